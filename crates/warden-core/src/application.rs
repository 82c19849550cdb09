// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Whitelist applications and their lifecycle.
//!
//! An application is created `pending` and moves exactly once to `approved`
//! or `declined`. Every constructor goes through [`ApplicationBuilder`], which
//! collects all violated invariants before failing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::error::{ConflictKind, ValidationError, ValidationErrors, WardenError};
use crate::types::char_len;

/// Maximum nickname length in code points.
pub const NICKNAME_MAX_CHARS: usize = 100;

/// Maximum decline reason length in code points.
pub const REASON_MAX_CHARS: usize = 500;

/// Reason recorded when an arbiter declines without giving one.
pub const DEFAULT_DECLINE_REASON: &str = "Заявка отклонена администратором";

/// Lifecycle status of an application.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Declined,
}

/// A user's request to be added to the whitelist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub nickname: String,
    pub status: ApplicationStatus,
    pub arbiter_id: Option<Uuid>,
    pub decline_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    /// Creates a new pending application. The nickname is trimmed first.
    pub fn new_pending(
        requester_id: Uuid,
        nickname: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, WardenError> {
        ApplicationBuilder::new(requester_id, nickname.trim())
            .created_at(now)
            .build()
            .map_err(WardenError::from)
    }

    pub fn is_pending(&self) -> bool {
        self.status == ApplicationStatus::Pending
    }

    /// Returns the approved copy of this application.
    pub fn approve(&self, arbiter_id: Uuid, now: DateTime<Utc>) -> Result<Self, WardenError> {
        self.decide(ApplicationStatus::Approved, arbiter_id, None, now)
    }

    /// Returns the declined copy of this application.
    ///
    /// A missing or blank reason is replaced by [`DEFAULT_DECLINE_REASON`].
    pub fn decline(
        &self,
        arbiter_id: Uuid,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Self, WardenError> {
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_DECLINE_REASON);
        self.decide(ApplicationStatus::Declined, arbiter_id, Some(reason), now)
    }

    fn decide(
        &self,
        status: ApplicationStatus,
        arbiter_id: Uuid,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Self, WardenError> {
        if !self.is_pending() {
            return Err(WardenError::Conflict(ConflictKind::AlreadyDecided));
        }
        let mut builder = ApplicationBuilder::from_existing(self)
            .status(status)
            .arbiter(arbiter_id)
            .updated_at(now);
        if let Some(reason) = reason {
            builder = builder.decline_reason(reason);
        }
        builder.build().map_err(WardenError::from)
    }

    /// Re-checks every invariant of an already constructed value.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        ApplicationBuilder::from_existing(self).build().map(|_| ())
    }
}

/// Validating builder for [`Application`].
///
/// `build` reports every violated invariant at once.
#[derive(Debug, Clone)]
pub struct ApplicationBuilder {
    id: Uuid,
    requester_id: Uuid,
    nickname: String,
    status: ApplicationStatus,
    arbiter_id: Option<Uuid>,
    decline_reason: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl ApplicationBuilder {
    pub fn new(requester_id: Uuid, nickname: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            requester_id,
            nickname: nickname.into(),
            status: ApplicationStatus::Pending,
            arbiter_id: None,
            decline_reason: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn from_existing(app: &Application) -> Self {
        Self {
            id: app.id,
            requester_id: app.requester_id,
            nickname: app.nickname.clone(),
            status: app.status,
            arbiter_id: app.arbiter_id,
            decline_reason: app.decline_reason.clone(),
            created_at: Some(app.created_at),
            updated_at: Some(app.updated_at),
        }
    }

    pub fn id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn status(mut self, status: ApplicationStatus) -> Self {
        self.status = status;
        self
    }

    pub fn arbiter(mut self, arbiter_id: Uuid) -> Self {
        self.arbiter_id = Some(arbiter_id);
        self
    }

    pub fn decline_reason(mut self, reason: impl Into<String>) -> Self {
        self.decline_reason = Some(reason.into());
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    pub fn updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = Some(at);
        self
    }

    pub fn build(self) -> Result<Application, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let len = char_len(&self.nickname);
        if self.nickname.trim().is_empty() {
            errors.push(ValidationError::EmptyNickname);
        } else if len > NICKNAME_MAX_CHARS {
            errors.push(ValidationError::NicknameTooLong {
                len,
                max: NICKNAME_MAX_CHARS,
            });
        }

        if let Some(reason) = &self.decline_reason {
            let len = char_len(reason);
            if len > REASON_MAX_CHARS {
                errors.push(ValidationError::ReasonTooLong {
                    len,
                    max: REASON_MAX_CHARS,
                });
            }
        }

        match self.status {
            ApplicationStatus::Pending => {
                if self.arbiter_id.is_some() {
                    errors.push(ValidationError::UnexpectedArbiter);
                }
                if self.decline_reason.is_some() {
                    errors.push(ValidationError::UnexpectedReason);
                }
            }
            ApplicationStatus::Approved => {
                if self.arbiter_id.is_none() {
                    errors.push(ValidationError::MissingArbiter {
                        status: self.status.into(),
                    });
                }
                if self.decline_reason.is_some() {
                    errors.push(ValidationError::UnexpectedReason);
                }
            }
            ApplicationStatus::Declined => {
                if self.arbiter_id.is_none() {
                    errors.push(ValidationError::MissingArbiter {
                        status: self.status.into(),
                    });
                }
                if self.decline_reason.is_none() {
                    errors.push(ValidationError::MissingReason);
                }
            }
        }

        errors.into_result()?;

        let created_at = self.created_at.unwrap_or_else(Utc::now);
        Ok(Application {
            id: self.id,
            requester_id: self.requester_id,
            nickname: self.nickname,
            status: self.status,
            arbiter_id: self.arbiter_id,
            decline_reason: self.decline_reason,
            created_at,
            updated_at: self.updated_at.unwrap_or(created_at),
        })
    }
}
