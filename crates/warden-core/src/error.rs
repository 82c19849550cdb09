// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Warden approval bot.

use std::fmt;

use thiserror::Error;

/// The primary error type used across stores, handlers, and the dispatcher.
#[derive(Debug, Error)]
pub enum WardenError {
    /// Caller-supplied data violates a documented constraint.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// The requested record does not exist.
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// Duplicate create or an illegal lifecycle transition.
    #[error("conflict: {0}")]
    Conflict(ConflictKind),

    /// A handler was invoked in a conversational state where it does not apply.
    #[error("invalid conversational state: {0}")]
    InvalidState(String),

    /// A non-admin attempted an admin-only action.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// No route matched the update.
    #[error("unknown command")]
    UnknownCommand,

    /// Underlying store or transport failure.
    #[error("backend error: {message}")]
    Backend {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The ambient cancellation signal fired.
    #[error("operation canceled")]
    Canceled,

    /// Lease registry misuse.
    #[error("lock error: {0}")]
    Lock(#[from] LockError),

    /// Startup configuration errors.
    #[error("configuration error: {0}")]
    Config(String),
}

impl WardenError {
    /// Shorthand for a [`WardenError::NotFound`] of the given entity.
    pub fn not_found(entity: &'static str) -> Self {
        WardenError::NotFound { entity }
    }

    /// Wraps an arbitrary error as a backend failure.
    pub fn backend<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        WardenError::Backend {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns `true` for [`WardenError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, WardenError::NotFound { .. })
    }

    /// Returns `true` for any [`WardenError::Conflict`].
    pub fn is_conflict(&self) -> bool {
        matches!(self, WardenError::Conflict(_))
    }

    /// Stable lowercase name of the error kind, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            WardenError::Validation(_) => "validation",
            WardenError::NotFound { .. } => "not_found",
            WardenError::Conflict(_) => "conflict",
            WardenError::InvalidState(_) => "invalid_state",
            WardenError::Unauthorized(_) => "unauthorized",
            WardenError::UnknownCommand => "unknown_command",
            WardenError::Backend { .. } => "backend",
            WardenError::Canceled => "canceled",
            WardenError::Lock(_) => "lock",
            WardenError::Config(_) => "config",
        }
    }
}

/// The reason a [`WardenError::Conflict`] was raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    /// A record with the same identity already exists.
    DuplicateUser,
    /// The requester already has an application awaiting a decision.
    PendingExists,
    /// The requester reached the per-user application cap.
    TooManyApplications { limit: u32 },
    /// The application has already been approved or declined.
    AlreadyDecided,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::DuplicateUser => write!(f, "user already exists"),
            ConflictKind::PendingExists => write!(f, "pending application exists"),
            ConflictKind::TooManyApplications { limit } => {
                write!(f, "application limit of {limit} reached")
            }
            ConflictKind::AlreadyDecided => write!(f, "application already decided"),
        }
    }
}

/// A single violated constraint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("nickname must not be empty")]
    EmptyNickname,

    #[error("nickname is {len} characters long, at most {max} allowed")]
    NicknameTooLong { len: usize, max: usize },

    #[error("decline reason is {len} characters long, at most {max} allowed")]
    ReasonTooLong { len: usize, max: usize },

    #[error("{status} application must have an arbiter")]
    MissingArbiter { status: &'static str },

    #[error("pending application must not have an arbiter")]
    UnexpectedArbiter,

    #[error("declined application must have a reason")]
    MissingReason,

    #[error("only declined applications carry a reason")]
    UnexpectedReason,

    #[error("invalid uuid `{0}`")]
    InvalidUuid(String),

    #[error("invalid callback payload: {0}")]
    InvalidCallback(String),

    #[error("unknown {field} value `{value}`")]
    UnknownVariant { field: &'static str, value: String },
}

/// An append-only list of validation failures, displayed joined by `"; "`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    pub fn contains(&self, error: &ValidationError) -> bool {
        self.0.contains(error)
    }

    /// `Ok(())` when nothing was collected, otherwise the joined failure.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.0.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self(vec![error])
    }
}

impl From<ValidationError> for WardenError {
    fn from(error: ValidationError) -> Self {
        WardenError::Validation(error.into())
    }
}

/// Errors raised by the per-user lease registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    /// `release` was called for a user that holds no lease.
    #[error("no lease is held for user {0}")]
    NotHeld(uuid::Uuid),
}
