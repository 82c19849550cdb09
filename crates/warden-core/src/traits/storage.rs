// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence contracts used by the pipeline.
//!
//! Every operation is atomic on a single record. Nothing in the core relies
//! on multi-record transactions; the per-user lease protects the
//! read-modify-write window of the conversational state.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::application::Application;
use crate::error::WardenError;
use crate::state::ConversationState;
use crate::traits::adapter::Adapter;
use crate::types::User;

/// Users keyed by internal id, with a unique secondary key on transport id.
#[async_trait]
pub trait UserStore: Adapter {
    /// Fails with `NotFound` when no user has this transport id.
    async fn user_by_transport_id(&self, transport_id: i64) -> Result<User, WardenError>;

    /// Fails with `NotFound` when no user has this id.
    async fn user_by_id(&self, id: Uuid) -> Result<User, WardenError>;

    /// Inserts a user. Fails with `Conflict(DuplicateUser)` when either the
    /// internal id or the transport id is already taken.
    async fn create_user(&self, user: &User) -> Result<User, WardenError>;

    /// Overwrites the profile fields and refreshes `updated_at`.
    async fn update_user(&self, user: &User) -> Result<User, WardenError>;
}

/// Applications and their lifecycle status.
#[async_trait]
pub trait ApplicationStore: Adapter {
    /// Persists a new pending application for `requester_id`.
    async fn create_application(
        &self,
        requester_id: Uuid,
        nickname: &str,
    ) -> Result<Application, WardenError>;

    async fn application_by_id(&self, id: Uuid) -> Result<Application, WardenError>;

    /// Pending applications joined with their requesters, most recent first,
    /// never more than `limit` entries.
    async fn pending_applications_with_requester(
        &self,
        limit: usize,
    ) -> Result<Vec<(Application, User)>, WardenError>;

    /// Commits a decision. Only a stored record that is still pending may be
    /// overwritten; a decided record yields `Conflict(AlreadyDecided)`.
    async fn update_application(&self, application: &Application)
    -> Result<Application, WardenError>;

    /// The most recently created application of `user_id`.
    async fn last_application_of_user(&self, user_id: Uuid) -> Result<Application, WardenError>;

    /// Number of applications ever created by `user_id`.
    async fn count_applications_of_user(&self, user_id: Uuid) -> Result<u64, WardenError>;
}

/// Current conversational state per user. No history is kept.
#[async_trait]
pub trait StateStore: Adapter {
    /// Returns [`ConversationState::Start`] when nothing is stored.
    async fn get_state(&self, user_id: Uuid) -> Result<ConversationState, WardenError>;

    async fn set_state(&self, user_id: Uuid, state: ConversationState) -> Result<(), WardenError>;
}

/// TTL-bounded key/value records used to suppress repeated notifications.
#[async_trait]
pub trait DedupStore: Adapter {
    /// The stored value, or `None` when absent or expired.
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>, WardenError>;

    /// Stores `value`, replacing any previous one, for `ttl`.
    async fn set(
        &self,
        namespace: &str,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), WardenError>;
}
