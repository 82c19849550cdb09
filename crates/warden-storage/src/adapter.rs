// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the store traits.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use warden_config::model::StorageConfig;
use warden_core::{
    Adapter, Application, ApplicationStore, ConversationState, DedupStore, HealthStatus,
    StateStore, User, UserStore, WardenError,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed store.
///
/// Wraps a [`Database`] handle and delegates every operation to the typed
/// query modules.
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Opens the database at the configured path.
    pub async fn open(config: &StorageConfig) -> Result<Self, WardenError> {
        let db = Database::open_with(&config.sqlite_path, config.wal_mode).await?;
        debug!(path = %config.sqlite_path, "SQLite store initialized");
        Ok(Self { db })
    }

    pub fn from_database(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Checkpoints the WAL. The connection closes when the store is dropped.
    pub async fn shutdown(&self) -> Result<(), WardenError> {
        self.db.checkpoint().await
    }
}

#[async_trait]
impl Adapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn health_check(&self) -> Result<HealthStatus, WardenError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn user_by_transport_id(&self, transport_id: i64) -> Result<User, WardenError> {
        queries::users::user_by_transport_id(&self.db, transport_id).await
    }

    async fn user_by_id(&self, id: Uuid) -> Result<User, WardenError> {
        queries::users::user_by_id(&self.db, id).await
    }

    async fn create_user(&self, user: &User) -> Result<User, WardenError> {
        queries::users::create_user(&self.db, user).await
    }

    async fn update_user(&self, user: &User) -> Result<User, WardenError> {
        queries::users::update_user(&self.db, user).await
    }
}

#[async_trait]
impl ApplicationStore for SqliteStore {
    async fn create_application(
        &self,
        requester_id: Uuid,
        nickname: &str,
    ) -> Result<Application, WardenError> {
        queries::applications::create_application(&self.db, requester_id, nickname).await
    }

    async fn application_by_id(&self, id: Uuid) -> Result<Application, WardenError> {
        queries::applications::application_by_id(&self.db, id).await
    }

    async fn pending_applications_with_requester(
        &self,
        limit: usize,
    ) -> Result<Vec<(Application, User)>, WardenError> {
        queries::applications::pending_applications_with_requester(&self.db, limit).await
    }

    async fn update_application(
        &self,
        application: &Application,
    ) -> Result<Application, WardenError> {
        queries::applications::update_application(&self.db, application).await
    }

    async fn last_application_of_user(&self, user_id: Uuid) -> Result<Application, WardenError> {
        queries::applications::last_application_of_user(&self.db, user_id).await
    }

    async fn count_applications_of_user(&self, user_id: Uuid) -> Result<u64, WardenError> {
        queries::applications::count_applications_of_user(&self.db, user_id).await
    }
}

#[async_trait]
impl StateStore for SqliteStore {
    async fn get_state(&self, user_id: Uuid) -> Result<ConversationState, WardenError> {
        queries::states::get_state(&self.db, user_id).await
    }

    async fn set_state(&self, user_id: Uuid, state: ConversationState) -> Result<(), WardenError> {
        queries::states::set_state(&self.db, user_id, state).await
    }
}

#[async_trait]
impl DedupStore for SqliteStore {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>, WardenError> {
        queries::dedup::get(&self.db, namespace, key).await
    }

    async fn set(
        &self,
        namespace: &str,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), WardenError> {
        queries::dedup::set(&self.db, namespace, key, value, ttl).await
    }
}
