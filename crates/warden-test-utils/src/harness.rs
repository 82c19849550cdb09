// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the real dispatcher, the admin notifier, a
//! [`MockTransport`] and either in-memory or temporary SQLite stores.
//! Notifications are not processed by a background worker; tests call
//! [`TestHarness::drain_notifications`] to run the queued fan-outs.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use warden_bot::{
    AdminNotifier, AdminSet, Deps, Dispatcher, FanOut, NotifyEvent, NotifyQueue, Settings, Stores,
};
use warden_config::model::{StorageBackend, StorageConfig};
use warden_core::{ConversationState, Profile, Update, User, WardenError};
use warden_storage::{MemoryStore, SqliteStore};

use crate::mock_transport::MockTransport;

/// A private-chat profile whose chat id equals its transport id.
pub fn profile(transport_id: i64) -> Profile {
    Profile {
        transport_id,
        chat_id: transport_id,
        first_name: Some(format!("User{transport_id}")),
        last_name: None,
        username: Some(format!("user{transport_id}")),
    }
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    admins: Vec<i64>,
    settings: Settings,
    sqlite: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            admins: vec![1],
            settings: Settings::default(),
            sqlite: false,
        }
    }

    pub fn with_admins(mut self, admins: impl IntoIterator<Item = i64>) -> Self {
        self.admins = admins.into_iter().collect();
        self
    }

    pub fn with_max_requests(mut self, max: u32) -> Self {
        self.settings.max_requests_per_user = max;
        self
    }

    pub fn with_page_size(mut self, size: usize) -> Self {
        self.settings.pending_page_size = size;
        self
    }

    pub fn with_notify_ttl(mut self, ttl: Duration) -> Self {
        self.settings.notify_dedup_ttl = ttl;
        self
    }

    /// Back the stores with a SQLite file in a temporary directory.
    pub fn with_sqlite(mut self) -> Self {
        self.sqlite = true;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, WardenError> {
        let (stores, temp_dir) = if self.sqlite {
            let temp_dir = tempfile::TempDir::new()
                .map_err(|e| WardenError::backend("failed to create temp dir", e))?;
            let config = StorageConfig {
                backend: StorageBackend::Sqlite,
                sqlite_path: temp_dir.path().join("test.db").to_string_lossy().to_string(),
                wal_mode: true,
            };
            let store = Arc::new(SqliteStore::open(&config).await?);
            (Stores::from_backend(store), Some(temp_dir))
        } else {
            (Stores::from_backend(Arc::new(MemoryStore::new())), None)
        };

        let transport = Arc::new(MockTransport::new());
        let admins = AdminSet::new(self.admins);
        let (notify, rx) = NotifyQueue::channel(warden_bot::notify::QUEUE_CAPACITY);
        let deps = Deps {
            stores: stores.clone(),
            admins: admins.clone(),
            notify,
            settings: self.settings.clone(),
        };
        let cancel = CancellationToken::new();
        let dispatcher = Dispatcher::new(deps, transport.clone(), cancel.clone());
        let notifier = AdminNotifier::new(
            transport.clone(),
            stores.clone(),
            admins,
            self.settings.notify_dedup_ttl,
        );

        Ok(TestHarness {
            transport,
            dispatcher,
            notifier,
            stores,
            cancel,
            rx: Mutex::new(rx),
            next_update_id: AtomicI64::new(1),
            _temp_dir: temp_dir,
        })
    }
}

/// A complete pipeline with a recording transport.
pub struct TestHarness {
    pub transport: Arc<MockTransport>,
    pub dispatcher: Dispatcher,
    pub notifier: AdminNotifier,
    pub stores: Stores,
    /// Root shutdown token shared by every update.
    pub cancel: CancellationToken,
    rx: Mutex<mpsc::Receiver<NotifyEvent>>,
    next_update_id: AtomicI64,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: Option<tempfile::TempDir>,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Default harness: admin `1`, in-memory stores.
    pub async fn new() -> Result<Self, WardenError> {
        Self::builder().build().await
    }

    fn update_id(&self) -> i64 {
        self.next_update_id.fetch_add(1, Ordering::Relaxed)
    }

    /// A text message from `transport_id`, not yet dispatched.
    pub fn text_update(&self, transport_id: i64, text: &str) -> Update {
        let id = self.update_id();
        Update::message(id, profile(transport_id), id as i32, text)
    }

    /// A button tap from `transport_id` on message `message_id`.
    pub fn callback_update(&self, transport_id: i64, message_id: i32, data: &str) -> Update {
        let id = self.update_id();
        Update::callback(
            id,
            profile(transport_id),
            format!("cb-{id}"),
            Some(message_id),
            data,
        )
    }

    pub async fn send_text(&self, transport_id: i64, text: &str) -> Result<(), WardenError> {
        self.dispatcher.dispatch(self.text_update(transport_id, text)).await
    }

    pub async fn press(
        &self,
        transport_id: i64,
        message_id: i32,
        data: &str,
    ) -> Result<(), WardenError> {
        self.dispatcher
            .dispatch(self.callback_update(transport_id, message_id, data))
            .await
    }

    /// Runs every queued admin fan-out, in order.
    pub async fn drain_notifications(&self) -> Vec<Result<FanOut, WardenError>> {
        let mut rx = self.rx.lock().await;
        self.notifier.drain(&mut rx).await
    }

    pub async fn user(&self, transport_id: i64) -> Result<User, WardenError> {
        self.stores.users.user_by_transport_id(transport_id).await
    }

    pub async fn state_of(&self, transport_id: i64) -> Result<ConversationState, WardenError> {
        let user = self.user(transport_id).await?;
        self.stores.states.get_state(user.id).await
    }
}
