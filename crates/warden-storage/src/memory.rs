// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory implementation of the store traits.
//!
//! Used for tests and for `STORAGE_BACKEND=memory`. Enforces the same
//! uniqueness, foreign-key and compare-and-set rules as the SQLite store.
//! Dedup expiry follows `tokio::time`, so paused-clock tests can advance it.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::time::Instant;
use uuid::Uuid;

use warden_core::{
    Adapter, Application, ApplicationStore, ConflictKind, ConversationState, DedupStore,
    HealthStatus, StateStore, User, UserStore, WardenError,
};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    by_transport: HashMap<i64, Uuid>,
    /// Insertion order doubles as the tie-breaker for equal timestamps.
    applications: Vec<Application>,
    states: HashMap<Uuid, ConversationState>,
    dedup: HashMap<(String, String), (String, Instant)>,
}

impl Inner {
    fn newest_first(&self) -> impl Iterator<Item = &Application> {
        let mut ordered: Vec<(usize, &Application)> = self.applications.iter().enumerate().collect();
        ordered.sort_by(|(ia, a), (ib, b)| b.created_at.cmp(&a.created_at).then(ib.cmp(ia)));
        ordered.into_iter().map(|(_, app)| app)
    }
}

/// Process-local store. Cheap to construct; everything is lost on drop.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, WardenError> {
        self.inner.lock().map_err(|_| WardenError::Backend {
            message: "memory store mutex poisoned".to_string(),
            source: None,
        })
    }
}

#[async_trait]
impl Adapter for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> Result<HealthStatus, WardenError> {
        self.lock()?;
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn user_by_transport_id(&self, transport_id: i64) -> Result<User, WardenError> {
        let inner = self.lock()?;
        inner
            .by_transport
            .get(&transport_id)
            .and_then(|id| inner.users.get(id))
            .cloned()
            .ok_or_else(|| WardenError::not_found("user"))
    }

    async fn user_by_id(&self, id: Uuid) -> Result<User, WardenError> {
        self.lock()?
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| WardenError::not_found("user"))
    }

    async fn create_user(&self, user: &User) -> Result<User, WardenError> {
        let mut inner = self.lock()?;
        if inner.users.contains_key(&user.id) || inner.by_transport.contains_key(&user.transport_id)
        {
            return Err(WardenError::Conflict(ConflictKind::DuplicateUser));
        }
        inner.by_transport.insert(user.transport_id, user.id);
        inner.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn update_user(&self, user: &User) -> Result<User, WardenError> {
        let mut inner = self.lock()?;
        let stored = inner
            .users
            .get_mut(&user.id)
            .ok_or_else(|| WardenError::not_found("user"))?;
        stored.chat_id = user.chat_id;
        stored.first_name = user.first_name.clone();
        stored.last_name = user.last_name.clone();
        stored.username = user.username.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }
}

#[async_trait]
impl ApplicationStore for MemoryStore {
    async fn create_application(
        &self,
        requester_id: Uuid,
        nickname: &str,
    ) -> Result<Application, WardenError> {
        let application = Application::new_pending(requester_id, nickname, Utc::now())?;
        let mut inner = self.lock()?;
        if !inner.users.contains_key(&requester_id) {
            return Err(WardenError::not_found("user"));
        }
        inner.applications.push(application.clone());
        Ok(application)
    }

    async fn application_by_id(&self, id: Uuid) -> Result<Application, WardenError> {
        self.lock()?
            .applications
            .iter()
            .find(|app| app.id == id)
            .cloned()
            .ok_or_else(|| WardenError::not_found("application"))
    }

    async fn pending_applications_with_requester(
        &self,
        limit: usize,
    ) -> Result<Vec<(Application, User)>, WardenError> {
        let inner = self.lock()?;
        Ok(inner
            .newest_first()
            .filter(|app| app.is_pending())
            .filter_map(|app| {
                inner
                    .users
                    .get(&app.requester_id)
                    .map(|user| (app.clone(), user.clone()))
            })
            .take(limit)
            .collect())
    }

    async fn update_application(
        &self,
        application: &Application,
    ) -> Result<Application, WardenError> {
        application.validate()?;
        let mut inner = self.lock()?;
        if let Some(arbiter) = application.arbiter_id
            && !inner.users.contains_key(&arbiter)
        {
            return Err(WardenError::not_found("user"));
        }
        let stored = inner
            .applications
            .iter_mut()
            .find(|app| app.id == application.id)
            .ok_or_else(|| WardenError::not_found("application"))?;
        if !stored.is_pending() {
            return Err(WardenError::Conflict(ConflictKind::AlreadyDecided));
        }
        stored.status = application.status;
        stored.arbiter_id = application.arbiter_id;
        stored.decline_reason = application.decline_reason.clone();
        stored.updated_at = application.updated_at;
        Ok(stored.clone())
    }

    async fn last_application_of_user(&self, user_id: Uuid) -> Result<Application, WardenError> {
        self.lock()?
            .newest_first()
            .find(|app| app.requester_id == user_id)
            .cloned()
            .ok_or_else(|| WardenError::not_found("application"))
    }

    async fn count_applications_of_user(&self, user_id: Uuid) -> Result<u64, WardenError> {
        let count = self
            .lock()?
            .applications
            .iter()
            .filter(|app| app.requester_id == user_id)
            .count();
        Ok(count as u64)
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get_state(&self, user_id: Uuid) -> Result<ConversationState, WardenError> {
        Ok(self
            .lock()?
            .states
            .get(&user_id)
            .copied()
            .unwrap_or_default())
    }

    async fn set_state(&self, user_id: Uuid, state: ConversationState) -> Result<(), WardenError> {
        self.lock()?.states.insert(user_id, state);
        Ok(())
    }
}

#[async_trait]
impl DedupStore for MemoryStore {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>, WardenError> {
        let now = Instant::now();
        let inner = self.lock()?;
        Ok(inner
            .dedup
            .get(&(namespace.to_string(), key.to_string()))
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(value, _)| value.clone()))
    }

    async fn set(
        &self,
        namespace: &str,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), WardenError> {
        let now = Instant::now();
        let mut inner = self.lock()?;
        inner.dedup.retain(|_, (_, expires_at)| *expires_at > now);
        inner.dedup.insert(
            (namespace.to_string(), key.to_string()),
            (value.to_string(), now + ttl),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::{ApplicationStatus, Profile};

    fn user(transport_id: i64) -> User {
        let profile = Profile {
            transport_id,
            chat_id: transport_id,
            first_name: None,
            last_name: None,
            username: Some(format!("u{transport_id}")),
        };
        User::from_profile(&profile, Utc::now())
    }

    #[tokio::test]
    async fn transport_id_is_unique() {
        let store = MemoryStore::new();
        store.create_user(&user(1)).await.unwrap();
        let err = store.create_user(&user(1)).await.unwrap_err();
        assert!(matches!(err, WardenError::Conflict(ConflictKind::DuplicateUser)));
        assert_eq!(store.user_by_transport_id(1).await.unwrap().transport_id, 1);
    }

    #[tokio::test]
    async fn state_defaults_to_start() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        assert_eq!(store.get_state(id).await.unwrap(), ConversationState::Start);
        store.set_state(id, ConversationState::Idle).await.unwrap();
        assert_eq!(store.get_state(id).await.unwrap(), ConversationState::Idle);
    }

    #[tokio::test]
    async fn compare_and_set_rejects_second_decision() {
        let store = MemoryStore::new();
        let requester = store.create_user(&user(1)).await.unwrap();
        let admin = store.create_user(&user(2)).await.unwrap();
        let app = store.create_application(requester.id, "Steve").await.unwrap();

        let approved = app.approve(admin.id, Utc::now()).unwrap();
        let stored = store.update_application(&approved).await.unwrap();
        assert_eq!(stored.status, ApplicationStatus::Approved);

        let declined = app.decline(admin.id, None, Utc::now()).unwrap();
        let err = store.update_application(&declined).await.unwrap_err();
        assert!(matches!(err, WardenError::Conflict(ConflictKind::AlreadyDecided)));
    }

    #[tokio::test]
    async fn pending_listing_skips_decided_and_respects_limit() {
        let store = MemoryStore::new();
        let requester = store.create_user(&user(1)).await.unwrap();
        let a = store.create_application(requester.id, "a").await.unwrap();
        let b = store.create_application(requester.id, "b").await.unwrap();
        let c = store.create_application(requester.id, "c").await.unwrap();
        store
            .update_application(&b.approve(requester.id, Utc::now()).unwrap())
            .await
            .unwrap();

        let pending = store.pending_applications_with_requester(10).await.unwrap();
        let ids: Vec<Uuid> = pending.iter().map(|(app, _)| app.id).collect();
        assert_eq!(ids, vec![c.id, a.id]);
        assert_eq!(store.pending_applications_with_requester(1).await.unwrap().len(), 1);
        assert_eq!(store.last_application_of_user(requester.id).await.unwrap().id, c.id);
        assert_eq!(store.count_applications_of_user(requester.id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn unknown_requester_is_not_found() {
        let store = MemoryStore::new();
        let err = store.create_application(Uuid::new_v4(), "x").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn dedup_entries_expire_with_tokio_time() {
        let store = MemoryStore::new();
        store.set("ns", "k", "v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get("ns", "k").await.unwrap().as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(store.get("ns", "k").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.get("ns", "k").await.unwrap().is_none());
    }
}
