// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handler contract and the dependencies handlers are given.
//!
//! A handler maps `(ctx, update, current state)` to a [`Reply`]: the next
//! state and a description of outbound effects. Handlers never perform
//! transport I/O. The dispatcher commits `next_state` only when the handler
//! succeeded and the state actually changed.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use warden_config::model::ServerConfig;
use warden_core::{
    ApplicationStore, ConversationState, DedupStore, RequestContext, Response, StateStore, Update,
    User, UserStore, WardenError,
};

use crate::notify::NotifyQueue;

/// Result of a successful handler run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub next_state: ConversationState,
    pub response: Response,
}

impl Reply {
    pub fn new(next_state: ConversationState, response: Response) -> Self {
        Self {
            next_state,
            response,
        }
    }
}

/// Everything a handler sees about the current update.
pub struct Call<'a> {
    pub ctx: &'a mut RequestContext,
    pub update: &'a Update,
    /// The materialized sender.
    pub user: &'a User,
    pub state: ConversationState,
}

#[async_trait]
pub trait Handler: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &'static str;

    async fn handle(&self, deps: &Deps, call: Call<'_>) -> Result<Reply, WardenError>;
}

/// The store handles a handler may use.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub applications: Arc<dyn ApplicationStore>,
    pub states: Arc<dyn StateStore>,
    pub dedup: Arc<dyn DedupStore>,
}

impl Stores {
    /// Uses one backend for every store.
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: UserStore + ApplicationStore + StateStore + DedupStore + 'static,
    {
        Self {
            users: backend.clone(),
            applications: backend.clone(),
            states: backend.clone(),
            dedup: backend,
        }
    }
}

/// Transport ids allowed to act as arbiters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminSet(Arc<BTreeSet<i64>>);

impl AdminSet {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        Self(Arc::new(ids.into_iter().collect()))
    }

    pub fn contains(&self, transport_id: i64) -> bool {
        self.0.contains(&transport_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Workflow limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub max_requests_per_user: u32,
    pub pending_page_size: usize,
    pub notify_dedup_ttl: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

impl From<&ServerConfig> for Settings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            max_requests_per_user: config.max_requests_per_user,
            pending_page_size: config.pending_page_size,
            notify_dedup_ttl: Duration::from_secs(config.notify_dedup_ttl_secs),
        }
    }
}

/// Shared, read-only dependencies of every handler.
#[derive(Clone)]
pub struct Deps {
    pub stores: Stores,
    pub admins: AdminSet,
    pub notify: NotifyQueue,
    pub settings: Settings,
}
