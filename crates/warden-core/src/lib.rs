// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Warden approval bot.
//!
//! This crate provides the domain types (users, applications, conversational
//! states, updates, responses), the crate-wide error type, the per-request
//! context, and the adapter traits that storage drivers and transports
//! implement.

pub mod application;
pub mod callback;
pub mod context;
pub mod error;
pub mod response;
pub mod state;
pub mod traits;
pub mod types;
pub mod update;

// Re-export key items at crate root for ergonomic imports.
pub use application::{Application, ApplicationStatus};
pub use callback::{CallbackPayload, DecisionAction};
pub use context::RequestContext;
pub use error::{ConflictKind, LockError, ValidationError, ValidationErrors, WardenError};
pub use response::Response;
pub use state::ConversationState;
pub use types::{HealthStatus, Profile, User};
pub use update::{Update, UpdateKind};

pub use traits::{Adapter, ApplicationStore, DedupStore, StateStore, Transport, UserStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_store_traits_are_object_safe() {
        fn _user(_: &dyn UserStore) {}
        fn _application(_: &dyn ApplicationStore) {}
        fn _state(_: &dyn StateStore) {}
        fn _dedup(_: &dyn DedupStore) {}
        fn _transport(_: &dyn Transport) {}
    }

    #[test]
    fn health_status_variants() {
        let healthy = HealthStatus::Healthy;
        assert_ne!(HealthStatus::Degraded("slow".into()), healthy);
        assert_ne!(HealthStatus::Unhealthy("down".into()), healthy);
    }
}
