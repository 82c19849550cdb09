// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Application lifecycle operations shared by the handlers.

use chrono::Utc;
use tracing::{debug, info};
use warden_core::{
    Application, CallbackPayload, ConflictKind, DecisionAction, RequestContext, User, WardenError,
};

use crate::handler::Deps;
use crate::notify::NotifyEvent;

/// Fails with a conflict when `user` may not open another application.
///
/// A pending application is always the most recent one, so only the last
/// application needs to be inspected.
pub async fn ensure_can_apply(
    deps: &Deps,
    ctx: &RequestContext,
    user: &User,
) -> Result<(), WardenError> {
    match ctx
        .io(deps.stores.applications.last_application_of_user(user.id))
        .await
    {
        Ok(last) if last.is_pending() => {
            return Err(WardenError::Conflict(ConflictKind::PendingExists));
        }
        Ok(_) => {}
        Err(e) if e.is_not_found() => return Ok(()),
        Err(e) => return Err(e),
    }

    let limit = deps.settings.max_requests_per_user;
    let count = ctx
        .io(deps.stores.applications.count_applications_of_user(user.id))
        .await?;
    if count >= u64::from(limit) {
        return Err(WardenError::Conflict(ConflictKind::TooManyApplications {
            limit,
        }));
    }
    Ok(())
}

/// Validates `nickname`, creates the application and queues the admin fan-out.
pub async fn submit_application(
    deps: &Deps,
    ctx: &mut RequestContext,
    user: &User,
    nickname: &str,
) -> Result<Application, WardenError> {
    // Reject bad input before touching the store.
    Application::new_pending(user.id, nickname, Utc::now())?;
    ensure_can_apply(deps, ctx, user).await?;

    let application = ctx
        .io(
            deps.stores
                .applications
                .create_application(user.id, nickname.trim()),
        )
        .await?;
    ctx.insert("application_id", application.id);
    info!(application_id = %application.id, requester = %user.id, "application created");

    deps.notify.enqueue(NotifyEvent::ApplicationCreated {
        application_id: application.id,
        requester_id: user.id,
    });
    Ok(application)
}

/// Result of an arbiter decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Decided {
        application: Application,
        requester: User,
    },
    /// The application was already decided; nothing was written.
    AlreadyProcessed,
}

/// Applies `payload.action` on behalf of `arbiter`.
///
/// Every read happens before `update_application`, which is the commit
/// point: it only overwrites a record that is still pending, so a racing
/// second decision lands in [`Decision::AlreadyProcessed`].
pub async fn decide(
    deps: &Deps,
    ctx: &mut RequestContext,
    arbiter: &User,
    payload: CallbackPayload,
) -> Result<Decision, WardenError> {
    ctx.insert("application_id", payload.id);
    ctx.insert("action", payload.action);

    let application = ctx
        .io(deps.stores.applications.application_by_id(payload.id))
        .await?;
    if !application.is_pending() {
        debug!(application_id = %application.id, status = %application.status, "already decided");
        return Ok(Decision::AlreadyProcessed);
    }

    // Resolved before the commit so a lookup failure leaves the record pending.
    let requester = ctx
        .io(deps.stores.users.user_by_id(application.requester_id))
        .await?;

    let now = Utc::now();
    let decided = match payload.action {
        DecisionAction::Approve => application.approve(arbiter.id, now)?,
        DecisionAction::Decline => application.decline(arbiter.id, None, now)?,
    };

    let stored = match ctx
        .io(deps.stores.applications.update_application(&decided))
        .await
    {
        Ok(stored) => stored,
        Err(WardenError::Conflict(ConflictKind::AlreadyDecided)) => {
            debug!(application_id = %decided.id, "lost decision race");
            return Ok(Decision::AlreadyProcessed);
        }
        Err(e) => return Err(e),
    };
    info!(
        application_id = %stored.id,
        status = %stored.status,
        arbiter = %arbiter.id,
        "application decided"
    );

    Ok(Decision::Decided {
        application: stored,
        requester,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;
    use uuid::Uuid;
    use warden_core::application::ApplicationStatus;
    use warden_core::{Adapter, ApplicationStore, HealthStatus, UserStore};
    use warden_storage::MemoryStore;

    use super::*;
    use crate::handlers::fixture::{ADMIN, Fixture};

    /// Serves transport-id lookups but fails every lookup by internal id.
    struct UsersDown(Arc<MemoryStore>);

    #[async_trait]
    impl Adapter for UsersDown {
        fn name(&self) -> &str {
            "users-down"
        }

        async fn health_check(&self) -> Result<HealthStatus, WardenError> {
            Ok(HealthStatus::Unhealthy("users down".into()))
        }
    }

    #[async_trait]
    impl UserStore for UsersDown {
        async fn user_by_transport_id(&self, transport_id: i64) -> Result<User, WardenError> {
            self.0.user_by_transport_id(transport_id).await
        }

        async fn user_by_id(&self, _id: Uuid) -> Result<User, WardenError> {
            Err(WardenError::Backend {
                message: "users down".into(),
                source: None,
            })
        }

        async fn create_user(&self, user: &User) -> Result<User, WardenError> {
            self.0.create_user(user).await
        }

        async fn update_user(&self, user: &User) -> Result<User, WardenError> {
            self.0.update_user(user).await
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::new(CancellationToken::new())
    }

    #[tokio::test]
    async fn failed_requester_lookup_leaves_application_pending() {
        let mut fx = Fixture::new();
        let requester = fx.user(42).await;
        let admin = fx.user(ADMIN).await;
        let app = fx.store.create_application(requester.id, "Alice").await.unwrap();
        fx.deps.stores.users = Arc::new(UsersDown(fx.store.clone()));

        let payload = CallbackPayload::new(app.id, DecisionAction::Approve);
        let err = decide(&fx.deps, &mut ctx(), &admin, payload).await.unwrap_err();
        assert!(matches!(err, WardenError::Backend { .. }));

        let stored = fx.store.application_by_id(app.id).await.unwrap();
        assert_eq!(stored.status, ApplicationStatus::Pending);
        assert!(stored.arbiter_id.is_none());

        // Once the store recovers the decision can still be made.
        fx.deps.stores.users = fx.store.clone();
        let decision = decide(&fx.deps, &mut ctx(), &admin, payload).await.unwrap();
        assert!(matches!(
            decision,
            Decision::Decided { ref application, ref requester }
                if application.status == ApplicationStatus::Approved && requester.transport_id == 42
        ));
    }

    #[tokio::test]
    async fn second_decision_is_already_processed() {
        let fx = Fixture::new();
        let requester = fx.user(42).await;
        let admin = fx.user(ADMIN).await;
        let app = fx.store.create_application(requester.id, "Bob").await.unwrap();

        let decline = CallbackPayload::new(app.id, DecisionAction::Decline);
        decide(&fx.deps, &mut ctx(), &admin, decline).await.unwrap();
        let again = CallbackPayload::new(app.id, DecisionAction::Approve);
        assert_eq!(
            decide(&fx.deps, &mut ctx(), &admin, again).await.unwrap(),
            Decision::AlreadyProcessed
        );
        let stored = fx.store.application_by_id(app.id).await.unwrap();
        assert_eq!(stored.status, ApplicationStatus::Declined);
    }
}
