// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-update pipeline.
//!
//! For every update the [`Dispatcher`]:
//! - enriches a [`RequestContext`] with the update's identifying fields
//! - materializes the sender as a stored [`User`]
//! - takes the sender's lease from the [`LockRegistry`]
//! - loads the conversational state and runs the first matching route
//! - commits a changed state and renders the response
//! - releases the lease on every exit path
//!
//! Failures are mapped to a fixed user-visible text; only startup errors are
//! fatal to the process.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, error, info, info_span, warn};
use warden_core::{
    ConflictKind, Profile, RequestContext, Response, Transport, Update, User, WardenError,
    response::CallbackAnswer,
};

use crate::handler::{Call, Deps, Reply};
use crate::handlers::default_routes;
use crate::locks::LockRegistry;
use crate::messages;
use crate::render::Renderer;
use crate::routes::RouteTable;

struct Inner {
    deps: Deps,
    routes: RouteTable,
    locks: LockRegistry,
    renderer: Renderer,
    with_context: bool,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

/// Cheaply clonable handle to the update pipeline.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    /// Builds a dispatcher with the default routes.
    ///
    /// `cancel` is the process-wide shutdown token; every update context is a
    /// child of it.
    pub fn new(deps: Deps, transport: Arc<dyn Transport>, cancel: CancellationToken) -> Self {
        let routes = default_routes(&deps.admins);
        Self::with_routes(deps, transport, routes, cancel)
    }

    pub fn with_routes(
        deps: Deps,
        transport: Arc<dyn Transport>,
        routes: RouteTable,
        cancel: CancellationToken,
    ) -> Self {
        info!(routes = routes.len(), admins = deps.admins.len(), "dispatcher initialized");
        let renderer = Renderer::new(transport, deps.admins.clone());
        Self {
            inner: Arc::new(Inner {
                deps,
                routes,
                locks: LockRegistry::new(),
                renderer,
                with_context: true,
                cancel,
                tracker: TaskTracker::new(),
            }),
        }
    }

    /// Toggles the per-update tracing span. Call before cloning.
    pub fn with_context(mut self, enabled: bool) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.with_context = enabled;
        } else {
            warn!("dispatcher already shared, with_context ignored");
        }
        self
    }

    pub fn deps(&self) -> &Deps {
        &self.inner.deps
    }

    pub fn locks(&self) -> &LockRegistry {
        &self.inner.locks
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.inner.cancel
    }

    /// Tasks started through [`Dispatcher::spawn`].
    pub fn tracker(&self) -> &TaskTracker {
        &self.inner.tracker
    }

    /// Dispatches `update` on a tracked background task.
    pub fn spawn(&self, update: Update) {
        let dispatcher = self.clone();
        self.inner.tracker.spawn(async move {
            // Failures were already reported to the user and logged.
            let _ = dispatcher.dispatch(update).await;
        });
    }

    /// Runs the whole pipeline for one update.
    ///
    /// The returned error has already been logged and, unless it is
    /// [`WardenError::Canceled`], reported to the sender.
    pub async fn dispatch(&self, update: Update) -> Result<(), WardenError> {
        let mut ctx = RequestContext::for_update(&update, &self.inner.cancel);
        if self.inner.with_context {
            let span = info_span!(
                "update",
                update_id = update.id,
                chat_id = update.chat_id,
                sender_id = update.sender_id(),
                request_id = %ctx.request_id(),
                correlation_id = %ctx.correlation_id(),
            );
            self.run(&mut ctx, &update).instrument(span).await
        } else {
            self.run(&mut ctx, &update).await
        }
    }

    async fn run(&self, ctx: &mut RequestContext, update: &Update) -> Result<(), WardenError> {
        match self.process(ctx, update).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.report(ctx, update, &e).await;
                Err(e)
            }
        }
    }

    async fn process(&self, ctx: &mut RequestContext, update: &Update) -> Result<(), WardenError> {
        let user = self.materialize(ctx, &update.sender).await?;
        ctx.insert("user_id", user.id);

        let lease = ctx.cancellable(self.inner.locks.acquire(user.id)).await?;
        let result = self.handle_locked(ctx, update, &user).await;
        if let Err(e) = lease.release() {
            error!(error = %e, "lease release failed");
        }
        result
    }

    /// Looks the sender up, creating or refreshing the stored record.
    async fn materialize(
        &self,
        ctx: &RequestContext,
        profile: &Profile,
    ) -> Result<User, WardenError> {
        let users = &self.inner.deps.stores.users;
        match ctx.io(users.user_by_transport_id(profile.transport_id)).await {
            Ok(mut user) => {
                if !user.differs_from(profile) {
                    return Ok(user);
                }
                user.apply_profile(profile);
                user.updated_at = Utc::now();
                debug!(user_id = %user.id, "refreshing user profile");
                ctx.io(users.update_user(&user)).await
            }
            Err(e) if e.is_not_found() => {
                let fresh = User::from_profile(profile, Utc::now());
                match ctx.io(users.create_user(&fresh)).await {
                    Ok(user) => {
                        info!(user_id = %user.id, transport_id = user.transport_id, "new user");
                        Ok(user)
                    }
                    // A concurrent update created it first.
                    Err(WardenError::Conflict(ConflictKind::DuplicateUser)) => {
                        ctx.io(users.user_by_transport_id(profile.transport_id))
                            .await
                    }
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn handle_locked(
        &self,
        ctx: &mut RequestContext,
        update: &Update,
        user: &User,
    ) -> Result<(), WardenError> {
        let inner = &self.inner;
        let state = ctx.io(inner.deps.stores.states.get_state(user.id)).await?;
        ctx.insert("state", state);

        let route = inner
            .routes
            .find(update, state)
            .ok_or(WardenError::UnknownCommand)?;
        let handler = route.handler.clone();
        ctx.insert("handler", handler.name());

        let Reply {
            next_state,
            response,
        } = handler
            .handle(
                &inner.deps,
                Call {
                    ctx: &mut *ctx,
                    update,
                    user,
                    state,
                },
            )
            .await?;

        if next_state != state {
            ctx.io(inner.deps.stores.states.set_state(user.id, next_state))
                .await?;
            debug!(from = %state, to = %next_state, "state committed");
        }

        let rendered = inner
            .renderer
            .render(ctx, update, Some(next_state), response)
            .await;
        debug!(
            handler = handler.name(),
            delivered = rendered.delivered,
            failed = rendered.failed,
            skipped = rendered.skipped,
            "update handled"
        );
        Ok(())
    }

    /// Logs `err` and tells the sender about it.
    async fn report(&self, ctx: &RequestContext, update: &Update, err: &WardenError) {
        match err {
            WardenError::Canceled => debug!(%ctx, "update canceled"),
            WardenError::Backend { .. } | WardenError::Lock(_) | WardenError::Config(_) => {
                error!(error = %err, kind = err.kind(), %ctx, "update failed")
            }
            _ => warn!(error = %err, kind = err.kind(), %ctx, "update rejected"),
        }

        let Some(text) = messages::error_text(err) else {
            return;
        };
        let response = if update.is_callback() {
            Response::new().answer(CallbackAnswer::alert(text))
        } else {
            Response::text(text)
        };
        self.inner.renderer.render(ctx, update, None, response).await;
    }
}
