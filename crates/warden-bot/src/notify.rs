// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admin fan-out on application creation.
//!
//! The submit handler enqueues an [`NotifyEvent`] and returns immediately. A
//! background worker (or the test harness, synchronously) runs
//! [`AdminNotifier::fan_out`], which is rate-limited by a TTL'd dedup marker:
//! while the marker is fresh no fan-out happens. The marker is only written
//! when at least one admin was reached.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;
use warden_core::{
    RequestContext, Transport, WardenError,
    response::{OutgoingMessage, ParseMode},
};

use crate::handler::{AdminSet, Stores};
use crate::handlers::admin::decision_keyboard;
use crate::messages;

pub const DEDUP_NAMESPACE: &str = "not_unique";
pub const DEDUP_KEY: &str = "application_admin_notified";

/// Capacity of the notification queue.
pub const QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyEvent {
    ApplicationCreated {
        application_id: Uuid,
        requester_id: Uuid,
    },
}

/// Sending half of the notification queue.
#[derive(Debug, Clone)]
pub struct NotifyQueue {
    tx: mpsc::Sender<NotifyEvent>,
}

impl NotifyQueue {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<NotifyEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Enqueues without waiting. A full or closed queue drops the event.
    pub fn enqueue(&self, event: NotifyEvent) {
        if let Err(e) = self.tx.try_send(event) {
            warn!(error = %e, ?event, "admin notification dropped");
        }
    }
}

/// Outcome of one fan-out attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FanOut {
    /// A previous fan-out is still fresh.
    Suppressed,
    /// At least one admin was reached.
    Delivered { delivered: usize, failed: usize },
}

/// Performs the admin fan-out.
#[derive(Clone)]
pub struct AdminNotifier {
    transport: Arc<dyn Transport>,
    stores: Stores,
    admins: AdminSet,
    ttl: Duration,
}

impl AdminNotifier {
    pub fn new(transport: Arc<dyn Transport>, stores: Stores, admins: AdminSet, ttl: Duration) -> Self {
        Self {
            transport,
            stores,
            admins,
            ttl,
        }
    }

    /// `true` when the stored marker is younger than the TTL.
    fn is_fresh(&self, marker: &str, now: DateTime<Utc>) -> bool {
        match DateTime::parse_from_rfc3339(marker) {
            Ok(at) => {
                let age = now.signed_duration_since(at.with_timezone(&Utc));
                age.to_std().map_or(true, |age| age < self.ttl)
            }
            // Unreadable markers still block until the store expires them.
            Err(_) => true,
        }
    }

    pub async fn fan_out(
        &self,
        ctx: &RequestContext,
        event: NotifyEvent,
    ) -> Result<FanOut, WardenError> {
        let NotifyEvent::ApplicationCreated {
            application_id,
            requester_id,
        } = event;

        let now = Utc::now();
        if let Some(marker) = ctx
            .io(self.stores.dedup.get(DEDUP_NAMESPACE, DEDUP_KEY))
            .await?
            && self.is_fresh(&marker, now)
        {
            debug!(%application_id, %marker, "admin fan-out suppressed");
            return Ok(FanOut::Suppressed);
        }

        let application = ctx
            .io(self.stores.applications.application_by_id(application_id))
            .await?;
        let requester = ctx.io(self.stores.users.user_by_id(requester_id)).await?;

        let keyboard = decision_keyboard(&application);
        let text = messages::new_application_notice(&application, &requester);

        let mut failures: Vec<(i64, WardenError)> = Vec::new();
        let mut delivered = 0;
        for admin in self.admins.iter() {
            let message = OutgoingMessage::new(text.clone())
                .to_chat(admin)
                .with_parse_mode(ParseMode::Html)
                .with_keyboard(keyboard.clone());
            match ctx.io(self.transport.send_message(&message)).await {
                Ok(_) => delivered += 1,
                Err(e) => {
                    warn!(admin, error = %e, "admin notification failed");
                    failures.push((admin, e));
                }
            }
        }

        if delivered == 0 {
            let detail = failures
                .iter()
                .map(|(admin, e)| format!("{admin}: {e}"))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(WardenError::Backend {
                message: format!("all {} admin deliveries failed: {detail}", failures.len()),
                source: None,
            });
        }

        ctx.io(
            self.stores
                .dedup
                .set(DEDUP_NAMESPACE, DEDUP_KEY, &now.to_rfc3339(), self.ttl),
        )
        .await?;
        info!(%application_id, delivered, failed = failures.len(), "admins notified");
        Ok(FanOut::Delivered {
            delivered,
            failed: failures.len(),
        })
    }

    /// Processes queued events until cancelled or the queue closes.
    pub async fn run(self, mut rx: mpsc::Receiver<NotifyEvent>, cancel: CancellationToken) {
        info!("admin notifier running");
        loop {
            tokio::select! {
                event = rx.recv() => {
                    let Some(event) = event else { break };
                    let ctx = RequestContext::new(cancel.child_token());
                    if let Err(e) = self.fan_out(&ctx, event).await {
                        warn!(error = %e, kind = e.kind(), %ctx, "admin fan-out failed");
                    }
                }
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping admin notifier");
                    break;
                }
            }
        }
        info!("admin notifier stopped");
    }

    /// Runs every event currently queued, in order, and returns the outcomes.
    pub async fn drain(
        &self,
        rx: &mut mpsc::Receiver<NotifyEvent>,
    ) -> Vec<Result<FanOut, WardenError>> {
        let ctx = RequestContext::new(CancellationToken::new());
        let mut outcomes = Vec::new();
        while let Ok(event) = rx.try_recv() {
            outcomes.push(self.fan_out(&ctx, event).await);
        }
        outcomes
    }
}
