// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-update request context: log fields and cancellation.
//!
//! A [`RequestContext`] travels with one update through the pipeline. It
//! carries a string-keyed bag of log fields that downstream records merge in,
//! and a child [`CancellationToken`] of the process-wide shutdown token.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::WardenError;
use crate::update::Update;

/// Ambient data for processing a single update.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: Uuid,
    correlation_id: Uuid,
    cancel: CancellationToken,
    fields: BTreeMap<String, String>,
}

impl RequestContext {
    /// A bare context with fresh ids and no fields.
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            correlation_id: Uuid::new_v4(),
            cancel,
            fields: BTreeMap::new(),
        }
    }

    /// A context enriched with the identifying fields of `update`.
    ///
    /// The cancellation token is a child of `parent`, so cancelling the parent
    /// cancels this request but not the other way round.
    pub fn for_update(update: &Update, parent: &CancellationToken) -> Self {
        let mut ctx = Self::new(parent.child_token());
        ctx.insert("update_id", update.id);
        ctx.insert("chat_id", update.chat_id);
        ctx.insert("sender_id", update.sender_id());
        ctx
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    /// Reuses a correlation id from an upstream context.
    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    /// Attaches a log field. Later values overwrite earlier ones.
    pub fn insert(&mut self, key: impl Into<String>, value: impl fmt::Display) {
        self.fields.insert(key.into(), value.to_string());
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fails with [`WardenError::Canceled`] once cancellation has fired.
    pub fn check(&self) -> Result<(), WardenError> {
        if self.cancel.is_cancelled() {
            Err(WardenError::Canceled)
        } else {
            Ok(())
        }
    }

    /// Starts an I/O step unless cancelled; a started step runs to completion.
    pub async fn io<T, F>(&self, fut: F) -> Result<T, WardenError>
    where
        F: Future<Output = Result<T, WardenError>>,
    {
        self.check()?;
        fut.await
    }

    /// Races `fut` against cancellation, dropping it if cancellation wins.
    pub async fn cancellable<T, F>(&self, fut: F) -> Result<T, WardenError>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(WardenError::Canceled),
            value = fut => Ok(value),
        }
    }
}

impl fmt::Display for RequestContext {
    /// Renders `request_id=… correlation_id=… key=value…` for log records.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "request_id={} correlation_id={}",
            self.request_id, self.correlation_id
        )?;
        for (key, value) in &self.fields {
            write!(f, " {key}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::types::Profile;

    fn update() -> Update {
        let sender = Profile {
            transport_id: 42,
            chat_id: 420,
            first_name: None,
            last_name: None,
            username: None,
        };
        Update::message(9, sender, 1, "/start")
    }

    #[test]
    fn for_update_attaches_identifying_fields() {
        let ctx = RequestContext::for_update(&update(), &CancellationToken::new());
        assert_eq!(ctx.field("update_id"), Some("9"));
        assert_eq!(ctx.field("chat_id"), Some("420"));
        assert_eq!(ctx.field("sender_id"), Some("42"));
        assert_ne!(ctx.request_id(), ctx.correlation_id());
    }

    #[test]
    fn display_includes_fields() {
        let mut ctx = RequestContext::new(CancellationToken::new());
        ctx.insert("handler", "start");
        let rendered = ctx.to_string();
        assert!(rendered.contains("handler=start"));
        assert!(rendered.contains(&ctx.request_id().to_string()));
    }

    #[test]
    fn parent_cancellation_reaches_request() {
        let parent = CancellationToken::new();
        let ctx = RequestContext::for_update(&update(), &parent);
        assert!(ctx.check().is_ok());
        parent.cancel();
        assert!(matches!(ctx.check(), Err(WardenError::Canceled)));
    }

    #[tokio::test]
    async fn io_refuses_to_start_after_cancel() {
        let ctx = RequestContext::new(CancellationToken::new());
        ctx.cancellation().cancel();
        let result = ctx.io(async { Ok::<_, WardenError>(1) }).await;
        assert!(matches!(result, Err(WardenError::Canceled)));
    }

    #[tokio::test]
    async fn cancellable_returns_promptly() {
        let ctx = RequestContext::new(CancellationToken::new());
        let token = ctx.cancellation().clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });
        let result = ctx.cancellable(std::future::pending::<()>()).await;
        assert!(matches!(result, Err(WardenError::Canceled)));
    }
}
