// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transport for deterministic testing.
//!
//! `MockTransport` implements [`Transport`] by recording every effect in
//! call order. Deliveries to chats marked with [`MockTransport::fail_chat`]
//! fail with a backend error and are not recorded.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use warden_core::response::{CallbackAnswer, EditMessage, Effect, MessageRef, OutgoingMessage};
use warden_core::{Adapter, HealthStatus, Transport, WardenError};

/// A recording messaging transport.
pub struct MockTransport {
    effects: Mutex<Vec<Effect>>,
    failing: Mutex<HashSet<i64>>,
    next_message_id: AtomicI32,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            effects: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            next_message_id: AtomicI32::new(1),
        }
    }

    /// Makes every later delivery to `chat_id` fail.
    pub async fn fail_chat(&self, chat_id: i64) {
        self.failing.lock().await.insert(chat_id);
    }

    pub async fn heal_chat(&self, chat_id: i64) {
        self.failing.lock().await.remove(&chat_id);
    }

    /// All recorded effects, in call order.
    pub async fn effects(&self) -> Vec<Effect> {
        self.effects.lock().await.clone()
    }

    pub async fn sent_messages(&self) -> Vec<OutgoingMessage> {
        self.effects
            .lock()
            .await
            .iter()
            .filter_map(|e| match e {
                Effect::Send(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    /// Messages delivered to `chat_id`.
    pub async fn sent_to(&self, chat_id: i64) -> Vec<OutgoingMessage> {
        self.sent_messages()
            .await
            .into_iter()
            .filter(|m| m.chat_id == Some(chat_id))
            .collect()
    }

    /// Text of the most recent message delivered to `chat_id`.
    pub async fn last_text_to(&self, chat_id: i64) -> Option<String> {
        self.sent_to(chat_id).await.pop().map(|m| m.text)
    }

    pub async fn edits(&self) -> Vec<EditMessage> {
        self.effects
            .lock()
            .await
            .iter()
            .filter_map(|e| match e {
                Effect::Edit(edit) => Some(edit.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn answers(&self) -> Vec<CallbackAnswer> {
        self.effects
            .lock()
            .await
            .iter()
            .filter_map(|e| match e {
                Effect::Answer(a) => Some(a.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn clear(&self) {
        self.effects.lock().await.clear();
    }

    async fn check(&self, chat_id: Option<i64>) -> Result<(), WardenError> {
        match chat_id {
            Some(chat) if self.failing.lock().await.contains(&chat) => Err(WardenError::Backend {
                message: format!("mock delivery to chat {chat} failed"),
                source: None,
            }),
            _ => Ok(()),
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }

    async fn health_check(&self) -> Result<HealthStatus, WardenError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_message(&self, message: &OutgoingMessage) -> Result<MessageRef, WardenError> {
        self.check(message.chat_id).await?;
        let message_id = self.next_message_id.fetch_add(1, Ordering::Relaxed);
        self.effects.lock().await.push(Effect::Send(message.clone()));
        Ok(MessageRef {
            chat_id: message.chat_id.unwrap_or_default(),
            message_id,
        })
    }

    async fn edit_message(&self, edit: &EditMessage) -> Result<(), WardenError> {
        self.check(edit.chat_id).await?;
        self.effects.lock().await.push(Effect::Edit(edit.clone()));
        Ok(())
    }

    async fn answer_callback(&self, answer: &CallbackAnswer) -> Result<(), WardenError> {
        self.effects.lock().await.push(Effect::Answer(answer.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_sends_in_order() {
        let transport = MockTransport::new();
        transport
            .send_message(&OutgoingMessage::new("a").to_chat(1))
            .await
            .unwrap();
        transport
            .send_message(&OutgoingMessage::new("b").to_chat(2))
            .await
            .unwrap();
        assert_eq!(transport.sent_messages().await.len(), 2);
        assert_eq!(transport.last_text_to(2).await.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn failing_chat_is_not_recorded() {
        let transport = MockTransport::new();
        transport.fail_chat(9).await;
        let err = transport
            .send_message(&OutgoingMessage::new("x").to_chat(9))
            .await
            .unwrap_err();
        assert!(matches!(err, WardenError::Backend { .. }));
        assert!(transport.effects().await.is_empty());

        transport.heal_chat(9).await;
        assert!(transport.send_message(&OutgoingMessage::new("x").to_chat(9)).await.is_ok());
    }
}
