// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound side of the chat transport.

use async_trait::async_trait;

use crate::error::WardenError;
use crate::response::{CallbackAnswer, EditMessage, MessageRef, OutgoingMessage};
use crate::traits::adapter::Adapter;

/// Delivers rendered effects to the chat platform.
///
/// The renderer resolves every optional target before calling in, so
/// implementations can rely on `chat_id`, `message_id`, and `callback_id`
/// being set.
#[async_trait]
pub trait Transport: Adapter {
    /// Sends a new message and returns where it landed.
    async fn send_message(&self, message: &OutgoingMessage) -> Result<MessageRef, WardenError>;

    /// Replaces the text (and inline keyboard) of an existing message.
    async fn edit_message(&self, edit: &EditMessage) -> Result<(), WardenError>;

    /// Acknowledges a callback query.
    async fn answer_callback(&self, answer: &CallbackAnswer) -> Result<(), WardenError>;
}
