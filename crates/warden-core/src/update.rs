// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport-agnostic incoming updates.

use serde::{Deserialize, Serialize};

use crate::callback::CallbackPayload;
use crate::error::ValidationError;
use crate::types::Profile;

/// An incoming update, already decoded from the transport wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    pub id: i64,
    pub chat_id: i64,
    pub sender: Profile,
    pub kind: UpdateKind,
}

/// The payload of an [`Update`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateKind {
    /// A text message.
    Message { message_id: i32, text: String },
    /// A tap on an inline button.
    Callback {
        callback_id: String,
        /// The message the button was attached to, when still accessible.
        message_id: Option<i32>,
        data: String,
    },
}

impl Update {
    /// Builds a text message update from `sender` in their private chat.
    pub fn message(id: i64, sender: Profile, message_id: i32, text: impl Into<String>) -> Self {
        Self {
            id,
            chat_id: sender.chat_id,
            sender,
            kind: UpdateKind::Message {
                message_id,
                text: text.into(),
            },
        }
    }

    /// Builds a callback update from `sender` in their private chat.
    pub fn callback(
        id: i64,
        sender: Profile,
        callback_id: impl Into<String>,
        message_id: Option<i32>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            id,
            chat_id: sender.chat_id,
            sender,
            kind: UpdateKind::Callback {
                callback_id: callback_id.into(),
                message_id,
                data: data.into(),
            },
        }
    }

    /// Transport identifier of the sender.
    pub fn sender_id(&self) -> i64 {
        self.sender.transport_id
    }

    /// Trimmed message text, `None` for callbacks.
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            UpdateKind::Message { text, .. } => Some(text.trim()),
            UpdateKind::Callback { .. } => None,
        }
    }

    pub fn is_callback(&self) -> bool {
        matches!(self.kind, UpdateKind::Callback { .. })
    }

    pub fn callback_id(&self) -> Option<&str> {
        match &self.kind {
            UpdateKind::Callback { callback_id, .. } => Some(callback_id),
            UpdateKind::Message { .. } => None,
        }
    }

    /// The message that carried the tapped button.
    pub fn origin_message_id(&self) -> Option<i32> {
        match &self.kind {
            UpdateKind::Callback { message_id, .. } => *message_id,
            UpdateKind::Message { .. } => None,
        }
    }

    /// Decodes the callback payload. `None` for text messages.
    pub fn callback_payload(&self) -> Option<Result<CallbackPayload, ValidationError>> {
        match &self.kind {
            UpdateKind::Callback { data, .. } => Some(CallbackPayload::decode(data)),
            UpdateKind::Message { .. } => None,
        }
    }
}
