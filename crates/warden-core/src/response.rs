// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound effects produced by handlers and materialized by the renderer.
//!
//! Handlers never talk to the transport. They describe what should happen
//! and the renderer in `warden-bot` fills in defaults and performs the I/O.

use serde::{Deserialize, Serialize};

/// Text formatting mode understood by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseMode {
    Html,
    MarkdownV2,
    Plain,
}

/// A button attached to a message that produces a callback when tapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// Keyboard markup attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Keyboard {
    /// Persistent reply keyboard of text buttons, row by row.
    Reply(Vec<Vec<String>>),
    /// Hide any reply keyboard currently shown.
    Remove,
    /// Buttons attached to the message itself.
    Inline(Vec<Vec<InlineButton>>),
}

/// A new message to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Target chat; `None` means the chat the update came from.
    pub chat_id: Option<i64>,
    pub text: String,
    pub parse_mode: Option<ParseMode>,
    pub keyboard: Option<Keyboard>,
}

impl OutgoingMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            chat_id: None,
            text: text.into(),
            parse_mode: None,
            keyboard: None,
        }
    }

    pub fn to_chat(mut self, chat_id: i64) -> Self {
        self.chat_id = Some(chat_id);
        self
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    pub fn with_parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = Some(mode);
        self
    }
}

/// Replacement text for a previously sent message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditMessage {
    /// `None` means the chat the update came from.
    pub chat_id: Option<i64>,
    /// `None` means the message carrying the tapped button.
    pub message_id: Option<i32>,
    pub text: String,
    pub parse_mode: Option<ParseMode>,
    /// Inline keyboard to keep; `None` strips the buttons.
    pub keyboard: Option<Keyboard>,
}

impl EditMessage {
    /// Edits the message that carried the tapped button.
    pub fn origin(text: impl Into<String>) -> Self {
        Self {
            chat_id: None,
            message_id: None,
            text: text.into(),
            parse_mode: None,
            keyboard: None,
        }
    }
}

/// Acknowledgement of a callback, optionally with a toast or alert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackAnswer {
    /// `None` means the callback being handled.
    pub callback_id: Option<String>,
    pub text: Option<String>,
    pub show_alert: bool,
}

impl CallbackAnswer {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            callback_id: None,
            text: Some(text.into()),
            show_alert: false,
        }
    }

    pub fn alert(text: impl Into<String>) -> Self {
        Self {
            callback_id: None,
            text: Some(text.into()),
            show_alert: true,
        }
    }
}

/// One outbound transport operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Send(OutgoingMessage),
    Edit(EditMessage),
    Answer(CallbackAnswer),
}

/// Identifies a message the transport delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i32,
}

/// Everything a handler wants the transport to do, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub effects: Vec<Effect>,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    /// A response consisting of a single message to the current chat.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new().send(OutgoingMessage::new(text))
    }

    pub fn send(mut self, message: OutgoingMessage) -> Self {
        self.effects.push(Effect::Send(message));
        self
    }

    pub fn edit(mut self, edit: EditMessage) -> Self {
        self.effects.push(Effect::Edit(edit));
        self
    }

    pub fn answer(mut self, answer: CallbackAnswer) -> Self {
        self.effects.push(Effect::Answer(answer));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Texts of every message sent by this response, in order.
    pub fn sent_texts(&self) -> Vec<&str> {
        self.effects
            .iter()
            .filter_map(|e| match e {
                Effect::Send(m) => Some(m.text.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_effect_order() {
        let response = Response::new()
            .answer(CallbackAnswer::text("ok"))
            .edit(EditMessage::origin("edited"))
            .send(OutgoingMessage::new("hi").to_chat(5));
        assert_eq!(response.effects.len(), 3);
        assert!(matches!(response.effects[0], Effect::Answer(_)));
        assert!(matches!(response.effects[1], Effect::Edit(_)));
        assert_eq!(response.sent_texts(), vec!["hi"]);
    }

    #[test]
    fn text_targets_current_chat() {
        let response = Response::text("hello");
        match &response.effects[0] {
            Effect::Send(m) => {
                assert!(m.chat_id.is_none());
                assert!(m.keyboard.is_none());
            }
            other => panic!("expected Send, got {other:?}"),
        }
    }
}
