// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram transport for the Warden approval bot.
//!
//! Implements [`Transport`] for the Telegram Bot API via teloxide and runs
//! the long-polling loop that feeds updates into the
//! [`Dispatcher`](warden_bot::Dispatcher).

pub mod convert;
pub mod markup;
pub mod polling;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{CallbackQueryId, ChatId, MessageId};
use tracing::{debug, warn};
use warden_config::model::TelegramConfig;
use warden_core::response::{CallbackAnswer, EditMessage, MessageRef, OutgoingMessage};
use warden_core::{Adapter, HealthStatus, Transport, WardenError};

pub use polling::run_polling;

/// Telegram transport implementing [`Transport`].
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    /// Creates a new Telegram transport.
    ///
    /// Requires `config.token` to be set and non-empty.
    pub fn new(config: &TelegramConfig) -> Result<Self, WardenError> {
        let token = config
            .token
            .as_deref()
            .ok_or_else(|| WardenError::Config("telegram.token is required".into()))?;

        if token.trim().is_empty() {
            return Err(WardenError::Config("telegram.token cannot be empty".into()));
        }

        Ok(Self {
            bot: Bot::new(token),
        })
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

fn send_error(what: &str, e: teloxide::RequestError) -> WardenError {
    WardenError::Backend {
        message: format!("failed to {what}: {e}"),
        source: Some(Box::new(e)),
    }
}

fn missing(field: &str) -> WardenError {
    WardenError::Backend {
        message: format!("telegram request without {field}"),
        source: None,
    }
}

#[async_trait]
impl Adapter for TelegramTransport {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn health_check(&self) -> Result<HealthStatus, WardenError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_message(&self, message: &OutgoingMessage) -> Result<MessageRef, WardenError> {
        let chat_id = message.chat_id.ok_or_else(|| missing("chat_id"))?;
        let mut request = self.bot.send_message(ChatId(chat_id), &message.text);
        if let Some(mode) = message.parse_mode.and_then(markup::parse_mode) {
            request = request.parse_mode(mode);
        }
        if let Some(keyboard) = &message.keyboard {
            request = request.reply_markup(markup::reply_markup(keyboard));
        }
        let sent = request
            .await
            .map_err(|e| send_error("send message", e))?;
        debug!(chat_id, message_id = sent.id.0, "message sent");
        Ok(MessageRef {
            chat_id,
            message_id: sent.id.0,
        })
    }

    async fn edit_message(&self, edit: &EditMessage) -> Result<(), WardenError> {
        let chat_id = edit.chat_id.ok_or_else(|| missing("chat_id"))?;
        let message_id = edit.message_id.ok_or_else(|| missing("message_id"))?;
        let mut request = self
            .bot
            .edit_message_text(ChatId(chat_id), MessageId(message_id), &edit.text);
        if let Some(mode) = edit.parse_mode.and_then(markup::parse_mode) {
            request = request.parse_mode(mode);
        }
        if let Some(inline) = edit.keyboard.as_ref().and_then(markup::inline_markup) {
            request = request.reply_markup(inline);
        }
        match request.await {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains("message is not modified") => {
                debug!(chat_id, message_id, "edit was a no-op");
                Ok(())
            }
            Err(e) => Err(send_error("edit message", e)),
        }
    }

    async fn answer_callback(&self, answer: &CallbackAnswer) -> Result<(), WardenError> {
        let id = answer
            .callback_id
            .clone()
            .ok_or_else(|| missing("callback_id"))?;
        let mut request = self.bot.answer_callback_query(CallbackQueryId(id));
        if let Some(text) = &answer.text {
            request = request.text(text);
        }
        if answer.show_alert {
            request = request.show_alert(true);
        }
        request.await.map_err(|e| {
            warn!(error = %e, "callback answer failed");
            send_error("answer callback", e)
        })?;
        Ok(())
    }
}
