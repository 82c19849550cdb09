// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns a handler [`Response`] into transport calls.
//!
//! Callback answers go out first so the client stops its spinner, then edits
//! and sends in declaration order. A failing effect is logged and the rest
//! are still attempted.

use std::sync::Arc;

use tracing::{debug, warn};
use warden_core::{
    ConversationState, RequestContext, Response, Transport, Update,
    response::{CallbackAnswer, EditMessage, Effect, Keyboard, OutgoingMessage, ParseMode},
};

use crate::handler::AdminSet;
use crate::messages;

/// Number of effects that reached the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rendered {
    pub delivered: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Clone)]
pub struct Renderer {
    transport: Arc<dyn Transport>,
    admins: AdminSet,
}

impl Renderer {
    pub fn new(transport: Arc<dyn Transport>, admins: AdminSet) -> Self {
        Self { transport, admins }
    }

    /// The reply keyboard shown while idle.
    pub fn idle_keyboard(&self, transport_id: i64) -> Keyboard {
        let mut rows = vec![vec![
            messages::BUTTON_APPLY.to_string(),
            messages::BUTTON_STATUS.to_string(),
        ]];
        if self.admins.contains(transport_id) {
            rows.push(vec![messages::BUTTON_ADMIN.to_string()]);
        }
        Keyboard::Reply(rows)
    }

    /// Fills in defaults for every effect and puts answers first.
    ///
    /// `next_state` is `None` when no state applies (error replies); then no
    /// keyboard rule is applied.
    pub fn prepare(
        &self,
        update: &Update,
        next_state: Option<ConversationState>,
        response: Response,
    ) -> Vec<Effect> {
        let (answers, rest): (Vec<_>, Vec<_>) = response
            .effects
            .into_iter()
            .partition(|e| matches!(e, Effect::Answer(_)));

        answers
            .into_iter()
            .chain(rest)
            .map(|effect| match effect {
                Effect::Send(message) => Effect::Send(self.prepare_send(update, next_state, message)),
                Effect::Edit(edit) => Effect::Edit(prepare_edit(update, edit)),
                Effect::Answer(answer) => Effect::Answer(prepare_answer(update, answer)),
            })
            .collect()
    }

    fn prepare_send(
        &self,
        update: &Update,
        next_state: Option<ConversationState>,
        mut message: OutgoingMessage,
    ) -> OutgoingMessage {
        let own_chat = message.chat_id.is_none_or(|chat| chat == update.chat_id);
        message.chat_id.get_or_insert(update.chat_id);
        message.parse_mode.get_or_insert(ParseMode::Html);
        if own_chat
            && message.keyboard.is_none()
            && let Some(state) = next_state
        {
            message.keyboard = Some(match state {
                ConversationState::Idle => self.idle_keyboard(update.sender_id()),
                _ => Keyboard::Remove,
            });
        }
        message
    }

    pub async fn render(
        &self,
        ctx: &RequestContext,
        update: &Update,
        next_state: Option<ConversationState>,
        response: Response,
    ) -> Rendered {
        let mut outcome = Rendered::default();
        for effect in self.prepare(update, next_state, response) {
            if ctx.is_cancelled() {
                outcome.skipped += 1;
                continue;
            }
            let result = match &effect {
                Effect::Send(message) => self.transport.send_message(message).await.map(|_| ()),
                Effect::Edit(edit) if edit.message_id.is_none() => {
                    debug!("edit without a target message skipped");
                    outcome.skipped += 1;
                    continue;
                }
                Effect::Edit(edit) => self.transport.edit_message(edit).await,
                Effect::Answer(answer) if answer.callback_id.is_none() => {
                    debug!("callback answer outside a callback skipped");
                    outcome.skipped += 1;
                    continue;
                }
                Effect::Answer(answer) => self.transport.answer_callback(answer).await,
            };
            match result {
                Ok(()) => outcome.delivered += 1,
                Err(e) => {
                    warn!(error = %e, kind = e.kind(), %ctx, "failed to render effect");
                    outcome.failed += 1;
                }
            }
        }
        outcome
    }
}

fn prepare_edit(update: &Update, mut edit: EditMessage) -> EditMessage {
    edit.chat_id.get_or_insert(update.chat_id);
    if edit.message_id.is_none() {
        edit.message_id = update.origin_message_id();
    }
    edit.parse_mode.get_or_insert(ParseMode::Html);
    edit
}

fn prepare_answer(update: &Update, mut answer: CallbackAnswer) -> CallbackAnswer {
    if answer.callback_id.is_none() {
        answer.callback_id = update.callback_id().map(str::to_string);
    }
    answer
}
