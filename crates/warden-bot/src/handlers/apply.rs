// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Application submission: prompt, cancel, and nickname intake.

use async_trait::async_trait;
use tracing::info;
use warden_core::{
    ConversationState, Response, WardenError,
    response::{Keyboard, OutgoingMessage},
};

use crate::handler::{Call, Deps, Handler, Reply};
use crate::messages;
use crate::workflow;

/// Maps a pending/cap conflict to a polite return to idle.
fn conflict_reply(error: WardenError) -> Result<Reply, WardenError> {
    match error {
        WardenError::Conflict(kind) => {
            info!(%kind, "application refused");
            Ok(Reply::new(
                ConversationState::Idle,
                Response::text(messages::conflict_text(&kind)),
            ))
        }
        other => Err(other),
    }
}

/// `/apply`: asks for the nickname unless the user may not apply.
pub struct ApplyHandler;

#[async_trait]
impl Handler for ApplyHandler {
    fn name(&self) -> &'static str {
        "apply"
    }

    async fn handle(&self, deps: &Deps, call: Call<'_>) -> Result<Reply, WardenError> {
        if let Err(e) = workflow::ensure_can_apply(deps, call.ctx, call.user).await {
            return conflict_reply(e);
        }
        let prompt = OutgoingMessage::new(messages::ASK_NICKNAME).with_keyboard(Keyboard::Reply(
            vec![vec![messages::BUTTON_CANCEL.to_string()]],
        ));
        Ok(Reply::new(
            ConversationState::WaitingNickname,
            Response::new().send(prompt),
        ))
    }
}

/// Leaves the nickname prompt without creating anything.
pub struct CancelApplyHandler;

#[async_trait]
impl Handler for CancelApplyHandler {
    fn name(&self) -> &'static str {
        "cancel_apply"
    }

    async fn handle(&self, _deps: &Deps, _call: Call<'_>) -> Result<Reply, WardenError> {
        Ok(Reply::new(
            ConversationState::Idle,
            Response::text(messages::APPLY_CANCELED),
        ))
    }
}

/// Takes the message text as the nickname and files the application.
pub struct SubmitNicknameHandler;

#[async_trait]
impl Handler for SubmitNicknameHandler {
    fn name(&self) -> &'static str {
        "submit_nickname"
    }

    async fn handle(&self, deps: &Deps, call: Call<'_>) -> Result<Reply, WardenError> {
        if call.state != ConversationState::WaitingNickname {
            return Err(WardenError::InvalidState(format!(
                "nickname received in state {}",
                call.state
            )));
        }
        let nickname = call.update.text().unwrap_or_default();
        match workflow::submit_application(deps, call.ctx, call.user, nickname).await {
            Ok(application) => Ok(Reply::new(
                ConversationState::Idle,
                Response::text(messages::application_submitted(&application)),
            )),
            Err(e) => conflict_reply(e),
        }
    }
}
