// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use warden_core::{ConversationState, Response, WardenError};

use crate::handler::{Call, Deps, Handler, Reply};
use crate::messages;

/// `/start`: greets the user and resets the conversation.
pub struct StartHandler;

#[async_trait]
impl Handler for StartHandler {
    fn name(&self) -> &'static str {
        "start"
    }

    async fn handle(&self, _deps: &Deps, _call: Call<'_>) -> Result<Reply, WardenError> {
        Ok(Reply::new(
            ConversationState::Idle,
            Response::text(messages::WELCOME),
        ))
    }
}
