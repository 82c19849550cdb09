// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain handlers and the default route table.

pub mod admin;
pub mod apply;
pub mod start;
pub mod status;

use warden_core::{ConversationState, DecisionAction};

use crate::handler::AdminSet;
use crate::messages;
use crate::routes::{
    RouteTable, and, any_callback, any_text, callback_action, command, message_text, or,
    principal_in, state,
};

pub use admin::{DecisionHandler, PendingListHandler, RejectCallbackHandler};
pub use apply::{ApplyHandler, CancelApplyHandler, SubmitNicknameHandler};
pub use start::StartHandler;
pub use status::StatusHandler;

/// The bot's routes, in priority order.
pub fn default_routes(admins: &AdminSet) -> RouteTable {
    let is_admin = || principal_in(admins.iter());

    RouteTable::new()
        .route(command("start"), StartHandler)
        .route(
            and([
                state(ConversationState::WaitingNickname),
                or([command("cancel"), message_text(messages::BUTTON_CANCEL)]),
            ]),
            CancelApplyHandler,
        )
        .route(
            or([command("apply"), message_text(messages::BUTTON_APPLY)]),
            ApplyHandler,
        )
        .route(
            or([command("status"), message_text(messages::BUTTON_STATUS)]),
            StatusHandler,
        )
        .route(
            and([
                is_admin(),
                or([command("admin"), message_text(messages::BUTTON_ADMIN)]),
            ]),
            PendingListHandler,
        )
        .route(
            and([is_admin(), callback_action(DecisionAction::Approve)]),
            DecisionHandler::new(DecisionAction::Approve),
        )
        .route(
            and([is_admin(), callback_action(DecisionAction::Decline)]),
            DecisionHandler::new(DecisionAction::Decline),
        )
        .route(any_callback(), RejectCallbackHandler)
        .route(
            and([state(ConversationState::WaitingNickname), any_text()]),
            SubmitNicknameHandler,
        )
}

/// Idle after the first interaction, otherwise unchanged.
pub(crate) fn settle(state: ConversationState) -> ConversationState {
    match state {
        ConversationState::Start => ConversationState::Idle,
        other => other,
    }
}
