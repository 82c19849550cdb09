// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversational states of the per-user FSM.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Where a user currently is in the conversation.
///
/// Stored as its snake_case name; a user without a stored state is in
/// [`ConversationState::Start`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    /// Never talked to the bot, or state was lost.
    #[default]
    Start,
    /// Main menu.
    Idle,
    /// Prompted for a nickname; the next text message is the application.
    WaitingNickname,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn default_is_start() {
        assert_eq!(ConversationState::default(), ConversationState::Start);
    }

    #[test]
    fn stored_names_round_trip() {
        for (state, name) in [
            (ConversationState::Start, "start"),
            (ConversationState::Idle, "idle"),
            (ConversationState::WaitingNickname, "waiting_nickname"),
        ] {
            assert_eq!(state.to_string(), name);
            assert_eq!(ConversationState::from_str(name).unwrap(), state);
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert!(ConversationState::from_str("sleeping").is_err());
    }
}
