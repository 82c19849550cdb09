// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Route table and matcher combinators.
//!
//! A route pairs a [`Matcher`] with a [`Handler`]. Dispatch walks the table
//! in declaration order and the first accepting matcher wins. Matchers are
//! pure functions of the update and the current state.

use std::collections::BTreeSet;
use std::sync::Arc;

use warden_core::{ConversationState, DecisionAction, Update};

use crate::handler::Handler;

/// Closed set of update predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// `/name` or `/name@bot` as the first word of a message.
    Command(String),
    /// Whole message text equals the literal after trimming.
    MessageText(String),
    /// Any message that is not a command.
    AnyText,
    State(ConversationState),
    /// Callback whose payload decodes to the given action.
    CallbackAction(DecisionAction),
    /// Any callback, decodable or not.
    AnyCallback,
    /// Sender transport id is in the allow-list.
    PrincipalIn(BTreeSet<i64>),
    And(Vec<Matcher>),
    Or(Vec<Matcher>),
}

impl Matcher {
    pub fn matches(&self, update: &Update, state: ConversationState) -> bool {
        match self {
            Matcher::Command(name) => update
                .text()
                .is_some_and(|text| command_name(text).is_some_and(|cmd| cmd == name)),
            Matcher::MessageText(literal) => update.text() == Some(literal.trim()),
            Matcher::AnyText => update
                .text()
                .is_some_and(|text| !text.is_empty() && !text.starts_with('/')),
            Matcher::State(expected) => state == *expected,
            Matcher::CallbackAction(action) => update
                .callback_payload()
                .is_some_and(|payload| payload.is_ok_and(|p| p.action == *action)),
            Matcher::AnyCallback => update.is_callback(),
            Matcher::PrincipalIn(ids) => ids.contains(&update.sender_id()),
            Matcher::And(all) => all.iter().all(|m| m.matches(update, state)),
            Matcher::Or(any) => any.iter().any(|m| m.matches(update, state)),
        }
    }
}

/// Extracts `name` from `/name`, `/name@bot` or `/name args`.
fn command_name(text: &str) -> Option<&str> {
    let first = text.trim().split_whitespace().next()?;
    let name = first.strip_prefix('/')?;
    let name = name.split_once('@').map_or(name, |(cmd, _bot)| cmd);
    (!name.is_empty()).then_some(name)
}

pub fn command(name: impl Into<String>) -> Matcher {
    Matcher::Command(name.into().trim_start_matches('/').to_string())
}

pub fn message_text(literal: impl Into<String>) -> Matcher {
    Matcher::MessageText(literal.into().trim().to_string())
}

pub fn any_text() -> Matcher {
    Matcher::AnyText
}

pub fn state(state: ConversationState) -> Matcher {
    Matcher::State(state)
}

pub fn callback_action(action: DecisionAction) -> Matcher {
    Matcher::CallbackAction(action)
}

pub fn any_callback() -> Matcher {
    Matcher::AnyCallback
}

pub fn principal_in(ids: impl IntoIterator<Item = i64>) -> Matcher {
    Matcher::PrincipalIn(ids.into_iter().collect())
}

pub fn and(matchers: impl IntoIterator<Item = Matcher>) -> Matcher {
    Matcher::And(matchers.into_iter().collect())
}

pub fn or(matchers: impl IntoIterator<Item = Matcher>) -> Matcher {
    Matcher::Or(matchers.into_iter().collect())
}

/// A matcher and the handler it selects.
#[derive(Clone)]
pub struct Route {
    pub matcher: Matcher,
    pub handler: Arc<dyn Handler>,
}

/// Ordered, first-match-wins list of routes.
#[derive(Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, matcher: Matcher, handler: impl Handler + 'static) -> Self {
        self.routes.push(Route {
            matcher,
            handler: Arc::new(handler),
        });
        self
    }

    /// First route accepting `(update, state)`.
    pub fn find(&self, update: &Update, state: ConversationState) -> Option<&Route> {
        self.routes.iter().find(|r| r.matcher.matches(update, state))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use uuid::Uuid;
    use warden_core::{CallbackPayload, Profile};

    use super::*;

    fn sender(id: i64) -> Profile {
        Profile {
            transport_id: id,
            chat_id: id,
            first_name: None,
            last_name: None,
            username: None,
        }
    }

    fn text(body: &str) -> Update {
        Update::message(1, sender(5), 1, body)
    }

    fn callback(data: &str) -> Update {
        Update::callback(1, sender(5), "cb", Some(3), data)
    }

    const IDLE: ConversationState = ConversationState::Idle;

    #[test]
    fn command_matches_first_word_and_bot_suffix() {
        let m = command("start");
        assert!(m.matches(&text("/start"), IDLE));
        assert!(m.matches(&text("  /start  "), IDLE));
        assert!(m.matches(&text("/start@warden_bot"), IDLE));
        assert!(m.matches(&text("/start payload"), IDLE));
        assert!(!m.matches(&text("/started"), IDLE));
        assert!(!m.matches(&text("start"), IDLE));
        assert!(!m.matches(&callback("/start"), IDLE));
    }

    #[test]
    fn message_text_is_exact_after_trim() {
        let m = message_text("Подать заявку");
        assert!(m.matches(&text(" Подать заявку "), IDLE));
        assert!(!m.matches(&text("Подать заявку!"), IDLE));
    }

    #[test]
    fn any_text_skips_commands() {
        assert!(any_text().matches(&text("Alice"), IDLE));
        assert!(!any_text().matches(&text("/apply"), IDLE));
        assert!(!any_text().matches(&text("   "), IDLE));
    }

    #[test]
    fn callback_action_requires_decodable_payload() {
        let approve = CallbackPayload::new(Uuid::nil(), DecisionAction::Approve).encode();
        assert!(callback_action(DecisionAction::Approve).matches(&callback(&approve), IDLE));
        assert!(!callback_action(DecisionAction::Decline).matches(&callback(&approve), IDLE));
        assert!(!callback_action(DecisionAction::Approve).matches(&callback("junk"), IDLE));
        assert!(any_callback().matches(&callback("junk"), IDLE));
    }

    #[test]
    fn combinators_compose() {
        let m = and([
            principal_in([5, 6]),
            or([command("admin"), message_text("Админ")]),
        ]);
        assert!(m.matches(&text("/admin"), IDLE));
        assert!(m.matches(&text("Админ"), IDLE));
        let stranger = Update::message(1, sender(9), 1, "/admin");
        assert!(!m.matches(&stranger, IDLE));
        assert!(and([]).matches(&text("x"), IDLE));
        assert!(!or([]).matches(&text("x"), IDLE));
    }

    #[test]
    fn state_matcher_compares_current_state() {
        let m = and([state(ConversationState::WaitingNickname), any_text()]);
        assert!(m.matches(&text("Alice"), ConversationState::WaitingNickname));
        assert!(!m.matches(&text("Alice"), IDLE));
    }

    proptest! {
        #[test]
        fn matchers_are_deterministic(body in ".{0,40}", waiting in any::<bool>()) {
            let s = if waiting { ConversationState::WaitingNickname } else { IDLE };
            let update = text(&body);
            for m in [command("apply"), any_text(), message_text(&body), state(s)] {
                prop_assert_eq!(m.matches(&update, s), m.matches(&update, s));
            }
            prop_assert!(message_text(&body).matches(&update, s));
        }
    }
}
