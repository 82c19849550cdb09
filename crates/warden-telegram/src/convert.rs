// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat filtering and conversion of Telegram updates into [`Update`]s.
//!
//! Only private chats are served. Messages without a sender or without text
//! and callbacks without data are dropped.

use teloxide::types::{CallbackQuery, ChatKind, Message, User as TgUser};
use tracing::debug;
use warden_core::{Profile, Update};

/// Checks whether the message is from a private (DM) chat.
pub fn is_dm(msg: &Message) -> bool {
    matches!(msg.chat.kind, ChatKind::Private(_))
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Sender profile; `None` when the id does not fit an `i64`.
pub fn profile(user: &TgUser, chat_id: i64) -> Option<Profile> {
    Some(Profile {
        transport_id: i64::try_from(user.id.0).ok()?,
        chat_id,
        first_name: non_empty(Some(user.first_name.as_str())),
        last_name: non_empty(user.last_name.as_deref()),
        username: non_empty(user.username.as_deref()),
    })
}

pub fn message_update(update_id: i64, msg: &Message) -> Option<Update> {
    if !is_dm(msg) {
        debug!(chat_id = msg.chat.id.0, "ignoring non-DM message");
        return None;
    }
    let from = msg.from.as_ref()?;
    let Some(text) = msg.text() else {
        debug!(msg_id = msg.id.0, "ignoring message without text");
        return None;
    };
    let sender = profile(from, msg.chat.id.0)?;
    Some(Update::message(update_id, sender, msg.id.0, text))
}

pub fn callback_update(update_id: i64, query: &CallbackQuery) -> Option<Update> {
    let Some(data) = query.data.as_deref() else {
        debug!("ignoring callback without data");
        return None;
    };
    let origin = query.message.as_ref();
    let chat_id = origin
        .map(|m| m.chat().id.0)
        .or_else(|| i64::try_from(query.from.id.0).ok())?;
    let sender = profile(&query.from, chat_id)?;
    Some(Update::callback(
        update_id,
        sender,
        query.id.to_string(),
        origin.map(|m| m.id().0),
        data,
    ))
}

#[cfg(test)]
mod tests {
    use warden_core::UpdateKind;

    use super::*;

    fn private_message(user_id: u64, username: Option<&str>, text: Option<&str>) -> Message {
        let mut json = serde_json::json!({
            "message_id": 11,
            "date": 1700000000i64,
            "chat": {
                "id": user_id as i64,
                "type": "private",
                "first_name": "Test",
            },
            "from": {
                "id": user_id,
                "is_bot": false,
                "first_name": "Test",
                "last_name": "User",
            },
        });
        if let Some(username) = username {
            json["from"]["username"] = username.into();
        }
        if let Some(text) = text {
            json["text"] = text.into();
        }
        serde_json::from_value(json).expect("failed to deserialize mock message")
    }

    fn group_message(user_id: u64, text: &str) -> Message {
        let json = serde_json::json!({
            "message_id": 1,
            "date": 1700000000i64,
            "chat": {
                "id": -100123i64,
                "type": "supergroup",
                "title": "Test Group",
            },
            "from": {
                "id": user_id,
                "is_bot": false,
                "first_name": "Test",
            },
            "text": text,
        });
        serde_json::from_value(json).expect("failed to deserialize mock group message")
    }

    fn callback_query(user_id: u64, data: Option<&str>) -> CallbackQuery {
        let mut json = serde_json::json!({
            "id": "4382bfdwdsb323b2d9",
            "from": {
                "id": user_id,
                "is_bot": false,
                "first_name": "Admin",
                "username": "boss",
            },
            "chat_instance": "-1234",
            "message": {
                "message_id": 77,
                "date": 1700000000i64,
                "chat": {
                    "id": user_id as i64,
                    "type": "private",
                    "first_name": "Admin",
                },
                "text": "card",
            },
        });
        if let Some(data) = data {
            json["data"] = data.into();
        }
        serde_json::from_value(json).expect("failed to deserialize mock callback")
    }

    #[test]
    fn private_text_becomes_message_update() {
        let msg = private_message(42, Some("alice"), Some("/start"));
        let update = message_update(5, &msg).unwrap();
        assert_eq!(update.id, 5);
        assert_eq!(update.chat_id, 42);
        assert_eq!(update.sender.transport_id, 42);
        assert_eq!(update.sender.username.as_deref(), Some("alice"));
        assert_eq!(update.sender.last_name.as_deref(), Some("User"));
        assert_eq!(
            update.kind,
            UpdateKind::Message {
                message_id: 11,
                text: "/start".into()
            }
        );
    }

    #[test]
    fn group_and_textless_messages_are_dropped() {
        assert!(!is_dm(&group_message(42, "hi")));
        assert!(message_update(1, &group_message(42, "hi")).is_none());
        assert!(message_update(1, &private_message(42, None, None)).is_none());
    }

    #[test]
    fn callback_keeps_origin_message() {
        let query = callback_query(7, Some(r#"{"id":"x","action":"approve"}"#));
        let update = callback_update(9, &query).unwrap();
        assert_eq!(update.chat_id, 7);
        assert_eq!(update.callback_id(), Some("4382bfdwdsb323b2d9"));
        assert_eq!(update.origin_message_id(), Some(77));
        assert!(update.is_callback());
    }

    #[test]
    fn callback_without_data_is_dropped() {
        assert!(callback_update(9, &callback_query(7, None)).is_none());
    }
}
