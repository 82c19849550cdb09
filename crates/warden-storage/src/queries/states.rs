// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversational state persistence. One row per user, overwritten on change.

use std::str::FromStr;

use chrono::Utc;
use rusqlite::{OptionalExtension, params};
use uuid::Uuid;
use warden_core::{ConversationState, WardenError};

use super::ts;
use crate::database::{Database, map_tr_err};

/// Current state of a user; [`ConversationState::Start`] when none is stored.
pub async fn get_state(db: &Database, user_id: Uuid) -> Result<ConversationState, WardenError> {
    let raw = db
        .connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            conn.query_row(
                "SELECT state FROM fsm_states WHERE user_id = ?1",
                params![user_id.to_string()],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?;

    match raw {
        None => Ok(ConversationState::Start),
        Some(raw) => ConversationState::from_str(&raw)
            .map_err(|e| WardenError::backend(format!("stored state `{raw}`"), e)),
    }
}

/// Overwrite the state of a user.
pub async fn set_state(
    db: &Database,
    user_id: Uuid,
    state: ConversationState,
) -> Result<(), WardenError> {
    let now = ts(&Utc::now());
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO fsm_states (user_id, state, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT (user_id) DO UPDATE SET state = excluded.state, updated_at = excluded.updated_at",
                params![user_id.to_string(), state.to_string(), now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
