// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User CRUD operations.

use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};
use uuid::Uuid;
use warden_core::{ConflictKind, User, WardenError};

use super::{parse_ts, parse_uuid, ts};
use crate::database::{Database, is_constraint_violation, map_tr_err};

pub(crate) const USER_COLUMNS: &str =
    "id, transport_id, chat_id, first_name, last_name, username, created_at, updated_at";

/// Maps a row selected with [`USER_COLUMNS`] starting at column `offset`.
pub(crate) fn user_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<User> {
    let id: String = row.get(offset)?;
    let created_at: String = row.get(offset + 6)?;
    let updated_at: String = row.get(offset + 7)?;
    Ok(User {
        id: parse_uuid(offset, &id)?,
        transport_id: row.get(offset + 1)?,
        chat_id: row.get(offset + 2)?,
        first_name: row.get(offset + 3)?,
        last_name: row.get(offset + 4)?,
        username: row.get(offset + 5)?,
        created_at: parse_ts(offset + 6, &created_at)?,
        updated_at: parse_ts(offset + 7, &updated_at)?,
    })
}

/// Insert a user. A taken id or transport id is a `DuplicateUser` conflict.
pub async fn create_user(db: &Database, user: &User) -> Result<User, WardenError> {
    let user = user.clone();
    let stored = user.clone();
    let inserted = db
        .connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let result = conn.execute(
                "INSERT INTO users (id, transport_id, chat_id, first_name, last_name, username, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    user.id.to_string(),
                    user.transport_id,
                    user.chat_id,
                    user.first_name,
                    user.last_name,
                    user.username,
                    ts(&user.created_at),
                    ts(&user.updated_at),
                ],
            );
            match result {
                Ok(_) => Ok(true),
                Err(e) if is_constraint_violation(&e) => Ok(false),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)?;

    if inserted {
        Ok(stored)
    } else {
        Err(WardenError::Conflict(ConflictKind::DuplicateUser))
    }
}

/// Get a user by transport id.
pub async fn user_by_transport_id(db: &Database, transport_id: i64) -> Result<User, WardenError> {
    db.connection()
        .call(move |conn| -> Result<Option<User>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE transport_id = ?1"),
                params![transport_id],
                |row| user_from_row(row, 0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?
        .ok_or_else(|| WardenError::not_found("user"))
}

/// Get a user by internal id.
pub async fn user_by_id(db: &Database, id: Uuid) -> Result<User, WardenError> {
    db.connection()
        .call(move |conn| -> Result<Option<User>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id.to_string()],
                |row| user_from_row(row, 0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?
        .ok_or_else(|| WardenError::not_found("user"))
}

/// Overwrite the profile fields of an existing user and bump `updated_at`.
pub async fn update_user(db: &Database, user: &User) -> Result<User, WardenError> {
    let mut updated = user.clone();
    updated.updated_at = Utc::now();
    let row = updated.clone();
    let changed = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE users SET chat_id = ?1, first_name = ?2, last_name = ?3, username = ?4, updated_at = ?5
                 WHERE id = ?6",
                params![
                    row.chat_id,
                    row.first_name,
                    row.last_name,
                    row.username,
                    ts(&row.updated_at),
                    row.id.to_string(),
                ],
            )
        })
        .await
        .map_err(map_tr_err)?;

    if changed == 0 {
        return Err(WardenError::not_found("user"));
    }
    Ok(updated)
}
