// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TTL-bounded key/value markers.
//!
//! Expiry is stored as unix milliseconds and checked on read; expired rows
//! are purged lazily on the next write.

use std::time::Duration;

use chrono::Utc;
use rusqlite::{OptionalExtension, params};
use warden_core::WardenError;

use crate::database::{Database, map_tr_err};

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// The live value under `(namespace, key)`.
pub async fn get(db: &Database, namespace: &str, key: &str) -> Result<Option<String>, WardenError> {
    let namespace = namespace.to_string();
    let key = key.to_string();
    let now = now_millis();
    db.connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            conn.query_row(
                "SELECT value FROM dedup_keys WHERE namespace = ?1 AND key = ?2 AND expires_at > ?3",
                params![namespace, key, now],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Store `value` under `(namespace, key)` for `ttl`.
pub async fn set(
    db: &Database,
    namespace: &str,
    key: &str,
    value: &str,
    ttl: Duration,
) -> Result<(), WardenError> {
    let namespace = namespace.to_string();
    let key = key.to_string();
    let value = value.to_string();
    let now = now_millis();
    let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    let expires_at = now.saturating_add(ttl_ms);
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute("DELETE FROM dedup_keys WHERE expires_at <= ?1", params![now])?;
            conn.execute(
                "INSERT INTO dedup_keys (namespace, key, value, expires_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (namespace, key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
                params![namespace, key, value, expires_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn value_is_visible_until_expiry() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("d.db").to_str().unwrap())
            .await
            .unwrap();

        assert_eq!(get(&db, "ns", "k").await.unwrap(), None);
        set(&db, "ns", "k", "v1", Duration::from_secs(60)).await.unwrap();
        assert_eq!(get(&db, "ns", "k").await.unwrap().as_deref(), Some("v1"));
        assert_eq!(get(&db, "other", "k").await.unwrap(), None);

        set(&db, "ns", "k", "v2", Duration::from_secs(60)).await.unwrap();
        assert_eq!(get(&db, "ns", "k").await.unwrap().as_deref(), Some("v2"));

        set(&db, "ns", "short", "x", Duration::from_millis(20)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(get(&db, "ns", "short").await.unwrap(), None);
        db.close().await.unwrap();
    }
}
