// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use tracing::{debug, info};
use warden_core::WardenError;

use crate::migrations;

/// Handle to the SQLite database. Query modules accept `&Database`.
pub struct Database {
    conn: tokio_rusqlite::Connection,
    path: String,
}

impl Database {
    /// Opens (creating if needed) the database at `path` in WAL mode and
    /// applies pending migrations.
    pub async fn open(path: &str) -> Result<Self, WardenError> {
        Self::open_with(path, true).await
    }

    /// Like [`Database::open`], with WAL journaling optional.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, WardenError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| WardenError::backend(format!("create {}", parent.display()), e))?;
        }

        // Migrations run on a short-lived synchronous connection before the
        // async writer thread takes over.
        {
            let mut setup = rusqlite::Connection::open(path)
                .map_err(|e| WardenError::backend("open sqlite", e))?;
            if wal_mode {
                setup
                    .pragma_update(None, "journal_mode", "WAL")
                    .map_err(|e| WardenError::backend("enable WAL", e))?;
            }
            migrations::run_migrations(&mut setup)?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(map_tr_err)?;
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(
                "PRAGMA foreign_keys = ON;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        info!(path, wal_mode, "sqlite database opened");
        Ok(Self {
            conn,
            path: path.to_string(),
        })
    }

    /// The single async connection every query goes through.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Checkpoints the WAL so that the database file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), WardenError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!(path = %self.path, "WAL checkpoint complete");
        Ok(())
    }

    /// Checkpoints and drops the connection, which stops the writer thread.
    pub async fn close(self) -> Result<(), WardenError> {
        self.checkpoint().await?;
        debug!(path = %self.path, "sqlite database closed");
        Ok(())
    }
}

/// Maps a tokio-rusqlite call failure onto [`WardenError::Backend`].
pub(crate) fn map_tr_err<E>(err: E) -> WardenError
where
    E: std::error::Error + Send + Sync + 'static,
{
    WardenError::backend("sqlite", err)
}

/// `true` when `err` is a UNIQUE, FOREIGN KEY or CHECK violation.
pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_file_and_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/warden.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        assert!(path.exists());

        let tables: Vec<String> = db
            .connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn
                    .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .unwrap();
        for expected in ["applications", "dedup_keys", "fsm_states", "users"] {
            assert!(tables.iter().any(|t| t == expected), "missing {expected}");
        }
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopening_skips_applied_migrations() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reopen.db");
        let path = path.to_str().unwrap();
        Database::open(path).await.unwrap().close().await.unwrap();
        let db = Database::open(path).await.unwrap();
        assert_eq!(db.path(), path);
        db.close().await.unwrap();
    }
}
