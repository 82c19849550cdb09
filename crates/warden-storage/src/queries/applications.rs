// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Application CRUD operations.

use std::str::FromStr;

use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, Row, params};
use uuid::Uuid;
use warden_core::{Application, ApplicationStatus, ConflictKind, User, WardenError};

use super::users::user_from_row;
use super::{parse_opt_uuid, parse_ts, parse_uuid, ts};
use crate::database::{Database, is_constraint_violation, map_tr_err};

const APPLICATION_COLUMNS: &str = "a.id, a.requester_id, a.nickname, a.status, a.arbiter_id, a.decline_reason, a.created_at, a.updated_at";

/// Number of columns in [`APPLICATION_COLUMNS`].
const APPLICATION_WIDTH: usize = 8;

fn application_from_row(row: &Row<'_>) -> rusqlite::Result<Application> {
    let id: String = row.get(0)?;
    let requester_id: String = row.get(1)?;
    let status: String = row.get(3)?;
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;
    Ok(Application {
        id: parse_uuid(0, &id)?,
        requester_id: parse_uuid(1, &requester_id)?,
        nickname: row.get(2)?,
        status: ApplicationStatus::from_str(&status)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?,
        arbiter_id: parse_opt_uuid(4, row.get(4)?)?,
        decline_reason: row.get(5)?,
        created_at: parse_ts(6, &created_at)?,
        updated_at: parse_ts(7, &updated_at)?,
    })
}

/// Persist a new pending application.
///
/// The nickname is validated first; an unknown requester is `NotFound`.
pub async fn create_application(
    db: &Database,
    requester_id: Uuid,
    nickname: &str,
) -> Result<Application, WardenError> {
    let application = Application::new_pending(requester_id, nickname, Utc::now())?;
    let row = application.clone();
    let inserted = db
        .connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let result = conn.execute(
                "INSERT INTO applications (id, requester_id, nickname, status, arbiter_id, decline_reason, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, NULL, NULL, ?5, ?6)",
                params![
                    row.id.to_string(),
                    row.requester_id.to_string(),
                    row.nickname,
                    row.status.to_string(),
                    ts(&row.created_at),
                    ts(&row.updated_at),
                ],
            );
            match result {
                Ok(_) => Ok(true),
                // The id is freshly generated, so the only violation left is
                // the requester foreign key.
                Err(e) if is_constraint_violation(&e) => Ok(false),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)?;

    if inserted {
        Ok(application)
    } else {
        Err(WardenError::not_found("user"))
    }
}

/// Get an application by id.
pub async fn application_by_id(db: &Database, id: Uuid) -> Result<Application, WardenError> {
    db.connection()
        .call(move |conn| -> Result<Option<Application>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {APPLICATION_COLUMNS} FROM applications a WHERE a.id = ?1"),
                params![id.to_string()],
                application_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?
        .ok_or_else(|| WardenError::not_found("application"))
}

/// Pending applications with their requesters, newest first, at most `limit`.
pub async fn pending_applications_with_requester(
    db: &Database,
    limit: usize,
) -> Result<Vec<(Application, User)>, WardenError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| -> Result<Vec<(Application, User)>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {APPLICATION_COLUMNS},
                        u.id, u.transport_id, u.chat_id, u.first_name, u.last_name, u.username, u.created_at, u.updated_at
                 FROM applications a
                 JOIN users u ON u.id = a.requester_id
                 WHERE a.status = 'pending'
                 ORDER BY a.created_at DESC, a.rowid DESC
                 LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![limit], |row| {
                Ok((
                    application_from_row(row)?,
                    user_from_row(row, APPLICATION_WIDTH)?,
                ))
            })?;
            let mut pending = Vec::new();
            for row in rows {
                pending.push(row?);
            }
            Ok(pending)
        })
        .await
        .map_err(map_tr_err)
}

/// Outcome of the compare-and-set update.
enum Cas {
    Updated,
    AlreadyDecided,
    Missing,
    UnknownArbiter,
}

/// Commit a decision on a still-pending application.
///
/// The write only happens while the stored row is pending, so two admins
/// racing on the same application cannot both win.
pub async fn update_application(
    db: &Database,
    application: &Application,
) -> Result<Application, WardenError> {
    application.validate()?;
    let row = application.clone();
    let outcome = db
        .connection()
        .call(move |conn| -> Result<Cas, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE applications
                 SET status = ?1, arbiter_id = ?2, decline_reason = ?3, updated_at = ?4
                 WHERE id = ?5 AND status = 'pending'",
                params![
                    row.status.to_string(),
                    row.arbiter_id.map(|id| id.to_string()),
                    row.decline_reason,
                    ts(&row.updated_at),
                    row.id.to_string(),
                ],
            );
            let changed = match changed {
                Ok(n) => n,
                Err(e) if is_constraint_violation(&e) => return Ok(Cas::UnknownArbiter),
                Err(e) => return Err(e),
            };
            if changed > 0 {
                return Ok(Cas::Updated);
            }
            let exists: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM applications WHERE id = ?1",
                    params![row.id.to_string()],
                    |r| r.get(0),
                )
                .optional()?;
            Ok(if exists.is_some() {
                Cas::AlreadyDecided
            } else {
                Cas::Missing
            })
        })
        .await
        .map_err(map_tr_err)?;

    match outcome {
        Cas::Updated => Ok(application.clone()),
        Cas::AlreadyDecided => Err(WardenError::Conflict(ConflictKind::AlreadyDecided)),
        Cas::Missing => Err(WardenError::not_found("application")),
        Cas::UnknownArbiter => Err(WardenError::not_found("user")),
    }
}

/// The most recently created application of a user.
pub async fn last_application_of_user(
    db: &Database,
    user_id: Uuid,
) -> Result<Application, WardenError> {
    db.connection()
        .call(move |conn| -> Result<Option<Application>, rusqlite::Error> {
            conn.query_row(
                &format!(
                    "SELECT {APPLICATION_COLUMNS} FROM applications a
                     WHERE a.requester_id = ?1
                     ORDER BY a.created_at DESC, a.rowid DESC
                     LIMIT 1"
                ),
                params![user_id.to_string()],
                application_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?
        .ok_or_else(|| WardenError::not_found("application"))
}

/// Number of applications ever created by a user.
pub async fn count_applications_of_user(db: &Database, user_id: Uuid) -> Result<u64, WardenError> {
    let count = db
        .connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM applications WHERE requester_id = ?1",
                params![user_id.to_string()],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(u64::try_from(count).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::users::create_user;
    use tempfile::tempdir;
    use warden_core::Profile;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    async fn seed_user(db: &Database, transport_id: i64) -> User {
        let profile = Profile {
            transport_id,
            chat_id: transport_id,
            first_name: Some(format!("user{transport_id}")),
            last_name: None,
            username: None,
        };
        create_user(db, &User::from_profile(&profile, Utc::now()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_trims_and_stores_pending() {
        let (db, _dir) = setup_db().await;
        let user = seed_user(&db, 1).await;
        let app = create_application(&db, user.id, "  Steve  ").await.unwrap();
        assert_eq!(app.nickname, "Steve");
        assert!(app.is_pending());

        let stored = application_by_id(&db, app.id).await.unwrap();
        assert_eq!(stored, app);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn create_rejects_invalid_nickname() {
        let (db, _dir) = setup_db().await;
        let user = seed_user(&db, 1).await;
        let err = create_application(&db, user.id, "   ").await.unwrap_err();
        assert!(matches!(err, WardenError::Validation(_)));
        assert_eq!(count_applications_of_user(&db, user.id).await.unwrap(), 0);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn create_for_unknown_requester_is_not_found() {
        let (db, _dir) = setup_db().await;
        let err = create_application(&db, Uuid::new_v4(), "Steve")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn pending_listing_is_newest_first_and_limited() {
        let (db, _dir) = setup_db().await;
        let a = seed_user(&db, 1).await;
        let b = seed_user(&db, 2).await;
        let first = create_application(&db, a.id, "first").await.unwrap();
        let second = create_application(&db, b.id, "second").await.unwrap();
        let third = create_application(&db, a.id, "third").await.unwrap();

        let decided = first.approve(b.id, Utc::now()).unwrap();
        update_application(&db, &decided).await.unwrap();

        let pending = pending_applications_with_requester(&db, 10).await.unwrap();
        let ids: Vec<Uuid> = pending.iter().map(|(app, _)| app.id).collect();
        assert_eq!(ids, vec![third.id, second.id]);
        assert_eq!(pending[0].1.id, a.id);
        assert_eq!(pending[1].1.id, b.id);

        let limited = pending_applications_with_requester(&db, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].0.id, third.id);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn second_decision_is_already_decided() {
        let (db, _dir) = setup_db().await;
        let user = seed_user(&db, 1).await;
        let admin = seed_user(&db, 2).await;
        let app = create_application(&db, user.id, "Steve").await.unwrap();

        let approved = app.approve(admin.id, Utc::now()).unwrap();
        update_application(&db, &approved).await.unwrap();

        // A decision computed from the stale pending copy must lose.
        let declined = app.decline(admin.id, None, Utc::now()).unwrap();
        let err = update_application(&db, &declined).await.unwrap_err();
        assert!(matches!(
            err,
            WardenError::Conflict(ConflictKind::AlreadyDecided)
        ));

        let stored = application_by_id(&db, app.id).await.unwrap();
        assert_eq!(stored.status, ApplicationStatus::Approved);
        assert_eq!(stored.arbiter_id, Some(admin.id));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn update_unknown_application_is_not_found() {
        let (db, _dir) = setup_db().await;
        let user = seed_user(&db, 1).await;
        let ghost = Application::new_pending(user.id, "ghost", Utc::now())
            .unwrap()
            .approve(user.id, Utc::now())
            .unwrap();
        assert!(update_application(&db, &ghost).await.unwrap_err().is_not_found());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn last_application_and_count() {
        let (db, _dir) = setup_db().await;
        let user = seed_user(&db, 1).await;
        assert!(last_application_of_user(&db, user.id)
            .await
            .unwrap_err()
            .is_not_found());

        create_application(&db, user.id, "one").await.unwrap();
        let latest = create_application(&db, user.id, "two").await.unwrap();
        assert_eq!(last_application_of_user(&db, user.id).await.unwrap().id, latest.id);
        assert_eq!(count_applications_of_user(&db, user.id).await.unwrap(), 2);
        db.close().await.unwrap();
    }
}
