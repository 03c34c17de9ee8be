//! SQLite session store implementation
//!
//! Implements the `SessionStore` port. The pending verification state is
//! stored as JSON in a single column.

use std::sync::Arc;

use application::{
    error::ApplicationError,
    ports::{PendingVerification, Session, SessionStore},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::UserId;
use rusqlite::{OptionalExtension, Row, params};
use tokio::task;
use tracing::{debug, instrument};

use super::connection::ConnectionPool;

/// SQLite-based session store
#[derive(Debug, Clone)]
pub struct SqliteSessionStore {
    pool: Arc<ConnectionPool>,
}

impl SqliteSessionStore {
    /// Create a new SQLite session store
    #[must_use]
    pub const fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }
}

/// Convert a database row to a `Session`
fn row_to_session(row: &Row<'_>) -> Result<Session, rusqlite::Error> {
    let id: String = row.get(0)?;
    let user_id_str: Option<String> = row.get(1)?;
    let pending_json: Option<String> = row.get(2)?;
    let created_at_str: String = row.get(3)?;
    let expires_at_str: String = row.get(4)?;

    let user_id = user_id_str
        .map(|raw| {
            UserId::parse(&raw).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    1,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
        })
        .transpose()?;

    // A pending blob that no longer deserializes just clears the state
    let pending: Option<PendingVerification> = pending_json
        .as_deref()
        .and_then(|raw| serde_json::from_str(raw).ok());

    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc));
    let expires_at = DateTime::parse_from_rfc3339(&expires_at_str)
        .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc));

    Ok(Session {
        id,
        user_id,
        pending,
        created_at,
        expires_at,
    })
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    async fn save(&self, session: &Session) -> Result<(), ApplicationError> {
        let pool = Arc::clone(&self.pool);
        let session = session.clone();

        task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| ApplicationError::Internal(e.to_string()))?;

            let pending_json = session
                .pending
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .map_err(|e| ApplicationError::Internal(e.to_string()))?;

            conn.execute(
                "INSERT INTO sessions (id, user_id, pending, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                     user_id = excluded.user_id,
                     pending = excluded.pending,
                     expires_at = excluded.expires_at",
                params![
                    session.id,
                    session.user_id.map(|id| id.to_string()),
                    pending_json,
                    session.created_at.to_rfc3339(),
                    session.expires_at.to_rfc3339(),
                ],
            )
            .map_err(|e| ApplicationError::Internal(e.to_string()))?;

            debug!("Saved session");
            Ok(())
        })
        .await
        .map_err(|e| ApplicationError::Internal(e.to_string()))?
    }

    #[instrument(skip(self))]
    async fn get(&self, session_id: &str) -> Result<Option<Session>, ApplicationError> {
        let pool = Arc::clone(&self.pool);
        let session_id = session_id.to_string();

        task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| ApplicationError::Internal(e.to_string()))?;

            let session = conn
                .query_row(
                    "SELECT id, user_id, pending, created_at, expires_at
                     FROM sessions WHERE id = ?1 AND expires_at > ?2",
                    params![session_id, Utc::now().to_rfc3339()],
                    row_to_session,
                )
                .optional()
                .map_err(|e| ApplicationError::Internal(e.to_string()))?;

            Ok(session)
        })
        .await
        .map_err(|e| ApplicationError::Internal(e.to_string()))?
    }

    #[instrument(skip(self))]
    async fn delete(&self, session_id: &str) -> Result<bool, ApplicationError> {
        let pool = Arc::clone(&self.pool);
        let session_id = session_id.to_string();

        task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| ApplicationError::Internal(e.to_string()))?;

            let deleted = conn
                .execute("DELETE FROM sessions WHERE id = ?1", [&session_id])
                .map_err(|e| ApplicationError::Internal(e.to_string()))?;

            debug!(deleted = deleted > 0, "Deleted session");
            Ok(deleted > 0)
        })
        .await
        .map_err(|e| ApplicationError::Internal(e.to_string()))?
    }

    #[instrument(skip(self))]
    async fn purge_expired(&self) -> Result<u64, ApplicationError> {
        let pool = Arc::clone(&self.pool);

        task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| ApplicationError::Internal(e.to_string()))?;

            let purged = conn
                .execute(
                    "DELETE FROM sessions WHERE expires_at <= ?1",
                    [Utc::now().to_rfc3339()],
                )
                .map_err(|e| ApplicationError::Internal(e.to_string()))?;

            debug!(purged, "Purged expired sessions");
            Ok(purged as u64)
        })
        .await
        .map_err(|e| ApplicationError::Internal(e.to_string()))?
    }
}
