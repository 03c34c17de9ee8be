//! SQLite user store implementation
//!
//! Implements the `UserStore` port using SQLite.

use std::sync::Arc;

use application::{error::ApplicationError, ports::UserStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{EmailAddress, PhoneNumber, User, UserId};
use rusqlite::{OptionalExtension, Row, params};
use tokio::task;
use tracing::{debug, instrument};

use super::connection::ConnectionPool;

/// SQLite-based user store
#[derive(Debug, Clone)]
pub struct SqliteUserStore {
    pool: Arc<ConnectionPool>,
}

impl SqliteUserStore {
    /// Create a new SQLite user store
    #[must_use]
    pub const fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }
}

/// Convert a database row to a `User`
fn row_to_user(row: &Row<'_>) -> Result<User, rusqlite::Error> {
    let id_str: String = row.get(0)?;
    let phone_str: String = row.get(1)?;
    let name: String = row.get(2)?;
    let email_str: Option<String> = row.get(3)?;
    let joined_at_str: String = row.get(4)?;

    let id = UserId::parse(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let phone = PhoneNumber::new(&phone_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;

    // Invalid legacy emails are dropped rather than failing the whole row
    let email = email_str.and_then(|raw| match EmailAddress::new(&raw) {
        Ok(email) => Some(email),
        Err(e) => {
            tracing::warn!(error = %e, "Invalid email in database, ignoring");
            None
        },
    });

    let joined_at = DateTime::parse_from_rfc3339(&joined_at_str)
        .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc));

    Ok(User::restore(id, phone, name, email, joined_at))
}

const SELECT_COLUMNS: &str = "id, phone_number, name, email, joined_at";

#[async_trait]
impl UserStore for SqliteUserStore {
    #[instrument(skip(self, user), fields(user_id = %user.id()))]
    async fn save(&self, user: &User) -> Result<(), ApplicationError> {
        let pool = Arc::clone(&self.pool);
        let user = user.clone();

        task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| ApplicationError::Internal(e.to_string()))?;

            conn.execute(
                "INSERT INTO users (id, phone_number, name, email, joined_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                     name = excluded.name,
                     email = excluded.email",
                params![
                    user.id().to_string(),
                    user.phone_number().as_str(),
                    user.name(),
                    user.email().map(EmailAddress::as_str),
                    user.joined_at().to_rfc3339(),
                ],
            )
            .map_err(|e| ApplicationError::Internal(e.to_string()))?;

            debug!("Saved user");
            Ok(())
        })
        .await
        .map_err(|e| ApplicationError::Internal(e.to_string()))?
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn get(&self, user_id: &UserId) -> Result<Option<User>, ApplicationError> {
        let pool = Arc::clone(&self.pool);
        let id_str = user_id.to_string();

        task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| ApplicationError::Internal(e.to_string()))?;

            let user = conn
                .query_row(
                    &format!("SELECT {SELECT_COLUMNS} FROM users WHERE id = ?1"),
                    [&id_str],
                    row_to_user,
                )
                .optional()
                .map_err(|e| ApplicationError::Internal(e.to_string()))?;

            debug!(found = user.is_some(), "Retrieved user");
            Ok(user)
        })
        .await
        .map_err(|e| ApplicationError::Internal(e.to_string()))?
    }

    #[instrument(skip(self), fields(phone = %phone))]
    async fn find_by_phone(&self, phone: &PhoneNumber) -> Result<Option<User>, ApplicationError> {
        let pool = Arc::clone(&self.pool);
        let phone_str = phone.as_str().to_string();

        task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| ApplicationError::Internal(e.to_string()))?;

            let user = conn
                .query_row(
                    &format!("SELECT {SELECT_COLUMNS} FROM users WHERE phone_number = ?1"),
                    [&phone_str],
                    row_to_user,
                )
                .optional()
                .map_err(|e| ApplicationError::Internal(e.to_string()))?;

            Ok(user)
        })
        .await
        .map_err(|e| ApplicationError::Internal(e.to_string()))?
    }

    #[instrument(skip(self), fields(phone = %phone))]
    async fn get_or_create(&self, phone: &PhoneNumber) -> Result<User, ApplicationError> {
        let pool = Arc::clone(&self.pool);
        let candidate = User::new(phone.clone());
        let phone_str = phone.as_str().to_string();

        task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| ApplicationError::Internal(e.to_string()))?;

            // Insert-if-absent keeps concurrent webhook deliveries from racing
            let inserted = conn
                .execute(
                    "INSERT INTO users (id, phone_number, name, email, joined_at)
                     VALUES (?1, ?2, '', NULL, ?3)
                     ON CONFLICT(phone_number) DO NOTHING",
                    params![
                        candidate.id().to_string(),
                        phone_str,
                        candidate.joined_at().to_rfc3339(),
                    ],
                )
                .map_err(|e| ApplicationError::Internal(e.to_string()))?;

            let user = conn
                .query_row(
                    &format!("SELECT {SELECT_COLUMNS} FROM users WHERE phone_number = ?1"),
                    [&phone_str],
                    row_to_user,
                )
                .map_err(|e| ApplicationError::Internal(e.to_string()))?;

            debug!(created = inserted > 0, user_id = %user.id(), "Resolved user by phone");
            Ok(user)
        })
        .await
        .map_err(|e| ApplicationError::Internal(e.to_string()))?
    }
}
