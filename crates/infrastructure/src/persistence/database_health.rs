//! Database health check implementation

use std::sync::Arc;

use application::{error::ApplicationError, ports::DatabaseHealthPort};
use async_trait::async_trait;
use tokio::task;

use super::connection::ConnectionPool;

/// Health check against the SQLite pool
#[derive(Debug, Clone)]
pub struct SqliteDatabaseHealth {
    pool: Arc<ConnectionPool>,
}

impl SqliteDatabaseHealth {
    /// Create a new database health checker
    #[must_use]
    pub const fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DatabaseHealthPort for SqliteDatabaseHealth {
    async fn ping(&self) -> Result<(), ApplicationError> {
        let pool = Arc::clone(&self.pool);

        task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| ApplicationError::Internal(e.to_string()))?;
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map_err(|e| ApplicationError::Internal(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| ApplicationError::Internal(e.to_string()))?
    }
}
