//! Database health port

use async_trait::async_trait;

use crate::error::ApplicationError;

/// Port for database reachability checks
#[async_trait]
pub trait DatabaseHealthPort: Send + Sync {
    /// Run a trivial query against the database
    async fn ping(&self) -> Result<(), ApplicationError>;
}
