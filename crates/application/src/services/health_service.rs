//! Health service

use std::fmt;
use std::sync::Arc;

use tracing::instrument;

use crate::ports::{DatabaseHealthPort, InferencePort};

/// Readiness of the service's dependencies
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct ReadinessReport {
    pub database: bool,
    pub inference: bool,
}

impl ReadinessReport {
    /// Whether the service can handle traffic
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.database && self.inference
    }
}

/// Service checking dependency health
pub struct HealthService {
    database: Arc<dyn DatabaseHealthPort>,
    inference: Arc<dyn InferencePort>,
}

impl fmt::Debug for HealthService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthService").finish_non_exhaustive()
    }
}

impl HealthService {
    /// Create a new health service
    pub fn new(database: Arc<dyn DatabaseHealthPort>, inference: Arc<dyn InferencePort>) -> Self {
        Self {
            database,
            inference,
        }
    }

    /// Check all dependencies
    #[instrument(skip(self))]
    pub async fn readiness(&self) -> ReadinessReport {
        ReadinessReport {
            database: self.database.ping().await.is_ok(),
            inference: self.inference.is_healthy().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use mockall::mock;

    use super::*;
    use crate::error::ApplicationError;
    use crate::ports::{AgentCompletion, AgentTurn, ExtractedReceipt, ReceiptSource, ToolSpec};

    mock! {
        pub Db {}

        #[async_trait::async_trait]
        impl DatabaseHealthPort for Db {
            async fn ping(&self) -> Result<(), ApplicationError>;
        }
    }

    mock! {
        pub Inference {}

        #[async_trait::async_trait]
        impl InferencePort for Inference {
            async fn extract_receipt(&self, source: ReceiptSource) -> Result<ExtractedReceipt, ApplicationError>;
            async fn complete_agent(&self, system: &str, turns: &[AgentTurn], tools: &[ToolSpec]) -> Result<AgentCompletion, ApplicationError>;
            async fn is_healthy(&self) -> bool;
        }
    }

    #[tokio::test]
    async fn all_healthy_is_ready() {
        let mut db = MockDb::new();
        db.expect_ping().returning(|| Ok(()));
        let mut inference = MockInference::new();
        inference.expect_is_healthy().returning(|| true);

        let service = HealthService::new(Arc::new(db), Arc::new(inference));
        let report = service.readiness().await;

        assert!(report.database);
        assert!(report.inference);
        assert!(report.is_ready());
    }

    #[tokio::test]
    async fn database_failure_is_not_ready() {
        let mut db = MockDb::new();
        db.expect_ping()
            .returning(|| Err(ApplicationError::Internal("pool".to_string())));
        let mut inference = MockInference::new();
        inference.expect_is_healthy().returning(|| true);

        let service = HealthService::new(Arc::new(db), Arc::new(inference));
        let report = service.readiness().await;

        assert!(!report.database);
        assert!(!report.is_ready());
    }

    #[tokio::test]
    async fn inference_failure_is_not_ready() {
        let mut db = MockDb::new();
        db.expect_ping().returning(|| Ok(()));
        let mut inference = MockInference::new();
        inference.expect_is_healthy().returning(|| false);

        let service = HealthService::new(Arc::new(db), Arc::new(inference));
        let report = service.readiness().await;

        assert!(!report.inference);
        assert!(!report.is_ready());
    }
}
