//! Application services

mod auth_service;
mod dashboard_service;
mod health_service;
mod ingestion_service;
mod query_service;

pub use auth_service::AuthService;
pub use dashboard_service::{DashboardOverview, DashboardService};
pub use health_service::{HealthService, ReadinessReport};
pub use ingestion_service::IngestionService;
pub use query_service::QueryService;
