//! Application state shared across handlers

use std::sync::Arc;

use application::{
    AuthService, DashboardService, HealthService, IngestionService, QueryService,
    ports::{SessionStore, UserStore},
};
use infrastructure::{AppConfig, TemplateEngine};

use crate::middleware::session::CookieSigner;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// OTP authentication
    pub auth_service: Arc<AuthService>,
    /// Receipt ingestion pipeline
    pub ingestion_service: Arc<IngestionService>,
    /// Query agent
    pub query_service: Arc<QueryService>,
    /// Dashboard aggregation
    pub dashboard_service: Arc<DashboardService>,
    /// Dependency health checks
    pub health_service: Arc<HealthService>,
    /// User accounts
    pub users: Arc<dyn UserStore>,
    /// Web sessions
    pub sessions: Arc<dyn SessionStore>,
    /// Page templates
    pub templates: Arc<TemplateEngine>,
    /// Session cookie signing
    pub cookie_signer: Arc<CookieSigner>,
    /// Application configuration
    pub config: Arc<AppConfig>,
}
