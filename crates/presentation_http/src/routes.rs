//! Route definitions

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::session::SessionLayer;
use crate::{handlers, state::AppState};

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    let session_layer = SessionLayer::new(state.cookie_signer.clone(), state.sessions.clone());

    Router::new()
        // Health and status endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        // Dashboard
        .route("/", get(handlers::dashboard::index))
        // Authentication
        .route(
            "/auth/login",
            get(handlers::auth::login_form).post(handlers::auth::login_submit),
        )
        .route(
            "/auth/register",
            get(handlers::auth::register_form).post(handlers::auth::register_submit),
        )
        .route(
            "/auth/verify",
            get(handlers::auth::verify_form).post(handlers::auth::verify_submit),
        )
        .route("/auth/logout", post(handlers::auth::logout))
        // Messaging webhook
        .route("/webhook/whatsapp", post(handlers::webhook::handle_webhook))
        // Session resolution for every route
        .layer(session_layer)
        // Attach state
        .with_state(state)
}
