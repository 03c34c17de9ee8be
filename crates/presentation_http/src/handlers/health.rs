//! Health and readiness handlers

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::state::AppState;

/// Liveness check
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness check: database and inference must be reachable
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.health_service.readiness().await;

    let status = if report.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(json!({
        "ready": report.is_ready(),
        "database": report.database,
        "inference": report.inference,
    })))
}
