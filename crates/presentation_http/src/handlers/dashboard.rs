//! Dashboard handler
//!
//! Session-gated overview of the user's receipts: recent rows, totals, and
//! the per-date expense series.

use axum::{
    Extension,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};
use application::receipt_fields::format_receipt_date;
use tracing::instrument;

use crate::error::ApiError;
use crate::middleware::session::SessionContext;
use crate::state::AppState;

/// GET /
#[instrument(skip(state, context))]
pub async fn index(
    State(state): State<AppState>,
    Extension(context): Extension<SessionContext>,
) -> Result<Response, ApiError> {
    let Some(user_id) = context.session.as_ref().and_then(|s| s.user_id) else {
        return Ok(Redirect::to("/auth/login").into_response());
    };

    // A stale session for a deleted account falls back to login
    if state.users.get(&user_id).await?.is_none() {
        return Ok(Redirect::to("/auth/login").into_response());
    }

    let overview = state.dashboard_service.overview(user_id).await?;

    let rows: Vec<serde_json::Value> = overview
        .receipts
        .iter()
        .map(|receipt| {
            serde_json::json!({
                "date": receipt
                    .date()
                    .map_or_else(|| "-".to_string(), format_receipt_date),
                "vendor": receipt.vendor(),
                "amount": receipt.amount().to_string(),
            })
        })
        .collect();

    let dates: Vec<String> = overview.dates.iter().map(ToString::to_string).collect();
    #[allow(clippy::cast_precision_loss)]
    let totals: Vec<f64> = overview
        .totals
        .iter()
        .map(|amount| amount.cents() as f64 / 100.0)
        .collect();

    let mut ctx = tera::Context::new();
    ctx.insert("receipts", &rows);
    ctx.insert("total_receipts", &overview.total_receipts);
    ctx.insert("total_expense", &overview.total_expense.to_string());
    ctx.insert("dates", &dates);
    ctx.insert("totals", &totals);

    let html = state
        .templates
        .render("dashboard.html", &ctx)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Html(html).into_response())
}
