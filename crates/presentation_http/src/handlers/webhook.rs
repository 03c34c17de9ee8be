//! WhatsApp webhook handler
//!
//! Receives inbound messages from the provider, validates the request
//! signature, branches on media presence, spawns the background unit of
//! work, and immediately acknowledges with TwiML. The actual answer goes
//! out asynchronously through the REST send API.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use domain::PhoneNumber;
use integration_twilio::{MessagingResponse, WebhookForm, validate_signature};
use tracing::{error, info, instrument, warn};

use crate::state::AppState;

/// Acknowledgment for a media message
const ACK_MEDIA: &str = "Ok let me extract the data for you";

/// Acknowledgment for a text query
const ACK_QUERY: &str = "Ok let me process your query";

/// POST /webhook/whatsapp
#[instrument(skip(state, headers, body))]
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // Decode the form both as raw pairs (for the signature) and typed
    let params: Vec<(String, String)> = match serde_urlencoded::from_bytes(&body) {
        Ok(params) => params,
        Err(e) => {
            warn!(error = %e, "Malformed webhook body");
            return (StatusCode::BAD_REQUEST, "Invalid form body").into_response();
        },
    };

    if let Err(response) = check_signature(&state, &headers, &params) {
        return response;
    }

    let form: WebhookForm = match serde_urlencoded::from_bytes(&body) {
        Ok(form) => form,
        Err(e) => {
            warn!(error = %e, "Webhook form missing fields");
            return (StatusCode::BAD_REQUEST, "Invalid form body").into_response();
        },
    };

    let Some(phone) = form.sender_phone().and_then(|raw| PhoneNumber::new(raw).ok()) else {
        warn!(from = %form.from, "Webhook without usable sender");
        return (StatusCode::BAD_REQUEST, "Missing sender").into_response();
    };

    let user = match state.users.get_or_create(&phone).await {
        Ok(user) => user,
        Err(e) => {
            error!(error = %e, "Failed to resolve webhook user");
            return (StatusCode::INTERNAL_SERVER_ERROR, "User lookup failed").into_response();
        },
    };

    // Branch on media, spawn the background unit, acknowledge immediately
    let ack = if let Some((media_url, mime_type)) = form.media() {
        info!(message_sid = %form.message_sid, mime_type = %mime_type, "Webhook media message");

        let ingestion = state.ingestion_service.clone();
        let media_url = media_url.to_string();
        let mime_type = mime_type.to_string();
        tokio::spawn(async move {
            // Errors already answered the user; log for the operator
            if let Err(e) = ingestion.ingest_media(&user, &media_url, &mime_type).await {
                warn!(error = %e, "Background ingestion failed");
            }
        });

        ACK_MEDIA
    } else {
        info!(message_sid = %form.message_sid, "Webhook text message");

        let query = state.query_service.clone();
        let question = form.body.clone();
        tokio::spawn(async move {
            query.handle_question(&user, &question).await;
        });

        ACK_QUERY
    };

    twiml_response(ack)
}

/// Validate the provider signature when required
fn check_signature(
    state: &AppState,
    headers: &HeaderMap,
    params: &[(String, String)],
) -> Result<(), Response> {
    let twilio = &state.config.twilio;
    if !twilio.signature_required {
        return Ok(());
    }

    let (Some(auth_token), Some(webhook_url)) =
        (twilio.auth_token_str(), twilio.webhook_url.as_deref())
    else {
        warn!("Signature validation required but auth_token or webhook_url not configured");
        return Err(
            (StatusCode::SERVICE_UNAVAILABLE, "Webhook not configured").into_response(),
        );
    };

    let signature = headers
        .get("x-twilio-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if validate_signature(auth_token, webhook_url, params, signature) {
        Ok(())
    } else {
        warn!("Webhook signature validation failed");
        Err((StatusCode::UNAUTHORIZED, "Invalid signature").into_response())
    }
}

/// Build a TwiML message response
fn twiml_response(message: &str) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/xml")],
        MessagingResponse::new().message(message).to_xml(),
    )
        .into_response()
}
