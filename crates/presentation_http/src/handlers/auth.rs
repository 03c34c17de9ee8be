//! Authentication handlers
//!
//! Phone-number login and registration gated by a provider-issued OTP.
//! Form errors re-render the page; provider failures surface as form-level
//! messages rather than error pages.

use axum::{
    Extension,
    extract::{Form, State},
    http::header::SET_COOKIE,
    response::{Html, IntoResponse, Redirect, Response},
};
use domain::{EmailAddress, OtpCode, PhoneNumber};
use serde::Deserialize;
use tracing::{instrument, warn};

use crate::error::ApiError;
use crate::middleware::session::SessionContext;
use crate::state::AppState;

/// Login form fields
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub phone_number: String,
}

/// Registration form fields
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub phone_number: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// OTP form fields
#[derive(Debug, Deserialize)]
pub struct OtpForm {
    pub otp: String,
}

fn render_page(
    state: &AppState,
    template: &str,
    error: Option<&str>,
) -> Result<Html<String>, ApiError> {
    let mut ctx = tera::Context::new();
    if let Some(error) = error {
        ctx.insert("error", error);
    }
    state
        .templates
        .render(template, &ctx)
        .map(Html)
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// GET /auth/login
pub async fn login_form(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    render_page(&state, "login.html", None)
}

/// POST /auth/login
#[instrument(skip(state, context, form))]
pub async fn login_submit(
    State(state): State<AppState>,
    Extension(context): Extension<SessionContext>,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    let phone = match PhoneNumber::new(&form.phone_number) {
        Ok(phone) => phone,
        Err(_) => {
            return Ok(render_page(&state, "login.html", Some("Invalid phone number"))?
                .into_response());
        },
    };

    let mut session = context.session_or_new();
    match state.auth_service.begin_login(&mut session, phone).await {
        Ok(()) => Ok(redirect_with_session(&state, &session, "/auth/verify")),
        Err(e) => {
            warn!(error = %e, "Login start failed");
            Ok(render_page(&state, "login.html", Some(&form_error(&e)))?.into_response())
        },
    }
}

/// GET /auth/register
pub async fn register_form(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    render_page(&state, "register.html", None)
}

/// POST /auth/register
#[instrument(skip(state, context, form))]
pub async fn register_submit(
    State(state): State<AppState>,
    Extension(context): Extension<SessionContext>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, ApiError> {
    let phone = match PhoneNumber::new(&form.phone_number) {
        Ok(phone) => phone,
        Err(_) => {
            return Ok(render_page(&state, "register.html", Some("Invalid phone number"))?
                .into_response());
        },
    };

    let email = match form.email.trim() {
        "" => None,
        raw => match EmailAddress::new(raw) {
            Ok(email) => Some(email),
            Err(_) => {
                return Ok(render_page(&state, "register.html", Some("Invalid email address"))?
                    .into_response());
            },
        },
    };

    let mut session = context.session_or_new();
    match state
        .auth_service
        .begin_registration(&mut session, phone, form.name.trim().to_string(), email)
        .await
    {
        Ok(()) => Ok(redirect_with_session(&state, &session, "/auth/verify")),
        Err(e) => {
            warn!(error = %e, "Registration start failed");
            Ok(render_page(&state, "register.html", Some(&form_error(&e)))?.into_response())
        },
    }
}

/// GET /auth/verify
pub async fn verify_form(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    render_page(&state, "verify.html", None)
}

/// POST /auth/verify
#[instrument(skip(state, context, form))]
pub async fn verify_submit(
    State(state): State<AppState>,
    Extension(context): Extension<SessionContext>,
    Form(form): Form<OtpForm>,
) -> Result<Response, ApiError> {
    let code = match OtpCode::new(&form.otp) {
        Ok(code) => code,
        Err(_) => {
            return Ok(render_page(&state, "verify.html", Some("Invalid OTP"))?.into_response());
        },
    };

    let mut session = context.session_or_new();
    match state
        .auth_service
        .complete_verification(&mut session, &code)
        .await
    {
        Ok(_user) => Ok(redirect_with_session(&state, &session, "/")),
        Err(e) => {
            warn!(error = %e, "OTP verification failed");
            Ok(render_page(&state, "verify.html", Some(&form_error(&e)))?.into_response())
        },
    }
}

/// POST /auth/logout
#[instrument(skip(state, context))]
pub async fn logout(
    State(state): State<AppState>,
    Extension(context): Extension<SessionContext>,
) -> Result<Response, ApiError> {
    if let Some(session) = &context.session {
        state.auth_service.logout(&session.id).await?;
    }

    Ok((
        [(SET_COOKIE, state.cookie_signer.clear_cookie())],
        Redirect::to("/auth/login"),
    )
        .into_response())
}

/// Redirect and (re)bind the session cookie
fn redirect_with_session(state: &AppState, session: &application::ports::Session, to: &str) -> Response {
    (
        [(SET_COOKIE, state.cookie_signer.set_cookie(session))],
        Redirect::to(to),
    )
        .into_response()
}

/// Map an application error onto a form-level message
fn form_error(error: &application::ApplicationError) -> String {
    use application::ApplicationError;

    match error {
        ApplicationError::Domain(e) => e.to_string(),
        ApplicationError::NotAuthorized(msg) => msg.clone(),
        ApplicationError::ExternalService(_) | ApplicationError::RateLimited => {
            "Error requesting OTP. Please try again later.".to_string()
        },
        _ => "Something went wrong. Please try again.".to_string(),
    }
}
