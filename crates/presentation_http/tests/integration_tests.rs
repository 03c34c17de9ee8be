//! Router-level integration tests
//!
//! Real SQLite stores on an in-memory database, stub implementations for
//! the hosted providers (verification, messaging, inference).

use std::sync::{Arc, Mutex};
use std::time::Duration;

use application::{
    ApplicationError, AuthService, DashboardService, HealthService, IngestionService,
    QueryService,
    ports::{
        AgentCompletion, AgentTurn, DatabaseHealthPort, ExtractedReceipt, FetchedMedia,
        InferencePort, MessengerPort, OtpVerifyPort, ReceiptSource, ReceiptStore, SessionStore,
        ToolSpec, UserStore,
    },
};
use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use domain::{OtpCode, PhoneNumber};
use infrastructure::{
    AppConfig, DatabaseConfig, FsMediaStore, SqliteDatabaseHealth, SqliteReceiptStore,
    SqliteSessionStore, SqliteUserStore, TemplateEngine, create_pool,
};
use presentation_http::{AppState, CookieSigner, create_router};
use secrecy::SecretString;

const VALID_OTP: &str = "123456";

/// Verification stub: any number is deliverable, one code is approved
struct StubVerify;

#[async_trait]
impl OtpVerifyPort for StubVerify {
    async fn lookup(&self, phone: &PhoneNumber) -> Result<bool, ApplicationError> {
        Ok(!phone.as_str().starts_with("+999"))
    }

    async fn start_verification(&self, _phone: &PhoneNumber) -> Result<(), ApplicationError> {
        Ok(())
    }

    async fn check_verification(
        &self,
        _phone: &PhoneNumber,
        code: &OtpCode,
    ) -> Result<bool, ApplicationError> {
        Ok(code.as_str() == VALID_OTP)
    }
}

/// Messenger stub recording outbound messages
#[derive(Default)]
struct StubMessenger {
    sent: Mutex<Vec<(String, String)>>,
}

impl StubMessenger {
    fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessengerPort for StubMessenger {
    async fn send_text(&self, to: &PhoneNumber, body: &str) -> Result<(), ApplicationError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), body.to_string()));
        Ok(())
    }

    async fn fetch_media(&self, _url: &str) -> Result<FetchedMedia, ApplicationError> {
        Ok(FetchedMedia {
            data: vec![0xFF, 0xD8, 0xFF],
            mime_type: "image/jpeg".to_string(),
        })
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}

/// Inference stub: fixed extraction and a fixed agent answer
struct StubInference;

#[async_trait]
impl InferencePort for StubInference {
    async fn extract_receipt(
        &self,
        _source: ReceiptSource,
    ) -> Result<ExtractedReceipt, ApplicationError> {
        Ok(ExtractedReceipt {
            date: Some("14-03-2025".to_string()),
            vendor: Some("REWE".to_string()),
            total_amount: Some(serde_json::json!(23.45)),
        })
    }

    async fn complete_agent(
        &self,
        _system: &str,
        _turns: &[AgentTurn],
        _tools: &[ToolSpec],
    ) -> Result<AgentCompletion, ApplicationError> {
        Ok(AgentCompletion {
            text: "You spent $23.45 in total.".to_string(),
            calls: vec![],
        })
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}

struct TestApp {
    server: TestServer,
    messenger: Arc<StubMessenger>,
    receipts: Arc<SqliteReceiptStore>,
    users: Arc<dyn UserStore>,
    _media_dir: tempfile::TempDir,
}

fn build_app(config: AppConfig) -> TestApp {
    let pool = Arc::new(
        create_pool(&DatabaseConfig {
            path: ":memory:".to_string(),
            max_connections: 1,
            run_migrations: true,
        })
        .unwrap(),
    );

    let users: Arc<dyn UserStore> = Arc::new(SqliteUserStore::new(Arc::clone(&pool)));
    let receipts = Arc::new(SqliteReceiptStore::new(Arc::clone(&pool)));
    let sessions: Arc<dyn SessionStore> = Arc::new(SqliteSessionStore::new(Arc::clone(&pool)));
    let database_health: Arc<dyn DatabaseHealthPort> =
        Arc::new(SqliteDatabaseHealth::new(Arc::clone(&pool)));

    let media_dir = tempfile::tempdir().unwrap();
    let media_store = Arc::new(FsMediaStore::with_root(media_dir.path()));

    let messenger = Arc::new(StubMessenger::default());
    let verify = Arc::new(StubVerify);
    let inference: Arc<dyn InferencePort> = Arc::new(StubInference);

    let receipts_port: Arc<dyn ReceiptStore> = receipts.clone();
    let users_handle = Arc::clone(&users);

    let state = AppState {
        auth_service: Arc::new(AuthService::new(
            verify,
            Arc::clone(&users),
            Arc::clone(&sessions),
        )),
        ingestion_service: Arc::new(IngestionService::new(
            messenger.clone(),
            Arc::clone(&inference),
            Arc::clone(&receipts_port),
            media_store,
        )),
        query_service: Arc::new(QueryService::new(
            Arc::clone(&inference),
            Arc::clone(&receipts_port),
            messenger.clone(),
        )),
        dashboard_service: Arc::new(DashboardService::new(Arc::clone(&receipts_port))),
        health_service: Arc::new(HealthService::new(database_health, inference)),
        users,
        sessions,
        templates: Arc::new(TemplateEngine::new().unwrap()),
        cookie_signer: Arc::new(CookieSigner::new(
            b"test-secret".to_vec(),
            "belegbot_session",
            false,
        )),
        config: Arc::new(config),
    };

    let mut server = TestServer::new(create_router(state)).unwrap();
    server.save_cookies();

    TestApp {
        server,
        messenger,
        receipts,
        users: users_handle,
        _media_dir: media_dir,
    }
}

fn open_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.twilio.signature_required = false;
    config
}

/// Wait until the background task has sent `count` messages
async fn wait_for_sends(messenger: &StubMessenger, count: usize) -> Vec<(String, String)> {
    for _ in 0..100 {
        let sent = messenger.sent();
        if sent.len() >= count {
            return sent;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    messenger.sent()
}

#[tokio::test]
async fn health_endpoint_is_ok() {
    let app = build_app(open_config());

    let response = app.server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<serde_json::Value>()["status"], "ok");
}

#[tokio::test]
async fn readiness_reports_dependencies() {
    let app = build_app(open_config());

    let response = app.server.get("/ready").await;
    response.assert_status_ok();
    let body = response.json::<serde_json::Value>();
    assert_eq!(body["ready"], true);
    assert_eq!(body["database"], true);
}

#[tokio::test]
async fn anonymous_dashboard_redirects_to_login() {
    let app = build_app(open_config());

    let response = app.server.get("/").await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/auth/login");
}

#[tokio::test]
async fn login_page_renders() {
    let app = build_app(open_config());

    let response = app.server.get("/auth/login").await;
    response.assert_status_ok();
    assert!(response.text().contains("phone number"));
}

#[tokio::test]
async fn full_login_flow_reaches_dashboard() {
    let app = build_app(open_config());

    // Request an OTP
    let response = app
        .server
        .post("/auth/login")
        .form(&[("phone_number", "+491234567890")])
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/auth/verify");

    // Enter the code
    let response = app
        .server
        .post("/auth/verify")
        .form(&[("otp", VALID_OTP)])
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/");

    // The dashboard is now accessible
    let response = app.server.get("/").await;
    response.assert_status_ok();
    assert!(response.text().contains("Your receipts"));
}

#[tokio::test]
async fn undeliverable_number_shows_form_error() {
    let app = build_app(open_config());

    let response = app
        .server
        .post("/auth/login")
        .form(&[("phone_number", "+999123456789")])
        .await;
    response.assert_status_ok();
    assert!(response.text().contains("Invalid phone number"));
}

#[tokio::test]
async fn malformed_number_shows_form_error() {
    let app = build_app(open_config());

    let response = app
        .server
        .post("/auth/login")
        .form(&[("phone_number", "not-a-number")])
        .await;
    response.assert_status_ok();
    assert!(response.text().contains("Invalid phone number"));
}

#[tokio::test]
async fn wrong_otp_keeps_user_on_verify_page() {
    let app = build_app(open_config());

    app.server
        .post("/auth/login")
        .form(&[("phone_number", "+491234567890")])
        .await;

    let response = app
        .server
        .post("/auth/verify")
        .form(&[("otp", "000000")])
        .await;
    response.assert_status_ok();
    assert!(response.text().contains("Invalid OTP"));

    // The pending state survives a failed attempt
    let response = app
        .server
        .post("/auth/verify")
        .form(&[("otp", VALID_OTP)])
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn verify_without_pending_phone_shows_error() {
    let app = build_app(open_config());

    let response = app
        .server
        .post("/auth/verify")
        .form(&[("otp", VALID_OTP)])
        .await;
    response.assert_status_ok();
    assert!(response.text().contains("request a new OTP"));
}

#[tokio::test]
async fn registration_flow_creates_named_account() {
    let app = build_app(open_config());

    let response = app
        .server
        .post("/auth/register")
        .form(&[
            ("phone_number", "+491234567890"),
            ("name", "Anna"),
            ("email", "anna@example.com"),
        ])
        .await;
    response.assert_status(StatusCode::SEE_OTHER);

    let response = app
        .server
        .post("/auth/verify")
        .form(&[("otp", VALID_OTP)])
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/");
}

#[tokio::test]
async fn logout_clears_the_session() {
    let app = build_app(open_config());

    app.server
        .post("/auth/login")
        .form(&[("phone_number", "+491234567890")])
        .await;
    app.server
        .post("/auth/verify")
        .form(&[("otp", VALID_OTP)])
        .await;

    let response = app.server.post("/auth/logout").await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/auth/login");

    let response = app.server.get("/").await;
    response.assert_status(StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn media_webhook_acks_and_ingests_in_background() {
    let app = build_app(open_config());

    let response = app
        .server
        .post("/webhook/whatsapp")
        .form(&[
            ("MessageSid", "SM1"),
            ("From", "whatsapp:+491234567890"),
            ("To", "whatsapp:+14155238886"),
            ("NumMedia", "1"),
            ("MediaUrl0", "https://api.twilio.com/media/ME1"),
            ("MediaContentType0", "image/jpeg"),
            ("Body", ""),
        ])
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "text/xml");
    assert!(response.text().contains("extract the data"));

    // The background pipeline replies with the receipt details
    let sent = wait_for_sends(&app.messenger, 1).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "+491234567890");
    assert!(sent[0].1.contains("Your receipt was processed!"));
    assert!(sent[0].1.contains("REWE"));
    assert!(sent[0].1.contains("$23.45"));

    // And the receipt landed in the store
    let user_id = find_user_id(&app, "+491234567890").await;
    let rows = app
        .receipts
        .list_for_user(&user_id, None, None)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].vendor(), "REWE");
}

#[tokio::test]
async fn text_webhook_acks_and_answers_in_background() {
    let app = build_app(open_config());

    let response = app
        .server
        .post("/webhook/whatsapp")
        .form(&[
            ("MessageSid", "SM2"),
            ("From", "whatsapp:+491234567890"),
            ("To", "whatsapp:+14155238886"),
            ("NumMedia", "0"),
            ("Body", "how much did I spend?"),
        ])
        .await;

    response.assert_status_ok();
    assert!(response.text().contains("process your query"));

    let sent = wait_for_sends(&app.messenger, 1).await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.contains("$23.45"));
}

#[tokio::test]
async fn webhook_without_sender_is_rejected() {
    let app = build_app(open_config());

    let response = app
        .server
        .post("/webhook/whatsapp")
        .form(&[("MessageSid", "SM3"), ("Body", "hi")])
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn webhook_signature_is_enforced_when_configured() {
    let mut config = AppConfig::default();
    config.twilio.signature_required = true;
    config.twilio.auth_token = Some(SecretString::from("webhook_token"));
    config.twilio.webhook_url = Some("https://example.com/webhook/whatsapp".to_string());
    let app = build_app(config);

    // No signature header
    let response = app
        .server
        .post("/webhook/whatsapp")
        .form(&[("From", "whatsapp:+491234567890"), ("Body", "hi")])
        .await;
    response.assert_status_unauthorized();

    // Correct signature passes
    let params = vec![
        ("From".to_string(), "whatsapp:+491234567890".to_string()),
        ("Body".to_string(), "hi".to_string()),
    ];
    let signature = sign_params(
        "webhook_token",
        "https://example.com/webhook/whatsapp",
        &params,
    );
    let response = app
        .server
        .post("/webhook/whatsapp")
        .add_header("x-twilio-signature", signature)
        .form(&[("From", "whatsapp:+491234567890"), ("Body", "hi")])
        .await;
    response.assert_status_ok();
}

/// Resolve the user id the webhook created for a phone number
async fn find_user_id(app: &TestApp, phone: &str) -> domain::UserId {
    let phone = PhoneNumber::new(phone).unwrap();
    app.users
        .find_by_phone(&phone)
        .await
        .unwrap()
        .expect("webhook should have created the user")
        .id()
}

fn sign_params(token: &str, url: &str, params: &[(String, String)]) -> String {
    use hmac::{Hmac, Mac};
    type HmacSha1 = Hmac<sha1::Sha1>;

    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut mac = HmacSha1::new_from_slice(token.as_bytes()).unwrap();
    mac.update(url.as_bytes());
    for (key, value) in sorted {
        mac.update(key.as_bytes());
        mac.update(value.as_bytes());
    }

    use base64::Engine as _;
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}
