//! belegbot HTTP server
//!
//! Main entry point: wires configuration, persistence, integration
//! clients, and services into the router.

use std::{sync::Arc, time::Duration};

use ai_core::GeminiInferenceEngine;
use application::{
    AuthService, DashboardService, HealthService, IngestionService, QueryService,
    ports::{SessionStore, UserStore},
};
use infrastructure::{
    AppConfig, FsMediaStore, GeminiInferenceAdapter, SqliteDatabaseHealth, SqliteReceiptStore,
    SqliteSessionStore, SqliteUserStore, TemplateEngine, TwilioMessengerAdapter,
    TwilioVerifyAdapter, create_pool,
};
use integration_twilio::{TwilioClient, TwilioClientConfig, VerifyClient, VerifyClientConfig};
use presentation_http::{
    AppState, CookieSigner, RateLimiterConfig, RateLimiterLayer, routes,
    set_expose_internal_errors,
};
use secrecy::ExposeSecret;
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration before tracing so the log format applies
    let config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {e}");
        AppConfig::default()
    });

    init_tracing(&config);
    set_expose_internal_errors(config.security.expose_internal_errors);

    info!("belegbot v{} starting...", env!("CARGO_PKG_VERSION"));
    info!(
        host = %config.server.host,
        port = %config.server.port,
        model = %config.inference.text_model,
        "Configuration loaded"
    );

    // Persistence
    let pool = Arc::new(create_pool(&config.database)?);
    let users: Arc<dyn UserStore> = Arc::new(SqliteUserStore::new(Arc::clone(&pool)));
    let receipts = Arc::new(SqliteReceiptStore::new(Arc::clone(&pool)));
    let sessions: Arc<dyn SessionStore> = Arc::new(SqliteSessionStore::new(Arc::clone(&pool)));
    let database_health = Arc::new(SqliteDatabaseHealth::new(Arc::clone(&pool)));
    let media_store = Arc::new(FsMediaStore::new(&config.media));

    // Integration clients
    let twilio_client = TwilioClient::new(twilio_client_config(&config)?)
        .map_err(|e| anyhow::anyhow!("Failed to initialize Twilio client: {e}"))?;
    let verify_client = VerifyClient::new(verify_client_config(&config)?)
        .map_err(|e| anyhow::anyhow!("Failed to initialize Verify client: {e}"))?;
    let inference_engine = GeminiInferenceEngine::new(config.inference.clone())
        .map_err(|e| anyhow::anyhow!("Failed to initialize inference: {e}"))?;

    // Adapters
    let messenger = Arc::new(TwilioMessengerAdapter::new(twilio_client));
    let verify = Arc::new(TwilioVerifyAdapter::new(verify_client));
    let inference = Arc::new(GeminiInferenceAdapter::new(Arc::new(inference_engine)));

    // Services
    let auth_service = Arc::new(AuthService::new(
        verify,
        Arc::clone(&users),
        Arc::clone(&sessions),
    ));
    let ingestion_service = Arc::new(IngestionService::new(
        messenger.clone(),
        inference.clone(),
        receipts.clone(),
        media_store,
    ));
    let query_service = Arc::new(QueryService::new(
        inference.clone(),
        receipts.clone(),
        messenger,
    ));
    let dashboard_service = Arc::new(DashboardService::new(receipts));
    let health_service = Arc::new(HealthService::new(database_health, inference));

    // Session cookie signing
    let session_secret = config.security.session_secret.as_ref().map_or_else(
        || {
            warn!("security.session_secret not configured, using insecure development secret");
            "insecure-development-secret".to_string()
        },
        |secret| secret.expose_secret().to_string(),
    );
    let cookie_signer = Arc::new(CookieSigner::new(
        session_secret.into_bytes(),
        config.security.session_cookie_name.clone(),
        config.security.session_cookie_secure,
    ));

    let templates = Arc::new(
        TemplateEngine::new().map_err(|e| anyhow::anyhow!("Failed to compile templates: {e}"))?,
    );

    let state = AppState {
        auth_service,
        ingestion_service,
        query_service,
        dashboard_service,
        health_service,
        users,
        sessions: Arc::clone(&sessions),
        templates,
        cookie_signer,
        config: Arc::new(config.clone()),
    };

    // Expired sessions are purged in the background
    spawn_session_purge(sessions);

    // Build router
    let app = routes::create_router(state);

    // Configure CORS layer
    let cors_layer = if config.server.allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use axum::http::{HeaderValue, Method};
        let origins: Vec<HeaderValue> = config
            .server
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any)
    };

    // Configure rate limiter
    let rate_limiter = RateLimiterLayer::new(&RateLimiterConfig {
        enabled: config.security.rate_limit_enabled,
        requests_per_minute: config.security.rate_limit_rpm,
    });

    // Add middleware (order matters: first added = outermost)
    let app = app
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .layer(RequestBodyLimitLayer::new(config.server.max_body_size_bytes))
        .layer(rate_limiter);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;

    info!("Server listening on http://{addr}");

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_secs.unwrap_or(30));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_timeout))
        .await?;

    info!("Server shutdown complete");

    Ok(())
}

/// Initialize tracing with the configured format
fn init_tracing(config: &AppConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "belegbot_server=debug,presentation_http=debug,tower_http=debug".into());

    if config.server.log_format == "json" {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Build the Twilio client configuration, failing on missing credentials
fn twilio_client_config(config: &AppConfig) -> anyhow::Result<TwilioClientConfig> {
    Ok(TwilioClientConfig {
        account_sid: config
            .twilio
            .account_sid
            .clone()
            .ok_or_else(|| anyhow::anyhow!("twilio.account_sid is not configured"))?,
        auth_token: config
            .twilio
            .auth_token_str()
            .ok_or_else(|| anyhow::anyhow!("twilio.auth_token is not configured"))?
            .to_string(),
        whatsapp_number: config
            .twilio
            .whatsapp_number
            .clone()
            .ok_or_else(|| anyhow::anyhow!("twilio.whatsapp_number is not configured"))?,
        base_url: config.twilio.api_base_url.clone(),
        max_media_bytes: config.media.max_bytes,
    })
}

/// Build the Verify client configuration, failing on missing credentials
fn verify_client_config(config: &AppConfig) -> anyhow::Result<VerifyClientConfig> {
    Ok(VerifyClientConfig {
        account_sid: config
            .twilio
            .account_sid
            .clone()
            .ok_or_else(|| anyhow::anyhow!("twilio.account_sid is not configured"))?,
        auth_token: config
            .twilio
            .auth_token_str()
            .ok_or_else(|| anyhow::anyhow!("twilio.auth_token is not configured"))?
            .to_string(),
        service_sid: config
            .twilio
            .verify_service_sid
            .clone()
            .ok_or_else(|| anyhow::anyhow!("twilio.verify_service_sid is not configured"))?,
        base_url: config.twilio.verify_base_url.clone(),
        lookup_base_url: config.twilio.lookup_base_url.clone(),
    })
}

/// Periodically delete expired sessions
fn spawn_session_purge(sessions: Arc<dyn SessionStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));
        loop {
            interval.tick().await;
            match sessions.purge_expired().await {
                Ok(purged) if purged > 0 => info!(purged, "Purged expired sessions"),
                Ok(_) => {},
                Err(e) => warn!(error = %e, "Session purge failed"),
            }
        }
    });
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn shutdown_signal(timeout: Duration) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }

    info!("Waiting up to {timeout:?} for connections to close...");
}
