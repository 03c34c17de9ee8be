//! Rate limiting middleware
//!
//! Token bucket rate limiter keyed by client IP. Applied to the web routes;
//! the webhook is excluded because inbound provider traffic is already
//! authenticated by its signature.

use std::{
    collections::HashMap,
    future::Future,
    net::IpAddr,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::{Duration, Instant},
};

use axum::{
    extract::Request,
    response::{IntoResponse, Response},
};
use parking_lot::Mutex;
use tower::{Layer, Service};

use crate::error::ApiError;

/// Rate limiter configuration
#[derive(Clone, Debug)]
pub struct RateLimiterConfig {
    /// Maximum requests per minute per client
    pub requests_per_minute: u32,
    /// Enable rate limiting
    pub enabled: bool,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            enabled: true,
        }
    }
}

/// Token bucket for a single client
#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(max_tokens: f64) -> Self {
        Self {
            tokens: max_tokens,
            last_update: Instant::now(),
        }
    }

    /// Try to consume a token, refilling based on elapsed time
    fn try_consume(&mut self, tokens_per_second: f64, max_tokens: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        self.tokens = elapsed
            .mul_add(tokens_per_second, self.tokens)
            .min(max_tokens);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Shared rate limiter state
#[derive(Debug)]
pub struct RateLimiterState {
    buckets: Mutex<HashMap<IpAddr, TokenBucket>>,
    tokens_per_second: f64,
    max_tokens: f64,
}

impl RateLimiterState {
    /// Create a new rate limiter state
    #[must_use]
    pub fn new(requests_per_minute: u32) -> Self {
        let max_tokens = f64::from(requests_per_minute);
        Self {
            buckets: Mutex::new(HashMap::new()),
            tokens_per_second: max_tokens / 60.0,
            max_tokens,
        }
    }

    /// Check if a request from the given IP is allowed
    pub fn check(&self, ip: IpAddr) -> bool {
        let mut buckets = self.buckets.lock();
        let bucket = buckets
            .entry(ip)
            .or_insert_with(|| TokenBucket::new(self.max_tokens));
        bucket.try_consume(self.tokens_per_second, self.max_tokens)
    }

    /// Drop entries idle longer than the given duration
    pub fn cleanup(&self, older_than: Duration) {
        let cutoff = Instant::now()
            .checked_sub(older_than)
            .unwrap_or_else(Instant::now);
        self.buckets
            .lock()
            .retain(|_, bucket| bucket.last_update > cutoff);
    }
}

/// Layer that applies rate limiting
#[derive(Clone, Debug)]
pub struct RateLimiterLayer {
    state: Arc<RateLimiterState>,
    enabled: bool,
    excluded_paths: Vec<String>,
}

impl RateLimiterLayer {
    /// Create a new rate limiter layer
    #[must_use]
    pub fn new(config: &RateLimiterConfig) -> Self {
        Self {
            state: Arc::new(RateLimiterState::new(config.requests_per_minute)),
            enabled: config.enabled,
            excluded_paths: vec![
                "/health".to_string(),
                "/ready".to_string(),
                "/webhook".to_string(),
            ],
        }
    }

    /// Get a reference to the state for cleanup tasks
    #[must_use]
    pub fn state(&self) -> Arc<RateLimiterState> {
        Arc::clone(&self.state)
    }
}

impl<S> Layer<S> for RateLimiterLayer {
    type Service = RateLimiter<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimiter {
            inner,
            state: Arc::clone(&self.state),
            enabled: self.enabled,
            excluded_paths: self.excluded_paths.clone(),
        }
    }
}

/// Middleware service for rate limiting
#[derive(Clone, Debug)]
pub struct RateLimiter<S> {
    inner: S,
    state: Arc<RateLimiterState>,
    enabled: bool,
    excluded_paths: Vec<String>,
}

impl<S> Service<Request> for RateLimiter<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let enabled = self.enabled;
        let state = Arc::clone(&self.state);
        let excluded_paths = self.excluded_paths.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if !enabled {
                return inner.call(req).await;
            }

            let path = req.uri().path();
            if excluded_paths.iter().any(|p| path.starts_with(p)) {
                return inner.call(req).await;
            }

            let client_ip = extract_client_ip(&req);
            if state.check(client_ip) {
                inner.call(req).await
            } else {
                Ok(ApiError::RateLimited.into_response())
            }
        })
    }
}

/// Client IP from X-Forwarded-For, falling back to localhost
fn extract_client_ip(req: &Request) -> IpAddr {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        && let Some(ip_str) = forwarded.split(',').next()
        && let Ok(ip) = ip_str.trim().parse::<IpAddr>()
    {
        return ip;
    }

    IpAddr::V4(std::net::Ipv4Addr::LOCALHOST)
}
