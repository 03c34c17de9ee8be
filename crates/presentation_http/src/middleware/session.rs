//! Session cookie middleware
//!
//! Sessions are stored server-side; the cookie carries only the session id,
//! signed with HMAC-SHA256. The layer verifies the signature, loads the
//! session, and makes it available to handlers through request extensions.

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use application::ports::{Session, SessionStore};
use axum::{extract::Request, http::header::COOKIE, response::Response};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tower::{Layer, Service};
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

/// Signs and verifies session cookies
#[derive(Clone)]
pub struct CookieSigner {
    secret: Vec<u8>,
    cookie_name: String,
    secure: bool,
}

impl std::fmt::Debug for CookieSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieSigner")
            .field("cookie_name", &self.cookie_name)
            .field("secure", &self.secure)
            .finish_non_exhaustive()
    }
}

impl CookieSigner {
    /// Create a new cookie signer
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>, cookie_name: impl Into<String>, secure: bool) -> Self {
        Self {
            secret: secret.into(),
            cookie_name: cookie_name.into(),
            secure,
        }
    }

    /// The cookie name
    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    fn signature(&self, session_id: &str) -> String {
        #[allow(clippy::expect_used)]
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(session_id.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Produce the signed cookie value for a session id
    #[must_use]
    pub fn sign(&self, session_id: &str) -> String {
        format!("{session_id}.{}", self.signature(session_id))
    }

    /// Verify a cookie value and return the session id
    #[must_use]
    pub fn verify(&self, cookie_value: &str) -> Option<String> {
        let (session_id, signature) = cookie_value.split_once('.')?;
        if session_id.is_empty() {
            return None;
        }
        let expected = self.signature(session_id);
        if expected.as_bytes().ct_eq(signature.as_bytes()).into() {
            Some(session_id.to_string())
        } else {
            None
        }
    }

    /// Build a Set-Cookie header value binding the session
    #[must_use]
    pub fn set_cookie(&self, session: &Session) -> String {
        let max_age = Session::LIFETIME_HOURS * 3600;
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}",
            self.cookie_name,
            self.sign(&session.id)
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// Build a Set-Cookie header value clearing the session
    #[must_use]
    pub fn clear_cookie(&self) -> String {
        format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
            self.cookie_name
        )
    }

    /// Extract the raw cookie value from a Cookie header
    fn cookie_from_header(&self, header: &str) -> Option<String> {
        header.split(';').find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == self.cookie_name).then(|| value.to_string())
        })
    }
}

/// The session attached to the current request
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    /// The loaded session, if the request carried a valid cookie
    pub session: Option<Session>,
}

impl SessionContext {
    /// The existing session, or a fresh anonymous one
    #[must_use]
    pub fn session_or_new(&self) -> Session {
        self.session.clone().unwrap_or_default()
    }
}

/// Layer loading the session for each request
#[derive(Clone)]
pub struct SessionLayer {
    signer: Arc<CookieSigner>,
    store: Arc<dyn SessionStore>,
}

impl std::fmt::Debug for SessionLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLayer").finish_non_exhaustive()
    }
}

impl SessionLayer {
    /// Create a new session layer
    pub fn new(signer: Arc<CookieSigner>, store: Arc<dyn SessionStore>) -> Self {
        Self { signer, store }
    }
}

impl<S> Layer<S> for SessionLayer {
    type Service = SessionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionService {
            inner,
            signer: Arc::clone(&self.signer),
            store: Arc::clone(&self.store),
        }
    }
}

/// Service resolving the session cookie
#[derive(Clone)]
pub struct SessionService<S> {
    inner: S,
    signer: Arc<CookieSigner>,
    store: Arc<dyn SessionStore>,
}

impl<S> std::fmt::Debug for SessionService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService").finish_non_exhaustive()
    }
}

impl<S> Service<Request> for SessionService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        let signer = Arc::clone(&self.signer);
        let store = Arc::clone(&self.store);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let session_id = request
                .headers()
                .get(COOKIE)
                .and_then(|v| v.to_str().ok())
                .and_then(|header| signer.cookie_from_header(header))
                .and_then(|value| signer.verify(&value));

            let session = match session_id {
                Some(id) => match store.get(&id).await {
                    Ok(session) => {
                        debug!(found = session.is_some(), "Resolved session cookie");
                        session
                    },
                    Err(e) => {
                        warn!(error = %e, "Failed to load session");
                        None
                    },
                },
                None => None,
            };

            request.extensions_mut().insert(SessionContext { session });
            inner.call(request).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> CookieSigner {
        CookieSigner::new(b"test-secret".to_vec(), "belegbot_session", false)
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let signer = signer();
        let cookie = signer.sign("abc123");
        assert_eq!(signer.verify(&cookie), Some("abc123".to_string()));
    }

    #[test]
    fn tampered_id_is_rejected() {
        let signer = signer();
        let cookie = signer.sign("abc123");
        let tampered = cookie.replacen("abc123", "abc124", 1);
        assert!(signer.verify(&tampered).is_none());
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let signer = signer();
        let mut cookie = signer.sign("abc123");
        cookie.pop();
        cookie.push('0');
        // One flipped hex digit must not verify (unless it was already '0')
        if cookie != signer.sign("abc123") {
            assert!(signer.verify(&cookie).is_none());
        }
    }

    #[test]
    fn different_secret_does_not_verify() {
        let cookie = signer().sign("abc123");
        let other = CookieSigner::new(b"other-secret".to_vec(), "belegbot_session", false);
        assert!(other.verify(&cookie).is_none());
    }

    #[test]
    fn unsigned_value_is_rejected() {
        assert!(signer().verify("abc123").is_none());
        assert!(signer().verify(".sig").is_none());
        assert!(signer().verify("").is_none());
    }

    #[test]
    fn set_cookie_carries_attributes() {
        let session = Session::new();
        let cookie = signer().set_cookie(&session);
        assert!(cookie.starts_with("belegbot_session="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn secure_flag_is_appended() {
        let secure_signer = CookieSigner::new(b"s".to_vec(), "belegbot_session", true);
        let cookie = secure_signer.set_cookie(&Session::new());
        assert!(cookie.contains("Secure"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let cookie = signer().clear_cookie();
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn cookie_is_found_among_others() {
        let signer = signer();
        let value = signer.sign("abc");
        let header = format!("theme=dark; belegbot_session={value}; lang=de");
        assert_eq!(signer.cookie_from_header(&header), Some(value));
    }

    #[test]
    fn missing_cookie_is_none() {
        assert!(signer().cookie_from_header("theme=dark").is_none());
    }

    #[test]
    fn session_context_creates_fresh_session() {
        let ctx = SessionContext::default();
        let session = ctx.session_or_new();
        assert!(!session.is_authenticated());
    }
}
