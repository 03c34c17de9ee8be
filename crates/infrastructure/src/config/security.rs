//! Security configuration: session signing and rate limiting.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use super::default_true;

/// Security configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Secret for session cookie signing (sensitive - uses SecretString)
    #[serde(default, skip_serializing)]
    pub session_secret: Option<SecretString>,

    /// Name of the session cookie
    #[serde(default = "default_cookie_name")]
    pub session_cookie_name: String,

    /// Mark the session cookie Secure (HTTPS only)
    #[serde(default)]
    pub session_cookie_secure: bool,

    /// Whether rate limiting is enabled (default: true)
    #[serde(default = "default_true")]
    pub rate_limit_enabled: bool,

    /// Allowed requests per minute per client
    #[serde(default = "default_rate_limit_rpm")]
    pub rate_limit_rpm: u32,

    /// Expose internal error details in responses (disable in production)
    #[serde(default = "default_true")]
    pub expose_internal_errors: bool,
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field(
                "session_secret",
                &if self.session_secret.is_some() {
                    Some("[REDACTED]")
                } else {
                    None
                },
            )
            .field("session_cookie_name", &self.session_cookie_name)
            .field("session_cookie_secure", &self.session_cookie_secure)
            .field("rate_limit_enabled", &self.rate_limit_enabled)
            .field("rate_limit_rpm", &self.rate_limit_rpm)
            .field("expose_internal_errors", &self.expose_internal_errors)
            .finish()
    }
}

fn default_cookie_name() -> String {
    "belegbot_session".to_string()
}

const fn default_rate_limit_rpm() -> u32 {
    60
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            session_secret: None,
            session_cookie_name: default_cookie_name(),
            session_cookie_secure: false,
            rate_limit_enabled: true,
            rate_limit_rpm: default_rate_limit_rpm(),
            expose_internal_errors: true,
        }
    }
}
