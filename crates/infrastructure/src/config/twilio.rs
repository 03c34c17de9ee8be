//! Twilio configuration: messaging, verification, webhook validation.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::default_true;

/// Twilio integration configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct TwilioConfig {
    /// Account SID
    #[serde(default)]
    pub account_sid: Option<String>,

    /// Auth token (sensitive - uses SecretString)
    #[serde(default, skip_serializing)]
    pub auth_token: Option<SecretString>,

    /// Sender number for WhatsApp messages (E.164)
    #[serde(default)]
    pub whatsapp_number: Option<String>,

    /// Verify service SID for OTP delivery
    #[serde(default)]
    pub verify_service_sid: Option<String>,

    /// Whether webhook signature validation is required (default: true)
    #[serde(default = "default_true")]
    pub signature_required: bool,

    /// Public URL of the webhook endpoint, used for signature validation
    ///
    /// Behind a reverse proxy the original request URL cannot be
    /// reconstructed reliably, so it is configured explicitly.
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// REST API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Verify API base URL
    #[serde(default = "default_verify_base_url")]
    pub verify_base_url: String,

    /// Lookup API base URL
    #[serde(default = "default_lookup_base_url")]
    pub lookup_base_url: String,
}

impl std::fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field(
                "auth_token",
                &if self.auth_token.is_some() {
                    Some("[REDACTED]")
                } else {
                    None
                },
            )
            .field("whatsapp_number", &self.whatsapp_number)
            .field("verify_service_sid", &self.verify_service_sid)
            .field("signature_required", &self.signature_required)
            .field("webhook_url", &self.webhook_url)
            .field("api_base_url", &self.api_base_url)
            .field("verify_base_url", &self.verify_base_url)
            .field("lookup_base_url", &self.lookup_base_url)
            .finish()
    }
}

fn default_api_base_url() -> String {
    "https://api.twilio.com".to_string()
}

fn default_verify_base_url() -> String {
    "https://verify.twilio.com".to_string()
}

fn default_lookup_base_url() -> String {
    "https://lookups.twilio.com".to_string()
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            whatsapp_number: None,
            verify_service_sid: None,
            signature_required: true,
            webhook_url: None,
            api_base_url: default_api_base_url(),
            verify_base_url: default_verify_base_url(),
            lookup_base_url: default_lookup_base_url(),
        }
    }
}

impl TwilioConfig {
    /// Get the auth token as a string reference
    #[must_use]
    pub fn auth_token_str(&self) -> Option<&str> {
        self.auth_token.as_ref().map(ExposeSecret::expose_secret)
    }
}
