//! Twilio Verify and Lookup client
//!
//! Phone number validation (Lookup v2) and OTP delivery/checking (Verify v2).
//! Codes are generated and checked entirely by the provider.

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::client::TwilioError;

/// Verify client configuration
#[derive(Debug, Clone)]
pub struct VerifyClientConfig {
    /// Account SID
    pub account_sid: String,
    /// Auth token
    pub auth_token: String,
    /// Verify service SID
    pub service_sid: String,
    /// Verify API base URL (default: https://verify.twilio.com)
    pub base_url: String,
    /// Lookup API base URL (default: https://lookups.twilio.com)
    pub lookup_base_url: String,
}

impl Default for VerifyClientConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            service_sid: String::new(),
            base_url: "https://verify.twilio.com".to_string(),
            lookup_base_url: "https://lookups.twilio.com".to_string(),
        }
    }
}

/// Result of a phone number lookup
#[derive(Debug, Clone, Deserialize)]
pub struct PhoneLookup {
    /// Whether the provider considers the number valid
    #[serde(default)]
    pub valid: bool,
    /// Normalized E.164 number
    #[serde(default)]
    pub phone_number: String,
}

/// Outcome of a verification start or check
#[derive(Debug, Clone, Deserialize)]
pub struct VerificationOutcome {
    /// Provider status: pending, approved, canceled
    pub status: String,
}

impl VerificationOutcome {
    /// Whether the check was approved
    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.status == "approved"
    }
}

/// API error response body
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Twilio Verify/Lookup REST client
#[derive(Debug, Clone)]
pub struct VerifyClient {
    client: Client,
    config: VerifyClientConfig,
}

impl VerifyClient {
    /// Create a new Verify client
    pub fn new(config: VerifyClientConfig) -> Result<Self, TwilioError> {
        if config.account_sid.is_empty() {
            return Err(TwilioError::Configuration(
                "account_sid is required".to_string(),
            ));
        }
        if config.auth_token.is_empty() {
            return Err(TwilioError::Configuration(
                "auth_token is required".to_string(),
            ));
        }
        if config.service_sid.is_empty() {
            return Err(TwilioError::Configuration(
                "service_sid is required".to_string(),
            ));
        }

        Ok(Self {
            client: Client::new(),
            config,
        })
    }

    /// Look up a phone number and report whether the provider considers it valid
    #[instrument(skip(self), fields(phone = %phone))]
    pub async fn lookup_phone(&self, phone: &str) -> Result<PhoneLookup, TwilioError> {
        let url = format!(
            "{}/v2/PhoneNumbers/{}",
            self.config.lookup_base_url, phone
        );

        let response = self
            .client
            .get(url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .send()
            .await?;

        if response.status().is_success() {
            let lookup: PhoneLookup = response.json().await?;
            debug!(valid = lookup.valid, "Phone lookup complete");
            Ok(lookup)
        } else {
            let error: ApiErrorResponse = response.json().await?;
            Err(TwilioError::Api {
                code: error.code,
                message: error.message,
            })
        }
    }

    /// Start an SMS verification for a phone number
    #[instrument(skip(self), fields(phone = %phone))]
    pub async fn start_verification(
        &self,
        phone: &str,
    ) -> Result<VerificationOutcome, TwilioError> {
        let url = format!(
            "{}/v2/Services/{}/Verifications",
            self.config.base_url, self.config.service_sid
        );

        let params = [("To", phone), ("Channel", "sms")];

        let response = self
            .client
            .post(url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&params)
            .send()
            .await?;

        if response.status().is_success() {
            let outcome: VerificationOutcome = response.json().await?;
            debug!(status = %outcome.status, "Verification started");
            Ok(outcome)
        } else {
            let error: ApiErrorResponse = response.json().await?;
            Err(TwilioError::Api {
                code: error.code,
                message: error.message,
            })
        }
    }

    /// Check a verification code entered by the user
    #[instrument(skip(self, code), fields(phone = %phone))]
    pub async fn check_verification(
        &self,
        phone: &str,
        code: &str,
    ) -> Result<VerificationOutcome, TwilioError> {
        let url = format!(
            "{}/v2/Services/{}/VerificationCheck",
            self.config.base_url, self.config.service_sid
        );

        let params = [("To", phone), ("Code", code)];

        let response = self
            .client
            .post(url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&params)
            .send()
            .await?;

        if response.status().is_success() {
            let outcome: VerificationOutcome = response.json().await?;
            debug!(status = %outcome.status, "Verification checked");
            Ok(outcome)
        } else {
            let error: ApiErrorResponse = response.json().await?;
            Err(TwilioError::Api {
                code: error.code,
                message: error.message,
            })
        }
    }
}
