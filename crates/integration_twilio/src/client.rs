//! Twilio client for sending WhatsApp messages and fetching media
//!
//! Uses the Twilio Messages REST API with HTTP basic authentication.

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

/// Twilio API errors
#[derive(Debug, Error)]
pub enum TwilioError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error: {code} - {message}")]
    Api { code: i64, message: String },

    #[error("Missing configuration: {0}")]
    Configuration(String),

    #[error("Invalid phone number: {0}")]
    InvalidPhoneNumber(String),

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Media too large: {size} bytes (limit {limit})")]
    MediaTooLarge { size: usize, limit: usize },
}

/// Twilio client configuration
#[derive(Debug, Clone)]
pub struct TwilioClientConfig {
    /// Account SID
    pub account_sid: String,
    /// Auth token
    pub auth_token: String,
    /// Sender number for WhatsApp messages (E.164, without the whatsapp: prefix)
    pub whatsapp_number: String,
    /// API base URL (default: https://api.twilio.com)
    pub base_url: String,
    /// Maximum accepted media download size in bytes
    pub max_media_bytes: usize,
}

impl Default for TwilioClientConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            whatsapp_number: String::new(),
            base_url: "https://api.twilio.com".to_string(),
            max_media_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Twilio REST client
#[derive(Debug, Clone)]
pub struct TwilioClient {
    client: Client,
    config: TwilioClientConfig,
}

/// Response for a sent message
#[derive(Debug, Deserialize)]
pub struct MessageResponse {
    /// Message SID
    pub sid: String,
    /// Delivery status as reported on creation (queued, sent, ...)
    pub status: String,
}

/// A downloaded media attachment
#[derive(Debug, Clone)]
pub struct DownloadedMedia {
    /// Raw bytes
    pub data: Vec<u8>,
    /// MIME type from the Content-Type header
    pub mime_type: String,
}

/// API error response body
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

impl TwilioClient {
    /// Create a new Twilio client
    pub fn new(config: TwilioClientConfig) -> Result<Self, TwilioError> {
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
        if config.whatsapp_number.is_empty() {
            return Err(TwilioError::Configuration(
                "whatsapp_number is required".to_string(),
            ));
        }

        Ok(Self {
            client: Client::new(),
            config,
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.base_url, self.config.account_sid
        )
    }

    /// Send a WhatsApp text message
    #[instrument(skip(self, body), fields(to = %to, body_len = body.len()))]
    pub async fn send_whatsapp(
        &self,
        to: &str,
        body: &str,
    ) -> Result<MessageResponse, TwilioError> {
        if !to.starts_with('+') || to.len() < 8 {
            return Err(TwilioError::InvalidPhoneNumber(to.to_string()));
        }

        let params = [
            ("From", format!("whatsapp:{}", self.config.whatsapp_number)),
            ("To", format!("whatsapp:{to}")),
            ("Body", body.to_string()),
        ];

        debug!("Sending WhatsApp message");

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&params)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let error: ApiErrorResponse = response.json().await?;
            Err(TwilioError::Api {
                code: error.code,
                message: error.message,
            })
        }
    }

    /// Download a media attachment delivered in a webhook
    ///
    /// Media URLs require the same basic authentication as the REST API.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn download_media(&self, url: &str) -> Result<DownloadedMedia, TwilioError> {
        let response = self
            .client
            .get(url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(TwilioError::Api {
                code: i64::from(status.as_u16()),
                message: format!("media download failed with status {status}"),
            });
        }

        if let Some(length) = response.content_length() {
            let length = usize::try_from(length).unwrap_or(usize::MAX);
            if length > self.config.max_media_bytes {
                return Err(TwilioError::MediaTooLarge {
                    size: length,
                    limit: self.config.max_media_bytes,
                });
            }
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        let data = response.bytes().await?.to_vec();
        if data.len() > self.config.max_media_bytes {
            return Err(TwilioError::MediaTooLarge {
                size: data.len(),
                limit: self.config.max_media_bytes,
            });
        }

        debug!(size = data.len(), mime_type = %mime_type, "Downloaded media");

        Ok(DownloadedMedia { data, mime_type })
    }

    /// Check if the Twilio API is reachable with the configured credentials
    #[instrument(skip(self))]
    pub async fn is_available(&self) -> bool {
        self.client
            .get(format!(
                "{}/2010-04-01/Accounts/{}.json",
                self.config.base_url, self.config.account_sid
            ))
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .send()
            .await
            .is_ok_and(|res| res.status().is_success())
    }

    /// Get the auth token (for webhook signature validation)
    #[must_use]
    pub fn auth_token(&self) -> &str {
        &self.config.auth_token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> TwilioClientConfig {
        TwilioClientConfig {
            account_sid: "AC00000000000000000000000000000000".to_string(),
            auth_token: "test_token".to_string(),
            whatsapp_number: "+14155238886".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn client_creation_requires_account_sid() {
        let config = TwilioClientConfig {
            auth_token: "t".to_string(),
            whatsapp_number: "+1".to_string(),
            ..Default::default()
        };
        let result = TwilioClient::new(config);
        assert!(matches!(result, Err(TwilioError::Configuration(_))));
    }

    #[test]
    fn client_creation_requires_auth_token() {
        let config = TwilioClientConfig {
            account_sid: "AC123".to_string(),
            whatsapp_number: "+1".to_string(),
            ..Default::default()
        };
        let result = TwilioClient::new(config);
        assert!(matches!(result, Err(TwilioError::Configuration(_))));
    }

    #[test]
    fn client_creation_requires_sender_number() {
        let config = TwilioClientConfig {
            account_sid: "AC123".to_string(),
            auth_token: "t".to_string(),
            ..Default::default()
        };
        let result = TwilioClient::new(config);
        assert!(matches!(result, Err(TwilioError::Configuration(_))));
    }

    #[test]
    fn client_creation_succeeds_with_valid_config() {
        assert!(TwilioClient::new(test_config()).is_ok());
    }

    #[test]
    fn messages_url_contains_account_sid() {
        let client = TwilioClient::new(test_config()).unwrap();
        assert_eq!(
            client.messages_url(),
            "https://api.twilio.com/2010-04-01/Accounts/AC00000000000000000000000000000000/Messages.json"
        );
    }

    #[tokio::test]
    async fn send_whatsapp_validates_phone_format() {
        let client = TwilioClient::new(test_config()).unwrap();

        let result = client.send_whatsapp("491234567890", "test").await;
        assert!(matches!(result, Err(TwilioError::InvalidPhoneNumber(_))));

        let result = client.send_whatsapp("+123", "test").await;
        assert!(matches!(result, Err(TwilioError::InvalidPhoneNumber(_))));
    }

    #[test]
    fn error_display() {
        let err = TwilioError::Api {
            code: 21211,
            message: "Invalid 'To' number".to_string(),
        };
        assert!(err.to_string().contains("21211"));
        assert!(err.to_string().contains("Invalid 'To' number"));

        let err = TwilioError::MediaTooLarge {
            size: 11,
            limit: 10,
        };
        assert!(err.to_string().contains("11"));
        assert!(err.to_string().contains("10"));
    }

    #[test]
    fn config_default_values() {
        let config = TwilioClientConfig::default();
        assert_eq!(config.base_url, "https://api.twilio.com");
        assert_eq!(config.max_media_bytes, 10 * 1024 * 1024);
    }
}
