//! Twilio webhook payload and signature validation
//!
//! Inbound WhatsApp messages arrive as form-encoded POSTs. Authenticity is
//! established through the X-Twilio-Signature header: HMAC-SHA1 over the
//! request URL concatenated with the sorted form parameters, base64-encoded.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha1::Sha1;
use subtle::ConstantTimeEq;
use tracing::warn;

type HmacSha1 = Hmac<Sha1>;

/// Inbound message webhook form
///
/// Twilio delivers every field as a string; `NumMedia` is "0" for plain text
/// messages.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookForm {
    /// Message SID
    #[serde(rename = "MessageSid", default)]
    pub message_sid: String,
    /// Message text
    #[serde(rename = "Body", default)]
    pub body: String,
    /// Sender, prefixed with the channel (e.g. "whatsapp:+491234567890")
    #[serde(rename = "From", default)]
    pub from: String,
    /// Receiving number
    #[serde(rename = "To", default)]
    pub to: String,
    /// Number of media attachments
    #[serde(rename = "NumMedia", default)]
    pub num_media: String,
    /// URL of the first media attachment
    #[serde(rename = "MediaUrl0", default)]
    pub media_url: Option<String>,
    /// MIME type of the first media attachment
    #[serde(rename = "MediaContentType0", default)]
    pub media_content_type: Option<String>,
}

impl WebhookForm {
    /// Extract the sender phone number without the channel prefix
    #[must_use]
    pub fn sender_phone(&self) -> Option<&str> {
        let phone = self
            .from
            .split_once(':')
            .map_or(self.from.as_str(), |(_, rest)| rest);
        if phone.is_empty() { None } else { Some(phone) }
    }

    /// Get the first media attachment, if any
    #[must_use]
    pub fn media(&self) -> Option<(&str, &str)> {
        let url = self.media_url.as_deref()?;
        if url.is_empty() {
            return None;
        }
        let mime = self
            .media_content_type
            .as_deref()
            .unwrap_or("application/octet-stream");
        Some((url, mime))
    }
}

/// Validate a webhook signature
///
/// `url` must be the full public URL the provider posted to; `params` the
/// decoded form parameters.
#[must_use]
pub fn validate_signature(
    auth_token: &str,
    url: &str,
    params: &[(String, String)],
    signature: &str,
) -> bool {
    let Ok(mut mac) = HmacSha1::new_from_slice(auth_token.as_bytes()) else {
        warn!("Failed to create HMAC for signature validation");
        return false;
    };

    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    mac.update(url.as_bytes());
    for (key, value) in sorted {
        mac.update(key.as_bytes());
        mac.update(value.as_bytes());
    }

    let expected = BASE64.encode(mac.finalize().into_bytes());
    expected.as_bytes().ct_eq(signature.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(auth_token: &str, url: &str, params: &[(String, String)]) -> String {
        let mut mac = HmacSha1::new_from_slice(auth_token.as_bytes()).unwrap();
        let mut sorted: Vec<&(String, String)> = params.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        mac.update(url.as_bytes());
        for (key, value) in sorted {
            mac.update(key.as_bytes());
            mac.update(value.as_bytes());
        }
        BASE64.encode(mac.finalize().into_bytes())
    }

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn valid_signature_is_accepted() {
        let url = "https://example.com/webhook/whatsapp";
        let params = params(&[
            ("Body", "hello"),
            ("From", "whatsapp:+491234567890"),
            ("MessageSid", "SM123"),
        ]);
        let signature = sign("token", url, &params);
        assert!(validate_signature("token", url, &params, &signature));
    }

    #[test]
    fn wrong_token_is_rejected() {
        let url = "https://example.com/webhook/whatsapp";
        let params = params(&[("Body", "hello")]);
        let signature = sign("token", url, &params);
        assert!(!validate_signature("other", url, &params, &signature));
    }

    #[test]
    fn tampered_params_are_rejected() {
        let url = "https://example.com/webhook/whatsapp";
        let original = params(&[("Body", "hello")]);
        let signature = sign("token", url, &original);
        let tampered = params(&[("Body", "goodbye")]);
        assert!(!validate_signature("token", url, &tampered, &signature));
    }

    #[test]
    fn param_order_does_not_matter() {
        let url = "https://example.com/webhook/whatsapp";
        let a = params(&[("B", "2"), ("A", "1")]);
        let b = params(&[("A", "1"), ("B", "2")]);
        let signature = sign("token", url, &a);
        assert!(validate_signature("token", url, &b, &signature));
    }

    #[test]
    fn garbage_signature_is_rejected() {
        let url = "https://example.com/webhook/whatsapp";
        let params = params(&[("Body", "hello")]);
        assert!(!validate_signature("token", url, &params, "not-base64!"));
    }

    #[test]
    fn sender_phone_strips_channel_prefix() {
        let form = WebhookForm {
            from: "whatsapp:+491234567890".to_string(),
            ..Default::default()
        };
        assert_eq!(form.sender_phone(), Some("+491234567890"));
    }

    #[test]
    fn sender_phone_without_prefix() {
        let form = WebhookForm {
            from: "+491234567890".to_string(),
            ..Default::default()
        };
        assert_eq!(form.sender_phone(), Some("+491234567890"));
    }

    #[test]
    fn empty_sender_is_none() {
        let form = WebhookForm::default();
        assert!(form.sender_phone().is_none());
    }

    #[test]
    fn media_requires_url() {
        let form = WebhookForm::default();
        assert!(form.media().is_none());

        let form = WebhookForm {
            media_url: Some(String::new()),
            ..Default::default()
        };
        assert!(form.media().is_none());
    }

    #[test]
    fn media_defaults_mime_type() {
        let form = WebhookForm {
            media_url: Some("https://api.twilio.com/media/ME123".to_string()),
            ..Default::default()
        };
        let (url, mime) = form.media().unwrap();
        assert_eq!(url, "https://api.twilio.com/media/ME123");
        assert_eq!(mime, "application/octet-stream");
    }

    #[test]
    fn media_with_content_type() {
        let form = WebhookForm {
            media_url: Some("https://api.twilio.com/media/ME123".to_string()),
            media_content_type: Some("image/jpeg".to_string()),
            ..Default::default()
        };
        assert_eq!(form.media(), Some(("https://api.twilio.com/media/ME123", "image/jpeg")));
    }

    #[test]
    fn form_deserializes_from_urlencoded_names() {
        let json = serde_json::json!({
            "MessageSid": "SM1",
            "Body": "hi",
            "From": "whatsapp:+49123456789",
            "To": "whatsapp:+14155238886",
            "NumMedia": "1",
            "MediaUrl0": "https://api.twilio.com/media/ME1",
            "MediaContentType0": "application/pdf"
        });
        let form: WebhookForm = serde_json::from_value(json).unwrap();
        assert_eq!(form.message_sid, "SM1");
        assert_eq!(form.num_media, "1");
        assert_eq!(form.media().unwrap().1, "application/pdf");
    }
}
