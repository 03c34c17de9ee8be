//! Twilio messenger adapter
//!
//! Implements the `MessengerPort` over the Twilio REST client.

use application::{
    error::ApplicationError,
    ports::{FetchedMedia, MessengerPort},
};
use async_trait::async_trait;
use domain::PhoneNumber;
use integration_twilio::TwilioClient;

/// Messenger port implementation backed by Twilio
#[derive(Debug, Clone)]
pub struct TwilioMessengerAdapter {
    client: TwilioClient,
}

impl TwilioMessengerAdapter {
    /// Create a new messenger adapter
    #[must_use]
    pub const fn new(client: TwilioClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MessengerPort for TwilioMessengerAdapter {
    async fn send_text(&self, to: &PhoneNumber, body: &str) -> Result<(), ApplicationError> {
        self.client
            .send_whatsapp(to.as_str(), body)
            .await
            .map_err(|e| ApplicationError::ExternalService(e.to_string()))?;
        Ok(())
    }

    async fn fetch_media(&self, url: &str) -> Result<FetchedMedia, ApplicationError> {
        let media = self
            .client
            .download_media(url)
            .await
            .map_err(|e| ApplicationError::ExternalService(e.to_string()))?;

        Ok(FetchedMedia {
            data: media.data,
            mime_type: media.mime_type,
        })
    }

    async fn is_healthy(&self) -> bool {
        self.client.is_available().await
    }
}
