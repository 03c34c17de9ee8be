//! Messenger port
//!
//! Outbound message delivery and authenticated media retrieval on the
//! messaging channel.

use async_trait::async_trait;
use domain::PhoneNumber;

use crate::error::ApplicationError;

/// A media attachment fetched from the messaging provider
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    /// Raw bytes
    pub data: Vec<u8>,
    /// MIME type reported by the provider
    pub mime_type: String,
}

/// Port for messaging operations
#[async_trait]
pub trait MessengerPort: Send + Sync {
    /// Send a text message to a user
    async fn send_text(&self, to: &PhoneNumber, body: &str) -> Result<(), ApplicationError>;

    /// Fetch a media attachment delivered in a webhook
    async fn fetch_media(&self, url: &str) -> Result<FetchedMedia, ApplicationError>;

    /// Check if the messaging provider is reachable
    async fn is_healthy(&self) -> bool;
}
