//! Receipt entity

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{Amount, ReceiptId, UserId};

/// Reference to a stored media file (the original receipt image or PDF)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    /// Stored filename, relative to the media root
    pub filename: String,
    /// MIME type as delivered by the messaging provider
    pub mime_type: String,
}

/// A logged receipt
///
/// Date and vendor may be absent when the extraction could not read them;
/// the amount is always present and non-negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    /// Unique receipt identifier
    id: ReceiptId,
    /// Owning user
    user_id: UserId,
    /// Date printed on the receipt
    date: Option<NaiveDate>,
    /// Vendor or store name (may be empty)
    vendor: String,
    /// Total amount
    amount: Amount,
    /// Stored media file, if any
    media: Option<MediaRef>,
    /// When the receipt was logged
    created_at: DateTime<Utc>,
}

impl Receipt {
    /// Create a new receipt
    #[must_use]
    pub fn new(
        user_id: UserId,
        date: Option<NaiveDate>,
        vendor: impl Into<String>,
        amount: Amount,
    ) -> Self {
        Self {
            id: ReceiptId::new(),
            user_id,
            date,
            vendor: vendor.into(),
            amount,
            media: None,
            created_at: Utc::now(),
        }
    }

    /// Attach a stored media reference
    #[must_use]
    pub fn with_media(mut self, media: MediaRef) -> Self {
        self.media = Some(media);
        self
    }

    /// Restore a receipt from storage
    #[must_use]
    pub const fn restore(
        id: ReceiptId,
        user_id: UserId,
        date: Option<NaiveDate>,
        vendor: String,
        amount: Amount,
        media: Option<MediaRef>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            date,
            vendor,
            amount,
            media,
            created_at,
        }
    }

    /// Get the receipt ID
    #[must_use]
    pub const fn id(&self) -> ReceiptId {
        self.id
    }

    /// Get the owning user ID
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Get the receipt date
    #[must_use]
    pub const fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    /// Get the vendor name
    #[must_use]
    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    /// Get the total amount
    #[must_use]
    pub const fn amount(&self) -> Amount {
        self.amount
    }

    /// Get the stored media reference
    #[must_use]
    pub const fn media(&self) -> Option<&MediaRef> {
        self.media.as_ref()
    }

    /// Get the creation timestamp
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
