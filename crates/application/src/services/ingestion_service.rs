//! Receipt ingestion pipeline
//!
//! Background processing of a media webhook: download the attachment, run
//! the extraction agent, validate the fields, persist the media file and the
//! receipt row, and reply to the user. Every failure path still produces a
//! user-facing reply.

use std::fmt;
use std::sync::Arc;

use domain::{MediaRef, Receipt, User};
use tracing::{info, instrument, warn};

use crate::error::ApplicationError;
use crate::ports::{InferencePort, MediaStore, MessengerPort, ReceiptSource, ReceiptStore};
use crate::receipt_fields::{format_receipt_date, validate_extracted};

/// Reply sent when any pipeline step fails
pub const EXTRACTION_FAILED_REPLY: &str =
    "Error processing receipt data. Please try again with a clear image or PDF.";

/// Service running the receipt ingestion pipeline
pub struct IngestionService {
    messenger: Arc<dyn MessengerPort>,
    inference: Arc<dyn InferencePort>,
    receipts: Arc<dyn ReceiptStore>,
    media: Arc<dyn MediaStore>,
}

impl fmt::Debug for IngestionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionService").finish_non_exhaustive()
    }
}

impl IngestionService {
    /// Create a new ingestion service
    pub fn new(
        messenger: Arc<dyn MessengerPort>,
        inference: Arc<dyn InferencePort>,
        receipts: Arc<dyn ReceiptStore>,
        media: Arc<dyn MediaStore>,
    ) -> Self {
        Self {
            messenger,
            inference,
            receipts,
            media,
        }
    }

    /// Run the full pipeline for one media attachment and reply to the user
    #[instrument(skip(self, user), fields(user_id = %user.id(), mime_type = %mime_type))]
    pub async fn ingest_media(
        &self,
        user: &User,
        media_url: &str,
        mime_type: &str,
    ) -> Result<Receipt, ApplicationError> {
        match self.process(user, media_url, mime_type).await {
            Ok(receipt) => {
                info!(receipt_id = %receipt.id(), "Receipt ingested");
                let reply = confirmation_message(&receipt);
                if let Err(e) = self.messenger.send_text(user.phone_number(), &reply).await {
                    warn!(error = %e, "Failed to send confirmation reply");
                }
                Ok(receipt)
            },
            Err(e) => {
                warn!(error = %e, "Receipt ingestion failed");
                if let Err(send_err) = self
                    .messenger
                    .send_text(user.phone_number(), EXTRACTION_FAILED_REPLY)
                    .await
                {
                    warn!(error = %send_err, "Failed to send error reply");
                }
                Err(e)
            },
        }
    }

    async fn process(
        &self,
        user: &User,
        media_url: &str,
        mime_type: &str,
    ) -> Result<Receipt, ApplicationError> {
        let fetched = self.messenger.fetch_media(media_url).await?;
        let mime = if mime_type.is_empty() {
            fetched.mime_type.clone()
        } else {
            mime_type.to_string()
        };

        let source = receipt_source(&mime, &fetched.data)?;
        let extracted = self.inference.extract_receipt(source).await?;
        let validated = validate_extracted(&extracted)?;

        let filename = media_filename(media_url, &mime);
        let stored = self.media.save(&filename, &fetched.data).await?;

        let receipt = Receipt::new(user.id(), validated.date, validated.vendor, validated.amount)
            .with_media(MediaRef {
                filename: stored,
                mime_type: mime,
            });
        self.receipts.save(&receipt).await?;

        Ok(receipt)
    }
}

/// Build the extraction source for a MIME type
fn receipt_source(mime_type: &str, data: &[u8]) -> Result<ReceiptSource, ApplicationError> {
    if mime_type.starts_with("image/") || mime_type == "application/pdf" {
        Ok(ReceiptSource::Media {
            mime_type: mime_type.to_string(),
            data: data.to_vec(),
        })
    } else if mime_type.starts_with("text/") {
        Ok(ReceiptSource::Text(
            String::from_utf8_lossy(data).into_owned(),
        ))
    } else {
        Err(domain::DomainError::ValidationError(format!(
            "Unsupported file type: {mime_type}"
        ))
        .into())
    }
}

/// Derive a storage filename from the media URL and MIME type
fn media_filename(media_url: &str, mime_type: &str) -> String {
    let path = media_url.split(['?', '#']).next().unwrap_or(media_url);
    let sid: String = path
        .rsplit('/')
        .next()
        .unwrap_or("media")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    let sid = if sid.is_empty() { "media".to_string() } else { sid };

    format!("{sid}{}", extension_for_mime(mime_type))
}

/// File extension for a MIME type
fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "image/webp" => ".webp",
        "image/gif" => ".gif",
        "application/pdf" => ".pdf",
        "text/plain" => ".txt",
        _ => ".bin",
    }
}

/// User-facing confirmation for a processed receipt
fn confirmation_message(receipt: &Receipt) -> String {
    let date = receipt
        .date()
        .map_or_else(|| "-".to_string(), format_receipt_date);
    format!(
        "Your receipt was processed!\nReceipt Details:\nDate: {date}\nVendor: {vendor}\nTotal Amount: ${amount}",
        vendor = receipt.vendor(),
        amount = receipt.amount()
    )
}

#[cfg(test)]
mod tests {
    use mockall::mock;

    use super::*;
    use crate::ports::{
        AgentCompletion, AgentTurn, DateRange, DateSpend, ExtractedReceipt, FetchedMedia,
        ReceiptStats, ToolSpec, VendorSpend,
    };
    use domain::{Amount, PhoneNumber, UserId};

    mock! {
        pub Messenger {}

        #[async_trait::async_trait]
        impl MessengerPort for Messenger {
            async fn send_text(&self, to: &PhoneNumber, body: &str) -> Result<(), ApplicationError>;
            async fn fetch_media(&self, url: &str) -> Result<FetchedMedia, ApplicationError>;
            async fn is_healthy(&self) -> bool;
        }
    }

    mock! {
        pub Inference {}

        #[async_trait::async_trait]
        impl InferencePort for Inference {
            async fn extract_receipt(&self, source: ReceiptSource) -> Result<ExtractedReceipt, ApplicationError>;
            async fn complete_agent(&self, system: &str, turns: &[AgentTurn], tools: &[ToolSpec]) -> Result<AgentCompletion, ApplicationError>;
            async fn is_healthy(&self) -> bool;
        }
    }

    mock! {
        pub Receipts {}

        #[async_trait::async_trait]
        impl ReceiptStore for Receipts {
            async fn save(&self, receipt: &Receipt) -> Result<(), ApplicationError>;
            #[mockall::concretize]
            async fn list_for_user(&self, user_id: &UserId, vendor_filter: Option<&str>, limit: Option<u32>) -> Result<Vec<Receipt>, ApplicationError>;
            async fn stats_for_user(&self, user_id: &UserId, range: DateRange) -> Result<ReceiptStats, ApplicationError>;
            async fn spend_by_vendor(&self, user_id: &UserId, top_n: Option<u32>) -> Result<Vec<VendorSpend>, ApplicationError>;
            async fn spend_by_date(&self, user_id: &UserId) -> Result<Vec<DateSpend>, ApplicationError>;
        }
    }

    mock! {
        pub Media {}

        #[async_trait::async_trait]
        impl MediaStore for Media {
            async fn save(&self, filename: &str, data: &[u8]) -> Result<String, ApplicationError>;
            async fn load(&self, filename: &str) -> Result<Option<Vec<u8>>, ApplicationError>;
            async fn delete(&self, filename: &str) -> Result<bool, ApplicationError>;
        }
    }

    fn user() -> User {
        User::new(PhoneNumber::new("+491234567890").unwrap())
    }

    fn extracted_ok() -> ExtractedReceipt {
        ExtractedReceipt {
            date: Some("14-03-2025".to_string()),
            vendor: Some("REWE".to_string()),
            total_amount: Some(serde_json::json!(23.45)),
        }
    }

    fn jpeg_media() -> FetchedMedia {
        FetchedMedia {
            data: vec![0xFF, 0xD8, 0xFF],
            mime_type: "image/jpeg".to_string(),
        }
    }

    #[tokio::test]
    async fn successful_pipeline_persists_and_confirms() {
        let mut messenger = MockMessenger::new();
        messenger
            .expect_fetch_media()
            .returning(|_| Ok(jpeg_media()));
        messenger
            .expect_send_text()
            .withf(|_, body| body.contains("Your receipt was processed!"))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut inference = MockInference::new();
        inference
            .expect_extract_receipt()
            .returning(|_| Ok(extracted_ok()));

        let mut receipts = MockReceipts::new();
        receipts.expect_save().times(1).returning(|_| Ok(()));

        let mut media = MockMedia::new();
        media
            .expect_save()
            .withf(|filename, _| filename == "ME123.jpg")
            .returning(|filename, _| Ok(filename.to_string()));

        let service = IngestionService::new(
            Arc::new(messenger),
            Arc::new(inference),
            Arc::new(receipts),
            Arc::new(media),
        );

        let receipt = service
            .ingest_media(
                &user(),
                "https://api.twilio.com/media/ME123",
                "image/jpeg",
            )
            .await
            .unwrap();

        assert_eq!(receipt.vendor(), "REWE");
        assert_eq!(receipt.amount().to_string(), "23.45");
        assert_eq!(receipt.media().unwrap().filename, "ME123.jpg");
    }

    #[tokio::test]
    async fn failed_extraction_sends_error_reply() {
        let mut messenger = MockMessenger::new();
        messenger
            .expect_fetch_media()
            .returning(|_| Ok(jpeg_media()));
        messenger
            .expect_send_text()
            .withf(|_, body| body == EXTRACTION_FAILED_REPLY)
            .times(1)
            .returning(|_, _| Ok(()));

        let mut inference = MockInference::new();
        inference
            .expect_extract_receipt()
            .returning(|_| Err(ApplicationError::Inference("no candidates".to_string())));

        let mut receipts = MockReceipts::new();
        receipts.expect_save().never();

        let service = IngestionService::new(
            Arc::new(messenger),
            Arc::new(inference),
            Arc::new(receipts),
            Arc::new(MockMedia::new()),
        );

        let result = service
            .ingest_media(&user(), "https://api.twilio.com/media/ME1", "image/jpeg")
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn invalid_fields_send_error_reply_and_skip_persistence() {
        let mut messenger = MockMessenger::new();
        messenger
            .expect_fetch_media()
            .returning(|_| Ok(jpeg_media()));
        messenger
            .expect_send_text()
            .withf(|_, body| body == EXTRACTION_FAILED_REPLY)
            .times(1)
            .returning(|_, _| Ok(()));

        let mut inference = MockInference::new();
        inference.expect_extract_receipt().returning(|_| {
            Ok(ExtractedReceipt {
                date: Some("not-a-date".to_string()),
                vendor: None,
                total_amount: Some(serde_json::json!(1.0)),
            })
        });

        let mut receipts = MockReceipts::new();
        receipts.expect_save().never();

        let mut media = MockMedia::new();
        media.expect_save().never();

        let service = IngestionService::new(
            Arc::new(messenger),
            Arc::new(inference),
            Arc::new(receipts),
            Arc::new(media),
        );

        let result = service
            .ingest_media(&user(), "https://api.twilio.com/media/ME1", "image/jpeg")
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn download_failure_sends_error_reply() {
        let mut messenger = MockMessenger::new();
        messenger
            .expect_fetch_media()
            .returning(|_| Err(ApplicationError::ExternalService("download failed".to_string())));
        messenger
            .expect_send_text()
            .withf(|_, body| body == EXTRACTION_FAILED_REPLY)
            .times(1)
            .returning(|_, _| Ok(()));

        let service = IngestionService::new(
            Arc::new(messenger),
            Arc::new(MockInference::new()),
            Arc::new(MockReceipts::new()),
            Arc::new(MockMedia::new()),
        );

        let result = service
            .ingest_media(&user(), "https://api.twilio.com/media/ME1", "image/jpeg")
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn text_media_is_inlined_into_prompt() {
        let mut messenger = MockMessenger::new();
        messenger.expect_fetch_media().returning(|_| {
            Ok(FetchedMedia {
                data: b"REWE total 12.00".to_vec(),
                mime_type: "text/plain".to_string(),
            })
        });
        messenger.expect_send_text().returning(|_, _| Ok(()));

        let mut inference = MockInference::new();
        inference
            .expect_extract_receipt()
            .withf(|source| matches!(source, ReceiptSource::Text(text) if text.contains("REWE")))
            .returning(|_| Ok(extracted_ok()));

        let mut receipts = MockReceipts::new();
        receipts.expect_save().returning(|_| Ok(()));

        let mut media = MockMedia::new();
        media
            .expect_save()
            .returning(|filename, _| Ok(filename.to_string()));

        let service = IngestionService::new(
            Arc::new(messenger),
            Arc::new(inference),
            Arc::new(receipts),
            Arc::new(media),
        );

        service
            .ingest_media(&user(), "https://api.twilio.com/media/ME9", "text/plain")
            .await
            .unwrap();
    }

    #[test]
    fn unsupported_mime_is_rejected() {
        let result = receipt_source("video/mp4", &[0]);
        assert!(result.is_err());
    }

    #[test]
    fn media_filename_uses_sid_and_extension() {
        assert_eq!(
            media_filename("https://api.twilio.com/2010-04-01/media/ME42", "image/png"),
            "ME42.png"
        );
        assert_eq!(
            media_filename("https://api.twilio.com/media/ME42?x=1", "application/pdf"),
            "ME42.pdf"
        );
    }

    #[test]
    fn media_filename_sanitizes_segments() {
        let filename = media_filename("https://host/..%2F..%2Fetc", "image/jpeg");
        assert!(!filename.contains('/'));
        assert!(!filename.contains('%'));
        assert!(filename.ends_with(".jpg"));
    }

    #[test]
    fn media_filename_falls_back_for_empty_path() {
        assert_eq!(media_filename("https://host/", "image/jpeg"), "media.jpg");
    }

    #[test]
    fn unknown_mime_gets_bin_extension() {
        assert_eq!(extension_for_mime("application/zip"), ".bin");
    }

    #[test]
    fn confirmation_includes_all_fields() {
        let receipt = Receipt::new(
            UserId::new(),
            chrono::NaiveDate::from_ymd_opt(2025, 3, 14),
            "REWE",
            Amount::parse("23.45").unwrap(),
        );
        let message = confirmation_message(&receipt);
        assert!(message.contains("Date: 14-03-2025"));
        assert!(message.contains("Vendor: REWE"));
        assert!(message.contains("Total Amount: $23.45"));
    }

    #[test]
    fn confirmation_shows_dash_for_missing_date() {
        let receipt = Receipt::new(UserId::new(), None, "REWE", Amount::ZERO);
        let message = confirmation_message(&receipt);
        assert!(message.contains("Date: -"));
    }
}
