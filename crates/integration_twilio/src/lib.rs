//! Twilio integration
//!
//! WhatsApp message sending and media download via the Twilio REST API,
//! phone verification via Verify and Lookup, inbound webhook payload types,
//! request signature validation, and TwiML response building.

pub mod client;
pub mod twiml;
pub mod verify;
pub mod webhook;

pub use client::{DownloadedMedia, MessageResponse, TwilioClient, TwilioClientConfig, TwilioError};
pub use twiml::MessagingResponse;
pub use verify::{PhoneLookup, VerificationOutcome, VerifyClient, VerifyClientConfig};
pub use webhook::{WebhookForm, validate_signature};
