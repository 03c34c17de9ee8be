//! Port definitions
//!
//! Interfaces implemented by infrastructure adapters.

mod database_health_port;
mod inference_port;
mod media_store;
mod messenger_port;
mod otp_verify_port;
mod receipt_store;
mod session_store;
mod user_store;

pub use database_health_port::DatabaseHealthPort;
pub use inference_port::{
    AgentCompletion, AgentTurn, ExtractedReceipt, InferencePort, ReceiptSource, ToolInvocation,
    ToolOutcome, ToolSpec,
};
pub use media_store::MediaStore;
pub use messenger_port::{FetchedMedia, MessengerPort};
pub use otp_verify_port::OtpVerifyPort;
pub use receipt_store::{DateRange, DateSpend, ReceiptStats, ReceiptStore, VendorSpend};
pub use session_store::{PendingVerification, Session, SessionStore};
pub use user_store::UserStore;
