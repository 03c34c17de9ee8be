//! OTP verification port
//!
//! Phone ownership is proven through a hosted verification service; codes
//! are never generated or checked locally.

use async_trait::async_trait;
use domain::{OtpCode, PhoneNumber};

use crate::error::ApplicationError;

/// Port for phone verification operations
#[async_trait]
pub trait OtpVerifyPort: Send + Sync {
    /// Check whether the provider considers the number deliverable
    async fn lookup(&self, phone: &PhoneNumber) -> Result<bool, ApplicationError>;

    /// Send an OTP to the number via SMS
    async fn start_verification(&self, phone: &PhoneNumber) -> Result<(), ApplicationError>;

    /// Check a user-entered OTP; returns whether it was approved
    async fn check_verification(
        &self,
        phone: &PhoneNumber,
        code: &OtpCode,
    ) -> Result<bool, ApplicationError>;
}
