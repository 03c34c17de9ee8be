//! Twilio Verify adapter
//!
//! Implements the `OtpVerifyPort` over the Twilio Verify/Lookup client.

use application::{error::ApplicationError, ports::OtpVerifyPort};
use async_trait::async_trait;
use domain::{OtpCode, PhoneNumber};
use integration_twilio::{TwilioError, VerifyClient};

/// Lookup API error code for numbers it cannot resolve
const LOOKUP_NOT_FOUND: i64 = 20404;

/// OTP verification port implementation backed by Twilio Verify
#[derive(Debug, Clone)]
pub struct TwilioVerifyAdapter {
    client: VerifyClient,
}

impl TwilioVerifyAdapter {
    /// Create a new verify adapter
    #[must_use]
    pub const fn new(client: VerifyClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OtpVerifyPort for TwilioVerifyAdapter {
    async fn lookup(&self, phone: &PhoneNumber) -> Result<bool, ApplicationError> {
        match self.client.lookup_phone(phone.as_str()).await {
            Ok(lookup) => Ok(lookup.valid),
            // Unresolvable numbers come back as a lookup 404, not a payload
            Err(TwilioError::Api { code, .. }) if code == LOOKUP_NOT_FOUND || code == 404 => {
                Ok(false)
            },
            Err(e) => Err(ApplicationError::ExternalService(e.to_string())),
        }
    }

    async fn start_verification(&self, phone: &PhoneNumber) -> Result<(), ApplicationError> {
        self.client
            .start_verification(phone.as_str())
            .await
            .map_err(|e| ApplicationError::ExternalService(e.to_string()))?;
        Ok(())
    }

    async fn check_verification(
        &self,
        phone: &PhoneNumber,
        code: &OtpCode,
    ) -> Result<bool, ApplicationError> {
        let outcome = self
            .client
            .check_verification(phone.as_str(), code.as_str())
            .await
            .map_err(|e| ApplicationError::ExternalService(e.to_string()))?;
        Ok(outcome.is_approved())
    }
}
