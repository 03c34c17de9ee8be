//! One-time passcode value object

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// A one-time passcode as entered by the user
///
/// Verification providers issue 4-10 digit numeric codes. The code itself is
/// never generated or checked locally; it is only forwarded to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OtpCode {
    value: String,
}

impl OtpCode {
    /// Create a new OTP code, validating shape only
    pub fn new(code: impl Into<String>) -> Result<Self, DomainError> {
        let value = code.into().trim().to_string();

        if !value.chars().all(|c| c.is_ascii_digit()) {
            return Err(DomainError::InvalidOtpCode(
                "OTP must contain only digits".to_string(),
            ));
        }

        if value.len() < 4 || value.len() > 10 {
            return Err(DomainError::InvalidOtpCode(
                "OTP must have 4-10 digits".to_string(),
            ));
        }

        Ok(Self { value })
    }

    /// Get the code as a string slice
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}
