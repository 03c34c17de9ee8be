//! Phone number value object with E.164 validation

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// A validated phone number in E.164 format (e.g., +491234567890)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber {
    value: String,
}

impl PhoneNumber {
    /// Create a new phone number, validating E.164 format
    ///
    /// E.164 format: +[country code][subscriber number]
    /// - Starts with +
    /// - Contains only digits after +
    /// - Length: 7-15 digits (including country code)
    pub fn new(number: impl Into<String>) -> Result<Self, DomainError> {
        let value = number.into().trim().replace([' ', '-', '(', ')'], "");

        if !value.starts_with('+') {
            return Err(DomainError::InvalidPhoneNumber(
                "Phone number must start with +".to_string(),
            ));
        }

        let digits = &value[1..];
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(DomainError::InvalidPhoneNumber(
                "Phone number must contain only digits after +".to_string(),
            ));
        }

        if digits.len() < 7 || digits.len() > 15 {
            return Err(DomainError::InvalidPhoneNumber(
                "Phone number must have 7-15 digits".to_string(),
            ));
        }

        Ok(Self { value })
    }

    /// Get the phone number as a string slice (E.164 format)
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Get digits only (without +)
    pub fn digits(&self) -> &str {
        &self.value[1..]
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for PhoneNumber {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_e164_number_is_accepted() {
        let phone = PhoneNumber::new("+491234567890").unwrap();
        assert_eq!(phone.as_str(), "+491234567890");
    }

    #[test]
    fn number_with_spaces_is_normalized() {
        let phone = PhoneNumber::new("+49 123 456 7890").unwrap();
        assert_eq!(phone.as_str(), "+491234567890");
    }

    #[test]
    fn number_without_plus_is_rejected() {
        assert!(PhoneNumber::new("491234567890").is_err());
    }

    #[test]
    fn number_with_letters_is_rejected() {
        assert!(PhoneNumber::new("+49123abc").is_err());
    }

    #[test]
    fn too_short_number_is_rejected() {
        assert!(PhoneNumber::new("+12345").is_err());
    }

    #[test]
    fn too_long_number_is_rejected() {
        assert!(PhoneNumber::new("+12345678901234567890").is_err());
    }

    #[test]
    fn digits_returns_without_plus() {
        let phone = PhoneNumber::new("+491234567890").unwrap();
        assert_eq!(phone.digits(), "491234567890");
    }

    #[test]
    fn display_format() {
        let phone = PhoneNumber::new("+491234567890").unwrap();
        assert_eq!(phone.to_string(), "+491234567890");
    }

    #[test]
    fn try_from_str() {
        let phone: PhoneNumber = "+491234567890".try_into().unwrap();
        assert_eq!(phone.as_str(), "+491234567890");
    }

    #[test]
    fn number_with_dashes_and_parens_normalized() {
        let phone = PhoneNumber::new("+49-(123)-456-7890").unwrap();
        assert_eq!(phone.as_str(), "+491234567890");
    }

    #[test]
    fn serialization() {
        let phone = PhoneNumber::new("+491234567890").unwrap();
        let json = serde_json::to_string(&phone).unwrap();
        let parsed: PhoneNumber = serde_json::from_str(&json).unwrap();
        assert_eq!(phone, parsed);
    }
}
