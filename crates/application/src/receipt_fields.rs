//! Validation of extracted receipt fields
//!
//! The extraction agent returns loosely-typed JSON. This module turns it
//! into domain values: the date must match the DD-MM-YYYY wire format, the
//! amount must be present and non-negative, the vendor must fit the column.

use chrono::NaiveDate;
use domain::{Amount, DomainError};

use crate::error::ApplicationError;
use crate::ports::ExtractedReceipt;

/// Wire format for receipt dates
pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// Maximum vendor name length
pub const VENDOR_MAX_LEN: usize = 255;

/// Validated receipt fields ready for persistence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedReceiptFields {
    pub date: Option<NaiveDate>,
    pub vendor: String,
    pub amount: Amount,
}

/// Validate raw extraction fields
pub fn validate_extracted(
    fields: &ExtractedReceipt,
) -> Result<ValidatedReceiptFields, ApplicationError> {
    let date = match fields.date.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| {
            DomainError::InvalidDate("Invalid date format. Please use DD-MM-YYYY.".to_string())
        })?),
    };

    let vendor = fields
        .vendor
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_string();
    if vendor.chars().count() > VENDOR_MAX_LEN {
        return Err(DomainError::ValidationError(format!(
            "vendor exceeds {VENDOR_MAX_LEN} characters"
        ))
        .into());
    }

    let amount = match &fields.total_amount {
        None | Some(serde_json::Value::Null) => {
            return Err(DomainError::InvalidAmount("total amount is required".to_string()).into());
        },
        Some(serde_json::Value::Number(n)) => {
            let value = n
                .as_f64()
                .ok_or_else(|| DomainError::InvalidAmount(format!("not a number: {n}")))?;
            Amount::from_f64(value)?
        },
        Some(serde_json::Value::String(s)) => Amount::parse(s)?,
        Some(other) => {
            return Err(
                DomainError::InvalidAmount(format!("unexpected amount value: {other}")).into(),
            );
        },
    };

    Ok(ValidatedReceiptFields {
        date,
        vendor,
        amount,
    })
}

/// Format a receipt date in the wire format
#[must_use]
pub fn format_receipt_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(date: Option<&str>, vendor: Option<&str>, amount: serde_json::Value) -> ExtractedReceipt {
        ExtractedReceipt {
            date: date.map(String::from),
            vendor: vendor.map(String::from),
            total_amount: Some(amount),
        }
    }

    #[test]
    fn valid_fields_pass() {
        let validated = validate_extracted(&fields(
            Some("14-03-2025"),
            Some("REWE"),
            serde_json::json!(23.45),
        ))
        .unwrap();

        assert_eq!(validated.date, NaiveDate::from_ymd_opt(2025, 3, 14));
        assert_eq!(validated.vendor, "REWE");
        assert_eq!(validated.amount.to_string(), "23.45");
    }

    #[test]
    fn string_amount_is_accepted() {
        let validated =
            validate_extracted(&fields(None, None, serde_json::json!("9.99"))).unwrap();
        assert_eq!(validated.amount.cents(), 999);
    }

    #[test]
    fn missing_amount_is_rejected() {
        let raw = ExtractedReceipt {
            date: None,
            vendor: Some("REWE".to_string()),
            total_amount: None,
        };
        assert!(validate_extracted(&raw).is_err());
    }

    #[test]
    fn negative_amount_is_rejected() {
        let result = validate_extracted(&fields(None, None, serde_json::json!(-1.50)));
        assert!(result.is_err());
    }

    #[test]
    fn wrong_date_format_is_rejected() {
        let result = validate_extracted(&fields(
            Some("2025-03-14"),
            None,
            serde_json::json!(1.00),
        ));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("DD-MM-YYYY"));
    }

    #[test]
    fn missing_date_is_allowed() {
        let validated = validate_extracted(&fields(None, None, serde_json::json!(1))).unwrap();
        assert!(validated.date.is_none());
    }

    #[test]
    fn blank_date_is_allowed() {
        let validated =
            validate_extracted(&fields(Some("  "), None, serde_json::json!(1))).unwrap();
        assert!(validated.date.is_none());
    }

    #[test]
    fn missing_vendor_becomes_empty() {
        let validated = validate_extracted(&fields(None, None, serde_json::json!(1))).unwrap();
        assert!(validated.vendor.is_empty());
    }

    #[test]
    fn vendor_is_trimmed() {
        let validated =
            validate_extracted(&fields(None, Some("  REWE  "), serde_json::json!(1))).unwrap();
        assert_eq!(validated.vendor, "REWE");
    }

    #[test]
    fn overlong_vendor_is_rejected() {
        let long_vendor = "x".repeat(VENDOR_MAX_LEN + 1);
        let result = validate_extracted(&fields(
            None,
            Some(&long_vendor),
            serde_json::json!(1),
        ));
        assert!(result.is_err());
    }

    #[test]
    fn non_numeric_amount_is_rejected() {
        let result = validate_extracted(&fields(None, None, serde_json::json!(["12.34"])));
        assert!(result.is_err());
    }

    #[test]
    fn impossible_date_is_rejected() {
        let result = validate_extracted(&fields(
            Some("32-01-2025"),
            None,
            serde_json::json!(1),
        ));
        assert!(result.is_err());
    }

    #[test]
    fn date_formats_back_to_wire_format() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        assert_eq!(format_receipt_date(date), "07-03-2025");
    }
}
