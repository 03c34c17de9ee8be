//! Monetary amount value object
//!
//! Fixed-point with two decimal places, stored as integer cents. Amounts are
//! never negative.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// A non-negative monetary amount with cent precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount {
    cents: i64,
}

impl Amount {
    /// Zero amount
    pub const ZERO: Self = Self { cents: 0 };

    /// Create an amount from integer cents
    pub fn from_cents(cents: i64) -> Result<Self, DomainError> {
        if cents < 0 {
            return Err(DomainError::InvalidAmount(
                "Total amount cannot be negative".to_string(),
            ));
        }
        Ok(Self { cents })
    }

    /// Parse an amount from a decimal string such as "12.34" or "12"
    ///
    /// At most two fractional digits are accepted; the extraction wire format
    /// is two-decimal fixed point.
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidAmount("empty amount".to_string()));
        }
        if trimmed.starts_with('-') {
            return Err(DomainError::InvalidAmount(
                "Total amount cannot be negative".to_string(),
            ));
        }

        let (whole, frac) = match trimmed.split_once('.') {
            Some((w, f)) => (w, f),
            None => (trimmed, ""),
        };

        if frac.len() > 2 {
            return Err(DomainError::InvalidAmount(format!(
                "too many decimal places: {trimmed}"
            )));
        }

        let whole_part: i64 = whole
            .parse()
            .map_err(|_| DomainError::InvalidAmount(format!("not a number: {trimmed}")))?;

        let frac_part: i64 = if frac.is_empty() {
            0
        } else {
            let padded = format!("{frac:0<2}");
            padded
                .parse()
                .map_err(|_| DomainError::InvalidAmount(format!("not a number: {trimmed}")))?
        };

        let cents = whole_part
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac_part))
            .ok_or_else(|| DomainError::InvalidAmount(format!("amount overflow: {trimmed}")))?;

        Self::from_cents(cents)
    }

    /// Convert a floating point value (e.g. a JSON number) to an amount,
    /// rounding to the nearest cent
    pub fn from_f64(value: f64) -> Result<Self, DomainError> {
        if !value.is_finite() {
            return Err(DomainError::InvalidAmount(
                "amount is not finite".to_string(),
            ));
        }
        if value < 0.0 {
            return Err(DomainError::InvalidAmount(
                "Total amount cannot be negative".to_string(),
            ));
        }
        #[allow(clippy::cast_possible_truncation)]
        let cents = (value * 100.0).round() as i64;
        Self::from_cents(cents)
    }

    /// Get the raw cent value
    #[must_use]
    pub const fn cents(&self) -> i64 {
        self.cents
    }

    /// Sum two amounts, saturating at the maximum representable value
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self {
            cents: self.cents.saturating_add(other.cents),
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}
