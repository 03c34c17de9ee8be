//! Receipt storage port
//!
//! Row-level persistence plus the aggregate queries used by the dashboard
//! and the query agent tools.

use async_trait::async_trait;
use chrono::NaiveDate;
use domain::{Amount, Receipt, UserId};
use serde::Serialize;

use crate::error::ApplicationError;

/// Optional date-range filter for aggregate queries
#[derive(Debug, Clone, Copy, Default)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// An unbounded range
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            from: None,
            to: None,
        }
    }
}

/// Aggregate statistics over a user's receipts
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptStats {
    pub count: u64,
    pub total: Amount,
    pub average: Option<Amount>,
    pub min: Option<Amount>,
    pub max: Option<Amount>,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

/// Per-vendor spending
#[derive(Debug, Clone, Serialize)]
pub struct VendorSpend {
    pub vendor: String,
    pub total: Amount,
    pub count: u64,
}

/// Per-date spending
#[derive(Debug, Clone, Serialize)]
pub struct DateSpend {
    pub date: NaiveDate,
    pub total: Amount,
}

/// Port for receipt storage operations
#[async_trait]
pub trait ReceiptStore: Send + Sync {
    /// Save a receipt
    async fn save(&self, receipt: &Receipt) -> Result<(), ApplicationError>;

    /// List a user's receipts ordered by date
    ///
    /// `vendor_filter` matches vendor names case-insensitively as a
    /// substring; `limit` caps the number of rows.
    async fn list_for_user(
        &self,
        user_id: &UserId,
        vendor_filter: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<Receipt>, ApplicationError>;

    /// Aggregate statistics for a user within an optional date range
    async fn stats_for_user(
        &self,
        user_id: &UserId,
        range: DateRange,
    ) -> Result<ReceiptStats, ApplicationError>;

    /// Spending grouped by vendor, largest first
    async fn spend_by_vendor(
        &self,
        user_id: &UserId,
        top_n: Option<u32>,
    ) -> Result<Vec<VendorSpend>, ApplicationError>;

    /// Spending grouped by receipt date, chronological
    async fn spend_by_date(&self, user_id: &UserId) -> Result<Vec<DateSpend>, ApplicationError>;
}
