//! Dashboard service
//!
//! Aggregates a user's receipts for the web dashboard: recent rows, totals,
//! and the per-date expense series feeding the chart.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use domain::{Amount, Receipt, UserId};
use tracing::instrument;

use crate::error::ApplicationError;
use crate::ports::{DateRange, ReceiptStore};

/// Data backing the dashboard page
#[derive(Debug, Clone)]
pub struct DashboardOverview {
    /// Receipts ordered by date
    pub receipts: Vec<Receipt>,
    /// Total number of receipts
    pub total_receipts: u64,
    /// Sum of all amounts
    pub total_expense: Amount,
    /// Chart x-axis: receipt dates
    pub dates: Vec<NaiveDate>,
    /// Chart y-axis: per-date totals
    pub totals: Vec<Amount>,
}

/// Service assembling dashboard data
pub struct DashboardService {
    receipts: Arc<dyn ReceiptStore>,
}

impl fmt::Debug for DashboardService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DashboardService").finish_non_exhaustive()
    }
}

impl DashboardService {
    /// Create a new dashboard service
    pub fn new(receipts: Arc<dyn ReceiptStore>) -> Self {
        Self { receipts }
    }

    /// Assemble the dashboard overview for a user
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn overview(&self, user_id: UserId) -> Result<DashboardOverview, ApplicationError> {
        let receipts = self.receipts.list_for_user(&user_id, None, None).await?;
        let stats = self
            .receipts
            .stats_for_user(&user_id, DateRange::unbounded())
            .await?;
        let series = self.receipts.spend_by_date(&user_id).await?;

        let (dates, totals): (Vec<_>, Vec<_>) =
            series.into_iter().map(|row| (row.date, row.total)).unzip();

        Ok(DashboardOverview {
            receipts,
            total_receipts: stats.count,
            total_expense: stats.total,
            dates,
            totals,
        })
    }
}

#[cfg(test)]
mod tests {
    use mockall::mock;

    use super::*;
    use crate::ports::{DateSpend, ReceiptStats, VendorSpend};

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

    #[tokio::test]
    async fn overview_combines_rows_totals_and_series() {
        let user_id = UserId::new();

        let mut receipts = MockReceipts::new();
        receipts.expect_list_for_user().returning(move |uid, _, _| {
            Ok(vec![Receipt::new(
                *uid,
                NaiveDate::from_ymd_opt(2025, 1, 5),
                "REWE",
                Amount::parse("10.00").unwrap(),
            )])
        });
        receipts.expect_stats_for_user().returning(|_, _| {
            Ok(ReceiptStats {
                count: 1,
                total: Amount::parse("10.00").unwrap(),
                average: Some(Amount::parse("10.00").unwrap()),
                min: Some(Amount::parse("10.00").unwrap()),
                max: Some(Amount::parse("10.00").unwrap()),
                first_date: NaiveDate::from_ymd_opt(2025, 1, 5),
                last_date: NaiveDate::from_ymd_opt(2025, 1, 5),
            })
        });
        receipts.expect_spend_by_date().returning(|_| {
            Ok(vec![DateSpend {
                date: NaiveDate::from_ymd_opt(2025, 1, 5).unwrap(),
                total: Amount::parse("10.00").unwrap(),
            }])
        });

        let service = DashboardService::new(Arc::new(receipts));
        let overview = service.overview(user_id).await.unwrap();

        assert_eq!(overview.receipts.len(), 1);
        assert_eq!(overview.total_receipts, 1);
        assert_eq!(overview.total_expense.to_string(), "10.00");
        assert_eq!(overview.dates.len(), 1);
        assert_eq!(overview.totals[0].to_string(), "10.00");
    }

    #[tokio::test]
    async fn empty_account_yields_empty_overview() {
        let mut receipts = MockReceipts::new();
        receipts
            .expect_list_for_user()
            .returning(|_, _, _| Ok(vec![]));
        receipts.expect_stats_for_user().returning(|_, _| {
            Ok(ReceiptStats {
                count: 0,
                total: Amount::ZERO,
                average: None,
                min: None,
                max: None,
                first_date: None,
                last_date: None,
            })
        });
        receipts.expect_spend_by_date().returning(|_| Ok(vec![]));

        let service = DashboardService::new(Arc::new(receipts));
        let overview = service.overview(UserId::new()).await.unwrap();

        assert!(overview.receipts.is_empty());
        assert_eq!(overview.total_receipts, 0);
        assert_eq!(overview.total_expense, Amount::ZERO);
        assert!(overview.dates.is_empty());
    }
}
