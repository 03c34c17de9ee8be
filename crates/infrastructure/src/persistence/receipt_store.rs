//! SQLite receipt store implementation
//!
//! Implements the `ReceiptStore` port: row persistence plus the aggregate
//! queries behind the dashboard and the query agent tools. Amounts are
//! stored as integer cents.

use std::sync::Arc;

use application::{
    error::ApplicationError,
    ports::{DateRange, DateSpend, ReceiptStats, ReceiptStore, VendorSpend},
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use domain::{Amount, MediaRef, Receipt, ReceiptId, UserId};
use rusqlite::{Row, params};
use tokio::task;
use tracing::{debug, instrument};

use super::connection::ConnectionPool;

/// SQLite-based receipt store
#[derive(Debug, Clone)]
pub struct SqliteReceiptStore {
    pool: Arc<ConnectionPool>,
}

impl SqliteReceiptStore {
    /// Create a new SQLite receipt store
    #[must_use]
    pub const fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }
}

/// Convert a database row to a `Receipt`
fn row_to_receipt(row: &Row<'_>) -> Result<Receipt, rusqlite::Error> {
    let id_str: String = row.get(0)?;
    let user_id_str: String = row.get(1)?;
    let date_str: Option<String> = row.get(2)?;
    let vendor: String = row.get(3)?;
    let amount_cents: i64 = row.get(4)?;
    let media_filename: Option<String> = row.get(5)?;
    let media_mime: Option<String> = row.get(6)?;
    let created_at_str: String = row.get(7)?;

    let id = ReceiptId::parse(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let user_id = UserId::parse(&user_id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let date = date_str.and_then(|raw| NaiveDate::parse_from_str(&raw, "%Y-%m-%d").ok());

    let amount = Amount::from_cents(amount_cents).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Integer, Box::new(e))
    })?;

    let media = media_filename.map(|filename| MediaRef {
        filename,
        mime_type: media_mime.unwrap_or_else(|| "application/octet-stream".to_string()),
    });

    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc));

    Ok(Receipt::restore(
        id, user_id, date, vendor, amount, media, created_at,
    ))
}

fn cents_to_amount(cents: i64) -> Result<Amount, ApplicationError> {
    Amount::from_cents(cents).map_err(ApplicationError::from)
}

const SELECT_COLUMNS: &str =
    "id, user_id, date, vendor, amount_cents, media_filename, media_mime_type, created_at";

#[async_trait]
impl ReceiptStore for SqliteReceiptStore {
    #[instrument(skip(self, receipt), fields(receipt_id = %receipt.id(), user_id = %receipt.user_id()))]
    async fn save(&self, receipt: &Receipt) -> Result<(), ApplicationError> {
        let pool = Arc::clone(&self.pool);
        let receipt = receipt.clone();

        task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| ApplicationError::Internal(e.to_string()))?;

            conn.execute(
                "INSERT INTO receipts
                     (id, user_id, date, vendor, amount_cents, media_filename, media_mime_type, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    receipt.id().to_string(),
                    receipt.user_id().to_string(),
                    receipt.date().map(|d| d.to_string()),
                    receipt.vendor(),
                    receipt.amount().cents(),
                    receipt.media().map(|m| m.filename.as_str()),
                    receipt.media().map(|m| m.mime_type.as_str()),
                    receipt.created_at().to_rfc3339(),
                ],
            )
            .map_err(|e| ApplicationError::Internal(e.to_string()))?;

            debug!("Saved receipt");
            Ok(())
        })
        .await
        .map_err(|e| ApplicationError::Internal(e.to_string()))?
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn list_for_user(
        &self,
        user_id: &UserId,
        vendor_filter: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<Receipt>, ApplicationError> {
        let pool = Arc::clone(&self.pool);
        let user_id_str = user_id.to_string();
        let vendor_filter = vendor_filter.map(str::to_string);

        task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| ApplicationError::Internal(e.to_string()))?;

            let mut sql = format!(
                "SELECT {SELECT_COLUMNS} FROM receipts WHERE user_id = ?1"
            );
            if vendor_filter.is_some() {
                sql.push_str(" AND vendor LIKE ?2 ESCAPE '\\'");
            }
            sql.push_str(" ORDER BY date ASC, created_at ASC");
            if let Some(limit) = limit {
                sql.push_str(&format!(" LIMIT {limit}"));
            }

            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| ApplicationError::Internal(e.to_string()))?;

            let rows = if let Some(ref search) = vendor_filter {
                let pattern = format!("%{}%", escape_like(search));
                stmt.query_map(params![user_id_str, pattern], row_to_receipt)
                    .map_err(|e| ApplicationError::Internal(e.to_string()))?
                    .collect::<Result<Vec<_>, _>>()
            } else {
                stmt.query_map([&user_id_str], row_to_receipt)
                    .map_err(|e| ApplicationError::Internal(e.to_string()))?
                    .collect::<Result<Vec<_>, _>>()
            }
            .map_err(|e| ApplicationError::Internal(e.to_string()))?;

            debug!(count = rows.len(), "Listed receipts");
            Ok(rows)
        })
        .await
        .map_err(|e| ApplicationError::Internal(e.to_string()))?
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn stats_for_user(
        &self,
        user_id: &UserId,
        range: DateRange,
    ) -> Result<ReceiptStats, ApplicationError> {
        let pool = Arc::clone(&self.pool);
        let user_id_str = user_id.to_string();

        task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| ApplicationError::Internal(e.to_string()))?;

            let mut sql = String::from(
                "SELECT COUNT(*), COALESCE(SUM(amount_cents), 0), AVG(amount_cents),
                        MIN(amount_cents), MAX(amount_cents), MIN(date), MAX(date)
                 FROM receipts WHERE user_id = ?1",
            );
            let mut bound: Vec<String> = vec![user_id_str];
            if let Some(from) = range.from {
                bound.push(from.to_string());
                sql.push_str(&format!(" AND date >= ?{}", bound.len()));
            }
            if let Some(to) = range.to {
                bound.push(to.to_string());
                sql.push_str(&format!(" AND date <= ?{}", bound.len()));
            }

            let (count, total_cents, avg_cents, min_cents, max_cents, first_date, last_date) = conn
                .query_row(
                    &sql,
                    rusqlite::params_from_iter(bound.iter()),
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, Option<f64>>(2)?,
                            row.get::<_, Option<i64>>(3)?,
                            row.get::<_, Option<i64>>(4)?,
                            row.get::<_, Option<String>>(5)?,
                            row.get::<_, Option<String>>(6)?,
                        ))
                    },
                )
                .map_err(|e| ApplicationError::Internal(e.to_string()))?;

            #[allow(clippy::cast_possible_truncation)]
            let average = avg_cents
                .map(|avg| cents_to_amount(avg.round() as i64))
                .transpose()?;

            Ok(ReceiptStats {
                count: u64::try_from(count).unwrap_or(0),
                total: cents_to_amount(total_cents)?,
                average,
                min: min_cents.map(cents_to_amount).transpose()?,
                max: max_cents.map(cents_to_amount).transpose()?,
                first_date: first_date
                    .and_then(|raw| NaiveDate::parse_from_str(&raw, "%Y-%m-%d").ok()),
                last_date: last_date
                    .and_then(|raw| NaiveDate::parse_from_str(&raw, "%Y-%m-%d").ok()),
            })
        })
        .await
        .map_err(|e| ApplicationError::Internal(e.to_string()))?
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn spend_by_vendor(
        &self,
        user_id: &UserId,
        top_n: Option<u32>,
    ) -> Result<Vec<VendorSpend>, ApplicationError> {
        let pool = Arc::clone(&self.pool);
        let user_id_str = user_id.to_string();

        task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| ApplicationError::Internal(e.to_string()))?;

            let mut sql = String::from(
                "SELECT vendor, SUM(amount_cents), COUNT(*)
                 FROM receipts WHERE user_id = ?1
                 GROUP BY vendor ORDER BY SUM(amount_cents) DESC",
            );
            if let Some(top_n) = top_n {
                sql.push_str(&format!(" LIMIT {top_n}"));
            }

            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| ApplicationError::Internal(e.to_string()))?;

            let rows = stmt
                .query_map([&user_id_str], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                })
                .map_err(|e| ApplicationError::Internal(e.to_string()))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ApplicationError::Internal(e.to_string()))?;

            rows.into_iter()
                .map(|(vendor, total_cents, count)| {
                    Ok(VendorSpend {
                        vendor,
                        total: cents_to_amount(total_cents)?,
                        count: u64::try_from(count).unwrap_or(0),
                    })
                })
                .collect()
        })
        .await
        .map_err(|e| ApplicationError::Internal(e.to_string()))?
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn spend_by_date(&self, user_id: &UserId) -> Result<Vec<DateSpend>, ApplicationError> {
        let pool = Arc::clone(&self.pool);
        let user_id_str = user_id.to_string();

        task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| ApplicationError::Internal(e.to_string()))?;

            let mut stmt = conn
                .prepare(
                    "SELECT date, SUM(amount_cents)
                     FROM receipts WHERE user_id = ?1 AND date IS NOT NULL
                     GROUP BY date ORDER BY date ASC",
                )
                .map_err(|e| ApplicationError::Internal(e.to_string()))?;

            let rows = stmt
                .query_map([&user_id_str], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })
                .map_err(|e| ApplicationError::Internal(e.to_string()))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ApplicationError::Internal(e.to_string()))?;

            rows.into_iter()
                .filter_map(|(date_str, total_cents)| {
                    let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").ok()?;
                    Some(cents_to_amount(total_cents).map(|total| DateSpend { date, total }))
                })
                .collect()
        })
        .await
        .map_err(|e| ApplicationError::Internal(e.to_string()))?
    }
}

/// Escape LIKE wildcards in a user-supplied search term
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
