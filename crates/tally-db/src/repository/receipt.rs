//! # Receipt Repository
//!
//! SQLite operations for receipts and their lines.
//!
//! ## Receipt Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Receipt Lifecycle                                 │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── insert() → Receipt { status: open, total: 0 }                  │
//! │                                                                         │
//! │  2. ADD LINES (one transaction each)                                   │
//! │     └── append_line() → check open, INSERT line,                       │
//! │                         UPDATE total (checked sum)                     │
//! │                                                                         │
//! │  3a. PAY                                                               │
//! │     └── record_payment() → { status: closed, discounted_total,         │
//! │                              paid_at }                                 │
//! │                                                                         │
//! │  3b. CLOSE UNPAID                                                      │
//! │     └── close() → { status: closed }                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use tracing::debug;

use tally_core::validation::validate_receipt_size;
use tally_core::{CurrencyCode, LineItem, Money, Receipt, ReceiptStatus};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::store::ReceiptStore;

const RECEIPT_COLUMNS: &str =
    "id, shift_id, currency, status, total, discounted_total, created_at, paid_at";

#[derive(Debug, FromRow)]
struct ReceiptRow {
    id: String,
    shift_id: String,
    currency: String,
    status: ReceiptStatus,
    total: i64,
    discounted_total: i64,
    created_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct LineRow {
    receipt_id: String,
    product_id: String,
    quantity: i64,
    unit_price: i64,
    line_total: i64,
}

impl From<LineRow> for LineItem {
    fn from(row: LineRow) -> Self {
        LineItem {
            product_id: row.product_id,
            quantity: row.quantity,
            unit_price: Money::from_minor(row.unit_price),
            line_total: Money::from_minor(row.line_total),
        }
    }
}

impl ReceiptRow {
    fn into_receipt(self, lines: Vec<LineItem>) -> DbResult<Receipt> {
        let currency = CurrencyCode::new(&self.currency)
            .map_err(|e| DbError::InvalidData(format!("receipt {}: {}", self.id, e)))?;

        Ok(Receipt {
            id: self.id,
            shift_id: self.shift_id,
            currency,
            status: self.status,
            lines,
            total: Money::from_minor(self.total),
            discounted_total: Money::from_minor(self.discounted_total),
            created_at: self.created_at,
            paid_at: self.paid_at,
        })
    }
}

/// Repository for receipt database operations.
#[derive(Debug, Clone)]
pub struct ReceiptRepository {
    pool: SqlitePool,
}

impl ReceiptRepository {
    /// Creates a new ReceiptRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReceiptRepository { pool }
    }

    /// Inserts a receipt exactly as given, lines included, in one
    /// transaction. The stored total is taken as is.
    pub async fn insert(&self, receipt: &Receipt) -> DbResult<()> {
        debug!(id = %receipt.id, shift_id = %receipt.shift_id, currency = %receipt.currency, "Inserting receipt");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO receipts (
                id, shift_id, currency, status, total, discounted_total, created_at, paid_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&receipt.id)
        .bind(&receipt.shift_id)
        .bind(receipt.currency.as_str())
        .bind(receipt.status)
        .bind(receipt.total.minor())
        .bind(receipt.discounted_total.minor())
        .bind(receipt.created_at)
        .bind(receipt.paid_at)
        .execute(&mut *tx)
        .await?;

        for (position, line) in receipt.lines.iter().enumerate() {
            insert_line(&mut tx, &receipt.id, position as i64, line).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Gets a receipt with its lines in the order they were added.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Receipt>> {
        let row: Option<ReceiptRow> = sqlx::query_as(&format!(
            "SELECT {} FROM receipts WHERE id = ?1",
            RECEIPT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let lines: Vec<LineRow> = sqlx::query_as(
            r#"
            SELECT receipt_id, product_id, quantity, unit_price, line_total
            FROM receipt_lines
            WHERE receipt_id = ?1
            ORDER BY position
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        row.into_receipt(lines.into_iter().map(LineItem::from).collect())
            .map(Some)
    }

    /// Appends a line and bumps the receipt total atomically.
    ///
    /// ## Transaction
    /// 1. Read status, total and line count
    /// 2. Reject closed receipts and totals that would overflow
    /// 3. INSERT the line at the next position
    /// 4. UPDATE total to the checked sum
    pub async fn append_line(&self, receipt_id: &str, line: &LineItem) -> DbResult<Receipt> {
        let mut tx = self.pool.begin().await?;

        let state: Option<(ReceiptStatus, i64, i64)> = sqlx::query_as(
            r#"
            SELECT status, total,
                   (SELECT COUNT(*) FROM receipt_lines WHERE receipt_id = ?1)
            FROM receipts
            WHERE id = ?1
            "#,
        )
        .bind(receipt_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (total, position) = match state {
            None => return Err(DbError::not_found("Receipt", receipt_id)),
            Some((ReceiptStatus::Closed, _, _)) => {
                return Err(DbError::already_closed("Receipt", receipt_id))
            }
            Some((ReceiptStatus::Open, total, count)) => (Money::from_minor(total), count),
        };

        validate_receipt_size(position as usize).map_err(|e| DbError::InvalidData(e.to_string()))?;
        let total = total.checked_add(line.line_total).ok_or_else(|| {
            DbError::InvalidData(format!("receipt {} total would overflow", receipt_id))
        })?;

        insert_line(&mut tx, receipt_id, position, line).await?;

        sqlx::query("UPDATE receipts SET total = ?2 WHERE id = ?1")
            .bind(receipt_id)
            .bind(total.minor())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(receipt_id = %receipt_id, product_id = %line.product_id, position, "Line appended");

        self.get_by_id(receipt_id)
            .await?
            .ok_or_else(|| DbError::not_found("Receipt", receipt_id))
    }

    /// Closes an open receipt without a payment.
    pub async fn close(&self, receipt_id: &str) -> DbResult<Receipt> {
        let result = sqlx::query("UPDATE receipts SET status = 'closed' WHERE id = ?1 AND status = 'open'")
            .bind(receipt_id)
            .execute(&self.pool)
            .await?;

        let receipt = self.closed_receipt(receipt_id, result.rows_affected()).await?;

        debug!(receipt_id = %receipt_id, "Receipt closed");
        Ok(receipt)
    }

    /// Closes an open receipt as paid, recording the settled base-currency
    /// total.
    pub async fn record_payment(&self, receipt_id: &str, discounted_total: Money) -> DbResult<Receipt> {
        let result = sqlx::query(
            r#"
            UPDATE receipts SET
                status = 'closed',
                discounted_total = ?2,
                paid_at = ?3
            WHERE id = ?1 AND status = 'open'
            "#,
        )
        .bind(receipt_id)
        .bind(discounted_total.minor())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let receipt = self.closed_receipt(receipt_id, result.rows_affected()).await?;

        debug!(receipt_id = %receipt_id, discounted_total = %discounted_total, "Payment recorded");
        Ok(receipt)
    }

    /// Reloads a receipt after a guarded close. No affected rows means it was
    /// missing or already closed.
    async fn closed_receipt(&self, receipt_id: &str, rows_affected: u64) -> DbResult<Receipt> {
        let receipt = self
            .get_by_id(receipt_id)
            .await?
            .ok_or_else(|| DbError::not_found("Receipt", receipt_id))?;

        if rows_affected == 0 {
            return Err(DbError::already_closed("Receipt", receipt_id));
        }

        Ok(receipt)
    }

    /// Receipts of one shift, oldest first.
    pub async fn for_shift(&self, shift_id: &str) -> DbResult<Vec<Receipt>> {
        let rows: Vec<ReceiptRow> = sqlx::query_as(&format!(
            "SELECT {} FROM receipts WHERE shift_id = ?1 ORDER BY rowid",
            RECEIPT_COLUMNS
        ))
        .bind(shift_id)
        .fetch_all(&self.pool)
        .await?;

        let lines: Vec<LineRow> = sqlx::query_as(
            r#"
            SELECT l.receipt_id, l.product_id, l.quantity, l.unit_price, l.line_total
            FROM receipt_lines l
            INNER JOIN receipts r ON r.id = l.receipt_id
            WHERE r.shift_id = ?1
            ORDER BY l.receipt_id, l.position
            "#,
        )
        .bind(shift_id)
        .fetch_all(&self.pool)
        .await?;

        assemble(rows, lines)
    }

    /// Every receipt, oldest first.
    pub async fn list(&self) -> DbResult<Vec<Receipt>> {
        let rows: Vec<ReceiptRow> = sqlx::query_as(&format!(
            "SELECT {} FROM receipts ORDER BY rowid",
            RECEIPT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let lines: Vec<LineRow> = sqlx::query_as(
            r#"
            SELECT receipt_id, product_id, quantity, unit_price, line_total
            FROM receipt_lines
            ORDER BY receipt_id, position
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        assemble(rows, lines)
    }
}

async fn insert_line(
    tx: &mut Transaction<'_, Sqlite>,
    receipt_id: &str,
    position: i64,
    line: &LineItem,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO receipt_lines (
            receipt_id, position, product_id, quantity, unit_price, line_total
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(receipt_id)
    .bind(position)
    .bind(&line.product_id)
    .bind(line.quantity)
    .bind(line.unit_price.minor())
    .bind(line.line_total.minor())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Attaches lines (already ordered by position) to their receipts.
fn assemble(rows: Vec<ReceiptRow>, lines: Vec<LineRow>) -> DbResult<Vec<Receipt>> {
    let mut by_receipt: HashMap<String, Vec<LineItem>> = HashMap::new();
    for line in lines {
        by_receipt
            .entry(line.receipt_id.clone())
            .or_default()
            .push(LineItem::from(line));
    }

    rows.into_iter()
        .map(|row| {
            let lines = by_receipt.remove(&row.id).unwrap_or_default();
            row.into_receipt(lines)
        })
        .collect()
}

#[async_trait]
impl ReceiptStore for Database {
    async fn insert_receipt(&self, receipt: &Receipt) -> DbResult<()> {
        self.receipts().insert(receipt).await
    }

    async fn get_receipt(&self, id: &str) -> DbResult<Option<Receipt>> {
        self.receipts().get_by_id(id).await
    }

    async fn append_line(&self, receipt_id: &str, line: &LineItem) -> DbResult<Receipt> {
        self.receipts().append_line(receipt_id, line).await
    }

    async fn close_receipt(&self, receipt_id: &str) -> DbResult<Receipt> {
        self.receipts().close(receipt_id).await
    }

    async fn record_payment(&self, receipt_id: &str, discounted_total: Money) -> DbResult<Receipt> {
        self.receipts().record_payment(receipt_id, discounted_total).await
    }

    async fn receipts_for_shift(&self, shift_id: &str) -> DbResult<Vec<Receipt>> {
        self.receipts().for_shift(shift_id).await
    }

    async fn list_receipts(&self) -> DbResult<Vec<Receipt>> {
        self.receipts().list().await
    }
}
