//! # Domain Types
//!
//! Core domain types used throughout Tally POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │     Shift       │   │    Receipt      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  barcode        │   │  status         │   │  shift_id (FK)  │       │
//! │  │  name           │   │  opened_at      │   │  currency       │       │
//! │  │  unit_price     │   │  closed_at      │   │  lines[]        │       │
//! │  └─────────────────┘   └─────────────────┘   │  total          │       │
//! │                                              │  discounted_tot │       │
//! │                                              │  paid_at        │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! A [`LineItem`] freezes the product's unit price at the moment it was
//! added. Later price edits never change existing lines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::currency::CurrencyCode;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::validation::{validate_quantity, validate_receipt_size};

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    /// Price in minor units of the base currency.
    pub unit_price: Money,

    /// Barcode (EAN-13, UPC-A, etc.). Unique across the catalog.
    pub barcode: String,

    /// When the product was created.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Creates a product with a generated ID.
    pub fn new(name: impl Into<String>, unit_price: Money, barcode: impl Into<String>) -> Self {
        Product {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            unit_price,
            barcode: barcode.into(),
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// Receipt Status
// =============================================================================

/// The status of a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    /// Lines may still be appended.
    #[default]
    Open,
    /// Paid or otherwise finalized. No further lines.
    Closed,
}

// =============================================================================
// Line Item
// =============================================================================

/// One product row on a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    pub product_id: String,
    /// Always greater than zero.
    pub quantity: i64,
    /// Unit price at the time the product was added (frozen).
    pub unit_price: Money,
    /// `quantity × unit_price`, frozen together with the price.
    pub line_total: Money,
}

impl LineItem {
    /// Snapshots a product into a new line.
    pub fn snapshot(product: &Product, quantity: i64) -> CoreResult<Self> {
        validate_quantity(quantity)?;

        let line_total = product
            .unit_price
            .checked_multiply_quantity(quantity)
            .ok_or_else(|| CoreError::amount_overflow("line_total"))?;

        Ok(LineItem {
            product_id: product.id.clone(),
            quantity,
            unit_price: product.unit_price,
            line_total,
        })
    }
}

// =============================================================================
// Receipt
// =============================================================================

/// A receipt (order) belonging to a shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Receipt {
    pub id: String,
    pub shift_id: String,
    /// Currency the customer pays in.
    pub currency: CurrencyCode,
    pub status: ReceiptStatus,
    /// Lines in the order they were added.
    pub lines: Vec<LineItem>,
    /// Sum of line totals in the base currency, maintained incrementally.
    pub total: Money,
    /// Base-currency payable amount, written back when a payment is recorded.
    pub discounted_total: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    /// Set when a payment is recorded; unpaid closes leave it empty.
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
}

impl Receipt {
    /// Creates an empty, open receipt with a generated ID.
    pub fn open(shift_id: impl Into<String>, currency: CurrencyCode) -> Self {
        Receipt {
            id: Uuid::new_v4().to_string(),
            shift_id: shift_id.into(),
            currency,
            status: ReceiptStatus::Open,
            lines: Vec::new(),
            total: Money::zero(),
            discounted_total: Money::zero(),
            created_at: Utc::now(),
            paid_at: None,
        }
    }

    /// Returns true while lines may still be appended.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == ReceiptStatus::Open
    }

    /// Appends a line snapshot of `product` and bumps the running total.
    ///
    /// ## Errors
    /// - `ReceiptAlreadyClosed` if the receipt is closed
    /// - `Validation` if the quantity is not positive or too large, or the
    ///   receipt is full
    pub fn add_line(&mut self, product: &Product, quantity: i64) -> CoreResult<&LineItem> {
        if !self.is_open() {
            return Err(CoreError::ReceiptAlreadyClosed(self.id.clone()));
        }

        let line = LineItem::snapshot(product, quantity)?;
        self.push_line(line)?;

        let index = self.lines.len() - 1;
        Ok(&self.lines[index])
    }

    /// Appends an already snapshotted line and bumps the running total.
    ///
    /// Storage backends use this when replaying a line they were handed.
    pub fn push_line(&mut self, line: LineItem) -> CoreResult<()> {
        if !self.is_open() {
            return Err(CoreError::ReceiptAlreadyClosed(self.id.clone()));
        }
        validate_receipt_size(self.lines.len())?;

        self.total = self
            .total
            .checked_add(line.line_total)
            .ok_or_else(|| CoreError::amount_overflow("total"))?;
        self.lines.push(line);
        Ok(())
    }

    /// Returns true once a payment has been recorded.
    #[inline]
    pub fn is_paid(&self) -> bool {
        self.paid_at.is_some()
    }

    /// Closes the receipt without taking a payment. `discounted_total` is
    /// left as it was.
    pub fn close(&mut self) -> CoreResult<()> {
        if !self.is_open() {
            return Err(CoreError::ReceiptAlreadyClosed(self.id.clone()));
        }

        self.status = ReceiptStatus::Closed;
        Ok(())
    }

    /// Closes the receipt as paid and records the settled base-currency
    /// total.
    pub fn record_payment(&mut self, discounted_total: Money) -> CoreResult<()> {
        self.close()?;
        self.discounted_total = discounted_total;
        self.paid_at = Some(Utc::now());
        Ok(())
    }
}

// =============================================================================
// Shift
// =============================================================================

/// The status of a cashier shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    #[default]
    Open,
    Closed,
}

/// A cashier shift. Receipts reference their shift by ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Shift {
    pub id: String,
    pub status: ShiftStatus,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl Shift {
    /// Opens a new shift with a generated ID.
    pub fn open() -> Self {
        Shift {
            id: Uuid::new_v4().to_string(),
            status: ShiftStatus::Open,
            opened_at: Utc::now(),
            closed_at: None,
        }
    }

    /// Returns true while receipts may be created in this shift.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == ShiftStatus::Open
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
