//! # Store Contracts
//!
//! What the services need from storage, independent of the backend.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Store (supertrait)                              │
//! │                                                                         │
//! │   ProductStore    ShiftStore    ReceiptStore    CampaignStore           │
//! │        │              │              │               │                  │
//! │        └──────────────┴──────┬───────┴───────────────┘                  │
//! │                              │                                          │
//! │               ┌──────────────┴──────────────┐                           │
//! │               ▼                             ▼                           │
//! │         MemoryStore                    Database                         │
//! │   (RwLock, copy-on-read)           (SQLite pool, transactions)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Reads
//! Every `get_*` returns an owned copy. A receipt handed to the pricing engine
//! cannot change underneath it, even if a line is appended concurrently.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tally_core::{Campaign, CampaignLink, LineItem, Money, Product, Receipt, Shift};

use crate::error::DbResult;

/// Product persistence.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Inserts a product. Fails with `UniqueViolation` on a duplicate barcode.
    async fn insert_product(&self, product: &Product) -> DbResult<()>;

    async fn get_product(&self, id: &str) -> DbResult<Option<Product>>;

    /// Products with the given IDs. Unknown IDs are skipped.
    async fn get_products(&self, ids: &[String]) -> DbResult<Vec<Product>>;

    /// Every product, oldest first.
    async fn list_products(&self) -> DbResult<Vec<Product>>;

    /// Replaces a product's unit price. Existing receipt lines are untouched.
    async fn update_product_price(&self, id: &str, unit_price: Money) -> DbResult<()>;

    async fn count_products(&self) -> DbResult<i64>;
}

/// Shift persistence.
#[async_trait]
pub trait ShiftStore: Send + Sync {
    async fn insert_shift(&self, shift: &Shift) -> DbResult<()>;

    async fn get_shift(&self, id: &str) -> DbResult<Option<Shift>>;

    /// Every shift, oldest first.
    async fn list_shifts(&self) -> DbResult<Vec<Shift>>;

    /// Marks a shift closed. `NotFound` or `AlreadyClosed` otherwise.
    async fn close_shift(&self, id: &str, closed_at: DateTime<Utc>) -> DbResult<()>;
}

/// Receipt persistence.
#[async_trait]
pub trait ReceiptStore: Send + Sync {
    async fn insert_receipt(&self, receipt: &Receipt) -> DbResult<()>;

    async fn get_receipt(&self, id: &str) -> DbResult<Option<Receipt>>;

    /// Appends `line` and adds its total to the receipt total in one write.
    ///
    /// ## Errors
    /// - `NotFound` if the receipt does not exist
    /// - `AlreadyClosed` if the receipt is closed
    async fn append_line(&self, receipt_id: &str, line: &LineItem) -> DbResult<Receipt>;

    /// Closes a receipt without a payment. The stored discounted total is
    /// left untouched.
    ///
    /// ## Errors
    /// - `NotFound` if the receipt does not exist
    /// - `AlreadyClosed` if the receipt is closed
    async fn close_receipt(&self, receipt_id: &str) -> DbResult<Receipt>;

    /// Closes a receipt as paid and records its base-currency discounted
    /// total. The only write of `discounted_total`.
    ///
    /// ## Errors
    /// Same as [`close_receipt`](Self::close_receipt).
    async fn record_payment(&self, receipt_id: &str, discounted_total: Money) -> DbResult<Receipt>;

    /// Receipts of one shift, oldest first.
    async fn receipts_for_shift(&self, shift_id: &str) -> DbResult<Vec<Receipt>>;

    /// Every receipt, oldest first.
    async fn list_receipts(&self) -> DbResult<Vec<Receipt>>;
}

/// Campaign persistence.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// Inserts a campaign together with its product links.
    async fn insert_campaign(&self, campaign: &Campaign, links: &[CampaignLink]) -> DbResult<()>;

    async fn get_campaign(&self, id: &str) -> DbResult<Option<Campaign>>;

    /// Every campaign in registration order.
    async fn list_campaigns(&self) -> DbResult<Vec<Campaign>>;

    async fn campaign_links(&self, campaign_id: &str) -> DbResult<Vec<CampaignLink>>;

    /// Deletes a campaign and its links. `NotFound` if absent.
    async fn delete_campaign(&self, id: &str) -> DbResult<()>;
}

/// Everything a Tally service needs, in one object.
pub trait Store: ProductStore + ShiftStore + ReceiptStore + CampaignStore {}

impl<T> Store for T where T: ProductStore + ShiftStore + ReceiptStore + CampaignStore {}
