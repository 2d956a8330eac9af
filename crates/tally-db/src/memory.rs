//! # In-Memory Store
//!
//! A [`Store`](crate::Store) backed by plain vectors behind one async lock.
//!
//! ## Thread Safety
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  MemoryStore ── Arc<RwLock<Tables>> ── shared by every clone            │
//! │                                                                         │
//! │  reads   ─► read lock  ─► clone the rows out  ─► release                │
//! │  writes  ─► write lock ─► check + mutate      ─► release                │
//! │                                                                         │
//! │  append_line holds the write lock for the whole check-and-append,      │
//! │  so the open check and the total update cannot interleave.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Foreign keys are enforced the same way the SQLite schema enforces them, so
//! both backends fail identically.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use tally_core::{
    Campaign, CampaignLink, CoreError, LineItem, Money, Product, Receipt, Shift, ShiftStatus,
};

use crate::error::{DbError, DbResult};
use crate::store::{CampaignStore, ProductStore, ReceiptStore, ShiftStore};

#[derive(Debug, Default)]
struct Tables {
    products: Vec<Product>,
    shifts: Vec<Shift>,
    receipts: Vec<Receipt>,
    campaigns: Vec<Campaign>,
    links: Vec<CampaignLink>,
}

impl Tables {
    fn product_exists(&self, id: &str) -> bool {
        self.products.iter().any(|p| p.id == id)
    }

    fn receipt_mut(&mut self, id: &str) -> DbResult<&mut Receipt> {
        self.receipts
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| DbError::not_found("Receipt", id))
    }
}

/// Store that lives for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn foreign_key(message: impl Into<String>) -> DbError {
    DbError::ForeignKeyViolation {
        message: message.into(),
    }
}

// =============================================================================
// Products
// =============================================================================

#[async_trait]
impl ProductStore for MemoryStore {
    async fn insert_product(&self, product: &Product) -> DbResult<()> {
        let mut tables = self.tables.write().await;

        if tables.products.iter().any(|p| p.id == product.id) {
            return Err(DbError::duplicate("products.id", &product.id));
        }
        if tables.products.iter().any(|p| p.barcode == product.barcode) {
            return Err(DbError::duplicate("products.barcode", &product.barcode));
        }

        debug!(id = %product.id, barcode = %product.barcode, "Inserting product");
        tables.products.push(product.clone());
        Ok(())
    }

    async fn get_product(&self, id: &str) -> DbResult<Option<Product>> {
        let tables = self.tables.read().await;
        Ok(tables.products.iter().find(|p| p.id == id).cloned())
    }

    async fn get_products(&self, ids: &[String]) -> DbResult<Vec<Product>> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn list_products(&self) -> DbResult<Vec<Product>> {
        Ok(self.tables.read().await.products.clone())
    }

    async fn update_product_price(&self, id: &str, unit_price: Money) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        let product = tables
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| DbError::not_found("Product", id))?;

        product.unit_price = unit_price;
        Ok(())
    }

    async fn count_products(&self) -> DbResult<i64> {
        Ok(self.tables.read().await.products.len() as i64)
    }
}

// =============================================================================
// Shifts
// =============================================================================

#[async_trait]
impl ShiftStore for MemoryStore {
    async fn insert_shift(&self, shift: &Shift) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        if tables.shifts.iter().any(|s| s.id == shift.id) {
            return Err(DbError::duplicate("shifts.id", &shift.id));
        }
        tables.shifts.push(shift.clone());
        Ok(())
    }

    async fn get_shift(&self, id: &str) -> DbResult<Option<Shift>> {
        let tables = self.tables.read().await;
        Ok(tables.shifts.iter().find(|s| s.id == id).cloned())
    }

    async fn list_shifts(&self) -> DbResult<Vec<Shift>> {
        Ok(self.tables.read().await.shifts.clone())
    }

    async fn close_shift(&self, id: &str, closed_at: DateTime<Utc>) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        let shift = tables
            .shifts
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| DbError::not_found("Shift", id))?;

        if !shift.is_open() {
            return Err(DbError::already_closed("Shift", id));
        }

        shift.status = ShiftStatus::Closed;
        shift.closed_at = Some(closed_at);
        Ok(())
    }
}

// =============================================================================
// Receipts
// =============================================================================

#[async_trait]
impl ReceiptStore for MemoryStore {
    async fn insert_receipt(&self, receipt: &Receipt) -> DbResult<()> {
        let mut tables = self.tables.write().await;

        if !tables.shifts.iter().any(|s| s.id == receipt.shift_id) {
            return Err(foreign_key(format!("shift {} does not exist", receipt.shift_id)));
        }
        if tables.receipts.iter().any(|r| r.id == receipt.id) {
            return Err(DbError::duplicate("receipts.id", &receipt.id));
        }

        tables.receipts.push(receipt.clone());
        Ok(())
    }

    async fn get_receipt(&self, id: &str) -> DbResult<Option<Receipt>> {
        let tables = self.tables.read().await;
        Ok(tables.receipts.iter().find(|r| r.id == id).cloned())
    }

    async fn append_line(&self, receipt_id: &str, line: &LineItem) -> DbResult<Receipt> {
        let mut tables = self.tables.write().await;

        if !tables.product_exists(&line.product_id) {
            return Err(foreign_key(format!("product {} does not exist", line.product_id)));
        }

        let receipt = tables.receipt_mut(receipt_id)?;
        receipt.push_line(line.clone()).map_err(|err| match err {
            CoreError::ReceiptAlreadyClosed(id) => DbError::already_closed("Receipt", id),
            other => DbError::InvalidData(other.to_string()),
        })?;

        debug!(receipt_id = %receipt_id, total = %receipt.total, "Line appended");
        Ok(receipt.clone())
    }

    async fn close_receipt(&self, receipt_id: &str) -> DbResult<Receipt> {
        let mut tables = self.tables.write().await;
        let receipt = tables.receipt_mut(receipt_id)?;

        receipt
            .close()
            .map_err(|_| DbError::already_closed("Receipt", receipt_id))?;

        Ok(receipt.clone())
    }

    async fn record_payment(&self, receipt_id: &str, discounted_total: Money) -> DbResult<Receipt> {
        let mut tables = self.tables.write().await;
        let receipt = tables.receipt_mut(receipt_id)?;

        receipt
            .record_payment(discounted_total)
            .map_err(|_| DbError::already_closed("Receipt", receipt_id))?;

        Ok(receipt.clone())
    }

    async fn receipts_for_shift(&self, shift_id: &str) -> DbResult<Vec<Receipt>> {
        let tables = self.tables.read().await;
        Ok(tables
            .receipts
            .iter()
            .filter(|r| r.shift_id == shift_id)
            .cloned()
            .collect())
    }

    async fn list_receipts(&self) -> DbResult<Vec<Receipt>> {
        Ok(self.tables.read().await.receipts.clone())
    }
}

// =============================================================================
// Campaigns
// =============================================================================

#[async_trait]
impl CampaignStore for MemoryStore {
    async fn insert_campaign(&self, campaign: &Campaign, links: &[CampaignLink]) -> DbResult<()> {
        let mut tables = self.tables.write().await;

        if let Some(missing) = links.iter().find(|l| !tables.product_exists(&l.product_id)) {
            return Err(foreign_key(format!(
                "product {} does not exist",
                missing.product_id
            )));
        }
        if tables.campaigns.iter().any(|c| c.id == campaign.id) {
            return Err(DbError::duplicate("campaigns.id", &campaign.id));
        }

        debug!(id = %campaign.id, kind = campaign.kind.name(), "Inserting campaign");
        tables.campaigns.push(campaign.clone());
        tables.links.extend(links.iter().cloned());
        Ok(())
    }

    async fn get_campaign(&self, id: &str) -> DbResult<Option<Campaign>> {
        let tables = self.tables.read().await;
        Ok(tables.campaigns.iter().find(|c| c.id == id).cloned())
    }

    async fn list_campaigns(&self) -> DbResult<Vec<Campaign>> {
        Ok(self.tables.read().await.campaigns.clone())
    }

    async fn campaign_links(&self, campaign_id: &str) -> DbResult<Vec<CampaignLink>> {
        let tables = self.tables.read().await;
        Ok(tables
            .links
            .iter()
            .filter(|l| l.campaign_id == campaign_id)
            .cloned()
            .collect())
    }

    async fn delete_campaign(&self, id: &str) -> DbResult<()> {
        let mut tables = self.tables.write().await;

        let before = tables.campaigns.len();
        tables.campaigns.retain(|c| c.id != id);
        if tables.campaigns.len() == before {
            return Err(DbError::not_found("Campaign", id));
        }

        tables.links.retain(|l| l.campaign_id != id);
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{CampaignKind, CurrencyCode, DiscountPercent};

    fn gel() -> CurrencyCode {
        CurrencyCode::new("GEL").unwrap()
    }

    async fn store_with_shift() -> (MemoryStore, Shift) {
        let store = MemoryStore::new();
        let shift = Shift::open();
        store.insert_shift(&shift).await.unwrap();
        (store, shift)
    }

    #[tokio::test]
    async fn test_duplicate_barcode_rejected() {
        let store = MemoryStore::new();
        store
            .insert_product(&Product::new("A", Money::from_minor(100), "123"))
            .await
            .unwrap();

        let err = store
            .insert_product(&Product::new("B", Money::from_minor(200), "123"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_append_line_updates_total() {
        let (store, shift) = store_with_shift().await;
        let product = Product::new("Lobiani", Money::from_minor(250), "1");
        store.insert_product(&product).await.unwrap();

        let receipt = Receipt::open(&shift.id, gel());
        store.insert_receipt(&receipt).await.unwrap();

        let line = LineItem::snapshot(&product, 2).unwrap();
        let updated = store.append_line(&receipt.id, &line).await.unwrap();
        assert_eq!(updated.total.minor(), 500);

        let stored = store.get_receipt(&receipt.id).await.unwrap().unwrap();
        assert_eq!(stored.lines.len(), 1);
        assert_eq!(stored.total.minor(), 500);
    }

    #[tokio::test]
    async fn test_append_line_to_closed_receipt() {
        let (store, shift) = store_with_shift().await;
        let product = Product::new("Lobiani", Money::from_minor(250), "1");
        store.insert_product(&product).await.unwrap();

        let receipt = Receipt::open(&shift.id, gel());
        store.insert_receipt(&receipt).await.unwrap();
        store.close_receipt(&receipt.id).await.unwrap();

        let line = LineItem::snapshot(&product, 1).unwrap();
        let err = store.append_line(&receipt.id, &line).await.unwrap_err();
        assert!(matches!(err, DbError::AlreadyClosed { .. }));
    }

    #[tokio::test]
    async fn test_close_keeps_discounted_total() {
        let (store, shift) = store_with_shift().await;
        let product = Product::new("Lobiani", Money::from_minor(250), "1");
        store.insert_product(&product).await.unwrap();

        let receipt = Receipt::open(&shift.id, gel());
        store.insert_receipt(&receipt).await.unwrap();
        store
            .append_line(&receipt.id, &LineItem::snapshot(&product, 2).unwrap())
            .await
            .unwrap();

        let closed = store.close_receipt(&receipt.id).await.unwrap();
        assert_eq!(closed.total.minor(), 500);
        assert!(closed.discounted_total.is_zero());
        assert!(!closed.is_paid());

        let err = store
            .record_payment(&receipt.id, Money::from_minor(450))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::AlreadyClosed { .. }));

        let other = Receipt::open(&shift.id, gel());
        store.insert_receipt(&other).await.unwrap();
        let paid = store
            .record_payment(&other.id, Money::from_minor(450))
            .await
            .unwrap();
        assert_eq!(paid.discounted_total.minor(), 450);
        assert!(paid.is_paid());
    }

    #[tokio::test]
    async fn test_reads_are_snapshots() {
        let (store, shift) = store_with_shift().await;
        let product = Product::new("Lobiani", Money::from_minor(250), "1");
        store.insert_product(&product).await.unwrap();

        let receipt = Receipt::open(&shift.id, gel());
        store.insert_receipt(&receipt).await.unwrap();

        let snapshot = store.get_receipt(&receipt.id).await.unwrap().unwrap();
        let line = LineItem::snapshot(&product, 1).unwrap();
        store.append_line(&receipt.id, &line).await.unwrap();

        assert!(snapshot.lines.is_empty());
    }

    #[tokio::test]
    async fn test_receipt_requires_shift() {
        let store = MemoryStore::new();
        let receipt = Receipt::open("no-such-shift", gel());
        let err = store.insert_receipt(&receipt).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_close_shift_twice() {
        let (store, shift) = store_with_shift().await;
        store.close_shift(&shift.id, Utc::now()).await.unwrap();

        let err = store.close_shift(&shift.id, Utc::now()).await.unwrap_err();
        assert!(matches!(err, DbError::AlreadyClosed { .. }));
    }

    #[tokio::test]
    async fn test_campaign_delete_removes_links() {
        let store = MemoryStore::new();
        let product = Product::new("Tarkhuna", Money::from_minor(300), "77");
        store.insert_product(&product).await.unwrap();

        let campaign = Campaign::new(CampaignKind::Discount {
            product_id: product.id.clone(),
            percent_off: DiscountPercent::new(10).unwrap(),
        })
        .unwrap();
        let links = campaign.links([&product]);
        store.insert_campaign(&campaign, &links).await.unwrap();

        assert_eq!(store.campaign_links(&campaign.id).await.unwrap().len(), 1);

        store.delete_campaign(&campaign.id).await.unwrap();
        assert!(store.get_campaign(&campaign.id).await.unwrap().is_none());
        assert!(store.campaign_links(&campaign.id).await.unwrap().is_empty());

        let err = store.delete_campaign(&campaign.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
