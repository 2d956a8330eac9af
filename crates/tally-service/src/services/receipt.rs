//! # Receipt Service

use std::sync::Arc;

use tracing::{debug, info};

use tally_core::validation::validate_quantity;
use tally_core::{CurrencyCode, LineItem, Receipt};
use tally_db::{ProductStore, ReceiptStore, ShiftStore, Store};

use crate::error::{ServiceError, ServiceResult};
use crate::services::payment::load_receipt;

#[derive(Clone)]
pub struct ReceiptService {
    store: Arc<dyn Store>,
}

impl ReceiptService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        ReceiptService { store }
    }

    /// Opens an empty receipt in `shift_id`.
    ///
    /// ## Errors
    /// * `Validation` - `currency` isn't a three-letter code
    /// * `NotFound` - no such shift
    /// * `ShiftClosed` - the shift is closed
    pub async fn create(&self, shift_id: &str, currency: &str) -> ServiceResult<Receipt> {
        let currency = CurrencyCode::new(currency)?;

        let shift = self
            .store
            .get_shift(shift_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Shift", shift_id))?;
        if !shift.is_open() {
            return Err(ServiceError::ShiftClosed(shift.id));
        }

        let receipt = Receipt::open(shift_id, currency);
        self.store.insert_receipt(&receipt).await?;

        info!(id = %receipt.id, shift_id = %shift_id, currency = %receipt.currency, "Receipt opened");
        Ok(receipt)
    }

    pub async fn get(&self, id: &str) -> ServiceResult<Receipt> {
        load_receipt(self.store.as_ref(), id).await
    }

    /// Adds `quantity` units of a product at its current price.
    ///
    /// ## Errors
    /// * `NotFound` - receipt or product
    /// * `AlreadyClosed` - the receipt is closed
    /// * `Validation` - quantity out of range, or the receipt is full
    pub async fn add_item(
        &self,
        receipt_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> ServiceResult<Receipt> {
        validate_quantity(quantity)?;

        let receipt = self.get(receipt_id).await?;
        if !receipt.is_open() {
            return Err(ServiceError::already_closed("Receipt", receipt_id));
        }

        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", product_id))?;

        let line = LineItem::snapshot(&product, quantity)?;
        let receipt = self.store.append_line(receipt_id, &line).await?;

        debug!(
            receipt_id = %receipt_id,
            product_id = %product_id,
            quantity,
            total = %receipt.total,
            "Item added"
        );
        Ok(receipt)
    }

    /// Closes a receipt without taking a payment. Nothing is priced and the
    /// discounted total stays unset; use `PaymentService::add_payment` to
    /// settle a sale.
    ///
    /// ## Errors
    /// * `NotFound` - no such receipt
    /// * `AlreadyClosed` - the receipt is closed
    pub async fn close(&self, receipt_id: &str) -> ServiceResult<Receipt> {
        let closed = self.store.close_receipt(receipt_id).await?;

        info!(id = %receipt_id, total = %closed.total, "Receipt closed without payment");
        Ok(closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::campaign::CampaignService;
    use crate::services::shift::ShiftService;
    use crate::services::testing::{product, store};
    use tally_core::{
        CampaignKind, DiscountPercent, Money, ReceiptStatus, MAX_AMOUNT, MAX_ITEM_QUANTITY,
    };

    async fn setup() -> (Arc<dyn Store>, ReceiptService, String) {
        let store = store();
        let shift = ShiftService::new(store.clone()).open().await.unwrap();
        (store.clone(), ReceiptService::new(store), shift.id)
    }

    #[tokio::test]
    async fn test_create_requires_open_shift() {
        let (store, service, shift_id) = setup().await;

        let receipt = service.create(&shift_id, "gel").await.unwrap();
        assert_eq!(receipt.currency.as_str(), "GEL");
        assert_eq!(receipt.total, Money::zero());
        assert_eq!(service.get(&receipt.id).await.unwrap(), receipt);

        let err = service.create("missing", "GEL").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));

        let err = service.create(&shift_id, "lari").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        service.close(&receipt.id).await.unwrap();
        ShiftService::new(store).close(&shift_id).await.unwrap();
        let err = service.create(&shift_id, "GEL").await.unwrap_err();
        assert!(matches!(err, ServiceError::ShiftClosed(_)));
    }

    #[tokio::test]
    async fn test_add_item_snapshots_price() {
        let (store, service, shift_id) = setup().await;
        let water = product(&store, "Nabeghlavi", 150, "17").await;
        let receipt = service.create(&shift_id, "GEL").await.unwrap();

        let receipt = service.add_item(&receipt.id, &water.id, 2).await.unwrap();
        assert_eq!(receipt.total.minor(), 300);

        store
            .update_product_price(&water.id, Money::from_minor(200))
            .await
            .unwrap();
        let receipt = service.add_item(&receipt.id, &water.id, 1).await.unwrap();

        assert_eq!(receipt.lines.len(), 2);
        assert_eq!(receipt.lines[0].unit_price.minor(), 150);
        assert_eq!(receipt.lines[1].unit_price.minor(), 200);
        assert_eq!(receipt.total.minor(), 500);
    }

    #[tokio::test]
    async fn test_add_item_errors() {
        let (store, service, shift_id) = setup().await;
        let water = product(&store, "Nabeghlavi", 150, "17").await;
        let receipt = service.create(&shift_id, "GEL").await.unwrap();

        let err = service.add_item(&receipt.id, "ghost", 1).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { ref entity, .. } if entity == "Product"));

        let err = service.add_item("ghost", &water.id, 1).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { ref entity, .. } if entity == "Receipt"));

        let err = service.add_item(&receipt.id, &water.id, 0).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        service.close(&receipt.id).await.unwrap();
        let err = service.add_item(&receipt.id, &water.id, 1).await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyClosed { .. }));
    }

    #[tokio::test]
    async fn test_close_records_no_payment() {
        let (store, service, shift_id) = setup().await;
        let bread = product(&store, "Shoti", 100, "31").await;
        CampaignService::new(store.clone())
            .create(CampaignKind::Discount {
                product_id: bread.id.clone(),
                percent_off: DiscountPercent::new(10).unwrap(),
            })
            .await
            .unwrap();
        let receipt = service.create(&shift_id, "GEL").await.unwrap();
        service.add_item(&receipt.id, &bread.id, 2).await.unwrap();

        let closed = service.close(&receipt.id).await.unwrap();
        assert_eq!(closed.status, ReceiptStatus::Closed);
        assert_eq!(closed.total.minor(), 200);
        assert_eq!(closed.discounted_total, Money::zero());
        assert!(!closed.is_paid());

        let err = service.close(&receipt.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyClosed { .. }));

        let err = service.close("ghost").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_oversized_line_is_an_error() {
        let (store, service, shift_id) = setup().await;
        let gold = product(&store, "Gold bar", MAX_AMOUNT, "79").await;
        let receipt = service.create(&shift_id, "GEL").await.unwrap();

        let receipt = service
            .add_item(&receipt.id, &gold.id, MAX_ITEM_QUANTITY)
            .await
            .unwrap();
        assert_eq!(receipt.total.minor(), MAX_AMOUNT * MAX_ITEM_QUANTITY);

        // A price that slipped past validation still cannot overflow a line
        store
            .update_product_price(&gold.id, Money::from_minor(i64::MAX / 2))
            .await
            .unwrap();
        let err = service.add_item(&receipt.id, &gold.id, 3).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(service.get(&receipt.id).await.unwrap().lines.len(), 1);
    }
}
