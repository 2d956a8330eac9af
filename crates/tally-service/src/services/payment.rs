//! # Payment Service
//!
//! Loads a receipt snapshot, prices it, converts it, and on `add_payment`
//! settles it.
//!
//! ## Calculation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  get_receipt(id)           owned snapshot; appends can't reach it       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  get_products(line ids) ──► Catalog                                     │
//! │  list_campaigns()       ──► CampaignIndex                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PricingEngine::price      base currency, pure                          │
//! │       │                                                                 │
//! │       ├── same currency ──► ExchangeRate::ONE                           │
//! │       └── otherwise     ──► RateProvider::rate(base, receipt currency)  │
//! │       │                     failure aborts the whole calculation        │
//! │       ▼                                                                 │
//! │  PricedReceipt::settle ──► ReceiptForPayment                            │
//! │       │                                                                 │
//! │       ▼ (add_payment only)                                              │
//! │  record_payment(id, base discounted total)                              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use tally_core::pricing::{CampaignIndex, Catalog, PricedReceipt, PricingEngine, ReceiptForPayment};
use tally_core::{CurrencyCode, ExchangeRate, Receipt};
use tally_db::{CampaignStore, ProductStore, ReceiptStore, Store};

use crate::error::{ServiceError, ServiceResult};
use crate::fx::RateProvider;

/// Prices a receipt in the base currency against the current catalog and
/// campaign set.
async fn price_receipt(store: &dyn Store, receipt: &Receipt) -> ServiceResult<PricedReceipt> {
    let mut seen = HashSet::new();
    let product_ids: Vec<String> = receipt
        .lines
        .iter()
        .filter(|line| seen.insert(line.product_id.as_str()))
        .map(|line| line.product_id.clone())
        .collect();

    let catalog: Catalog = store.get_products(&product_ids).await?.into_iter().collect();
    let index = CampaignIndex::build(store.list_campaigns().await?);

    let priced = PricingEngine::new(&index, &catalog).price(receipt)?;

    debug!(
        receipt_id = %receipt.id,
        lines = receipt.lines.len(),
        products = catalog.len(),
        campaigns = index.len(),
        total = %receipt.total,
        discounted_total = %priced.discounted_total,
        "Receipt priced"
    );
    Ok(priced)
}

pub(crate) async fn load_receipt(store: &dyn Store, id: &str) -> ServiceResult<Receipt> {
    store
        .get_receipt(id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Receipt", id))
}

#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn Store>,
    rates: Arc<dyn RateProvider>,
    base: CurrencyCode,
}

impl PaymentService {
    pub fn new(store: Arc<dyn Store>, rates: Arc<dyn RateProvider>, base: CurrencyCode) -> Self {
        PaymentService { store, rates, base }
    }

    pub fn base_currency(&self) -> &CurrencyCode {
        &self.base
    }

    /// Quotes a receipt, open or closed. Nothing is written.
    ///
    /// ## Errors
    /// * `NotFound` - receipt, or a product on one of its lines
    /// * `ExternalService` - the rate lookup failed
    /// * `InternalConsistency` - a campaign reached a resolver it doesn't fit
    pub async fn calculate_payment(&self, receipt_id: &str) -> ServiceResult<ReceiptForPayment> {
        let receipt = load_receipt(self.store.as_ref(), receipt_id).await?;
        self.quote(&receipt).await
    }

    /// Quotes an open receipt, then closes it with the base-currency
    /// discounted total.
    ///
    /// Nothing is written if pricing or the rate lookup fails.
    ///
    /// ## Errors
    /// Those of [`calculate_payment`](Self::calculate_payment), plus
    /// `AlreadyClosed` if the receipt was settled before.
    pub async fn add_payment(&self, receipt_id: &str) -> ServiceResult<ReceiptForPayment> {
        let receipt = load_receipt(self.store.as_ref(), receipt_id).await?;
        if !receipt.is_open() {
            return Err(ServiceError::already_closed("Receipt", receipt_id));
        }

        let payment = self.quote(&receipt).await?;
        let closed = self
            .store
            .record_payment(receipt_id, payment.base_discounted_total)
            .await?;

        info!(
            receipt_id = %receipt_id,
            currency = %payment.currency,
            discounted_total = %payment.discounted_total,
            amount_saved = %payment.reduced_amount,
            "Payment recorded"
        );

        Ok(ReceiptForPayment {
            receipt: closed,
            ..payment
        })
    }

    async fn quote(&self, receipt: &Receipt) -> ServiceResult<ReceiptForPayment> {
        let priced = price_receipt(self.store.as_ref(), receipt).await?;

        let rate = if priced.needs_conversion(&self.base) {
            self.rates.rate(&self.base, &receipt.currency).await?
        } else {
            ExchangeRate::ONE
        };

        Ok(priced.settle(&self.base, rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fx::FixedRates;
    use crate::services::testing::{gel, product, store};
    use tally_core::{
        Campaign, CampaignKind, DiscountPercent, LineItem, Money, ReceiptStatus, Shift,
    };
    use tally_db::ShiftStore;

    fn usd() -> CurrencyCode {
        CurrencyCode::new("USD").unwrap()
    }

    fn service(store: &Arc<dyn Store>, rates: FixedRates) -> PaymentService {
        PaymentService::new(store.clone(), Arc::new(rates), gel())
    }

    async fn receipt_with(
        store: &Arc<dyn Store>,
        currency: CurrencyCode,
        lines: &[(&tally_core::Product, i64)],
    ) -> Receipt {
        let shift = Shift::open();
        store.insert_shift(&shift).await.unwrap();

        let receipt = Receipt::open(&shift.id, currency);
        store.insert_receipt(&receipt).await.unwrap();
        for (product, quantity) in lines {
            store
                .append_line(&receipt.id, &LineItem::snapshot(product, *quantity).unwrap())
                .await
                .unwrap();
        }
        store.get_receipt(&receipt.id).await.unwrap().unwrap()
    }

    async fn campaign(store: &Arc<dyn Store>, kind: CampaignKind) -> Campaign {
        let campaign = Campaign::new(kind).unwrap();
        let products = store.list_products().await.unwrap();
        store
            .insert_campaign(&campaign, &campaign.links(&products))
            .await
            .unwrap();
        campaign
    }

    #[tokio::test]
    async fn test_discount_quote() {
        let store = store();
        let p = product(&store, "P", 100, "1").await;
        campaign(
            &store,
            CampaignKind::Discount {
                product_id: p.id.clone(),
                percent_off: DiscountPercent::new(10).unwrap(),
            },
        )
        .await;
        let receipt = receipt_with(&store, gel(), &[(&p, 2)]).await;

        let payment = service(&store, FixedRates::new())
            .calculate_payment(&receipt.id)
            .await
            .unwrap();

        let summary = payment.summary();
        assert_eq!(summary.total.minor(), 200);
        assert_eq!(summary.discounted_total.minor(), 180);
        assert_eq!(summary.amount_saved.minor(), 20);
        assert_eq!(summary.currency, gel());
    }

    #[tokio::test]
    async fn test_quote_is_idempotent_and_writes_nothing() {
        let store = store();
        let q = product(&store, "Q", 200, "2").await;
        campaign(
            &store,
            CampaignKind::BuyNGetN {
                product_id: q.id.clone(),
                buy_quantity: 2,
                get_quantity: 1,
            },
        )
        .await;
        let receipt = receipt_with(&store, gel(), &[(&q, 3)]).await;
        let service = service(&store, FixedRates::new());

        let first = service.calculate_payment(&receipt.id).await.unwrap();
        let second = service.calculate_payment(&receipt.id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.discounted_total.minor(), 400);

        let stored = store.get_receipt(&receipt.id).await.unwrap().unwrap();
        assert_eq!(stored, receipt);
    }

    #[tokio::test]
    async fn test_foreign_currency_conversion() {
        let store = store();
        let p = product(&store, "P", 100, "1").await;
        campaign(
            &store,
            CampaignKind::Discount {
                product_id: p.id.clone(),
                percent_off: DiscountPercent::new(10).unwrap(),
            },
        )
        .await;
        let receipt = receipt_with(&store, usd(), &[(&p, 2)]).await;
        let rates = FixedRates::new().with_rate(gel(), usd(), ExchangeRate::from_f64(2.5).unwrap());

        let payment = service(&store, rates)
            .calculate_payment(&receipt.id)
            .await
            .unwrap();

        assert_eq!(payment.base_discounted_total.minor(), 180);
        assert_eq!(payment.discounted_total.minor(), 450);
        assert_eq!(payment.total.minor(), 500);
        assert_eq!(payment.reduced_amount.minor(), 50);
        assert_eq!(payment.currency, usd());
    }

    #[tokio::test]
    async fn test_missing_rate_fails_loudly() {
        let store = store();
        let p = product(&store, "P", 100, "1").await;
        let receipt = receipt_with(&store, usd(), &[(&p, 1)]).await;
        let service = service(&store, FixedRates::new());

        let err = service.calculate_payment(&receipt.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::ExternalService(_)));

        let err = service.add_payment(&receipt.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::ExternalService(_)));
        let stored = store.get_receipt(&receipt.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReceiptStatus::Open);
    }

    #[tokio::test]
    async fn test_add_payment_closes_once() {
        let store = store();
        let p = product(&store, "P", 300, "1").await;
        let r = product(&store, "R", 200, "2").await;
        campaign(
            &store,
            CampaignKind::ReceiptDiscount {
                min_amount: Money::from_minor(500),
                percent_off: DiscountPercent::new(10).unwrap(),
            },
        )
        .await;
        let receipt = receipt_with(&store, gel(), &[(&p, 1), (&r, 4)]).await;
        let service = service(&store, FixedRates::new());

        let payment = service.add_payment(&receipt.id).await.unwrap();
        assert_eq!(payment.receipt.status, ReceiptStatus::Closed);
        assert_eq!(payment.discounted_total.minor(), 990);
        assert_eq!(payment.receipt.discounted_total.minor(), 990);
        assert!(payment.receipt.is_paid());

        let err = service.add_payment(&receipt.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyClosed { .. }));

        // Closed receipts can still be quoted
        let quote = service.calculate_payment(&receipt.id).await.unwrap();
        assert_eq!(quote.discounted_total.minor(), 990);
    }

    #[tokio::test]
    async fn test_unknown_receipt() {
        let store = store();
        let err = service(&store, FixedRates::new())
            .calculate_payment("missing")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { ref entity, .. } if entity == "Receipt"));
    }
}
