//! # Receipt Pricing Engine
//!
//! Computes what a receipt costs after campaigns, in one pass.
//!
//! ## Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  for line in receipt.lines (in order):                                  │
//! │      candidates = index.campaigns_for(line.product_id)                  │
//! │      best       = min(line_total, price_under(line, c) for c in cands)  │
//! │      running   += best                     (no stacking on one line)    │
//! │                                                                         │
//! │  satisfied = receipt-level campaigns with min_amount ≤ running          │
//! │  pick ONE: highest percent_off, earliest registered on a tie            │
//! │  running  -= floor(running × pct / 100)    (never compounds)            │
//! │                                                                         │
//! │  reduced   = receipt.total − running                                    │
//! │  settle(): convert total and running with one rate, truncating          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Pricing reads only. Open and closed receipts quote the same way; persisting
//! the outcome is the payment service's job.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::campaign::{Campaign, CampaignKind};
use crate::currency::{convert, CurrencyCode, ExchangeRate};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::Receipt;

use super::catalog::Catalog;
use super::index::CampaignIndex;
use super::resolver::price_under;

// =============================================================================
// Results
// =============================================================================

/// How one line was priced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineQuote {
    pub product_id: String,
    pub quantity: i64,
    /// Undiscounted line total (base currency).
    pub line_total: Money,
    /// Lowest price over all candidate campaigns (base currency).
    pub best_price: Money,
    /// Campaign that produced `best_price`, if any lowered it.
    pub campaign_id: Option<String>,
}

/// A receipt priced in the base currency, before conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedReceipt {
    pub receipt: Receipt,
    pub lines: Vec<LineQuote>,
    /// Sum of line best prices, before any receipt-level discount.
    pub line_subtotal: Money,
    /// The receipt-level campaign that was applied, if one qualified.
    pub receipt_campaign_id: Option<String>,
    pub discounted_total: Money,
    /// `receipt.total − discounted_total`.
    pub reduced_amount: Money,
}

/// A priced receipt expressed in the receipt's own currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptForPayment {
    pub receipt: Receipt,
    pub lines: Vec<LineQuote>,
    pub receipt_campaign_id: Option<String>,
    /// Base-currency payable amount; this is what gets persisted.
    pub base_discounted_total: Money,
    /// Rate applied to reach the receipt currency.
    pub rate: ExchangeRate,
    pub currency: CurrencyCode,
    pub total: Money,
    pub discounted_total: Money,
    pub reduced_amount: Money,
}

/// What the request layer shows the cashier.
///
/// All amounts are minor units of `currency`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentSummary {
    pub receipt_id: String,
    pub total: Money,
    pub discounted_total: Money,
    pub amount_saved: Money,
    pub currency: CurrencyCode,
}

impl ReceiptForPayment {
    pub fn summary(&self) -> PaymentSummary {
        PaymentSummary {
            receipt_id: self.receipt.id.clone(),
            total: self.total,
            discounted_total: self.discounted_total,
            amount_saved: self.reduced_amount,
            currency: self.currency.clone(),
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Prices receipts against a campaign index and product catalog.
#[derive(Debug, Clone, Copy)]
pub struct PricingEngine<'a> {
    index: &'a CampaignIndex,
    catalog: &'a Catalog,
}

impl<'a> PricingEngine<'a> {
    pub fn new(index: &'a CampaignIndex, catalog: &'a Catalog) -> Self {
        PricingEngine { index, catalog }
    }

    /// Prices `receipt` in the base currency.
    ///
    /// ## Errors
    /// - `ProductNotFound` if a line references a product missing from the catalog
    /// - `InternalConsistency` if the index hands out a campaign that does not
    ///   cover the line
    pub fn price(&self, receipt: &Receipt) -> CoreResult<PricedReceipt> {
        let mut lines = Vec::with_capacity(receipt.lines.len());
        let mut running = Money::zero();

        for line in &receipt.lines {
            if !self.catalog.contains(&line.product_id) {
                return Err(CoreError::ProductNotFound(line.product_id.clone()));
            }

            let mut best = line.line_total;
            let mut winner: Option<&Campaign> = None;

            for candidate in self.index.campaigns_for(&line.product_id) {
                let price = price_under(line, candidate, receipt)?;
                // strict: on equal prices the earlier campaign keeps the line
                if price < best {
                    best = price;
                    winner = Some(candidate);
                }
            }

            running = running
                .checked_add(best)
                .ok_or_else(|| CoreError::amount_overflow("discounted_total"))?;
            lines.push(LineQuote {
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                line_total: line.line_total,
                best_price: best,
                campaign_id: winner.map(|c| c.id.clone()),
            });
        }

        let line_subtotal = running;
        let receipt_campaign = self.pick_receipt_discount(running);
        if let Some((_, percent)) = receipt_campaign {
            running = running.less_percent(percent);
        }

        Ok(PricedReceipt {
            receipt: receipt.clone(),
            lines,
            line_subtotal,
            receipt_campaign_id: receipt_campaign.map(|(c, _)| c.id.clone()),
            discounted_total: running,
            reduced_amount: receipt.total - running,
        })
    }

    /// The single receipt-level campaign to apply to `running`.
    ///
    /// Highest `percent_off` among campaigns whose threshold is met; the
    /// earliest registered wins a tie.
    fn pick_receipt_discount(&self, running: Money) -> Option<(&'a Campaign, u32)> {
        let mut chosen: Option<(&'a Campaign, u32)> = None;

        for campaign in self.index.receipt_level_campaigns() {
            let CampaignKind::ReceiptDiscount {
                min_amount,
                percent_off,
            } = &campaign.kind
            else {
                continue;
            };

            if *min_amount > running {
                continue;
            }

            let percent = percent_off.get();
            match chosen {
                Some((_, best)) if best >= percent => {}
                _ => chosen = Some((campaign, percent)),
            }
        }

        chosen
    }
}

impl PricedReceipt {
    /// True when the receipt is paid in something other than `base`.
    pub fn needs_conversion(&self, base: &CurrencyCode) -> bool {
        self.receipt.currency != *base
    }

    /// Converts the result into the receipt's currency.
    ///
    /// `rate` is units of the receipt currency per unit of `base`. It is
    /// ignored when no conversion is needed. Both totals are truncated and the
    /// saved amount is their difference, so the three figures reconcile.
    pub fn settle(self, base: &CurrencyCode, rate: ExchangeRate) -> ReceiptForPayment {
        let currency = self.receipt.currency.clone();
        let rate = if self.needs_conversion(base) {
            rate
        } else {
            ExchangeRate::ONE
        };

        let total = convert(self.receipt.total, base, &currency, rate);
        let discounted_total = convert(self.discounted_total, base, &currency, rate);

        ReceiptForPayment {
            base_discounted_total: self.discounted_total,
            receipt: self.receipt,
            lines: self.lines,
            receipt_campaign_id: self.receipt_campaign_id,
            rate,
            currency,
            total,
            discounted_total,
            reduced_amount: total - discounted_total,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::DiscountPercent;
    use crate::types::Product;

    fn pct(p: u32) -> DiscountPercent {
        DiscountPercent::new(p).unwrap()
    }

    fn gel() -> CurrencyCode {
        CurrencyCode::new("GEL").unwrap()
    }

    fn discount(product: &Product, percent: u32) -> Campaign {
        Campaign::new(CampaignKind::Discount {
            product_id: product.id.clone(),
            percent_off: pct(percent),
        })
        .unwrap()
    }

    fn combo(products: &[&Product], percent: u32) -> Campaign {
        Campaign::new(CampaignKind::Combo {
            product_ids: products.iter().map(|p| p.id.clone()).collect(),
            percent_off: pct(percent),
        })
        .unwrap()
    }

    fn receipt_discount(min: i64, percent: u32) -> Campaign {
        Campaign::new(CampaignKind::ReceiptDiscount {
            min_amount: Money::from_minor(min),
            percent_off: pct(percent),
        })
        .unwrap()
    }

    fn receipt(currency: CurrencyCode, lines: &[(&Product, i64)]) -> Receipt {
        let mut receipt = Receipt::open("shift-1", currency);
        for (product, quantity) in lines {
            receipt.add_line(product, *quantity).unwrap();
        }
        receipt
    }

    fn price(receipt: &Receipt, products: &[&Product], campaigns: Vec<Campaign>) -> PricedReceipt {
        let catalog: Catalog = products.iter().map(|p| (*p).clone()).collect();
        let index = CampaignIndex::build(campaigns);
        PricingEngine::new(&index, &catalog).price(receipt).unwrap()
    }

    #[test]
    fn test_flat_discount() {
        let p = Product::new("P", Money::from_minor(100), "1");
        let r = receipt(gel(), &[(&p, 2)]);

        let priced = price(&r, &[&p], vec![discount(&p, 10)]);
        assert_eq!(priced.receipt.total.minor(), 200);
        assert_eq!(priced.discounted_total.minor(), 180);
        assert_eq!(priced.reduced_amount.minor(), 20);
    }

    #[test]
    fn test_buy_two_get_one() {
        let q = Product::new("Q", Money::from_minor(200), "2");
        let campaign = Campaign::new(CampaignKind::BuyNGetN {
            product_id: q.id.clone(),
            buy_quantity: 2,
            get_quantity: 1,
        })
        .unwrap();
        let r = receipt(gel(), &[(&q, 3)]);

        let priced = price(&r, &[&q], vec![campaign]);
        assert_eq!(priced.discounted_total.minor(), 400);
    }

    #[test]
    fn test_combo_all_or_nothing() {
        let p = Product::new("P", Money::from_minor(100), "1");
        let r = Product::new("R", Money::from_minor(200), "2");

        let both = receipt(gel(), &[(&p, 1), (&r, 1)]);
        let priced = price(&both, &[&p, &r], vec![combo(&[&p, &r], 20)]);
        assert_eq!(priced.lines[0].best_price.minor(), 80);
        assert_eq!(priced.lines[1].best_price.minor(), 160);
        assert_eq!(priced.discounted_total.minor(), 240);

        let only_p = receipt(gel(), &[(&p, 1)]);
        let priced = price(&only_p, &[&p, &r], vec![combo(&[&p, &r], 20)]);
        assert_eq!(priced.discounted_total.minor(), 100);
        assert_eq!(priced.lines[0].campaign_id, None);
    }

    #[test]
    fn test_receipt_discount_threshold() {
        let p = Product::new("P", Money::from_minor(290), "1");
        let r = receipt(gel(), &[(&p, 2)]);

        let priced = price(&r, &[&p], vec![receipt_discount(500, 10)]);
        assert_eq!(priced.line_subtotal.minor(), 580);
        assert_eq!(priced.discounted_total.minor(), 522);
        assert!(priced.receipt_campaign_id.is_some());

        let priced = price(&r, &[&p], vec![receipt_discount(581, 10)]);
        assert_eq!(priced.discounted_total.minor(), 580);
        assert!(priced.receipt_campaign_id.is_none());
    }

    #[test]
    fn test_receipt_discount_checked_against_discounted_total() {
        // 600 before line discounts, 540 after; threshold 550 is not met
        let p = Product::new("P", Money::from_minor(300), "1");
        let r = receipt(gel(), &[(&p, 2)]);

        let priced = price(&r, &[&p], vec![discount(&p, 10), receipt_discount(550, 50)]);
        assert_eq!(priced.discounted_total.minor(), 540);
    }

    #[test]
    fn test_receipt_discount_applies_once() {
        let p = Product::new("P", Money::from_minor(1000), "1");
        let r = receipt(gel(), &[(&p, 1)]);

        let small = receipt_discount(0, 5);
        let large = receipt_discount(100, 20);
        let tied = receipt_discount(200, 20);
        let large_id = large.id.clone();

        let priced = price(&r, &[&p], vec![small, large, tied]);
        // 20% once, not 5% + 20% + 20%
        assert_eq!(priced.discounted_total.minor(), 800);
        assert_eq!(priced.receipt_campaign_id, Some(large_id));
    }

    #[test]
    fn test_best_price_independent_of_registration_order() {
        let p = Product::new("P", Money::from_minor(100), "1");
        let r = receipt(gel(), &[(&p, 4)]);

        let worse = discount(&p, 10);
        let better = discount(&p, 30);

        let a = price(&r, &[&p], vec![worse.clone(), better.clone()]);
        let b = price(&r, &[&p], vec![better.clone(), worse]);

        assert_eq!(a.discounted_total.minor(), 280);
        assert_eq!(a.discounted_total, b.discounted_total);
        assert_eq!(a.lines[0].campaign_id, Some(better.id.clone()));
        assert_eq!(b.lines[0].campaign_id, Some(better.id));
    }

    #[test]
    fn test_campaigns_do_not_stack_on_a_line() {
        let p = Product::new("P", Money::from_minor(100), "1");
        let r_product = Product::new("R", Money::from_minor(100), "2");
        let r = receipt(gel(), &[(&p, 1), (&r_product, 1)]);

        let priced = price(
            &r,
            &[&p, &r_product],
            vec![discount(&p, 10), combo(&[&p, &r_product], 20)],
        );
        // P gets 20% (combo), not 10% + 20%
        assert_eq!(priced.lines[0].best_price.minor(), 80);
        assert_eq!(priced.discounted_total.minor(), 160);
    }

    #[test]
    fn test_line_without_campaigns_keeps_full_price() {
        let p = Product::new("P", Money::from_minor(100), "1");
        let other = Product::new("O", Money::from_minor(50), "2");
        let r = receipt(gel(), &[(&p, 1), (&other, 3)]);

        let priced = price(&r, &[&p, &other], vec![discount(&p, 50)]);
        assert_eq!(priced.lines[1].best_price.minor(), 150);
        assert_eq!(priced.discounted_total.minor(), 200);
    }

    #[test]
    fn test_missing_product_is_not_found() {
        let p = Product::new("P", Money::from_minor(100), "1");
        let r = receipt(gel(), &[(&p, 1)]);

        let catalog = Catalog::new();
        let index = CampaignIndex::default();
        let err = PricingEngine::new(&index, &catalog).price(&r).unwrap_err();
        assert!(matches!(err, CoreError::ProductNotFound(id) if id == p.id));
    }

    #[test]
    fn test_closed_receipt_still_quotes() {
        let p = Product::new("P", Money::from_minor(100), "1");
        let mut r = receipt(gel(), &[(&p, 2)]);
        r.record_payment(Money::from_minor(180)).unwrap();

        let priced = price(&r, &[&p], vec![discount(&p, 10)]);
        assert_eq!(priced.discounted_total.minor(), 180);
    }

    #[test]
    fn test_idempotent() {
        let p = Product::new("P", Money::from_minor(123), "1");
        let q = Product::new("Q", Money::from_minor(77), "2");
        let r = receipt(gel(), &[(&p, 3), (&q, 5)]);
        let campaigns = vec![
            discount(&p, 15),
            combo(&[&p, &q], 10),
            receipt_discount(100, 5),
        ];

        let first = price(&r, &[&p, &q], campaigns.clone());
        let second = price(&r, &[&p, &q], campaigns);
        assert_eq!(first, second);
    }

    #[test]
    fn test_settle_converts_with_truncation() {
        let p = Product::new("P", Money::from_minor(100), "1");
        let r = receipt(CurrencyCode::new("USD").unwrap(), &[(&p, 2)]);

        let priced = price(&r, &[&p], vec![discount(&p, 10)]);
        assert!(priced.needs_conversion(&gel()));

        let payment = priced.settle(&gel(), ExchangeRate::from_f64(2.5).unwrap());
        assert_eq!(payment.base_discounted_total.minor(), 180);
        assert_eq!(payment.discounted_total.minor(), 450);
        assert_eq!(payment.total.minor(), 500);
        assert_eq!(payment.reduced_amount.minor(), 50);

        let summary = payment.summary();
        assert_eq!(summary.currency.as_str(), "USD");
        assert_eq!(summary.amount_saved.minor(), 50);
    }

    #[test]
    fn test_settle_in_base_currency_ignores_rate() {
        let p = Product::new("P", Money::from_minor(100), "1");
        let r = receipt(gel(), &[(&p, 2)]);

        let priced = price(&r, &[&p], vec![discount(&p, 10)]);
        assert!(!priced.needs_conversion(&gel()));

        let payment = priced.settle(&gel(), ExchangeRate::from_f64(3.0).unwrap());
        assert_eq!(payment.discounted_total.minor(), 180);
        assert_eq!(payment.total.minor(), 200);
        assert_eq!(payment.rate, ExchangeRate::ONE);
    }
}
