//! # Line-Item Discount Resolver
//!
//! Prices one receipt line under one candidate campaign.
//!
//! ```text
//! Discount        line_total − floor(line_total × pct / 100)
//! BuyNGetN        line_total − floor(qty / (buy + get)) × get × unit_price
//! Combo           satisfied? line_total − floor(line_total × pct / 100)
//!                          : line_total
//! ReceiptDiscount never reaches a line (consistency error)
//! ```
//!
//! Pure: same inputs, same answer.

use crate::campaign::{Campaign, CampaignKind};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{LineItem, Receipt};

use super::combo;

/// Returns the line's total under `campaign`.
///
/// The result is always within `0..=line.line_total`.
///
/// ## Errors
/// `InternalConsistency` when the campaign is receipt-level or is not
/// attached to the line's product. Either means the index handed out a
/// campaign it should not have.
pub fn price_under(line: &LineItem, campaign: &Campaign, receipt: &Receipt) -> CoreResult<Money> {
    if !campaign
        .kind
        .product_ids()
        .contains(&line.product_id.as_str())
    {
        return Err(CoreError::consistency(format!(
            "{} campaign {} does not cover product {}",
            campaign.kind.name(),
            campaign.id,
            line.product_id
        )));
    }

    let price = match &campaign.kind {
        CampaignKind::Discount { percent_off, .. } => percent_off.apply(line.line_total),

        CampaignKind::BuyNGetN {
            buy_quantity,
            get_quantity,
            ..
        } => {
            if *buy_quantity <= 0 || *get_quantity <= 0 {
                return Err(CoreError::consistency(format!(
                    "buy_n_get_n campaign {} has non-positive quantities",
                    campaign.id
                )));
            }
            let bundle = buy_quantity + get_quantity;
            let free_units = (line.quantity / bundle) * get_quantity;
            line.line_total - line.unit_price.multiply_quantity(free_units)
        }

        CampaignKind::Combo {
            product_ids,
            percent_off,
        } => {
            if combo::is_satisfied(product_ids, receipt) {
                percent_off.apply(line.line_total)
            } else {
                line.line_total
            }
        }

        // Unreachable after the coverage check above; kept exhaustive.
        CampaignKind::ReceiptDiscount { .. } => {
            return Err(CoreError::consistency(format!(
                "receipt_discount campaign {} cannot price a line",
                campaign.id
            )));
        }
    };

    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::DiscountPercent;
    use crate::currency::CurrencyCode;
    use crate::types::Product;

    fn pct(p: u32) -> DiscountPercent {
        DiscountPercent::new(p).unwrap()
    }

    fn open_receipt() -> Receipt {
        Receipt::open("shift-1", CurrencyCode::new("GEL").unwrap())
    }

    fn buy_get(product: &Product, buy: i64, get: i64) -> Campaign {
        Campaign::new(CampaignKind::BuyNGetN {
            product_id: product.id.clone(),
            buy_quantity: buy,
            get_quantity: get,
        })
        .unwrap()
    }

    #[test]
    fn test_discount() {
        let p = Product::new("P", Money::from_minor(100), "1");
        let mut receipt = open_receipt();
        receipt.add_line(&p, 2).unwrap();

        let campaign = Campaign::new(CampaignKind::Discount {
            product_id: p.id.clone(),
            percent_off: pct(10),
        })
        .unwrap();

        let price = price_under(&receipt.lines[0], &campaign, &receipt).unwrap();
        assert_eq!(price.minor(), 180);
    }

    #[test]
    fn test_buy_n_get_n_one_bundle() {
        let q = Product::new("Q", Money::from_minor(200), "2");
        let mut receipt = open_receipt();
        receipt.add_line(&q, 3).unwrap();

        let price = price_under(&receipt.lines[0], &buy_get(&q, 2, 1), &receipt).unwrap();
        assert_eq!(price.minor(), 400);
    }

    #[test]
    fn test_buy_n_get_n_partial_bundle_earns_nothing() {
        let q = Product::new("Q", Money::from_minor(200), "2");
        let campaign = buy_get(&q, 3, 2);

        // buy + get - 1 units
        let mut receipt = open_receipt();
        receipt.add_line(&q, 4).unwrap();
        let price = price_under(&receipt.lines[0], &campaign, &receipt).unwrap();
        assert_eq!(price, receipt.lines[0].line_total);

        // exactly two bundles: 2 × get free
        let mut receipt = open_receipt();
        receipt.add_line(&q, 10).unwrap();
        let price = price_under(&receipt.lines[0], &campaign, &receipt).unwrap();
        assert_eq!(price.minor(), 2000 - 4 * 200);
    }

    #[test]
    fn test_combo_unsatisfied_leaves_line_untouched() {
        let p = Product::new("P", Money::from_minor(100), "1");
        let r = Product::new("R", Money::from_minor(200), "2");
        let combo = Campaign::new(CampaignKind::Combo {
            product_ids: vec![p.id.clone(), r.id.clone()],
            percent_off: pct(20),
        })
        .unwrap();

        let mut receipt = open_receipt();
        receipt.add_line(&p, 1).unwrap();
        assert_eq!(
            price_under(&receipt.lines[0], &combo, &receipt).unwrap().minor(),
            100
        );

        receipt.add_line(&r, 1).unwrap();
        assert_eq!(
            price_under(&receipt.lines[0], &combo, &receipt).unwrap().minor(),
            80
        );
        assert_eq!(
            price_under(&receipt.lines[1], &combo, &receipt).unwrap().minor(),
            160
        );
    }

    #[test]
    fn test_receipt_discount_is_a_consistency_error() {
        let p = Product::new("P", Money::from_minor(100), "1");
        let mut receipt = open_receipt();
        receipt.add_line(&p, 1).unwrap();

        let campaign = Campaign::new(CampaignKind::ReceiptDiscount {
            min_amount: Money::zero(),
            percent_off: pct(10),
        })
        .unwrap();

        let err = price_under(&receipt.lines[0], &campaign, &receipt).unwrap_err();
        assert!(matches!(err, CoreError::InternalConsistency(_)));
    }

    #[test]
    fn test_foreign_campaign_is_a_consistency_error() {
        let p = Product::new("P", Money::from_minor(100), "1");
        let other = Product::new("X", Money::from_minor(100), "9");
        let mut receipt = open_receipt();
        receipt.add_line(&p, 1).unwrap();

        let err = price_under(&receipt.lines[0], &buy_get(&other, 1, 1), &receipt).unwrap_err();
        assert!(matches!(err, CoreError::InternalConsistency(_)));
    }

    #[test]
    fn test_price_stays_within_line_total() {
        let p = Product::new("P", Money::from_minor(333), "1");
        let campaigns = vec![
            Campaign::new(CampaignKind::Discount {
                product_id: p.id.clone(),
                percent_off: pct(100),
            })
            .unwrap(),
            Campaign::new(CampaignKind::Discount {
                product_id: p.id.clone(),
                percent_off: pct(0),
            })
            .unwrap(),
            buy_get(&p, 1, 1),
            buy_get(&p, 1, 5),
            buy_get(&p, 50, 1),
        ];

        for quantity in 1..=25 {
            let mut receipt = open_receipt();
            receipt.add_line(&p, quantity).unwrap();
            let line = &receipt.lines[0];

            for campaign in &campaigns {
                let price = price_under(line, campaign, &receipt).unwrap();
                assert!(price <= line.line_total);
                assert!(!price.is_negative());
            }
        }
    }
}
