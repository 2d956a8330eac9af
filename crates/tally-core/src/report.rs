//! # Reports
//!
//! Shift (X/Z) and lifetime sales reports, built from receipts the caller
//! already loaded. Only paid receipts count as sales; a receipt closed
//! without a payment carries no revenue.
//!
//! ## Revenue
//! Revenue is grouped by the currency the customer paid in. Amounts are the
//! base-currency discounted totals recorded when each payment was taken, so
//! the groups add up to `total_revenue`.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::currency::CurrencyCode;
use crate::money::Money;
use crate::types::Receipt;

/// Units of one product sold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductQuantity {
    pub product_id: String,
    pub quantity: i64,
}

/// X report (shift still open) or Z report (shift closed right after).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShiftReport {
    pub shift_id: String,
    /// Number of paid receipts.
    pub receipt_count: usize,
    pub revenue: BTreeMap<CurrencyCode, Money>,
    pub total_revenue: Money,
    /// Quantities sold, in order of first sale.
    pub products: Vec<ProductQuantity>,
}

/// One settled receipt in the lifetime report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaidReceiptSummary {
    pub receipt_id: String,
    pub shift_id: String,
    pub currency: CurrencyCode,
    pub total: Money,
    pub discounted_total: Money,
}

/// Sales across every shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesReport {
    pub receipt_count: usize,
    pub revenue: BTreeMap<CurrencyCode, Money>,
    pub total_revenue: Money,
    pub paid_receipts: Vec<PaidReceiptSummary>,
}

fn paid(receipts: &[Receipt]) -> impl Iterator<Item = &Receipt> {
    receipts.iter().filter(|receipt| receipt.is_paid())
}

fn revenue_by_currency<'a>(
    receipts: impl Iterator<Item = &'a Receipt>,
) -> (BTreeMap<CurrencyCode, Money>, Money) {
    let mut revenue: BTreeMap<CurrencyCode, Money> = BTreeMap::new();
    let mut total = Money::zero();

    for receipt in receipts {
        *revenue.entry(receipt.currency.clone()).or_default() += receipt.discounted_total;
        total += receipt.discounted_total;
    }

    (revenue, total)
}

/// Builds the report for one shift from that shift's receipts.
pub fn shift_report(shift_id: &str, receipts: &[Receipt]) -> ShiftReport {
    let (revenue, total_revenue) = revenue_by_currency(paid(receipts));

    let mut products: Vec<ProductQuantity> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for line in paid(receipts).flat_map(|receipt| receipt.lines.iter()) {
        match positions.get(line.product_id.as_str()) {
            Some(&position) => products[position].quantity += line.quantity,
            None => {
                positions.insert(line.product_id.as_str(), products.len());
                products.push(ProductQuantity {
                    product_id: line.product_id.clone(),
                    quantity: line.quantity,
                });
            }
        }
    }

    ShiftReport {
        shift_id: shift_id.to_string(),
        receipt_count: paid(receipts).count(),
        revenue,
        total_revenue,
        products,
    }
}

/// Builds the lifetime report from every receipt ever created.
pub fn sales_report(receipts: &[Receipt]) -> SalesReport {
    let (revenue, total_revenue) = revenue_by_currency(paid(receipts));

    let paid_receipts: Vec<PaidReceiptSummary> = paid(receipts)
        .map(|receipt| PaidReceiptSummary {
            receipt_id: receipt.id.clone(),
            shift_id: receipt.shift_id.clone(),
            currency: receipt.currency.clone(),
            total: receipt.total,
            discounted_total: receipt.discounted_total,
        })
        .collect();

    SalesReport {
        receipt_count: paid_receipts.len(),
        revenue,
        total_revenue,
        paid_receipts,
    }
}
