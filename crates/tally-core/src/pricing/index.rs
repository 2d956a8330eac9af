//! # Campaign Index
//!
//! Maps product IDs to the campaigns that touch them.
//!
//! ```text
//! campaigns (registration order)        by_product
//! ┌───┬──────────────────────┐          ┌──────────┬─────────┐
//! │ 0 │ Discount(P, 10%)     │          │ P        │ [0, 2]  │
//! │ 1 │ ReceiptDiscount(500) │   ───►   │ Q        │ [3]     │
//! │ 2 │ Combo({P, R}, 20%)   │          │ R        │ [2]     │
//! │ 3 │ BuyNGetN(Q, 2, 1)    │          └──────────┴─────────┘
//! └───┴──────────────────────┘          receipt_level: [1]
//! ```
//!
//! Lookups are a single hash probe, so pricing a receipt with many lines
//! never scans the whole campaign list per line.

use std::collections::HashMap;

use crate::campaign::Campaign;

/// Read-only view of the registered campaigns.
#[derive(Debug, Clone, Default)]
pub struct CampaignIndex {
    campaigns: Vec<Campaign>,
    by_product: HashMap<String, Vec<usize>>,
    receipt_level: Vec<usize>,
}

impl CampaignIndex {
    /// Builds the index. Input order is registration order and is preserved
    /// by every lookup.
    pub fn build(campaigns: impl IntoIterator<Item = Campaign>) -> Self {
        let campaigns: Vec<Campaign> = campaigns.into_iter().collect();
        let mut by_product: HashMap<String, Vec<usize>> = HashMap::new();
        let mut receipt_level = Vec::new();

        for (position, campaign) in campaigns.iter().enumerate() {
            if campaign.kind.is_receipt_level() {
                receipt_level.push(position);
                continue;
            }

            for product_id in campaign.kind.product_ids() {
                let entries = by_product.entry(product_id.to_string()).or_default();
                // a product listed twice in one campaign is indexed once
                if entries.last() != Some(&position) {
                    entries.push(position);
                }
            }
        }

        CampaignIndex {
            campaigns,
            by_product,
            receipt_level,
        }
    }

    /// Campaigns attached to `product_id`, in registration order.
    pub fn campaigns_for(&self, product_id: &str) -> impl Iterator<Item = &Campaign> + '_ {
        self.by_product
            .get(product_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .map(move |&position| &self.campaigns[position])
    }

    /// Receipt-level campaigns, in registration order.
    pub fn receipt_level_campaigns(&self) -> impl Iterator<Item = &Campaign> + '_ {
        self.receipt_level
            .iter()
            .map(move |&position| &self.campaigns[position])
    }

    pub fn len(&self) -> usize {
        self.campaigns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.campaigns.is_empty()
    }
}
