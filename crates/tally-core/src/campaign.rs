//! # Campaigns
//!
//! Promotional campaigns as a closed sum type. Every kind carries exactly the
//! data it needs, so the pricing resolver dispatches with an exhaustive
//! `match` instead of runtime type checks.
//!
//! ## Campaign Kinds
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Kind              Scope          Effect                                │
//! │  ────────────────  ─────────────  ──────────────────────────────────── │
//! │  Discount          one product    line − floor(line × pct / 100)       │
//! │  BuyNGetN          one product    every (buy+get) units, `get` free    │
//! │  Combo             ≥2 products    pct off each line, all-or-nothing    │
//! │  ReceiptDiscount   whole receipt  pct off running total ≥ min_amount   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! ```json
//! { "id": "…", "type": "combo", "product_ids": ["p-1", "p-2"], "percent_off": 20, "created_at": "…" }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::types::Product;
use crate::validation::{
    validate_amount, validate_bundle_quantity, validate_percent, ValidationResult,
};

// =============================================================================
// Discount Percent
// =============================================================================

/// A whole-number percentage in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(try_from = "u32", into = "u32")]
#[ts(export)]
pub struct DiscountPercent(u32);

impl DiscountPercent {
    /// Creates a percentage, rejecting values above 100.
    pub fn new(percent: u32) -> ValidationResult<Self> {
        validate_percent(percent)?;
        Ok(DiscountPercent(percent))
    }

    #[inline]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Applies the discount to `amount`, flooring the discount.
    #[inline]
    pub fn apply(&self, amount: Money) -> Money {
        amount.less_percent(self.0)
    }
}

impl TryFrom<u32> for DiscountPercent {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        DiscountPercent::new(value)
    }
}

impl From<DiscountPercent> for u32 {
    fn from(percent: DiscountPercent) -> Self {
        percent.0
    }
}

// =============================================================================
// Campaign Kind
// =============================================================================

/// The rules of a campaign, one variant per kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum CampaignKind {
    /// Flat percentage off one product's line total.
    Discount {
        product_id: String,
        percent_off: DiscountPercent,
    },

    /// For every `buy_quantity + get_quantity` units, `get_quantity` are free.
    BuyNGetN {
        product_id: String,
        buy_quantity: i64,
        get_quantity: i64,
    },

    /// Percentage off every participating line, only when all products are present.
    Combo {
        product_ids: Vec<String>,
        percent_off: DiscountPercent,
    },

    /// Percentage off the discounted receipt total once it reaches `min_amount`.
    ReceiptDiscount {
        min_amount: Money,
        percent_off: DiscountPercent,
    },
}

impl CampaignKind {
    /// Stable name of the kind, matching the serialized `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            CampaignKind::Discount { .. } => "discount",
            CampaignKind::BuyNGetN { .. } => "buy_n_get_n",
            CampaignKind::Combo { .. } => "combo",
            CampaignKind::ReceiptDiscount { .. } => "receipt_discount",
        }
    }

    /// Products the campaign is attached to. Empty for receipt-level kinds.
    pub fn product_ids(&self) -> Vec<&str> {
        match self {
            CampaignKind::Discount { product_id, .. }
            | CampaignKind::BuyNGetN { product_id, .. } => vec![product_id.as_str()],
            CampaignKind::Combo { product_ids, .. } => {
                product_ids.iter().map(String::as_str).collect()
            }
            CampaignKind::ReceiptDiscount { .. } => Vec::new(),
        }
    }

    /// True for kinds keyed on the receipt total rather than a product.
    #[inline]
    pub fn is_receipt_level(&self) -> bool {
        matches!(self, CampaignKind::ReceiptDiscount { .. })
    }

    /// Percentage carried by the campaign, if its kind has one.
    pub fn percent_off(&self) -> Option<DiscountPercent> {
        match self {
            CampaignKind::Discount { percent_off, .. }
            | CampaignKind::Combo { percent_off, .. }
            | CampaignKind::ReceiptDiscount { percent_off, .. } => Some(*percent_off),
            CampaignKind::BuyNGetN { .. } => None,
        }
    }

    /// Checks the per-kind rules.
    ///
    /// ## Rules
    /// - buy/get quantities positive
    /// - combo over at least two distinct products
    /// - receipt threshold non-negative
    pub fn validate(&self) -> ValidationResult<()> {
        match self {
            CampaignKind::Discount { product_id, .. } => require_product_id(product_id),
            CampaignKind::BuyNGetN {
                product_id,
                buy_quantity,
                get_quantity,
            } => {
                require_product_id(product_id)?;
                validate_bundle_quantity("buy_quantity", *buy_quantity)?;
                validate_bundle_quantity("get_quantity", *get_quantity)
            }
            CampaignKind::Combo { product_ids, .. } => {
                for id in product_ids {
                    require_product_id(id)?;
                }
                let mut distinct: Vec<&String> = product_ids.iter().collect();
                distinct.sort();
                distinct.dedup();
                if distinct.len() < 2 {
                    return Err(ValidationError::TooFew {
                        field: "product_ids".to_string(),
                        min: 2,
                    });
                }
                Ok(())
            }
            CampaignKind::ReceiptDiscount { min_amount, .. } => {
                validate_amount("min_amount", min_amount.minor())
            }
        }
    }

    /// Removes repeated combo members, keeping first occurrences in order.
    fn normalize(&mut self) {
        if let CampaignKind::Combo { product_ids, .. } = self {
            let mut seen = std::collections::HashSet::new();
            product_ids.retain(|id| seen.insert(id.clone()));
        }
    }
}

fn require_product_id(product_id: &str) -> ValidationResult<()> {
    if product_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "product_id".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Campaign
// =============================================================================

/// A registered promotional campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Campaign {
    pub id: String,

    #[serde(flatten)]
    #[ts(flatten)]
    pub kind: CampaignKind,

    /// Registration time. Receipt-level ties are broken by registration order.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    /// Validates `kind` and creates a campaign with a generated ID.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::campaign::{Campaign, CampaignKind, DiscountPercent};
    ///
    /// let campaign = Campaign::new(CampaignKind::Discount {
    ///     product_id: "p-1".to_string(),
    ///     percent_off: DiscountPercent::new(10).unwrap(),
    /// }).unwrap();
    /// assert_eq!(campaign.kind.name(), "discount");
    /// ```
    pub fn new(mut kind: CampaignKind) -> CoreResult<Self> {
        kind.normalize();
        kind.validate()?;

        Ok(Campaign {
            id: Uuid::new_v4().to_string(),
            kind,
            created_at: Utc::now(),
        })
    }

    /// Builds the per-product links stored alongside the campaign.
    ///
    /// `products` must hold every product the campaign references; missing
    /// ones are skipped, the caller checks existence first.
    pub fn links<'a>(&self, products: impl IntoIterator<Item = &'a Product>) -> Vec<CampaignLink> {
        let products: Vec<&Product> = products.into_iter().collect();

        self.kind
            .product_ids()
            .into_iter()
            .filter_map(|product_id| {
                products
                    .iter()
                    .find(|p| p.id == product_id)
                    .map(|product| CampaignLink {
                        campaign_id: self.id.clone(),
                        product_id: product.id.clone(),
                        reference_price: reference_price(&self.kind, product),
                    })
            })
            .collect()
    }
}

// =============================================================================
// Campaign Link
// =============================================================================

/// One product a campaign is attached to.
///
/// `reference_price` is the discounted unit price at registration time. It is
/// informational only: pricing always recomputes from live campaign data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CampaignLink {
    pub campaign_id: String,
    pub product_id: String,
    pub reference_price: Money,
}

/// Unit price of `product` under `kind`, as recorded in a [`CampaignLink`].
pub fn reference_price(kind: &CampaignKind, product: &Product) -> Money {
    match kind {
        CampaignKind::Discount { percent_off, .. } | CampaignKind::Combo { percent_off, .. } => {
            percent_off.apply(product.unit_price)
        }
        CampaignKind::BuyNGetN { .. } | CampaignKind::ReceiptDiscount { .. } => product.unit_price,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
