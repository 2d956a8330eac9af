//! # tally-core: Pure Business Logic for Tally POS
//!
//! Everything Tally POS knows about money, receipts and campaigns, as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    tally-service                                │   │
//! │  │   products, shifts, receipts, campaigns, payments, FX lookups  │   │
//! │  └──────────────┬───────────────────────────────┬──────────────────┘   │
//! │                 │                               │                       │
//! │  ┌──────────────▼──────────────────┐  ┌─────────▼──────────────────┐   │
//! │  │  ★ tally-core (THIS CRATE) ★    │  │  tally-db                  │   │
//! │  │                                 │  │  store traits, in-memory   │   │
//! │  │  types  money  campaign         │  │  and SQLite backends       │   │
//! │  │  currency  pricing  report      │  └────────────────────────────┘   │
//! │  │                                 │                                    │
//! │  │  NO I/O • NO DATABASE • NO NET  │                                    │
//! │  └─────────────────────────────────┘                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Product, Receipt, LineItem, Shift
//! - [`money`] - Money type with integer arithmetic
//! - [`campaign`] - Campaign kinds as a sum type
//! - [`pricing`] - Campaign index, resolver, combo check, receipt engine
//! - [`currency`] - Currency codes and conversion math
//! - [`report`] - X/Z and lifetime sales reports
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::campaign::{Campaign, CampaignKind, DiscountPercent};
//! use tally_core::currency::CurrencyCode;
//! use tally_core::pricing::{CampaignIndex, Catalog, PricingEngine};
//! use tally_core::{Money, Product, Receipt};
//!
//! let bread = Product::new("Shoti", Money::from_minor(100), "4860001");
//! let campaign = Campaign::new(CampaignKind::Discount {
//!     product_id: bread.id.clone(),
//!     percent_off: DiscountPercent::new(10).unwrap(),
//! }).unwrap();
//!
//! let mut receipt = Receipt::open("shift-1", CurrencyCode::new("GEL").unwrap());
//! receipt.add_line(&bread, 2).unwrap();
//!
//! let catalog: Catalog = vec![bread].into_iter().collect();
//! let index = CampaignIndex::build(vec![campaign]);
//! let priced = PricingEngine::new(&index, &catalog).price(&receipt).unwrap();
//!
//! assert_eq!(priced.discounted_total.minor(), 180);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod campaign;
pub mod currency;
pub mod error;
pub mod money;
pub mod pricing;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use campaign::{Campaign, CampaignKind, CampaignLink, DiscountPercent};
pub use currency::{CurrencyCode, ExchangeRate};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Currency all stored amounts are denominated in unless configured otherwise.
pub const DEFAULT_BASE_CURRENCY: &str = "GEL";

/// Maximum lines on a single receipt.
pub const MAX_RECEIPT_LINES: usize = 200;

/// Maximum quantity on a single line.
///
/// ## Business Reason
/// Catches typos like 1000 instead of 10 at the till.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Largest accepted price or threshold, in minor units (100 million major
/// units).
///
/// Together with `MAX_ITEM_QUANTITY` and `MAX_RECEIPT_LINES` this keeps every
/// receipt total far inside `i64`.
pub const MAX_AMOUNT: i64 = 10_000_000_000;
