//! # Pricing
//!
//! The campaign discount and payment calculation engine.
//!
//! ## Control Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Receipt ──► PricingEngine::price ──────────────► PricedReceipt        │
//! │                 │        │                          (base currency)     │
//! │                 │        ▼                                 │            │
//! │                 │   CampaignIndex::campaigns_for           │            │
//! │                 │        │                                 ▼            │
//! │                 ▼        ▼                       settle(base, rate)     │
//! │             Catalog   resolver::price_under                │            │
//! │                          │                                 ▼            │
//! │                          ▼                        ReceiptForPayment     │
//! │                   combo::is_satisfied             (receipt currency)    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Looking up the exchange rate happens between `price` and `settle`, outside
//! this crate, because it is I/O.

pub mod catalog;
pub mod combo;
pub mod engine;
pub mod index;
pub mod resolver;

pub use catalog::Catalog;
pub use engine::{LineQuote, PaymentSummary, PricedReceipt, PricingEngine, ReceiptForPayment};
pub use index::CampaignIndex;
pub use resolver::price_under;
