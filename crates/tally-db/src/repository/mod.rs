//! # Repository Module
//!
//! SQLite repositories, one per table family. [`crate::Database`] hands them
//! out and implements the store traits by delegating to them.
//!
//! ```text
//! Service
//!    │  store.append_line(receipt_id, line)
//!    ▼
//! impl ReceiptStore for Database
//!    │  self.receipts().append_line(..)
//!    ▼
//! ReceiptRepository ──► SQL (transaction) ──► SQLite
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`] - products and price updates
//! - [`ShiftRepository`] - shift open/close
//! - [`ReceiptRepository`] - receipts and their lines
//! - [`CampaignRepository`] - campaigns and campaign-product links

pub mod campaign;
pub mod product;
pub mod receipt;
pub mod shift;

pub use campaign::CampaignRepository;
pub use product::ProductRepository;
pub use receipt::ReceiptRepository;
pub use shift::ShiftRepository;
