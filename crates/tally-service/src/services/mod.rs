//! # Services
//!
//! One service per aggregate. Each holds the store behind `Arc<dyn Store>`,
//! so the same code runs against memory and SQLite.
//!
//! ```text
//! ProductService   create / get / list / update_price
//! ShiftService     open / get / close / x_report / z_report / sales_report
//! ReceiptService   create / get / add_item / close
//! CampaignService  create / get / list / links / delete
//! PaymentService   calculate_payment / add_payment
//! ```

pub mod campaign;
pub mod payment;
pub mod product;
pub mod receipt;
pub mod shift;

pub use campaign::CampaignService;
pub use payment::PaymentService;
pub use product::ProductService;
pub use receipt::ReceiptService;
pub use shift::ShiftService;
