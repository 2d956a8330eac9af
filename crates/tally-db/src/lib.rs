//! # tally-db: Storage Layer for Tally POS
//!
//! Async store contracts and the two backends behind them.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Data Flow                              │
//! │                                                                         │
//! │  tally-service (ReceiptService, PaymentService, ...)                   │
//! │       │  Arc<dyn Store>                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │  MemoryStore  │    │   Database    │    │  Migrations  │   │   │
//! │  │   │  (memory.rs)  │    │   (pool.rs)   │    │  (embedded)  │   │   │
//! │  │   │               │    │       │       │    │              │   │   │
//! │  │   │ RwLock<Tables>│    │  Repositories │    │ 001_init.sql │   │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`store`] - the store traits services program against
//! - [`memory`] - process-lifetime backend
//! - [`pool`] - SQLite pool creation and configuration
//! - [`migrations`] - embedded schema migrations
//! - [`repository`] - SQLite repositories
//! - [`error`] - database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tally_db::{Database, DbConfig, MemoryStore, Store};
//!
//! let store: Arc<dyn Store> = Arc::new(Database::new(DbConfig::new("tally.db")).await?);
//! let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod memory;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use memory::MemoryStore;
pub use pool::{Database, DbConfig};
pub use store::{CampaignStore, ProductStore, ReceiptStore, ShiftStore, Store};

pub use repository::{CampaignRepository, ProductRepository, ReceiptRepository, ShiftRepository};
