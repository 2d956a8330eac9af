//! # tally-service: Application Services for Tally POS
//!
//! Connects the pure pricing core to a store and an exchange-rate provider.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Request Flow                           │
//! │                                                                         │
//! │  Request layer (CLI, HTTP, desktop shell)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                  tally-service (THIS CRATE)                     │    │
//! │  │                                                                 │    │
//! │  │   Tally ──► ProductService  ShiftService  ReceiptService        │    │
//! │  │             CampaignService PaymentService                      │    │
//! │  │                  │                  │                           │    │
//! │  │                  ▼                  ▼                           │    │
//! │  │          Arc<dyn Store>     Arc<dyn RateProvider>               │    │
//! │  └──────────────────┼──────────────────┼───────────────────────────┘    │
//! │                     ▼                  ▼                                │
//! │         tally-db (memory/SQLite)   exchange-rate API (reqwest)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_service::{telemetry, Tally, TallyConfig};
//!
//! telemetry::init_tracing();
//! let tally = Tally::from_config(&TallyConfig::load(None)?).await?;
//!
//! let shift = tally.shifts.open().await?;
//! let receipt = tally.receipts.create(&shift.id, "GEL").await?;
//! tally.receipts.add_item(&receipt.id, &product_id, 2).await?;
//! let summary = tally.payments.add_payment(&receipt.id).await?.summary();
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod fx;
pub mod services;
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{StoreBackend, TallyConfig};
pub use error::{ServiceError, ServiceResult};
pub use fx::{ExchangeRateApi, FixedRates, FxError, FxResult, RateProvider};
pub use services::{CampaignService, PaymentService, ProductService, ReceiptService, ShiftService};

use std::sync::Arc;

use tracing::{info, warn};

use tally_core::CurrencyCode;
use tally_db::{Database, DbConfig, MemoryStore, Store};

/// Every service, sharing one store and one rate provider.
#[derive(Clone)]
pub struct Tally {
    pub products: ProductService,
    pub shifts: ShiftService,
    pub receipts: ReceiptService,
    pub campaigns: CampaignService,
    pub payments: PaymentService,
}

impl Tally {
    pub fn new(store: Arc<dyn Store>, rates: Arc<dyn RateProvider>, base: CurrencyCode) -> Self {
        Tally {
            products: ProductService::new(store.clone()),
            shifts: ShiftService::new(store.clone()),
            receipts: ReceiptService::new(store.clone()),
            campaigns: CampaignService::new(store.clone()),
            payments: PaymentService::new(store, rates, base),
        }
    }

    /// Opens the configured store and rate provider.
    ///
    /// Without an API key only base-currency receipts can be paid; foreign
    /// receipts fail with `ExternalService`.
    pub async fn from_config(config: &TallyConfig) -> ServiceResult<Self> {
        config.validate()?;
        let base = config.base_currency()?;

        let store: Arc<dyn Store> = match config.store.backend {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::Sqlite => {
                let db_config = DbConfig::new(config.database_path()?)
                    .max_connections(config.store.max_connections);
                Arc::new(Database::new(db_config).await?)
            }
        };

        let rates: Arc<dyn RateProvider> = match &config.exchange_rate.api_key {
            Some(key) => Arc::new(
                ExchangeRateApi::new(
                    config.exchange_rate.api_url.as_str(),
                    key.as_str(),
                    config.exchange_rate.timeout(),
                )
                .map_err(|e| ServiceError::Config(e.to_string()))?,
            ),
            None => {
                warn!("No exchange rate API key configured; only {} receipts can be paid", base);
                Arc::new(FixedRates::new())
            }
        };

        info!(backend = %config.store.backend, base = %base, "Tally services ready");
        Ok(Tally::new(store, rates, base))
    }
}

// =============================================================================
// End-to-end Tests
// =============================================================================
