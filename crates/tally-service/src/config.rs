//! # Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                            │
//! │     TALLY_STORE_BACKEND=sqlite                                          │
//! │     TALLY_DB_PATH=./tally.db                                            │
//! │     TALLY_BASE_CURRENCY=GEL                                             │
//! │     EXCHANGE_RATE_API_KEY=...                                           │
//! │     TALLY_EXCHANGE_RATE_URL=https://...                                 │
//! │                                                                         │
//! │  2. TOML Config File                                                    │
//! │     ~/.config/tallypos/tally.toml (Linux)                               │
//! │     ~/Library/Application Support/com.tally.pos/tally.toml (macOS)      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                    │
//! │     in-memory store, GEL, no API key                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [store]
//! backend = "sqlite"          # memory | sqlite
//! database_path = "/var/lib/tally/tally.db"
//! max_connections = 5
//!
//! [currency]
//! base = "GEL"
//!
//! [exchange_rate]
//! api_url = "https://v6.exchangerate-api.com/v6"
//! api_key = "..."
//! timeout_secs = 10
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use tally_core::{CurrencyCode, DEFAULT_BASE_CURRENCY};

use crate::error::{ServiceError, ServiceResult};

// =============================================================================
// Store Settings
// =============================================================================

/// Which store implementation backs the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Lives for the lifetime of the process.
    #[default]
    Memory,

    /// SQLite file.
    Sqlite,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Memory => write!(f, "memory"),
            StoreBackend::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "in_memory" => Ok(StoreBackend::Memory),
            "sqlite" => Ok(StoreBackend::Sqlite),
            other => Err(ServiceError::Config(format!(
                "Unknown store backend: '{}'. Valid options: memory, sqlite",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,

    /// SQLite file. Defaults to the platform data directory.
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            backend: StoreBackend::default(),
            database_path: None,
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Currency Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencySettings {
    /// Currency every stored amount is denominated in.
    #[serde(default = "default_base_currency")]
    pub base: String,
}

fn default_base_currency() -> String {
    DEFAULT_BASE_CURRENCY.to_string()
}

impl Default for CurrencySettings {
    fn default() -> Self {
        CurrencySettings {
            base: default_base_currency(),
        }
    }
}

// =============================================================================
// Exchange Rate Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRateSettings {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Without a key only base-currency receipts can be paid.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://v6.exchangerate-api.com/v6".to_string()
}

fn default_timeout() -> u64 {
    10
}

impl Default for ExchangeRateSettings {
    fn default() -> Self {
        ExchangeRateSettings {
            api_url: default_api_url(),
            api_key: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl ExchangeRateSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete Tally configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TallyConfig {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub currency: CurrencySettings,

    #[serde(default)]
    pub exchange_rate: ExchangeRateSettings,
}

impl TallyConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (tally.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ServiceResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| ServiceError::Config(format!("{}: {}", path.display(), e)))?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(contents: &str) -> ServiceResult<Self> {
        toml::from_str(contents).map_err(|e| ServiceError::Config(e.to_string()))
    }

    /// Checks values that deserialization alone can't.
    pub fn validate(&self) -> ServiceResult<()> {
        self.base_currency()?;

        if self.store.max_connections == 0 {
            return Err(ServiceError::Config(
                "store.max_connections must be greater than 0".into(),
            ));
        }

        let url = &self.exchange_rate.api_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ServiceError::Config(format!(
                "exchange_rate.api_url must start with http:// or https://, got: {}",
                url
            )));
        }

        if self.exchange_rate.timeout_secs == 0 {
            return Err(ServiceError::Config(
                "exchange_rate.timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies overrides from `var` (the process environment in [`load`]).
    ///
    /// [`load`]: TallyConfig::load
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(backend) = var("TALLY_STORE_BACKEND") {
            match backend.parse() {
                Ok(parsed) => {
                    debug!(backend = %backend, "Overriding store backend from environment");
                    self.store.backend = parsed;
                }
                Err(_) => warn!(backend = %backend, "Unknown store backend in environment"),
            }
        }

        if let Some(path) = var("TALLY_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.store.database_path = Some(PathBuf::from(path));
        }

        if let Some(base) = var("TALLY_BASE_CURRENCY") {
            self.currency.base = base;
        }

        if let Some(key) = var("EXCHANGE_RATE_API_KEY") {
            self.exchange_rate.api_key = Some(key);
        }

        if let Some(url) = var("TALLY_EXCHANGE_RATE_URL") {
            debug!(url = %url, "Overriding exchange rate URL from environment");
            self.exchange_rate.api_url = url;
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("com", "tally", "pos")
    }

    fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("tally.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn base_currency(&self) -> ServiceResult<CurrencyCode> {
        CurrencyCode::new(&self.currency.base)
            .map_err(|e| ServiceError::Config(format!("currency.base: {}", e)))
    }

    /// The SQLite file to open: the configured path, else the platform data
    /// directory.
    pub fn database_path(&self) -> ServiceResult<PathBuf> {
        if let Some(path) = &self.store.database_path {
            return Ok(path.clone());
        }

        let dirs = Self::project_dirs()
            .ok_or_else(|| ServiceError::Config("Could not determine data directory".into()))?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .map_err(|e| ServiceError::Config(format!("{}: {}", data_dir.display(), e)))?;

        Ok(data_dir.join("tally.db"))
    }
}
