//! # Exchange Rates
//!
//! Rate lookup for receipts paid in a currency other than the base one.
//!
//! ## Flow
//! ```text
//! PaymentService
//!      │ rate(GEL, USD)
//!      ▼
//! ┌──────────────────┐   GET {api_url}/{key}/latest/GEL   ┌──────────────┐
//! │ ExchangeRateApi  │ ─────────────────────────────────► │   provider   │
//! │    (reqwest)     │ ◄───────────────────────────────── │              │
//! └──────────────────┘  {"result":"success",              └──────────────┘
//!                        "conversion_rates":{"USD":0.37}}
//! ```
//!
//! One call per calculation. No retries, no caching, and never a default rate:
//! a failed lookup fails the whole payment calculation.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use tally_core::{CurrencyCode, ExchangeRate};

pub type FxResult<T> = Result<T, FxError>;

#[derive(Debug, Error)]
pub enum FxError {
    #[error("Exchange rate request failed: {0}")]
    Request(String),

    #[error("Exchange rate provider returned HTTP {0}")]
    Status(u16),

    /// The provider answered but reported a failure.
    #[error("Exchange rate provider error: {0}")]
    Provider(String),

    #[error("No exchange rate from {from} to {to}")]
    MissingRate { from: String, to: String },

    #[error("Invalid exchange rate: {0}")]
    InvalidRate(String),
}

impl From<reqwest::Error> for FxError {
    fn from(err: reqwest::Error) -> Self {
        FxError::Request(err.to_string())
    }
}

/// Source of exchange rates.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Units of `to` per unit of `from`.
    async fn rate(&self, from: &CurrencyCode, to: &CurrencyCode) -> FxResult<ExchangeRate>;
}

// =============================================================================
// HTTP Provider
// =============================================================================

#[derive(Debug, Deserialize)]
struct LatestRates {
    result: String,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
    #[serde(default)]
    conversion_rates: HashMap<String, f64>,
}

/// Extracts the `from -> to` rate from a `latest` response body.
fn parse_latest(body: &str, from: &CurrencyCode, to: &CurrencyCode) -> FxResult<ExchangeRate> {
    let latest: LatestRates =
        serde_json::from_str(body).map_err(|e| FxError::Provider(e.to_string()))?;

    if latest.result != "success" {
        return Err(FxError::Provider(
            latest.error_type.unwrap_or_else(|| latest.result.clone()),
        ));
    }

    let raw = latest
        .conversion_rates
        .get(to.as_str())
        .copied()
        .ok_or_else(|| FxError::MissingRate {
            from: from.to_string(),
            to: to.to_string(),
        })?;

    ExchangeRate::from_f64(raw).map_err(|e| FxError::InvalidRate(e.to_string()))
}

/// Client for an exchangerate-api style `latest` endpoint.
#[derive(Debug, Clone)]
pub struct ExchangeRateApi {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl ExchangeRateApi {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> FxResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FxError::Request(format!("Failed to build HTTP client: {}", e)))?;

        Ok(ExchangeRateApi {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl RateProvider for ExchangeRateApi {
    async fn rate(&self, from: &CurrencyCode, to: &CurrencyCode) -> FxResult<ExchangeRate> {
        let url = format!("{}/{}/latest/{}", self.api_url, self.api_key, from);
        debug!(from = %from, to = %to, "Fetching exchange rate");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Exchange rate request rejected");
            return Err(FxError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let rate = parse_latest(&body, from, to)?;

        debug!(from = %from, to = %to, rate = rate.as_f64(), "Exchange rate fetched");
        Ok(rate)
    }
}

// =============================================================================
// Fixed Rates
// =============================================================================

/// Rates set up front. Used offline and in tests; a pair that wasn't set
/// fails like a provider without that currency.
#[derive(Debug, Clone, Default)]
pub struct FixedRates {
    rates: HashMap<(CurrencyCode, CurrencyCode), ExchangeRate>,
}

impl FixedRates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, from: CurrencyCode, to: CurrencyCode, rate: ExchangeRate) -> Self {
        self.rates.insert((from, to), rate);
        self
    }
}

#[async_trait]
impl RateProvider for FixedRates {
    async fn rate(&self, from: &CurrencyCode, to: &CurrencyCode) -> FxResult<ExchangeRate> {
        self.rates
            .get(&(from.clone(), to.clone()))
            .copied()
            .ok_or_else(|| FxError::MissingRate {
                from: from.to_string(),
                to: to.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(c: &str) -> CurrencyCode {
        CurrencyCode::new(c).unwrap()
    }

    #[test]
    fn test_parse_success() {
        let body = r#"{"result":"success","base_code":"GEL","conversion_rates":{"GEL":1,"USD":0.3712}}"#;
        let rate = parse_latest(body, &code("GEL"), &code("USD")).unwrap();
        assert_eq!(rate.micros(), 371_200);
    }

    #[test]
    fn test_parse_provider_error() {
        let body = r#"{"result":"error","error-type":"invalid-key"}"#;
        let err = parse_latest(body, &code("GEL"), &code("USD")).unwrap_err();
        assert!(matches!(err, FxError::Provider(ref t) if t == "invalid-key"));
    }

    #[test]
    fn test_parse_missing_currency() {
        let body = r#"{"result":"success","conversion_rates":{"EUR":0.34}}"#;
        let err = parse_latest(body, &code("GEL"), &code("USD")).unwrap_err();
        assert!(matches!(err, FxError::MissingRate { .. }));
    }

    #[test]
    fn test_parse_zero_rate_is_rejected() {
        let body = r#"{"result":"success","conversion_rates":{"USD":0}}"#;
        let err = parse_latest(body, &code("GEL"), &code("USD")).unwrap_err();
        assert!(matches!(err, FxError::InvalidRate(_)));
    }

    #[tokio::test]
    async fn test_fixed_rates() {
        let rates = FixedRates::new().with_rate(
            code("GEL"),
            code("USD"),
            ExchangeRate::from_f64(2.5).unwrap(),
        );

        let rate = rates.rate(&code("GEL"), &code("USD")).await.unwrap();
        assert_eq!(rate.micros(), 2_500_000);

        let err = rates.rate(&code("USD"), &code("GEL")).await.unwrap_err();
        assert!(matches!(err, FxError::MissingRate { .. }));
    }
}
