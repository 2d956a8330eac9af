//! # Currency
//!
//! ISO 4217 currency codes, exchange rates and the conversion math applied
//! as the last step of payment calculation.
//!
//! ## Conversion Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  base amount (minor units) × rate ──► receipt currency (minor units)   │
//! │                                                                         │
//! │  1. rate is fixed to 6 decimal places  (2.5 → 2_500_000 micros)        │
//! │  2. minor-unit exponents are honoured  (GEL: 2, JPY: 0, KWD: 3)        │
//! │  3. the result is TRUNCATED, never rounded half-up                     │
//! │                                                                         │
//! │  180 tetri × 2.5 = 450 cents                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Looking rates up is somebody else's job; see the service crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::ValidationResult;

/// Fixed-point scale applied to exchange rates.
const RATE_SCALE: i128 = 1_000_000;

// =============================================================================
// Currency Code
// =============================================================================

/// A three-letter ISO 4217 currency code, always upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(try_from = "String", into = "String")]
#[ts(export)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parses a currency code. Lower-case input is accepted and normalized.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::currency::CurrencyCode;
    ///
    /// assert_eq!(CurrencyCode::new("usd").unwrap().as_str(), "USD");
    /// assert!(CurrencyCode::new("dollars").is_err());
    /// ```
    pub fn new(code: &str) -> ValidationResult<Self> {
        let code = code.trim();

        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidFormat {
                field: "currency".to_string(),
                reason: "must be a three-letter ISO 4217 code".to_string(),
            });
        }

        Ok(CurrencyCode(code.to_ascii_uppercase()))
    }

    /// Returns the code as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of decimal places of the currency's minor unit.
    pub fn minor_unit_exponent(&self) -> u32 {
        match self.0.as_str() {
            "BIF" | "CLP" | "DJF" | "GNF" | "ISK" | "JPY" | "KMF" | "KRW" | "PYG" | "RWF"
            | "UGX" | "VND" | "VUV" | "XAF" | "XOF" | "XPF" => 0,
            "BHD" | "IQD" | "JOD" | "KWD" | "LYD" | "OMR" | "TND" => 3,
            _ => 2,
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CurrencyCode::new(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CurrencyCode::new(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

// =============================================================================
// Exchange Rate
// =============================================================================

/// Units of the target currency per unit of the source currency,
/// stored as a fixed-point number with 6 decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExchangeRate {
    micros: i64,
}

impl ExchangeRate {
    /// Identity rate, used when source and target currencies match.
    pub const ONE: ExchangeRate = ExchangeRate { micros: 1_000_000 };

    /// Builds a rate from the float a rate provider returns.
    ///
    /// ## Errors
    /// Non-finite, zero or negative rates are rejected. A missing or broken
    /// rate must never silently become `1.0`.
    pub fn from_f64(rate: f64) -> ValidationResult<Self> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ValidationError::MustBePositive {
                field: "exchange rate".to_string(),
            });
        }

        let micros = (rate * RATE_SCALE as f64).round();
        if micros < 1.0 || micros > i64::MAX as f64 {
            return Err(ValidationError::OutOfRange {
                field: "exchange rate".to_string(),
                min: 1,
                max: i64::MAX,
            });
        }

        Ok(ExchangeRate {
            micros: micros as i64,
        })
    }

    /// Returns the rate in millionths.
    #[inline]
    pub const fn micros(&self) -> i64 {
        self.micros
    }

    /// Returns the rate as a float (for display only).
    pub fn as_f64(&self) -> f64 {
        self.micros as f64 / RATE_SCALE as f64
    }
}

/// Converts `amount` from `from` minor units into `to` minor units.
///
/// The result is truncated toward zero.
///
/// ## Example
/// ```rust
/// use tally_core::currency::{convert, CurrencyCode, ExchangeRate};
/// use tally_core::money::Money;
///
/// let gel = CurrencyCode::new("GEL").unwrap();
/// let usd = CurrencyCode::new("USD").unwrap();
/// let rate = ExchangeRate::from_f64(2.5).unwrap();
///
/// assert_eq!(convert(Money::from_minor(180), &gel, &usd, rate).minor(), 450);
/// ```
pub fn convert(amount: Money, from: &CurrencyCode, to: &CurrencyCode, rate: ExchangeRate) -> Money {
    let from_scale = 10_i128.pow(from.minor_unit_exponent());
    let to_scale = 10_i128.pow(to.minor_unit_exponent());

    let numerator = amount.minor() as i128 * rate.micros as i128 * to_scale;
    let denominator = RATE_SCALE * from_scale;

    // i128 division truncates toward zero
    Money::from_minor((numerator / denominator) as i64)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> CurrencyCode {
        CurrencyCode::new(s).unwrap()
    }

    #[test]
    fn test_currency_code_parsing() {
        assert_eq!(code("gel").as_str(), "GEL");
        assert!(CurrencyCode::new("").is_err());
        assert!(CurrencyCode::new("US").is_err());
        assert!(CurrencyCode::new("U$D").is_err());
        assert_eq!("eur".parse::<CurrencyCode>().unwrap(), code("EUR"));
    }

    #[test]
    fn test_currency_code_serde() {
        let json = serde_json::to_string(&code("USD")).unwrap();
        assert_eq!(json, "\"USD\"");

        let parsed: CurrencyCode = serde_json::from_str("\"eur\"").unwrap();
        assert_eq!(parsed.as_str(), "EUR");
        assert!(serde_json::from_str::<CurrencyCode>("\"euro\"").is_err());
    }

    #[test]
    fn test_rate_rejects_non_positive() {
        assert!(ExchangeRate::from_f64(0.0).is_err());
        assert!(ExchangeRate::from_f64(-1.2).is_err());
        assert!(ExchangeRate::from_f64(f64::NAN).is_err());
        assert!(ExchangeRate::from_f64(f64::INFINITY).is_err());
    }

    #[test]
    fn test_convert_basic() {
        let rate = ExchangeRate::from_f64(2.5).unwrap();
        let converted = convert(Money::from_minor(180), &code("GEL"), &code("USD"), rate);
        assert_eq!(converted.minor(), 450);
    }

    #[test]
    fn test_convert_truncates() {
        // 333 × 0.37 = 123.21 → 123
        let rate = ExchangeRate::from_f64(0.37).unwrap();
        let converted = convert(Money::from_minor(333), &code("GEL"), &code("USD"), rate);
        assert_eq!(converted.minor(), 123);

        // 100 × 0.29 must be exactly 29, not 28.999...
        let rate = ExchangeRate::from_f64(0.29).unwrap();
        let converted = convert(Money::from_minor(100), &code("GEL"), &code("EUR"), rate);
        assert_eq!(converted.minor(), 29);
    }

    #[test]
    fn test_convert_honours_minor_unit_exponent() {
        // 10.00 GEL at 55.123 JPY per GEL = 551 yen (no minor unit)
        let rate = ExchangeRate::from_f64(55.123).unwrap();
        let converted = convert(Money::from_minor(1000), &code("GEL"), &code("JPY"), rate);
        assert_eq!(converted.minor(), 551);

        // 10.00 GEL at 0.1139 KWD per GEL = 1.139 KWD = 1139 fils
        let rate = ExchangeRate::from_f64(0.1139).unwrap();
        let converted = convert(Money::from_minor(1000), &code("GEL"), &code("KWD"), rate);
        assert_eq!(converted.minor(), 1139);
    }

    #[test]
    fn test_identity_rate() {
        let converted = convert(Money::from_minor(987), &code("GEL"), &code("GEL"), ExchangeRate::ONE);
        assert_eq!(converted.minor(), 987);
    }
}
