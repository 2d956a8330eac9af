//! # Validation Module
//!
//! Input validation utilities for Tally POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request layer                                                │
//! │  └── Type validation (deserialization)                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Services + THIS MODULE                                       │
//! │  └── Business rule validation (names, prices, percentages)             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Storage                                                      │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE (barcode) and foreign keys                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{validate_barcode, validate_quantity};
//!
//! validate_barcode("4860001234567").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::{MAX_AMOUNT, MAX_ITEM_QUANTITY, MAX_RECEIPT_LINES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a barcode.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, digits and hyphens only
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_barcode;
///
/// assert!(validate_barcode("4860001234567").is_ok());
/// assert!(validate_barcode("").is_err());
/// assert!(validate_barcode("has space").is_err());
/// ```
pub fn validate_barcode(barcode: &str) -> ValidationResult<()> {
    let barcode = barcode.trim();

    if barcode.is_empty() {
        return Err(ValidationError::Required {
            field: "barcode".to_string(),
        });
    }

    if barcode.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "barcode".to_string(),
            max: 50,
        });
    }

    if !barcode.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ValidationError::InvalidFormat {
            field: "barcode".to_string(),
            reason: "must contain only letters, digits, and hyphens".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price or threshold in minor units.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free items, "any amount" thresholds)
/// - Must not exceed MAX_AMOUNT
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_amount;
///
/// assert!(validate_amount("price", 1099).is_ok());
/// assert!(validate_amount("price", 0).is_ok());
/// assert!(validate_amount("price", -100).is_err());
/// assert!(validate_amount("price", i64::MAX / 2).is_err());
/// ```
pub fn validate_amount(field: &str, minor: i64) -> ValidationResult<()> {
    if !(0..=MAX_AMOUNT).contains(&minor) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT,
        });
    }

    Ok(())
}

/// Validates a discount percentage (0 to 100 inclusive).
pub fn validate_percent(percent: u32) -> ValidationResult<()> {
    if percent > 100 {
        return Err(ValidationError::OutOfRange {
            field: "percent_off".to_string(),
            min: 0,
            max: 100,
        });
    }

    Ok(())
}

/// Validates a buy/get quantity of a bundle campaign.
pub fn validate_bundle_quantity(field: &str, qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates receipt size (number of lines).
pub fn validate_receipt_size(current_lines: usize) -> ValidationResult<()> {
    if current_lines >= MAX_RECEIPT_LINES {
        return Err(ValidationError::OutOfRange {
            field: "receipt lines".to_string(),
            min: 0,
            max: MAX_RECEIPT_LINES as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
