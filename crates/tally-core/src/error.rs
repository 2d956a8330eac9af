//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Domain and pricing errors                      │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError          - Storage operation failures                     │
//! │                                                                         │
//! │  tally-service errors                                                  │
//! │  └── ServiceError     - What the request layer maps to status codes    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError ← DbError            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Receipt cannot be found.
    #[error("Receipt not found: {0}")]
    ReceiptNotFound(String),

    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Campaign cannot be found.
    #[error("Campaign not found: {0}")]
    CampaignNotFound(String),

    /// Mutation attempted on a closed receipt.
    ///
    /// ## When This Occurs
    /// - Adding a line to a closed receipt
    /// - Recording a payment on a receipt that was already settled
    ///
    /// Pricing itself accepts closed receipts (quotes are always allowed).
    #[error("Receipt {0} is already closed")]
    ReceiptAlreadyClosed(String),

    /// A campaign reached a resolver branch that does not match its kind,
    /// or a line was priced under a campaign that does not cover it.
    ///
    /// This indicates a bug in the campaign index, never a user error.
    #[error("Internal consistency error: {0}")]
    InternalConsistency(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an InternalConsistency error from any message.
    pub fn consistency(message: impl Into<String>) -> Self {
        CoreError::InternalConsistency(message.into())
    }

    /// An amount that no longer fits in minor units.
    pub fn amount_overflow(field: impl Into<String>) -> Self {
        CoreError::Validation(ValidationError::OutOfRange {
            field: field.into(),
            min: 0,
            max: i64::MAX,
        })
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid currency code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Collection does not have enough distinct entries.
    #[error("{field} needs at least {min} distinct entries")]
    TooFew { field: String, min: usize },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
