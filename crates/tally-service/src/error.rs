//! # Service Error Types
//!
//! The one error type callers of the services see.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Service Error Categories                          │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐  │
//! │  │     Lookup      │  │     State       │  │       Input             │  │
//! │  │                 │  │                 │  │                         │  │
//! │  │  NotFound       │  │  AlreadyClosed  │  │  Validation             │  │
//! │  │                 │  │  ShiftClosed    │  │  Conflict               │  │
//! │  │                 │  │  OpenReceipts   │  │                         │  │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘  │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐  │
//! │  │    External     │  │    Internal     │  │     Infrastructure      │  │
//! │  │                 │  │                 │  │                         │  │
//! │  │ ExternalService │  │  Internal-      │  │  Storage                │  │
//! │  │ (exchange rate) │  │  Consistency    │  │  Config                 │  │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Errors propagate unchanged. Nothing here retries or substitutes a default.

use thiserror::Error;

use tally_core::{CoreError, ValidationError};
use tally_db::DbError;

use crate::fx::FxError;

/// Result type alias for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// A receipt, product, shift or campaign referenced by ID doesn't exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Mutation attempted on a closed receipt or shift.
    #[error("{entity} {id} is already closed")]
    AlreadyClosed { entity: String, id: String },

    /// Receipt creation attempted in a closed shift.
    #[error("Shift {0} is closed")]
    ShiftClosed(String),

    /// Shift close attempted while receipts are still open.
    #[error("Shift {shift_id} has {count} open receipt(s)")]
    OpenReceipts { shift_id: String, count: usize },

    /// Unique value already taken (product barcode).
    #[error("{field} '{value}' already exists")]
    Conflict { field: String, value: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The exchange-rate lookup failed.
    #[error("External service error: {0}")]
    ExternalService(#[from] FxError),

    /// A bug: data reached a branch that can't handle it.
    #[error("Internal consistency error: {0}")]
    InternalConsistency(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ServiceError {
    pub fn not_found(entity: &str, id: impl Into<String>) -> Self {
        ServiceError::NotFound {
            entity: entity.to_string(),
            id: id.into(),
        }
    }

    pub fn already_closed(entity: &str, id: impl Into<String>) -> Self {
        ServiceError::AlreadyClosed {
            entity: entity.to_string(),
            id: id.into(),
        }
    }

    /// True for errors the cashier caused and can fix.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ServiceError::NotFound { .. }
                | ServiceError::AlreadyClosed { .. }
                | ServiceError::ShiftClosed(_)
                | ServiceError::OpenReceipts { .. }
                | ServiceError::Conflict { .. }
                | ServiceError::Validation(_)
        )
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ServiceError::NotFound { entity, id },
            DbError::AlreadyClosed { entity, id } => ServiceError::AlreadyClosed { entity, id },
            DbError::UniqueViolation { field, value } => ServiceError::Conflict { field, value },
            other => {
                tracing::error!(error = %other, "Storage operation failed");
                ServiceError::Storage(other.to_string())
            }
        }
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ReceiptNotFound(id) => ServiceError::not_found("Receipt", id),
            CoreError::ProductNotFound(id) => ServiceError::not_found("Product", id),
            CoreError::CampaignNotFound(id) => ServiceError::not_found("Campaign", id),
            CoreError::ReceiptAlreadyClosed(id) => ServiceError::already_closed("Receipt", id),
            CoreError::InternalConsistency(message) => ServiceError::InternalConsistency(message),
            CoreError::Validation(err) => ServiceError::Validation(err),
        }
    }
}
