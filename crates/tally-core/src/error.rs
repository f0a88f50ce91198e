//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  tally-core (this file)                                                │
//! │  ├── CoreError        - State machine and domain rule violations       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tally-db                                                              │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  tally-engine                                                          │
//! │  └── SaleError        - What callers of the sales engine see           │
//! │                                                                         │
//! │  Flow: ValidationError → SaleError::Validation → caller, verbatim      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::SaleStatus;

// =============================================================================
// Core Error
// =============================================================================

#[derive(Debug, Error)]
pub enum CoreError {
    /// The requested status change is not an edge of the state machine.
    #[error("Sale cannot move from {from} to {to}")]
    InvalidStatusTransition { from: SaleStatus, to: SaleStatus },

    /// Arithmetic on a line overflowed the money representation.
    #[error("Amount overflow on {field}")]
    AmountOverflow { field: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, raised before any storage work starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// A collection that must have entries is empty.
    #[error("at least one {what} is required")]
    Empty { what: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Two fields contradict each other (e.g. a manual line with an item id).
    #[error("{field} is inconsistent: {reason}")]
    Inconsistent { field: String, reason: String },
}

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidStatusTransition {
            from: SaleStatus::Void,
            to: SaleStatus::Completed,
        };
        assert_eq!(err.to_string(), "Sale cannot move from void to completed");

        let err = ValidationError::Empty {
            what: "line item".to_string(),
        };
        assert_eq!(err.to_string(), "at least one line item is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::Required {
            field: "customer_id".to_string(),
        }
        .into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
