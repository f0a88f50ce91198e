//! # Engine Errors
//!
//! Closed sets of failures, one enum per concern.
//!
//! ## Fatal vs Recoverable
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SaleError        raised before commit, rolls the whole sale back       │
//! │    Validation       missing customer, no lines, bad amounts             │
//! │    Lookup           business/customer/product/service not found         │
//! │    TaxCalculation   rate service failed (invoice policy)                │
//! │    InsufficientStock                                                    │
//! │                                                                         │
//! │  AccountingError  after commit, recorded on the sale, never returned    │
//! │  ServiceError     collaborator failures (ledger, audit, inventory)      │
//! │  TaxError         rate miss vs computation failure                      │
//! │  ConfigError      loading or validating engine.toml                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use thiserror::Error;

use tally_core::{CoreError, ItemKind, SaleStatus, ValidationError};
use tally_db::DbError;

pub type SaleResult<T> = Result<T, SaleError>;
pub type AccountingResult<T> = Result<T, AccountingError>;
pub type ServiceResult<T> = Result<T, ServiceError>;
pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sale Errors
// =============================================================================

/// Why a sale operation was rejected.
#[derive(Debug, Error)]
pub enum SaleError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A referenced record does not exist for the business.
    #[error("{entity} not found: {id}")]
    Lookup { entity: String, id: String },

    #[error("Tax calculation failed on line {line_no}: {source}")]
    TaxCalculation {
        line_no: i64,
        #[source]
        source: TaxError,
    },

    /// Stock on hand does not cover the requested quantity.
    #[error("Insufficient stock for {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        item_id: String,
        requested: i64,
        available: i64,
    },

    #[error("Cannot move sale from {from} to {to}")]
    InvalidTransition { from: SaleStatus, to: SaleStatus },

    #[error("Sale not found: {0}")]
    NotFound(String),

    /// The inventory collaborator could not answer a stock check.
    #[error("Inventory check failed: {0}")]
    Inventory(ServiceError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
}

impl SaleError {
    pub(crate) fn lookup(entity: impl Into<String>, id: impl Into<String>) -> Self {
        SaleError::Lookup {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub(crate) fn missing_item(kind: ItemKind, id: &str) -> Self {
        let entity = match kind {
            ItemKind::Product => "Product",
            ItemKind::Service => "Service",
            ItemKind::Inventory => "Inventory item",
        };
        SaleError::lookup(entity, id)
    }

    /// Short tag for logs and API error codes.
    pub fn code(&self) -> &'static str {
        match self {
            SaleError::Validation(_) => "validation",
            SaleError::Lookup { .. } => "lookup",
            SaleError::TaxCalculation { .. } => "tax_calculation",
            SaleError::InsufficientStock { .. } => "insufficient_stock",
            SaleError::InvalidTransition { .. } => "invalid_transition",
            SaleError::NotFound(_) => "not_found",
            SaleError::Inventory(_) => "inventory",
            SaleError::Core(_) => "core",
            SaleError::Storage(_) => "storage",
        }
    }

    /// True when the caller sent something the engine cannot accept, as
    /// opposed to an infrastructure failure.
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            SaleError::Storage(_) | SaleError::Inventory(_) | SaleError::Core(_)
        )
    }
}

// =============================================================================
// Tax Errors
// =============================================================================

/// A rate lookup miss is kept apart from a computation failure so callers
/// can decide per context which one is fatal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaxError {
    #[error("No tax rate for category {category} in {jurisdiction} on {as_of}")]
    RateNotFound {
        category: String,
        jurisdiction: String,
        as_of: NaiveDate,
    },

    #[error("Tax calculation error: {0}")]
    Calculation(String),
}

// =============================================================================
// Collaborator Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Storage error: {0}")]
    Storage(#[from] DbError),

    #[error("Service error: {0}")]
    Internal(String),
}

/// Why a ledger posting or reversal did not go through. The message ends up
/// in the sale's `accounting_error` column.
#[derive(Debug, Error)]
pub enum AccountingError {
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    #[error("Ledger rejected entry: {reason}")]
    Rejected { reason: String },

    #[error("Ledger error: {0}")]
    Ledger(#[from] ServiceError),

    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
}

// =============================================================================
// Configuration Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid engine configuration: {0}")]
    Invalid(String),

    #[error("Failed to load config: {0}")]
    LoadFailed(String),

    #[error("Failed to save config: {0}")]
    SaveFailed(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::SaveFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejections_vs_failures() {
        let err = SaleError::from(ValidationError::Empty {
            what: "line item".into(),
        });
        assert!(err.is_rejection());
        assert_eq!(err.code(), "validation");

        let err = SaleError::from(DbError::ConnectionFailed("gone".into()));
        assert!(!err.is_rejection());
    }

    #[test]
    fn test_missing_item_names_entity() {
        let err = SaleError::missing_item(ItemKind::Service, "svc-9");
        assert_eq!(err.to_string(), "Service not found: svc-9");
    }
}
