//! # tally-engine: Transactional Sales Engine
//!
//! Turns a sale request into a committed header, its line items and their
//! tax audit records, then records the operation and bridges it into the
//! ledger.
//!
//! ## Sale Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sale Creation Flow                               │
//! │                                                                         │
//! │  SaleRequest                                                            │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  validate ──► InventoryGuard (stock check, before any write)           │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  ┌──────────────────── one database transaction ────────────────────┐  │
//! │  │  business + customer lookup, sale number                         │  │
//! │  │  LineItemProcessor ──► TaxResolver ──► TaxRateService            │  │
//! │  │  insert header, lines, tax audit records                         │  │
//! │  └───────────────────────────────┬──────────────────────────────────┘  │
//! │                                  │ commit                               │
//! │                 ┌────────────────┴────────────────┐                     │
//! │                 ▼                                 ▼                     │
//! │            AuditTrail                      AccountingBridge             │
//! │     (failure logged, dropped)     (failure stored on the sale row)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`coordinator`] - `TransactionCoordinator`, the public entry point
//! - [`line_items`] - Per-line category resolution, tax and line building
//! - [`tax_resolver`] - Validated tax lookups against a rate service
//! - [`rates`] - Config-driven rate table
//! - [`inventory_guard`] - Stock sufficiency checks
//! - [`audit_trail`] - Post-commit audit entries
//! - [`accounting`] - Ledger posting, reversal and reconciliation
//! - [`services`] - Collaborator traits
//! - [`adapters`] - SQLite implementations of the collaborators
//! - [`config`] - Engine configuration
//! - [`error`] - Engine error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_engine::{EngineConfig, TransactionCoordinator};
//! use tally_db::Database;
//!
//! let config = EngineConfig::load_or_default(None);
//! let db = Database::new(config.db_config()).await?;
//! let engine = TransactionCoordinator::from_config(db, &config);
//!
//! let created = engine.create_invoice(&request).await?;
//! println!("{} total {}", created.sale.sale_number, created.sale.total_cents);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod accounting;
pub mod adapters;
pub mod audit_trail;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod inventory_guard;
pub mod line_items;
pub mod rates;
pub mod services;
pub mod tax_resolver;

#[cfg(test)]
pub(crate) mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use accounting::{AccountingBridge, AccountingOutcome, ReconcileReport};
pub use adapters::{SqliteAuditLog, SqliteInventory, SqliteLedger};
pub use audit_trail::AuditTrail;
pub use config::{
    AccountCodes, AccountingSettings, BusinessSettings, DatabaseSettings, DispatchMode,
    EngineConfig, RateRule, TaxSettings,
};
pub use coordinator::{
    CreatedSale, EngineServices, SaleDetails, StatusChange, TransactionCoordinator,
};
pub use error::{
    AccountingError, AccountingResult, ConfigError, ConfigResult, SaleError, SaleResult,
    ServiceError, ServiceResult, TaxError,
};
pub use inventory_guard::{InventoryGuard, StockDemand};
pub use line_items::{LineContext, LineItemProcessor, ProcessedLine};
pub use rates::RateTable;
pub use services::{
    AuditService, InventoryService, ItemTaxRequest, LedgerOutcome, LedgerService, RateInfo,
    TaxRateService,
};
pub use tax_resolver::{TaxQuery, TaxResolver};
