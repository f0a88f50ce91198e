//! # tally-core: Pure Sales Domain Logic
//!
//! Domain types and rules for the Tally sales engine, with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 tally-engine (Sales Engine)                     │   │
//! │  │  TransactionCoordinator ─► LineItemProcessor ─► TaxResolver     │   │
//! │  │          │                                                      │   │
//! │  │          └─► AuditTrail, AccountingBridge (after commit)        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │    tax    │  │ validation│  │   │
//! │  │   │   Sale    │  │   Money   │  │ fallback  │  │  request  │  │   │
//! │  │   │ LineItem  │  │  TaxRate  │  │ LineTax   │  │  totals   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Sale, line item, catalog records and status enums
//! - [`money`] - Money type with integer arithmetic
//! - [`tax`] - Category fallback chain, line tax, tax-audit record
//! - [`ledger`] - Journal entry shape and reversal
//! - [`audit`] - Audit events and sale snapshots
//! - [`request`] - Sale request DTOs
//! - [`totals`] - Running totals and payment defaults
//! - [`validation`] - Request validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::money::Money;
//! use tally_core::types::TaxRate;
//!
//! let taxable = Money::from_cents(5000).multiply_quantity(2);
//! let tax = taxable.calculate_tax(TaxRate::from_percent(18));
//!
//! assert_eq!(taxable.cents(), 10000);
//! assert_eq!(tax.cents(), 1800);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod audit;
pub mod error;
pub mod ledger;
pub mod money;
pub mod request;
pub mod tax;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use audit::{AuditEvent, AuditLogEntry, SaleAuditSnapshot};
pub use error::{CoreError, CoreResult, ValidationError};
pub use ledger::{EntrySide, JournalEntryRequest, JournalLine, PostedEntry};
pub use money::Money;
pub use request::{LineItemRequest, PaymentDetails, SaleRequest};
pub use tax::{LineTax, TaxAuditRecord, TaxCalculationContext, TaxQuote};
pub use totals::SaleTotals;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines on a single sale.
pub const MAX_LINE_ITEMS: usize = 500;

/// Maximum quantity on a single line.
///
/// Guards against keying errors (typing 100000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 99_999;

/// Version label written into every tax calculation context.
pub const ENGINE_VERSION: &str = concat!("tally/", env!("CARGO_PKG_VERSION"));

/// Fresh UUID v4 string for a new row.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
