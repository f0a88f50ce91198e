//! # tally-db: Database Layer for the Tally Sales Engine
//!
//! SQLite storage for sales, catalog, tax audit, audit log and journal,
//! using sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Data Flow                                  │
//! │                                                                         │
//! │  TransactionCoordinator (tally-engine)                                 │
//! │       │  db.begin() → &mut *tx passed down the call chain              │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ SaleRepo      │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ CatalogRepo   │    │ 001_initial  │  │   │
//! │  │   │ Transactions  │    │ TaxAuditRepo  │    │   _schema    │  │   │
//! │  │   │               │    │ JournalRepo   │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation, configuration, transaction scopes
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/tally.db")).await?;
//! let sale = db.sales().get_by_id(&sale_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

#[cfg(test)]
pub(crate) mod test_fixtures;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::audit_log::AuditLogRepository;
pub use repository::catalog::CatalogRepository;
pub use repository::inventory::InventoryRepository;
pub use repository::journal::JournalRepository;
pub use repository::sale::SaleRepository;
pub use repository::tax_audit::TaxAuditRepository;

pub use sqlx::SqliteConnection;
