//! # Collaborator Contracts
//!
//! The services the engine consumes but does not own. Each is a trait
//! object so SQLite adapters, remote clients and test doubles plug in the
//! same way.
//!
//! ```text
//!   TransactionCoordinator
//!      ├── TaxRateService    (via TaxResolver)     rates.rs: RateTable
//!      ├── InventoryService  (via InventoryGuard)  adapters.rs: SqliteInventory
//!      ├── AuditService      (via AuditTrail)      adapters.rs: SqliteAuditLog
//!      └── LedgerService     (via AccountingBridge) adapters.rs: SqliteLedger
//! ```

use async_trait::async_trait;
use chrono::NaiveDate;

use tally_core::{
    AuditEvent, CustomerClass, InventoryItem, JournalEntryRequest, Money, PostedEntry,
    SaleChannel, TaxQuote, TaxRate,
};

use crate::error::{ServiceResult, TaxError};

// =============================================================================
// Rates
// =============================================================================

/// Everything the rate service needs to price one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemTaxRequest {
    pub business_id: String,
    pub category: String,
    pub jurisdiction: String,
    /// quantity × unit price.
    pub amount: Money,
    pub transaction_type: SaleChannel,
    pub customer_class: CustomerClass,
    /// Date only; rate tables are effective-dated by day.
    pub transaction_date: NaiveDate,
}

/// A rate as published for a category, before it is applied to an amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateInfo {
    pub rate: TaxRate,
    pub tax_code: String,
    pub tax_type_id: Option<String>,
    pub tax_rate_id: Option<String>,
    pub effective_from: NaiveDate,
}

#[async_trait]
pub trait TaxRateService: Send + Sync {
    /// Prices one line. Must be deterministic for identical requests.
    async fn calculate_item_tax(&self, request: &ItemTaxRequest) -> Result<TaxQuote, TaxError>;

    /// Rate for a category without a customer-class variant.
    async fn get_tax_rate(
        &self,
        category: &str,
        jurisdiction: &str,
        as_of: NaiveDate,
    ) -> Result<RateInfo, TaxError>;
}

// =============================================================================
// Ledger
// =============================================================================

/// A ledger answer that is not an error but not a posting either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOutcome {
    Posted(PostedEntry),
    Rejected { reason: String },
}

#[async_trait]
pub trait LedgerService: Send + Sync {
    /// Posts a balanced entry. Debits must equal credits.
    async fn create_journal_entry(&self, entry: &JournalEntryRequest)
        -> ServiceResult<LedgerOutcome>;

    /// Entries recorded against a reference, oldest first.
    async fn entries_for_reference(
        &self,
        business_id: &str,
        reference_id: &str,
    ) -> ServiceResult<Vec<PostedEntry>>;
}

// =============================================================================
// Audit
// =============================================================================

#[async_trait]
pub trait AuditService: Send + Sync {
    async fn log_action(&self, event: &AuditEvent) -> ServiceResult<()>;
}

// =============================================================================
// Inventory
// =============================================================================

#[async_trait]
pub trait InventoryService: Send + Sync {
    /// Quantity on hand, `None` when no stock record exists.
    async fn stock_level(&self, business_id: &str, item_id: &str) -> ServiceResult<Option<i64>>;

    /// Materializes the stock record for a catalog product if it has none.
    async fn sync_from_catalog(
        &self,
        business_id: &str,
        product_id: &str,
    ) -> ServiceResult<InventoryItem>;
}
