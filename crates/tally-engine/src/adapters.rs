//! # SQLite Adapters
//!
//! Collaborator implementations over the tally-db repositories. Each one
//! works on the pool in its own statement or transaction, never on a sale's
//! open transaction.

use async_trait::async_trait;
use tracing::warn;

use tally_core::{AuditEvent, InventoryItem, JournalEntryRequest, PostedEntry};
use tally_db::{AuditLogRepository, InventoryRepository, JournalRepository};

use crate::error::ServiceResult;
use crate::services::{AuditService, InventoryService, LedgerOutcome, LedgerService};

// =============================================================================
// Ledger
// =============================================================================

/// Append-only journal in the engine's own database.
#[derive(Debug, Clone)]
pub struct SqliteLedger {
    journal: JournalRepository,
}

impl SqliteLedger {
    pub fn new(journal: JournalRepository) -> Self {
        SqliteLedger { journal }
    }
}

#[async_trait]
impl LedgerService for SqliteLedger {
    async fn create_journal_entry(
        &self,
        entry: &JournalEntryRequest,
    ) -> ServiceResult<LedgerOutcome> {
        if !entry.is_balanced() {
            let reason = format!(
                "unbalanced entry: debits {} != credits {}",
                entry.total_debits(),
                entry.total_credits()
            );
            warn!(reference_id = %entry.reference_id, %reason, "Journal entry rejected");
            return Ok(LedgerOutcome::Rejected { reason });
        }

        let posted = self.journal.insert(entry).await?;
        Ok(LedgerOutcome::Posted(posted))
    }

    async fn entries_for_reference(
        &self,
        business_id: &str,
        reference_id: &str,
    ) -> ServiceResult<Vec<PostedEntry>> {
        Ok(self
            .journal
            .entries_for_reference(business_id, reference_id)
            .await?)
    }
}

// =============================================================================
// Audit Log
// =============================================================================

#[derive(Debug, Clone)]
pub struct SqliteAuditLog {
    log: AuditLogRepository,
}

impl SqliteAuditLog {
    pub fn new(log: AuditLogRepository) -> Self {
        SqliteAuditLog { log }
    }
}

#[async_trait]
impl AuditService for SqliteAuditLog {
    async fn log_action(&self, event: &AuditEvent) -> ServiceResult<()> {
        self.log.insert(event).await?;
        Ok(())
    }
}

// =============================================================================
// Inventory
// =============================================================================

#[derive(Debug, Clone)]
pub struct SqliteInventory {
    inventory: InventoryRepository,
}

impl SqliteInventory {
    pub fn new(inventory: InventoryRepository) -> Self {
        SqliteInventory { inventory }
    }
}

#[async_trait]
impl InventoryService for SqliteInventory {
    async fn stock_level(&self, business_id: &str, item_id: &str) -> ServiceResult<Option<i64>> {
        Ok(self.inventory.stock_level(business_id, item_id).await?)
    }

    async fn sync_from_catalog(
        &self,
        business_id: &str,
        product_id: &str,
    ) -> ServiceResult<InventoryItem> {
        Ok(self
            .inventory
            .sync_from_product(business_id, product_id)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tally_core::{JournalLine, Money};
    use tally_db::{Database, DbConfig};

    fn entry(debit: i64, credit: i64) -> JournalEntryRequest {
        JournalEntryRequest {
            business_id: "biz-1".into(),
            description: "Sale INV-000001".into(),
            entry_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            reference_type: "sale".into(),
            reference_id: "sale-1".into(),
            reverses_entry_id: None,
            lines: vec![
                JournalLine::debit("1000", "cash", Money::from_cents(debit)),
                JournalLine::credit("4000", "revenue", Money::from_cents(credit)),
            ],
        }
    }

    #[tokio::test]
    async fn test_ledger_rejects_unbalanced_without_writing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let ledger = SqliteLedger::new(db.journal());

        let outcome = ledger.create_journal_entry(&entry(100, 90)).await.unwrap();
        assert!(matches!(outcome, LedgerOutcome::Rejected { .. }));
        assert_eq!(db.journal().count_entries("biz-1").await.unwrap(), 0);

        let outcome = ledger.create_journal_entry(&entry(100, 100)).await.unwrap();
        let LedgerOutcome::Posted(posted) = outcome else {
            panic!("expected a posting");
        };
        let entries = ledger.entries_for_reference("biz-1", "sale-1").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, posted.id);
    }
}
