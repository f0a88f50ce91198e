//! # Transaction Coordinator
//!
//! Creates sales atomically and drives their status changes.
//!
//! ## Sale Creation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. validate request ─────────────── fails: nothing touched storage    │
//! │  2. InventoryGuard (pool, read-then-decide)                             │
//! │  3. BEGIN ──────────────────────────────────────────────┐               │
//! │  4.   business, customer class, jurisdiction            │  &mut *tx     │
//! │  5.   next sale number (INV-000042 / POS-000042)        │  passed down  │
//! │  6.   LineItemProcessor per line, totals accumulate     │               │
//! │  7.   INSERT header, lines, tax-audit rows              │  any error:   │
//! │  8. COMMIT ─────────────────────────────────────────────┘  tx dropped,  │
//! │                                                             rollback    │
//! │  9. AuditTrail (logged and swallowed on failure)                        │
//! │ 10. AccountingBridge (own scope, outcome reported, never raised)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Status Changes
//! `draft -> completed` posts the sale; `completed -> void | cancelled`
//! reverses it. Closing a sale reopens its accounting flags until the
//! reversal is recorded. Line items and tax-audit rows are never rewritten.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use tally_core::validation::validate_sale_request;
use tally_core::{
    new_id, CustomerClass, LineItem, Money, SaleChannel, SaleRequest, SaleStatus, SaleTotals,
    SaleTransaction, TaxAuditRecord,
};
use tally_db::{
    CatalogRepository, Database, SaleRepository, SqliteConnection, TaxAuditRepository,
};

use crate::accounting::{AccountingBridge, AccountingOutcome};
use crate::adapters::{SqliteAuditLog, SqliteInventory, SqliteLedger};
use crate::audit_trail::AuditTrail;
use crate::config::EngineConfig;
use crate::error::{SaleError, SaleResult};
use crate::inventory_guard::InventoryGuard;
use crate::line_items::{LineContext, LineItemProcessor};
use crate::rates::RateTable;
use crate::services::{AuditService, InventoryService, LedgerService, TaxRateService};
use crate::tax_resolver::TaxResolver;

// =============================================================================
// Wiring
// =============================================================================

/// The collaborators a coordinator talks to.
#[derive(Clone)]
pub struct EngineServices {
    pub rates: Arc<dyn TaxRateService>,
    pub ledger: Arc<dyn LedgerService>,
    pub audit: Arc<dyn AuditService>,
    pub inventory: Arc<dyn InventoryService>,
}

impl EngineServices {
    /// SQLite-backed collaborators and the configured rate table.
    pub fn sqlite(db: &Database, config: &EngineConfig) -> Self {
        EngineServices {
            rates: Arc::new(RateTable::new(config.tax.rules.clone())),
            ledger: Arc::new(SqliteLedger::new(db.journal())),
            audit: Arc::new(SqliteAuditLog::new(db.audit_log())),
            inventory: Arc::new(SqliteInventory::new(db.inventory())),
        }
    }

    pub fn with_rates(mut self, rates: Arc<dyn TaxRateService>) -> Self {
        self.rates = rates;
        self
    }

    pub fn with_ledger(mut self, ledger: Arc<dyn LedgerService>) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditService>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_inventory(mut self, inventory: Arc<dyn InventoryService>) -> Self {
        self.inventory = inventory;
        self
    }
}

// =============================================================================
// Results
// =============================================================================

/// A committed sale with everything written alongside it.
#[derive(Debug, Clone)]
pub struct CreatedSale {
    pub sale: SaleTransaction,
    pub line_items: Vec<LineItem>,
    pub tax_audit_records: Vec<TaxAuditRecord>,
    /// Side attribute for operators; a failure here does not fail the sale.
    pub accounting: AccountingOutcome,
}

#[derive(Debug, Clone)]
pub struct StatusChange {
    pub sale: SaleTransaction,
    pub previous: SaleStatus,
    pub accounting: AccountingOutcome,
}

/// A sale as read back from storage.
#[derive(Debug, Clone)]
pub struct SaleDetails {
    pub sale: SaleTransaction,
    pub line_items: Vec<LineItem>,
    pub tax_audit_records: Vec<TaxAuditRecord>,
}

// =============================================================================
// Coordinator
// =============================================================================

#[derive(Clone)]
pub struct TransactionCoordinator {
    db: Database,
    processor: LineItemProcessor,
    guard: InventoryGuard,
    audit: AuditTrail,
    accounting: AccountingBridge,
    default_country: String,
    engine_version: String,
}

impl TransactionCoordinator {
    pub fn new(db: Database, services: EngineServices, config: &EngineConfig) -> Self {
        TransactionCoordinator {
            processor: LineItemProcessor::new(TaxResolver::new(services.rates)),
            guard: InventoryGuard::new(db.catalog(), services.inventory),
            audit: AuditTrail::new(services.audit),
            accounting: AccountingBridge::new(
                db.sales(),
                services.ledger,
                config.accounting.clone(),
            ),
            default_country: config.business.default_country.clone(),
            engine_version: config.tax.engine_version.clone(),
            db,
        }
    }

    /// Coordinator over SQLite-backed collaborators.
    pub fn from_config(db: Database, config: &EngineConfig) -> Self {
        let services = EngineServices::sqlite(&db, config);
        Self::new(db, services, config)
    }

    pub fn accounting(&self) -> &AccountingBridge {
        &self.accounting
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Creates an invoice. Lookup and tax failures abort the whole sale.
    pub async fn create_invoice(&self, request: &SaleRequest) -> SaleResult<CreatedSale> {
        self.create(SaleChannel::Invoice, request).await
    }

    /// Creates a point-of-sale transaction. Missing catalog records and tax
    /// failures degrade to defaults; the sale completes immediately.
    pub async fn create_pos_sale(&self, request: &SaleRequest) -> SaleResult<CreatedSale> {
        self.create(SaleChannel::PointOfSale, request).await
    }

    async fn create(&self, channel: SaleChannel, request: &SaleRequest) -> SaleResult<CreatedSale> {
        validate_sale_request(request, channel)?;
        self.guard.check(&request.business_id, &request.lines).await?;

        let mut tx = self.db.begin().await?;
        let (sale, line_items, tax_audit_records) =
            self.write_sale(&mut *tx, channel, request).await?;
        tx.commit().await.map_err(tally_db::DbError::from)?;

        info!(
            sale_id = %sale.id,
            sale_number = %sale.sale_number,
            channel = %channel,
            total = %sale.total(),
            lines = line_items.len(),
            "Sale committed"
        );

        self.audit.record_created(&sale, line_items.len()).await;

        let accounting = match sale.status {
            SaleStatus::Completed => self.accounting.dispatch_post(&sale.id).await,
            _ => AccountingOutcome::Skipped {
                reason: format!("sale is {}", sale.status),
            },
        };

        Ok(CreatedSale {
            sale,
            line_items,
            tax_audit_records,
            accounting,
        })
    }

    /// Everything between BEGIN and COMMIT.
    async fn write_sale(
        &self,
        conn: &mut SqliteConnection,
        channel: SaleChannel,
        request: &SaleRequest,
    ) -> SaleResult<(SaleTransaction, Vec<LineItem>, Vec<TaxAuditRecord>)> {
        let business_id = request.business_id.trim();
        let business = CatalogRepository::find_business(&mut *conn, business_id)
            .await?
            .ok_or_else(|| SaleError::lookup("Business", business_id))?;

        let jurisdiction = request
            .jurisdiction
            .as_deref()
            .or(business.country_code.as_deref())
            .unwrap_or(self.default_country.as_str())
            .trim()
            .to_uppercase();

        let customer_class = self.customer_class(&mut *conn, channel, request).await?;
        let sale_number = SaleRepository::next_sale_number(&mut *conn, business_id, channel).await?;

        let sale_id = new_id();
        let now = Utc::now();
        let ctx = LineContext {
            business_id,
            sale_id: &sale_id,
            channel,
            jurisdiction: &jurisdiction,
            tax_date: request.tax_date(),
            customer_class,
            engine_version: &self.engine_version,
            created_at: now,
        };

        debug!(sale_number = %sale_number, %jurisdiction, %customer_class, "Processing lines");

        let mut totals = SaleTotals::new();
        let mut line_items = Vec::with_capacity(request.lines.len());
        let mut tax_audit_records = Vec::new();
        for (index, line) in request.lines.iter().enumerate() {
            let processed = self.processor.process(&mut *conn, &ctx, index, line).await?;
            totals.add_line(processed.gross, processed.discount, processed.tax.amount())?;
            if let Some(record) = processed.tax_audit_record(&ctx) {
                tax_audit_records.push(record);
            }
            line_items.push(processed.line);
        }
        totals.add_header_discount(Money::from_cents(request.discount_cents))?;

        let paid_in_full = channel == SaleChannel::PointOfSale;
        let amount_paid = totals.amount_paid(request.payment.amount_paid_cents, paid_in_full);
        let status = if request.save_as_draft {
            SaleStatus::Draft
        } else {
            SaleStatus::Completed
        };

        let sale = SaleTransaction {
            id: sale_id.clone(),
            business_id: business_id.to_string(),
            channel,
            sale_number,
            customer_id: request.customer_id.clone(),
            transaction_date: request.transaction_date,
            tax_date: request.tax_date(),
            due_date: request.due_date,
            subtotal_cents: totals.subtotal.cents(),
            tax_cents: totals.tax.cents(),
            discount_cents: totals.discount.cents(),
            total_cents: totals.final_amount().cents(),
            status,
            payment_method: request.payment.method,
            payment_status: totals.payment_status(amount_paid),
            amount_paid_cents: amount_paid.cents(),
            notes: request.notes.clone(),
            created_by: request.actor_id.clone(),
            accounting_processed: false,
            accounting_error: None,
            created_at: now,
            updated_at: now,
            completed_at: (status == SaleStatus::Completed).then_some(now),
            closed_at: None,
        };

        SaleRepository::insert_sale(&mut *conn, &sale).await?;
        for line in &line_items {
            SaleRepository::insert_line(&mut *conn, line).await?;
        }
        for record in &tax_audit_records {
            TaxAuditRepository::insert(&mut *conn, record).await?;
        }

        Ok((sale, line_items, tax_audit_records))
    }

    /// Classification that selects the tax rule variant.
    ///
    /// Walk-ins are individuals. A missing customer is a lookup failure on
    /// an invoice and an individual at the point of sale.
    async fn customer_class(
        &self,
        conn: &mut SqliteConnection,
        channel: SaleChannel,
        request: &SaleRequest,
    ) -> SaleResult<CustomerClass> {
        let Some(customer_id) = request
            .customer_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
        else {
            return Ok(CustomerClass::Individual);
        };

        match CatalogRepository::find_customer(&mut *conn, request.business_id.trim(), customer_id)
            .await?
        {
            Some(customer) => Ok(customer.customer_class),
            None if channel.is_strict() => Err(SaleError::lookup("Customer", customer_id)),
            None => {
                warn!(customer_id, "Customer not found, treating as individual");
                Ok(CustomerClass::Individual)
            }
        }
    }

    // =========================================================================
    // Status Changes
    // =========================================================================

    /// Finalizes a draft invoice and posts it.
    pub async fn complete_sale(&self, sale_id: &str, actor_id: &str) -> SaleResult<StatusChange> {
        self.transition(sale_id, actor_id, SaleStatus::Completed).await
    }

    /// Voids a completed sale and reverses its posting.
    pub async fn void_sale(&self, sale_id: &str, actor_id: &str) -> SaleResult<StatusChange> {
        self.transition(sale_id, actor_id, SaleStatus::Void).await
    }

    /// Cancels a completed sale and reverses its posting.
    pub async fn cancel_sale(&self, sale_id: &str, actor_id: &str) -> SaleResult<StatusChange> {
        self.transition(sale_id, actor_id, SaleStatus::Cancelled).await
    }

    async fn transition(
        &self,
        sale_id: &str,
        actor_id: &str,
        next: SaleStatus,
    ) -> SaleResult<StatusChange> {
        let mut tx = self.db.begin().await?;

        let before = SaleRepository::find_by_id(&mut *tx, sale_id)
            .await?
            .ok_or_else(|| SaleError::NotFound(sale_id.to_string()))?;

        if !before.status.can_transition_to(next) {
            return Err(SaleError::InvalidTransition {
                from: before.status,
                to: next,
            });
        }

        SaleRepository::update_status(&mut *tx, sale_id, before.status, next, Utc::now()).await?;
        let after = SaleRepository::find_by_id(&mut *tx, sale_id)
            .await?
            .ok_or_else(|| SaleError::NotFound(sale_id.to_string()))?;
        let line_count = SaleRepository::count_lines(&mut *tx, sale_id).await?;
        tx.commit().await.map_err(tally_db::DbError::from)?;

        info!(
            sale_id,
            sale_number = %after.sale_number,
            from = %before.status,
            to = %next,
            "Sale status changed"
        );

        // Nothing past the commit may fail the call.
        self.audit
            .record_transition(&before, &after, line_count as usize, actor_id)
            .await;

        let accounting = match next {
            SaleStatus::Completed => self.accounting.dispatch_post(sale_id).await,
            _ => self.accounting.dispatch_reverse(sale_id).await,
        };

        Ok(StatusChange {
            sale: after,
            previous: before.status,
            accounting,
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get_sale(&self, sale_id: &str) -> SaleResult<SaleDetails> {
        let sales = self.db.sales();
        let sale = sales
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| SaleError::NotFound(sale_id.to_string()))?;

        Ok(SaleDetails {
            line_items: sales.get_lines(sale_id).await?,
            tax_audit_records: self.db.tax_audit().list_for_sale(sale_id).await?,
            sale,
        })
    }

    /// Sales whose posting or reversal has not reached the ledger.
    pub async fn list_pending_accounting(
        &self,
        business_id: &str,
        limit: u32,
    ) -> SaleResult<Vec<SaleTransaction>> {
        Ok(self
            .db
            .sales()
            .list_pending_accounting(business_id, limit)
            .await?)
    }
}
