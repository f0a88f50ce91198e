//! Seeded databases and collaborator doubles shared by the engine tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use tally_core::{
    new_id, AuditEvent, Customer, CustomerClass, InventoryItem, JournalEntryRequest, PaymentStatus,
    PostedEntry, Product, SaleChannel, SaleStatus, SaleTransaction, Service, TaxQuote, TaxRate,
};
use tally_db::{Database, DbConfig, JournalRepository};

use crate::adapters::SqliteLedger;
use crate::config::EngineConfig;
use crate::coordinator::{EngineServices, TransactionCoordinator};
use crate::error::{ServiceError, ServiceResult, TaxError};
use crate::services::{
    AuditService, ItemTaxRequest, LedgerOutcome, LedgerService, RateInfo, TaxRateService,
};

pub const BUSINESS: &str = "biz-1";
pub const COMPANY: &str = "cust-company";
pub const INDIVIDUAL: &str = "cust-individual";

/// Untracked, category ALCOHOL.
pub const WINE: &str = "prod-wine";
/// Tracked, category REDUCED_FOOD, no stock record yet.
pub const RICE: &str = "prod-rice";
/// Tracked, category ELECTRONICS, stock record TV_STOCK with 6 on hand.
pub const TV: &str = "prod-tv";
pub const TV_STOCK: &str = "stock-tv";
/// Category LABOUR.
pub const INSTALL: &str = "svc-install";
/// No category.
pub const DELIVERY: &str = "svc-delivery";

pub fn sale_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 10, 30, 0).unwrap()
}

pub async fn seeded_db() -> Database {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let catalog = db.catalog();
    let now = Utc::now();

    catalog
        .insert_business(BUSINESS, "Test Shop", Some("NG"))
        .await
        .unwrap();

    for (id, class) in [
        (COMPANY, CustomerClass::Company),
        (INDIVIDUAL, CustomerClass::Individual),
    ] {
        catalog
            .insert_customer(&Customer {
                id: id.to_string(),
                business_id: BUSINESS.to_string(),
                name: id.to_string(),
                customer_class: class,
                created_at: now,
            })
            .await
            .unwrap();
    }

    for (id, category, tracked) in [
        (WINE, "ALCOHOL", false),
        (RICE, "REDUCED_FOOD", true),
        (TV, "ELECTRONICS", true),
    ] {
        catalog
            .insert_product(&Product {
                id: id.to_string(),
                business_id: BUSINESS.to_string(),
                sku: id.to_uppercase(),
                name: id.to_string(),
                unit_price_cents: 5000,
                tax_category_code: Some(category.to_string()),
                track_inventory: tracked,
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
    }

    db.inventory()
        .insert_item(&InventoryItem {
            id: TV_STOCK.to_string(),
            business_id: BUSINESS.to_string(),
            product_id: Some(TV.to_string()),
            name: "TV stock".to_string(),
            quantity_on_hand: 6,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();

    for (id, category) in [(INSTALL, Some("LABOUR")), (DELIVERY, None)] {
        catalog
            .insert_service(&Service {
                id: id.to_string(),
                business_id: BUSINESS.to_string(),
                name: id.to_string(),
                rate_cents: 1000,
                tax_category_code: category.map(str::to_string),
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
    }

    db
}

/// A completed, unpaid invoice header: 100.00 + 18.00 tax.
pub fn header(business_id: &str) -> SaleTransaction {
    let at = sale_time();
    SaleTransaction {
        id: new_id(),
        business_id: business_id.to_string(),
        channel: SaleChannel::Invoice,
        sale_number: format!("INV-{}", &new_id()[..6]),
        customer_id: Some(COMPANY.to_string()),
        transaction_date: at,
        tax_date: at.date_naive(),
        due_date: None,
        subtotal_cents: 10000,
        tax_cents: 1800,
        discount_cents: 0,
        total_cents: 11800,
        status: SaleStatus::Completed,
        payment_method: None,
        payment_status: PaymentStatus::Unpaid,
        amount_paid_cents: 0,
        notes: None,
        created_by: "user-1".to_string(),
        accounting_processed: false,
        accounting_error: None,
        created_at: at,
        updated_at: at,
        completed_at: Some(at),
        closed_at: None,
    }
}

/// Coordinator over SQLite collaborators, with the given rate service.
pub fn coordinator(db: &Database, rates: Arc<dyn TaxRateService>) -> TransactionCoordinator {
    coordinator_with(db, |services| services.with_rates(rates))
}

pub fn coordinator_with(
    db: &Database,
    customize: impl FnOnce(EngineServices) -> EngineServices,
) -> TransactionCoordinator {
    let config = EngineConfig::default();
    let services = customize(
        EngineServices::sqlite(db, &config)
            .with_rates(Arc::new(FixedRates::new(TaxRate::from_percent(18)))),
    );
    TransactionCoordinator::new(db.clone(), services, &config)
}

// =============================================================================
// Rate doubles
// =============================================================================

/// Applies one rate to every category.
#[derive(Default)]
pub struct FixedRates {
    rate: TaxRate,
    calls: Mutex<Vec<ItemTaxRequest>>,
}

impl FixedRates {
    pub fn new(rate: TaxRate) -> Self {
        FixedRates {
            rate,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ItemTaxRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaxRateService for FixedRates {
    async fn calculate_item_tax(&self, request: &ItemTaxRequest) -> Result<TaxQuote, TaxError> {
        self.calls.lock().unwrap().push(request.clone());
        Ok(TaxQuote {
            rate: self.rate,
            amount: request.amount.calculate_tax(self.rate),
            tax_code: format!("VAT{}", self.rate.bps() / 100),
            tax_type_id: Some("vat".to_string()),
            tax_rate_id: Some(format!("fixed-{}", self.rate.bps())),
        })
    }

    async fn get_tax_rate(
        &self,
        _category: &str,
        _jurisdiction: &str,
        _as_of: NaiveDate,
    ) -> Result<RateInfo, TaxError> {
        Ok(RateInfo {
            rate: self.rate,
            tax_code: format!("VAT{}", self.rate.bps() / 100),
            tax_type_id: Some("vat".to_string()),
            tax_rate_id: Some(format!("fixed-{}", self.rate.bps())),
            effective_from: NaiveDate::MIN,
        })
    }
}

/// Fails for one category (or all), otherwise prices at 18%.
pub struct FailingRates {
    category: Option<String>,
    fallback: FixedRates,
}

impl FailingRates {
    pub fn always() -> Self {
        FailingRates {
            category: None,
            fallback: FixedRates::new(TaxRate::from_percent(18)),
        }
    }

    pub fn on_category(category: &str) -> Self {
        FailingRates {
            category: Some(category.to_string()),
            fallback: FixedRates::new(TaxRate::from_percent(18)),
        }
    }

    fn fails_for(&self, category: &str) -> bool {
        self.category.as_deref().map_or(true, |c| c == category)
    }
}

#[async_trait]
impl TaxRateService for FailingRates {
    async fn calculate_item_tax(&self, request: &ItemTaxRequest) -> Result<TaxQuote, TaxError> {
        if self.fails_for(&request.category) {
            return Err(TaxError::Calculation("rate service unavailable".to_string()));
        }
        self.fallback.calculate_item_tax(request).await
    }

    async fn get_tax_rate(
        &self,
        category: &str,
        jurisdiction: &str,
        as_of: NaiveDate,
    ) -> Result<RateInfo, TaxError> {
        if self.fails_for(category) {
            return Err(TaxError::RateNotFound {
                category: category.to_string(),
                jurisdiction: jurisdiction.to_string(),
                as_of,
            });
        }
        self.fallback.get_tax_rate(category, jurisdiction, as_of).await
    }
}

// =============================================================================
// Ledger doubles
// =============================================================================

/// In-memory ledger that keeps every request it accepted.
#[derive(Default)]
pub struct RecordingLedger {
    posted: Mutex<Vec<(JournalEntryRequest, PostedEntry)>>,
}

impl RecordingLedger {
    pub fn requests(&self) -> Vec<JournalEntryRequest> {
        self.posted
            .lock()
            .unwrap()
            .iter()
            .map(|(request, _)| request.clone())
            .collect()
    }
}

#[async_trait]
impl LedgerService for RecordingLedger {
    async fn create_journal_entry(
        &self,
        entry: &JournalEntryRequest,
    ) -> ServiceResult<LedgerOutcome> {
        let posted = PostedEntry {
            id: new_id(),
            business_id: entry.business_id.clone(),
            description: entry.description.clone(),
            entry_date: entry.entry_date,
            reference_type: entry.reference_type.clone(),
            reference_id: entry.reference_id.clone(),
            reverses_entry_id: entry.reverses_entry_id.clone(),
            lines: entry.lines.clone(),
            created_at: Utc::now(),
        };
        self.posted
            .lock()
            .unwrap()
            .push((entry.clone(), posted.clone()));
        Ok(LedgerOutcome::Posted(posted))
    }

    async fn entries_for_reference(
        &self,
        business_id: &str,
        reference_id: &str,
    ) -> ServiceResult<Vec<PostedEntry>> {
        Ok(self
            .posted
            .lock()
            .unwrap()
            .iter()
            .map(|(_, posted)| posted)
            .filter(|p| p.business_id == business_id && p.reference_id == reference_id)
            .cloned()
            .collect())
    }
}

/// A ledger that errors out or refuses every entry.
pub struct FailingLedger {
    reject: bool,
}

impl FailingLedger {
    pub fn erroring() -> Self {
        FailingLedger { reject: false }
    }

    pub fn rejecting() -> Self {
        FailingLedger { reject: true }
    }
}

#[async_trait]
impl LedgerService for FailingLedger {
    async fn create_journal_entry(
        &self,
        _entry: &JournalEntryRequest,
    ) -> ServiceResult<LedgerOutcome> {
        if self.reject {
            Ok(LedgerOutcome::Rejected {
                reason: "period closed".to_string(),
            })
        } else {
            Err(ServiceError::Unavailable("ledger offline".to_string()))
        }
    }

    async fn entries_for_reference(
        &self,
        _business_id: &str,
        _reference_id: &str,
    ) -> ServiceResult<Vec<PostedEntry>> {
        Ok(Vec::new())
    }
}

/// Posts through SQLite but never finishes a reversal.
pub struct StallingLedger {
    inner: SqliteLedger,
}

impl StallingLedger {
    pub fn new(journal: JournalRepository) -> Self {
        StallingLedger {
            inner: SqliteLedger::new(journal),
        }
    }
}

#[async_trait]
impl LedgerService for StallingLedger {
    async fn create_journal_entry(
        &self,
        entry: &JournalEntryRequest,
    ) -> ServiceResult<LedgerOutcome> {
        if entry.reverses_entry_id.is_some() {
            std::future::pending::<()>().await;
        }
        self.inner.create_journal_entry(entry).await
    }

    async fn entries_for_reference(
        &self,
        business_id: &str,
        reference_id: &str,
    ) -> ServiceResult<Vec<PostedEntry>> {
        self.inner.entries_for_reference(business_id, reference_id).await
    }
}

// =============================================================================
// Audit double
// =============================================================================

pub struct FailingAudit;

#[async_trait]
impl AuditService for FailingAudit {
    async fn log_action(&self, _event: &AuditEvent) -> ServiceResult<()> {
        Err(ServiceError::Unavailable("audit store offline".to_string()))
    }
}
