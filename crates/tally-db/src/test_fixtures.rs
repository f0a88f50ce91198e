//! Row builders shared by the repository tests.

use chrono::{NaiveDate, TimeZone, Utc};
use std::collections::BTreeMap;

use crate::Database;
use tally_core::tax::{tax_period, CategorySource};
use tally_core::{
    new_id, CustomerClass, ItemKind, LineItem, PaymentStatus, Product, SaleChannel, SaleStatus,
    SaleTransaction, TaxAuditRecord, TaxCalculationContext,
};

pub async fn seed_business(db: &Database, id: &str) {
    db.catalog()
        .insert_business(id, "Test Shop", Some("NG"))
        .await
        .unwrap();
}

/// A completed sale: 2 × 50.00 at 18%.
pub fn sale_fixture(business_id: &str, channel: SaleChannel, number: &str) -> SaleTransaction {
    let at = Utc.with_ymd_and_hms(2026, 3, 14, 10, 30, 0).unwrap();
    SaleTransaction {
        id: new_id(),
        business_id: business_id.to_string(),
        channel,
        sale_number: number.to_string(),
        customer_id: Some("cust-1".to_string()),
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

pub fn line_fixture(sale_id: &str, line_no: i64, tax_cents: Option<i64>) -> LineItem {
    LineItem {
        id: new_id(),
        sale_id: sale_id.to_string(),
        line_no,
        item_kind: None,
        product_id: None,
        service_id: None,
        inventory_item_id: None,
        description: format!("Line {}", line_no),
        quantity: 2,
        unit_price_cents: 5000,
        discount_cents: 0,
        line_total_cents: 10000,
        tax_rate_bps: tax_cents.map(|_| 1800),
        tax_cents,
        tax_category_code: "STANDARD_GOODS".to_string(),
        created_at: Utc::now(),
    }
}

pub fn product_fixture(
    business_id: &str,
    id: &str,
    category: Option<&str>,
    track_inventory: bool,
) -> Product {
    let now = Utc::now();
    Product {
        id: id.to_string(),
        business_id: business_id.to_string(),
        sku: format!("SKU-{}", id),
        name: format!("Product {}", id),
        unit_price_cents: 5000,
        tax_category_code: category.map(str::to_string),
        track_inventory,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

pub fn tax_audit_fixture(sale: &SaleTransaction, line: &LineItem) -> TaxAuditRecord {
    let date: NaiveDate = sale.tax_date;
    TaxAuditRecord {
        id: new_id(),
        business_id: sale.business_id.clone(),
        sale_id: sale.id.clone(),
        line_item_id: line.id.clone(),
        transaction_type: sale.channel,
        transaction_date: date,
        tax_type_id: Some("vat".to_string()),
        tax_rate_id: Some("vat-ng-std".to_string()),
        tax_code: "VAT".to_string(),
        taxable_amount_cents: line.taxable_amount().cents(),
        tax_rate_bps: 1800,
        tax_cents: 1800,
        jurisdiction_code: "NG".to_string(),
        tax_category_code: line.tax_category_code.clone(),
        tax_period: tax_period(date),
        context: TaxCalculationContext {
            line_no: line.line_no,
            line_item_id: line.id.clone(),
            item_kind: Some(ItemKind::Product),
            item_id: None,
            customer_class: CustomerClass::Company,
            category_source: CategorySource::Explicit,
            engine_version: "tally/test".to_string(),
            extra: BTreeMap::new(),
        },
        created_at: Utc::now(),
    }
}
