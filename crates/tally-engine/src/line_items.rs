//! # Line Item Processor
//!
//! Classifies each requested line to a tax category, prices its tax and
//! builds the rows the coordinator writes.
//!
//! ## Per-Line Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  LineItemRequest                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  linked_category()   catalog lookup on the caller's transaction        │
//! │       │              (skipped when the line carries an override)       │
//! │       ▼                                                                 │
//! │  resolve_category()  fallback chain, strict on invoices                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  TaxResolver         amount = quantity × unit price                    │
//! │       │              failure: invoice aborts, POS records untaxed      │
//! │       ▼                                                                 │
//! │  ProcessedLine       LineItem + optional TaxAuditRecord                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, warn};

use tally_core::tax::{
    resolve_category, tax_period, CategoryFacts, LinkedCategory, ResolvedCategory,
};
use tally_core::{
    new_id, CoreError, CustomerClass, ItemKind, LineItem, LineItemRequest, LineTax, Money,
    SaleChannel, TaxAuditRecord, TaxCalculationContext,
};
use tally_db::{CatalogRepository, InventoryRepository, SqliteConnection};

use crate::error::{SaleError, SaleResult};
use crate::tax_resolver::{TaxQuery, TaxResolver};

/// Sale-level facts every line of one sale shares.
#[derive(Debug, Clone)]
pub struct LineContext<'a> {
    pub business_id: &'a str,
    pub sale_id: &'a str,
    pub channel: SaleChannel,
    pub jurisdiction: &'a str,
    pub tax_date: NaiveDate,
    pub customer_class: CustomerClass,
    pub engine_version: &'a str,
    pub created_at: DateTime<Utc>,
}

/// A line ready to insert.
#[derive(Debug, Clone)]
pub struct ProcessedLine {
    pub line: LineItem,
    pub category: ResolvedCategory,
    pub tax: LineTax,
    /// quantity × unit price.
    pub gross: Money,
    pub discount: Money,
}

impl ProcessedLine {
    /// The compliance record for this line, `None` when it is not taxed.
    pub fn tax_audit_record(&self, ctx: &LineContext<'_>) -> Option<TaxAuditRecord> {
        let quote = self.tax.quote()?;

        Some(TaxAuditRecord {
            id: new_id(),
            business_id: ctx.business_id.to_string(),
            sale_id: ctx.sale_id.to_string(),
            line_item_id: self.line.id.clone(),
            transaction_type: ctx.channel,
            transaction_date: ctx.tax_date,
            tax_type_id: quote.tax_type_id.clone(),
            tax_rate_id: quote.tax_rate_id.clone(),
            tax_code: quote.tax_code.clone(),
            taxable_amount_cents: self.gross.cents(),
            tax_rate_bps: quote.rate.bps(),
            tax_cents: quote.amount.cents(),
            jurisdiction_code: ctx.jurisdiction.to_string(),
            tax_category_code: self.category.code.clone(),
            tax_period: tax_period(ctx.tax_date),
            context: TaxCalculationContext {
                line_no: self.line.line_no,
                line_item_id: self.line.id.clone(),
                item_kind: self.line.item_kind,
                item_id: self.line.item_id().map(str::to_string),
                customer_class: ctx.customer_class,
                category_source: self.category.source,
                engine_version: ctx.engine_version.to_string(),
                extra: Default::default(),
            },
            created_at: ctx.created_at,
        })
    }
}

#[derive(Clone)]
pub struct LineItemProcessor {
    resolver: TaxResolver,
}

impl LineItemProcessor {
    pub fn new(resolver: TaxResolver) -> Self {
        LineItemProcessor { resolver }
    }

    /// Processes the line at `index` (0-based) of a sale.
    ///
    /// Catalog lookups run on `conn`, the coordinator's open transaction.
    pub async fn process(
        &self,
        conn: &mut SqliteConnection,
        ctx: &LineContext<'_>,
        index: usize,
        request: &LineItemRequest,
    ) -> SaleResult<ProcessedLine> {
        let line_no = index as i64 + 1;
        let strict = ctx.channel.is_strict();

        let linked = Self::linked_category(conn, ctx.business_id, request).await?;
        let category = resolve_category(
            &CategoryFacts {
                explicit: request.tax_category.as_deref(),
                kind: request.kind,
                linked: linked.clone(),
            },
            strict,
        )
        .map_err(|missing| {
            SaleError::missing_item(missing.kind, request.item_id.as_deref().unwrap_or_default())
        })?;

        if linked == LinkedCategory::Missing {
            warn!(
                line_no,
                item_id = ?request.item_id,
                category = %category.code,
                "Referenced catalog item not found, using default category"
            );
        }

        let gross = request.gross().ok_or_else(|| CoreError::AmountOverflow {
            field: format!("lines[{}].gross", index),
        })?;
        let discount = Money::from_cents(request.discount_cents);

        let query = TaxQuery {
            business_id: ctx.business_id,
            category: &category.code,
            jurisdiction: ctx.jurisdiction,
            as_of: ctx.tax_date,
            customer_class: ctx.customer_class,
            amount: gross,
            transaction_type: ctx.channel,
        };

        let tax = match self.resolver.resolve(&query).await {
            Ok(tax) => tax,
            Err(source) if strict => {
                return Err(SaleError::TaxCalculation { line_no, source });
            }
            Err(e) => {
                warn!(line_no, category = %category.code, error = %e, "Tax lookup failed, recording line untaxed");
                LineTax::untaxed()
            }
        };

        let item_id = request.item_id.as_deref().map(str::trim).map(str::to_string);
        let ref_for = |kind: ItemKind| {
            if request.kind == Some(kind) {
                item_id.clone()
            } else {
                None
            }
        };

        let line = LineItem {
            id: new_id(),
            sale_id: ctx.sale_id.to_string(),
            line_no,
            item_kind: request.kind,
            product_id: ref_for(ItemKind::Product),
            service_id: ref_for(ItemKind::Service),
            inventory_item_id: ref_for(ItemKind::Inventory),
            description: request.description.trim().to_string(),
            quantity: request.quantity,
            unit_price_cents: request.unit_price_cents,
            discount_cents: request.discount_cents,
            line_total_cents: (gross - discount).cents(),
            tax_rate_bps: tax.rate_bps(),
            tax_cents: tax.tax_cents(),
            tax_category_code: category.code.clone(),
            created_at: ctx.created_at,
        };

        debug!(
            line_no,
            category = %category.code,
            source = ?category.source,
            taxed = tax.is_taxed(),
            "Line processed"
        );

        Ok(ProcessedLine {
            line,
            category,
            tax,
            gross,
            discount,
        })
    }

    /// Looks up the category of the record a line points at.
    async fn linked_category(
        conn: &mut SqliteConnection,
        business_id: &str,
        request: &LineItemRequest,
    ) -> SaleResult<LinkedCategory> {
        let has_override = request
            .tax_category
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty());
        let (Some(kind), Some(item_id), false) =
            (request.kind, request.item_id.as_deref().map(str::trim), has_override)
        else {
            return Ok(LinkedCategory::NotLooked);
        };

        let linked = match kind {
            ItemKind::Product => CatalogRepository::find_product(&mut *conn, business_id, item_id)
                .await?
                .map(|p| p.tax_category_code),
            ItemKind::Service => CatalogRepository::find_service(&mut *conn, business_id, item_id)
                .await?
                .map(|s| s.tax_category_code),
            ItemKind::Inventory => {
                InventoryRepository::linked_product_category(&mut *conn, business_id, item_id)
                    .await?
            }
        };

        Ok(linked.map_or(LinkedCategory::Missing, LinkedCategory::Found))
    }
}
