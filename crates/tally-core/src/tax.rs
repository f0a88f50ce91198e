//! # Tax Module
//!
//! Pure tax logic: the category fallback chain, normalization of a rate
//! quote into what a line stores, and the tax-audit record shape.
//!
//! ## Category Fallback Chain
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  First match wins, evaluated top to bottom                              │
//! │                                                                         │
//! │  1. explicit override on the line ────────────────► override            │
//! │  2. product line   ── product found ──────────────► product.category    │
//! │                    └─ product missing ── invoice ─► LOOKUP ERROR        │
//! │                                         └ pos ────► STANDARD_GOODS      │
//! │  3. service line   ── service found with code ────► service.category    │
//! │                    └─ otherwise ──────────────────► SERVICES            │
//! │                       (missing service on invoice: LOOKUP ERROR)        │
//! │  4. inventory line ── linked product with code ───► product.category    │
//! │                    └─ otherwise ──────────────────► STANDARD_GOODS      │
//! │  5. manual line ──────────────────────────────────► STANDARD_GOODS      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::money::Money;
use crate::types::{CustomerClass, ItemKind, SaleChannel, TaxRate};

/// Generic category for goods with no better classification.
pub const STANDARD_GOODS: &str = "STANDARD_GOODS";

/// Generic category for services with no better classification.
pub const SERVICES: &str = "SERVICES";

// =============================================================================
// Category Resolution
// =============================================================================

/// What the processor learned about the catalog record a line points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkedCategory {
    /// Nothing was looked up (manual line, or the override short-circuited).
    NotLooked,
    /// The referenced record does not exist for this business.
    Missing,
    /// The record exists; carries its category code if it has one.
    Found(Option<String>),
}

/// Inputs to the fallback chain for one line.
#[derive(Debug, Clone)]
pub struct CategoryFacts<'a> {
    pub explicit: Option<&'a str>,
    pub kind: Option<ItemKind>,
    pub linked: LinkedCategory,
}

/// Which rung of the chain produced the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategorySource {
    Explicit,
    Product,
    MissingProductDefault,
    Service,
    ServiceDefault,
    InventoryProduct,
    InventoryDefault,
    ManualDefault,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCategory {
    pub code: String,
    pub source: CategorySource,
}

impl ResolvedCategory {
    fn new(code: impl Into<String>, source: CategorySource) -> Self {
        ResolvedCategory {
            code: code.into(),
            source,
        }
    }
}

/// The chain hit a missing product or service under the strict policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingReference {
    pub kind: ItemKind,
}

/// Runs the category fallback chain.
///
/// `strict` is the invoice policy: a missing product or service is an error
/// instead of a default.
pub fn resolve_category(
    facts: &CategoryFacts<'_>,
    strict: bool,
) -> Result<ResolvedCategory, MissingReference> {
    if let Some(code) = facts.explicit.map(str::trim).filter(|c| !c.is_empty()) {
        return Ok(ResolvedCategory::new(code, CategorySource::Explicit));
    }

    let found_code = |linked: &LinkedCategory| match linked {
        LinkedCategory::Found(Some(code)) if !code.trim().is_empty() => Some(code.clone()),
        _ => None,
    };

    match facts.kind {
        Some(ItemKind::Product) => match &facts.linked {
            LinkedCategory::Missing if strict => Err(MissingReference {
                kind: ItemKind::Product,
            }),
            LinkedCategory::Found(_) => Ok(match found_code(&facts.linked) {
                Some(code) => ResolvedCategory::new(code, CategorySource::Product),
                None => ResolvedCategory::new(STANDARD_GOODS, CategorySource::Product),
            }),
            _ => Ok(ResolvedCategory::new(
                STANDARD_GOODS,
                CategorySource::MissingProductDefault,
            )),
        },
        Some(ItemKind::Service) => match &facts.linked {
            LinkedCategory::Missing if strict => Err(MissingReference {
                kind: ItemKind::Service,
            }),
            linked => Ok(match found_code(linked) {
                Some(code) => ResolvedCategory::new(code, CategorySource::Service),
                None => ResolvedCategory::new(SERVICES, CategorySource::ServiceDefault),
            }),
        },
        Some(ItemKind::Inventory) => Ok(match found_code(&facts.linked) {
            Some(code) => ResolvedCategory::new(code, CategorySource::InventoryProduct),
            None => ResolvedCategory::new(STANDARD_GOODS, CategorySource::InventoryDefault),
        }),
        None => Ok(ResolvedCategory::new(
            STANDARD_GOODS,
            CategorySource::ManualDefault,
        )),
    }
}

// =============================================================================
// Rate Quotes
// =============================================================================

/// A rate service answer for one taxable amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxQuote {
    pub rate: TaxRate,
    pub amount: Money,
    pub tax_code: String,
    pub tax_type_id: Option<String>,
    pub tax_rate_id: Option<String>,
}

/// The tax a line ends up storing.
///
/// Either both rate and amount are set and positive, or the line is untaxed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineTax {
    quote: Option<TaxQuote>,
}

impl LineTax {
    pub fn untaxed() -> Self {
        LineTax { quote: None }
    }

    /// Normalizes a quote; a zero rate or an amount that rounds to zero
    /// becomes untaxed.
    pub fn from_quote(quote: TaxQuote) -> Self {
        if quote.rate.is_zero() || !quote.amount.is_positive() {
            LineTax::untaxed()
        } else {
            LineTax { quote: Some(quote) }
        }
    }

    pub fn is_taxed(&self) -> bool {
        self.quote.is_some()
    }

    pub fn rate_bps(&self) -> Option<u32> {
        self.quote.as_ref().map(|q| q.rate.bps())
    }

    pub fn tax_cents(&self) -> Option<i64> {
        self.quote.as_ref().map(|q| q.amount.cents())
    }

    pub fn amount(&self) -> Money {
        self.quote.as_ref().map(|q| q.amount).unwrap_or_default()
    }

    pub fn quote(&self) -> Option<&TaxQuote> {
        self.quote.as_ref()
    }
}

// =============================================================================
// Tax Audit Record
// =============================================================================

/// Structured context stored with each tax-audit row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxCalculationContext {
    pub line_no: i64,
    pub line_item_id: String,
    pub item_kind: Option<ItemKind>,
    pub item_id: Option<String>,
    pub customer_class: CustomerClass,
    pub category_source: CategorySource,
    pub engine_version: String,
    /// Forward-compatible fields only.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

/// One append-only compliance record per taxed line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxAuditRecord {
    pub id: String,
    pub business_id: String,
    pub sale_id: String,
    pub line_item_id: String,
    pub transaction_type: SaleChannel,
    pub transaction_date: NaiveDate,
    pub tax_type_id: Option<String>,
    pub tax_rate_id: Option<String>,
    pub tax_code: String,
    pub taxable_amount_cents: i64,
    pub tax_rate_bps: u32,
    pub tax_cents: i64,
    pub jurisdiction_code: String,
    pub tax_category_code: String,
    /// Monthly bucket, `YYYY-MM`.
    pub tax_period: String,
    pub context: TaxCalculationContext,
    pub created_at: DateTime<Utc>,
}

impl TaxCalculationContext {
    /// JSON form stored in the `calculation_context` column.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

/// Monthly reporting bucket for a tax date.
pub fn tax_period(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(kind: Option<ItemKind>, linked: LinkedCategory) -> CategoryFacts<'static> {
        CategoryFacts {
            explicit: None,
            kind,
            linked,
        }
    }

    #[test]
    fn test_explicit_override_wins() {
        let f = CategoryFacts {
            explicit: Some("REDUCED_FOOD"),
            kind: Some(ItemKind::Product),
            linked: LinkedCategory::Missing,
        };
        let resolved = resolve_category(&f, true).unwrap();
        assert_eq!(resolved.code, "REDUCED_FOOD");
        assert_eq!(resolved.source, CategorySource::Explicit);
    }

    #[test]
    fn test_blank_override_is_ignored() {
        let f = CategoryFacts {
            explicit: Some("  "),
            kind: None,
            linked: LinkedCategory::NotLooked,
        };
        assert_eq!(resolve_category(&f, false).unwrap().code, STANDARD_GOODS);
    }

    #[test]
    fn test_product_category_from_record() {
        let f = facts(
            Some(ItemKind::Product),
            LinkedCategory::Found(Some("ALCOHOL".into())),
        );
        let resolved = resolve_category(&f, true).unwrap();
        assert_eq!(resolved.code, "ALCOHOL");
        assert_eq!(resolved.source, CategorySource::Product);
    }

    #[test]
    fn test_missing_product_is_strict_on_invoice() {
        let f = facts(Some(ItemKind::Product), LinkedCategory::Missing);
        assert_eq!(
            resolve_category(&f, true),
            Err(MissingReference {
                kind: ItemKind::Product
            })
        );
    }

    #[test]
    fn test_missing_product_defaults_on_pos() {
        let f = facts(Some(ItemKind::Product), LinkedCategory::Missing);
        let resolved = resolve_category(&f, false).unwrap();
        assert_eq!(resolved.code, STANDARD_GOODS);
        assert_eq!(resolved.source, CategorySource::MissingProductDefault);
    }

    #[test]
    fn test_service_without_code_uses_services() {
        let f = facts(Some(ItemKind::Service), LinkedCategory::Found(None));
        assert_eq!(resolve_category(&f, true).unwrap().code, SERVICES);

        let f = facts(Some(ItemKind::Service), LinkedCategory::Missing);
        assert_eq!(resolve_category(&f, false).unwrap().code, SERVICES);
        assert!(resolve_category(&f, true).is_err());
    }

    #[test]
    fn test_inventory_chain() {
        let f = facts(
            Some(ItemKind::Inventory),
            LinkedCategory::Found(Some("ELECTRONICS".into())),
        );
        assert_eq!(resolve_category(&f, true).unwrap().code, "ELECTRONICS");

        let f = facts(Some(ItemKind::Inventory), LinkedCategory::Missing);
        let resolved = resolve_category(&f, true).unwrap();
        assert_eq!(resolved.code, STANDARD_GOODS);
        assert_eq!(resolved.source, CategorySource::InventoryDefault);
    }

    #[test]
    fn test_manual_line_is_standard_goods() {
        let f = facts(None, LinkedCategory::NotLooked);
        let resolved = resolve_category(&f, true).unwrap();
        assert_eq!(resolved.code, STANDARD_GOODS);
        assert_eq!(resolved.source, CategorySource::ManualDefault);
    }

    #[test]
    fn test_zero_quotes_normalize_to_untaxed() {
        let zero_rated = TaxQuote {
            rate: TaxRate::zero(),
            amount: Money::zero(),
            tax_code: "ZR".into(),
            tax_type_id: None,
            tax_rate_id: None,
        };
        let tax = LineTax::from_quote(zero_rated);
        assert!(!tax.is_taxed());
        assert_eq!(tax.rate_bps(), None);
        assert_eq!(tax.tax_cents(), None);

        let rounded_away = TaxQuote {
            rate: TaxRate::from_bps(1000),
            amount: Money::zero(),
            tax_code: "STD".into(),
            tax_type_id: None,
            tax_rate_id: None,
        };
        assert!(!LineTax::from_quote(rounded_away).is_taxed());
    }

    #[test]
    fn test_positive_quote_is_kept() {
        let tax = LineTax::from_quote(TaxQuote {
            rate: TaxRate::from_percent(18),
            amount: Money::from_cents(1800),
            tax_code: "VAT18".into(),
            tax_type_id: Some("vat".into()),
            tax_rate_id: Some("vat-18".into()),
        });
        assert_eq!(tax.rate_bps(), Some(1800));
        assert_eq!(tax.tax_cents(), Some(1800));
    }

    #[test]
    fn test_context_json_keeps_shape() {
        let ctx = TaxCalculationContext {
            line_no: 1,
            line_item_id: "li-1".into(),
            item_kind: Some(ItemKind::Product),
            item_id: Some("prod-1".into()),
            customer_class: CustomerClass::Company,
            category_source: CategorySource::Product,
            engine_version: "tally/test".into(),
            extra: BTreeMap::new(),
        };
        let raw = ctx.to_json().unwrap();
        assert!(raw.contains("\"customer_class\":\"company\""));
        assert!(!raw.contains("extra"));
        assert_eq!(TaxCalculationContext::from_json(&raw).unwrap(), ctx);
    }

    #[test]
    fn test_tax_period_bucket() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        assert_eq!(tax_period(date), "2026-03");
    }
}
