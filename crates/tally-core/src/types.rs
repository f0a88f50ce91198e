//! # Domain Types
//!
//! Core domain types shared by the storage layer and the sales engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────┐   ┌──────────────────┐   ┌──────────────────┐    │
//! │  │ SaleTransaction  │──►│    LineItem      │──►│ TaxAuditRecord   │    │
//! │  │ ──────────────── │ 1:n ─────────────── │ 1:0..1 ───────────── │    │
//! │  │ sale_number      │   │ item_kind        │   │ taxable amount   │    │
//! │  │ status           │   │ tax_rate_bps?    │   │ rate, amount     │    │
//! │  │ totals           │   │ tax_cents?       │   │ period, context  │    │
//! │  │ accounting flags │   │ category code    │   └──────────────────┘    │
//! │  └──────────────────┘   └──────────────────┘                           │
//! │                                                                         │
//! │  Catalog (business-scoped): Business, Customer, Product, Service,      │
//! │  InventoryItem                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has a UUID `id` used for relations; sales also carry a
//! human-readable, business-scoped `sale_number` (`INV-000042`).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 1800 bps = 18%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a whole-number percentage (18 -> 1800 bps).
    #[inline]
    pub const fn from_percent(pct: u32) -> Self {
        TaxRate(pct * 100)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale transaction.
///
/// ## State Machine
/// ```text
///   Draft ──► Completed ──┬──► Void       (terminal)
///                         └──► Cancelled  (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Saved but not yet finalized (invoices only).
    Draft,
    /// Finalized; the accounting bridge posts it.
    Completed,
    /// Voided after completion; the ledger gets a reversing entry.
    Void,
    /// Cancelled after completion; the ledger gets a reversing entry.
    Cancelled,
}

impl SaleStatus {
    /// Returns true if `self -> next` is a defined transition.
    pub fn can_transition_to(&self, next: SaleStatus) -> bool {
        matches!(
            (self, next),
            (SaleStatus::Draft, SaleStatus::Completed)
                | (SaleStatus::Completed, SaleStatus::Void)
                | (SaleStatus::Completed, SaleStatus::Cancelled)
        )
    }

    /// Void and cancelled sales accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SaleStatus::Void | SaleStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Draft => "draft",
            SaleStatus::Completed => "completed",
            SaleStatus::Void => "void",
            SaleStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Completed
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Sale Channel
// =============================================================================

/// Entry point a sale was created through.
///
/// The channel selects the failure policy: invoices abort on lookup and tax
/// failures, point-of-sale degrades to defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleChannel {
    Invoice,
    PointOfSale,
}

impl SaleChannel {
    /// Prefix of the human-readable sale number.
    pub fn number_prefix(&self) -> &'static str {
        match self {
            SaleChannel::Invoice => "INV",
            SaleChannel::PointOfSale => "POS",
        }
    }

    /// Transaction type tag written to tax-audit records.
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleChannel::Invoice => "invoice",
            SaleChannel::PointOfSale => "point_of_sale",
        }
    }

    /// Whether lookup and tax failures abort the whole sale.
    pub fn is_strict(&self) -> bool {
        matches!(self, SaleChannel::Invoice)
    }
}

impl fmt::Display for SaleChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    /// Sold on account; settled later.
    Credit,
}

impl PaymentMethod {
    /// Whether the money lands in the cash account immediately.
    pub fn settles_to_cash(&self) -> bool {
        !matches!(self, PaymentMethod::Credit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

impl PaymentStatus {
    /// Derives the status from what was paid against what is owed.
    pub fn derive(amount_paid: Money, final_amount: Money) -> Self {
        if amount_paid.cents() <= 0 {
            PaymentStatus::Unpaid
        } else if amount_paid < final_amount {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Paid
        }
    }
}

// =============================================================================
// Line Item Kind / Customer Class
// =============================================================================

/// What a line item references. `None` on a line means a manual entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Product,
    Service,
    Inventory,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Product => "product",
            ItemKind::Service => "service",
            ItemKind::Inventory => "inventory",
        }
    }
}

/// Coarse customer designation that selects the tax rule variant
/// (withholding for companies, consumption tax for individuals).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CustomerClass {
    Company,
    Individual,
}

impl CustomerClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerClass::Company => "company",
            CustomerClass::Individual => "individual",
        }
    }
}

impl fmt::Display for CustomerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Sale Transaction
// =============================================================================

/// A sale header. Created atomically with its line items.
///
/// `total_cents == subtotal_cents - discount_cents + tax_cents` always holds;
/// the database enforces it with a CHECK constraint as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleTransaction {
    pub id: String,
    pub business_id: String,
    pub channel: SaleChannel,
    /// Business-scoped sequential number, e.g. `INV-000042`.
    pub sale_number: String,
    /// `None` for walk-in point-of-sale customers.
    pub customer_id: Option<String>,
    #[ts(as = "String")]
    pub transaction_date: DateTime<Utc>,
    /// Date-only value used for effective-dated rate lookups.
    #[ts(as = "String")]
    pub tax_date: NaiveDate,
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub status: SaleStatus,
    pub payment_method: Option<PaymentMethod>,
    pub payment_status: PaymentStatus,
    pub amount_paid_cents: i64,
    pub notes: Option<String>,
    pub created_by: String,
    pub accounting_processed: bool,
    pub accounting_error: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
    /// When the sale was voided or cancelled.
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
}

/// Where a sale stands with the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountingState {
    /// Neither posted nor failed yet.
    Pending,
    Processed,
    Failed(String),
}

impl SaleTransaction {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn tax(&self) -> Money {
        Money::from_cents(self.tax_cents)
    }

    #[inline]
    pub fn discount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn amount_paid(&self) -> Money {
        Money::from_cents(self.amount_paid_cents)
    }

    /// Checks `final == subtotal - discount + tax`.
    pub fn totals_reconcile(&self) -> bool {
        self.subtotal() - self.discount() + self.tax() == self.total()
    }

    pub fn accounting_state(&self) -> AccountingState {
        match (self.accounting_processed, &self.accounting_error) {
            (true, _) => AccountingState::Processed,
            (false, Some(err)) => AccountingState::Failed(err.clone()),
            (false, None) => AccountingState::Pending,
        }
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// A line of a sale. Immutable once the parent transaction commits.
///
/// `tax_rate_bps` and `tax_cents` are both `None` when the line is not
/// taxed, and both present and positive otherwise; a stored zero never
/// appears so reports can tell "not taxable" from "zero-rated".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LineItem {
    pub id: String,
    pub sale_id: String,
    /// 1-based position in submission order.
    pub line_no: i64,
    pub item_kind: Option<ItemKind>,
    pub product_id: Option<String>,
    pub service_id: Option<String>,
    pub inventory_item_id: Option<String>,
    pub description: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub discount_cents: i64,
    /// quantity × unit price − line discount (before tax).
    pub line_total_cents: i64,
    pub tax_rate_bps: Option<u32>,
    pub tax_cents: Option<i64>,
    pub tax_category_code: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl LineItem {
    /// quantity × unit price, the amount tax is computed on.
    #[inline]
    pub fn taxable_amount(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }

    #[inline]
    pub fn tax(&self) -> Money {
        Money::from_cents(self.tax_cents.unwrap_or(0))
    }

    #[inline]
    pub fn is_taxed(&self) -> bool {
        self.tax_cents.is_some()
    }

    /// Returns the referenced catalog id, if any.
    pub fn item_id(&self) -> Option<&str> {
        match self.item_kind? {
            ItemKind::Product => self.product_id.as_deref(),
            ItemKind::Service => self.service_id.as_deref(),
            ItemKind::Inventory => self.inventory_item_id.as_deref(),
        }
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A tenant of the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Business {
    pub id: String,
    pub name: String,
    /// ISO country code used as the default tax jurisdiction.
    pub country_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub business_id: String,
    pub name: String,
    pub customer_class: CustomerClass,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: String,
    pub business_id: String,
    pub sku: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub tax_category_code: Option<String>,
    /// Stock-checked on sale when set.
    pub track_inventory: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Service {
    pub id: String,
    pub business_id: String,
    pub name: String,
    pub rate_cents: i64,
    pub tax_category_code: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stock record, optionally linked to the product it materializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryItem {
    pub id: String,
    pub business_id: String,
    pub product_id: Option<String>,
    pub name: String,
    pub quantity_on_hand: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
