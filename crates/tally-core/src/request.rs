//! # Sale Requests
//!
//! Input shapes for creating a sale through either entry point.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{ItemKind, PaymentMethod};

/// Payment captured with the sale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub method: Option<PaymentMethod>,
    /// `None` means "use the channel default": paid in full at the point of
    /// sale, nothing received on an invoice.
    pub amount_paid_cents: Option<i64>,
}

/// One requested line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemRequest {
    /// `None` for a manual entry.
    pub kind: Option<ItemKind>,
    pub item_id: Option<String>,
    pub description: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    #[serde(default)]
    pub discount_cents: i64,
    /// Explicit tax category override.
    pub tax_category: Option<String>,
}

impl LineItemRequest {
    pub fn manual(description: impl Into<String>, quantity: i64, unit_price_cents: i64) -> Self {
        LineItemRequest {
            kind: None,
            item_id: None,
            description: description.into(),
            quantity,
            unit_price_cents,
            discount_cents: 0,
            tax_category: None,
        }
    }

    pub fn catalog(
        kind: ItemKind,
        item_id: impl Into<String>,
        description: impl Into<String>,
        quantity: i64,
        unit_price_cents: i64,
    ) -> Self {
        LineItemRequest {
            kind: Some(kind),
            item_id: Some(item_id.into()),
            ..LineItemRequest::manual(description, quantity, unit_price_cents)
        }
    }

    pub fn with_category(mut self, code: impl Into<String>) -> Self {
        self.tax_category = Some(code.into());
        self
    }

    pub fn with_discount(mut self, discount_cents: i64) -> Self {
        self.discount_cents = discount_cents;
        self
    }

    /// quantity × unit price, `None` on overflow.
    pub fn gross(&self) -> Option<Money> {
        Money::from_cents(self.unit_price_cents).checked_multiply_quantity(self.quantity)
    }
}

/// A request to create one sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRequest {
    pub business_id: String,
    /// User recorded on the sale and in the audit trail.
    pub actor_id: String,
    pub customer_id: Option<String>,
    pub transaction_date: DateTime<Utc>,
    pub due_date: Option<NaiveDate>,
    /// Overrides the business's configured country.
    pub jurisdiction: Option<String>,
    /// Header-level discount on top of line discounts.
    #[serde(default)]
    pub discount_cents: i64,
    #[serde(default)]
    pub payment: PaymentDetails,
    pub notes: Option<String>,
    /// Save an invoice without finalizing it.
    #[serde(default)]
    pub save_as_draft: bool,
    pub lines: Vec<LineItemRequest>,
}

impl SaleRequest {
    pub fn new(
        business_id: impl Into<String>,
        actor_id: impl Into<String>,
        transaction_date: DateTime<Utc>,
    ) -> Self {
        SaleRequest {
            business_id: business_id.into(),
            actor_id: actor_id.into(),
            customer_id: None,
            transaction_date,
            due_date: None,
            jurisdiction: None,
            discount_cents: 0,
            payment: PaymentDetails::default(),
            notes: None,
            save_as_draft: false,
            lines: Vec::new(),
        }
    }

    pub fn customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn line(mut self, line: LineItemRequest) -> Self {
        self.lines.push(line);
        self
    }

    pub fn paid(mut self, method: PaymentMethod, amount_paid_cents: i64) -> Self {
        self.payment = PaymentDetails {
            method: Some(method),
            amount_paid_cents: Some(amount_paid_cents),
        };
        self
    }

    pub fn draft(mut self) -> Self {
        self.save_as_draft = true;
        self
    }

    /// The date-only value used for tax-rate lookups.
    pub fn tax_date(&self) -> NaiveDate {
        self.transaction_date.date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_tax_date_strips_time() {
        let at = Utc.with_ymd_and_hms(2026, 5, 31, 23, 59, 59).unwrap();
        let req = SaleRequest::new("biz", "user", at);
        assert_eq!(req.tax_date(), NaiveDate::from_ymd_opt(2026, 5, 31).unwrap());
    }

    #[test]
    fn test_catalog_line_builder() {
        let line = LineItemRequest::catalog(ItemKind::Service, "svc-1", "Repair", 1, 2500)
            .with_category("LABOUR")
            .with_discount(500);
        assert_eq!(line.kind, Some(ItemKind::Service));
        assert_eq!(line.item_id.as_deref(), Some("svc-1"));
        assert_eq!(line.tax_category.as_deref(), Some("LABOUR"));
        assert_eq!(line.gross(), Some(Money::from_cents(2500)));
    }
}
