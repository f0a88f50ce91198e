//! # Validation Module
//!
//! Input validation for sale requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE (before any storage transaction opens)           │
//! │  ├── Required references (business, actor, invoice customer)           │
//! │  ├── At least one line item                                            │
//! │  └── Quantities, prices, discounts, payment amount                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Engine (inside the transaction)                              │
//! │  └── Catalog lookups, stock checks, tax resolution                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints on totals and line tax                          │
//! │  ├── UNIQUE sale numbers per business                                  │
//! │  └── Append-only triggers                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failure here leaves zero trace in storage.
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::validate_quantity;
//!
//! assert!(validate_quantity(2).is_ok());
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::request::{LineItemRequest, SaleRequest};
use crate::types::SaleChannel;
use crate::{MAX_ITEM_QUANTITY, MAX_LINE_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn require(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a line description.
///
/// ## Rules
/// - Must not be empty
/// - At most 500 characters
pub fn validate_description(field: &str, description: &str) -> ValidationResult<()> {
    require(field, description)?;

    if description.trim().chars().count() > 500 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 500,
        });
    }

    Ok(())
}

/// Validates a tax category code.
///
/// ## Rules
/// - 1 to 50 characters
/// - Letters, digits and underscores only
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_category_code;
///
/// assert!(validate_category_code("STANDARD_GOODS").is_ok());
/// assert!(validate_category_code("bad code").is_err());
/// ```
pub fn validate_category_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();
    require("tax_category", code)?;

    if code.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "tax_category".to_string(),
            max: 50,
        });
    }

    if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ValidationError::InvalidFormat {
            field: "tax_category".to_string(),
            reason: "must contain only letters, digits, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a jurisdiction code such as `NG` or `US-CA`.
pub fn validate_jurisdiction(code: &str) -> ValidationResult<()> {
    let code = code.trim();
    require("jurisdiction", code)?;

    if code.len() > 10 {
        return Err(ValidationError::TooLong {
            field: "jurisdiction".to_string(),
            max: 10,
        });
    }

    if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ValidationError::InvalidFormat {
            field: "jurisdiction".to_string(),
            reason: "must contain only letters, digits, and hyphens".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents. Zero is allowed (free items).
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(5000).is_ok());
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "unit_price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Request Validators
// =============================================================================

fn at(index: usize, field: &str) -> String {
    format!("lines[{}].{}", index, field)
}

/// Validates one requested line, returning its net amount (gross minus
/// line discount).
pub fn validate_line(index: usize, line: &LineItemRequest) -> ValidationResult<Money> {
    validate_description(&at(index, "description"), &line.description)?;

    validate_quantity(line.quantity).map_err(|e| rename(e, at(index, "quantity")))?;
    validate_price_cents(line.unit_price_cents)
        .map_err(|e| rename(e, at(index, "unit_price")))?;

    let gross = line.gross().ok_or_else(|| ValidationError::OutOfRange {
        field: at(index, "unit_price"),
        min: 0,
        max: i64::MAX / line.quantity,
    })?;

    if line.discount_cents < 0 || line.discount_cents > gross.cents() {
        return Err(ValidationError::OutOfRange {
            field: at(index, "discount"),
            min: 0,
            max: gross.cents(),
        });
    }

    match (line.kind, line.item_id.as_deref().map(str::trim)) {
        (Some(kind), None) | (Some(kind), Some("")) => {
            return Err(ValidationError::Required {
                field: format!("{} ({} line)", at(index, "item_id"), kind.as_str()),
            });
        }
        (None, Some(_)) => {
            return Err(ValidationError::Inconsistent {
                field: at(index, "item_id"),
                reason: "a manual line cannot reference a catalog item".to_string(),
            });
        }
        _ => {}
    }

    if let Some(code) = &line.tax_category {
        validate_category_code(code).map_err(|e| rename(e, at(index, "tax_category")))?;
    }

    Ok(gross - Money::from_cents(line.discount_cents))
}

/// Validates a sale request for the given entry point.
///
/// ## Rules
/// - Business and actor are required
/// - Invoices require a customer; point-of-sale allows walk-ins
/// - At least one line, at most MAX_LINE_ITEMS
/// - Header discount cannot exceed what the lines are worth after their own
///   discounts
/// - Amount paid cannot be negative
pub fn validate_sale_request(request: &SaleRequest, channel: SaleChannel) -> ValidationResult<()> {
    require("business_id", &request.business_id)?;
    require("actor_id", &request.actor_id)?;

    if channel == SaleChannel::Invoice {
        require("customer_id", request.customer_id.as_deref().unwrap_or(""))?;
    }

    if request.lines.is_empty() {
        return Err(ValidationError::Empty {
            what: "line item".to_string(),
        });
    }

    if request.lines.len() > MAX_LINE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "lines".to_string(),
            min: 1,
            max: MAX_LINE_ITEMS as i64,
        });
    }

    if let Some(code) = &request.jurisdiction {
        validate_jurisdiction(code)?;
    }

    let mut net = Money::zero();
    for (index, line) in request.lines.iter().enumerate() {
        let line_net = validate_line(index, line)?;
        net = Money::from_cents(net.cents().checked_add(line_net.cents()).ok_or_else(|| {
            ValidationError::OutOfRange {
                field: "lines".to_string(),
                min: 0,
                max: i64::MAX,
            }
        })?);
    }

    if request.discount_cents < 0 || request.discount_cents > net.cents() {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: net.cents(),
        });
    }

    if let Some(paid) = request.payment.amount_paid_cents {
        if paid < 0 {
            return Err(ValidationError::OutOfRange {
                field: "amount_paid".to_string(),
                min: 0,
                max: i64::MAX,
            });
        }
    }

    if request.save_as_draft && channel == SaleChannel::PointOfSale {
        return Err(ValidationError::Inconsistent {
            field: "save_as_draft".to_string(),
            reason: "point-of-sale transactions complete immediately".to_string(),
        });
    }

    Ok(())
}

/// Re-labels a field-level error with the indexed field path.
fn rename(err: ValidationError, field: String) -> ValidationError {
    match err {
        ValidationError::Required { .. } => ValidationError::Required { field },
        ValidationError::TooLong { max, .. } => ValidationError::TooLong { field, max },
        ValidationError::OutOfRange { min, max, .. } => {
            ValidationError::OutOfRange { field, min, max }
        }
        ValidationError::MustBePositive { .. } => ValidationError::MustBePositive { field },
        ValidationError::InvalidFormat { reason, .. } => {
            ValidationError::InvalidFormat { field, reason }
        }
        ValidationError::Inconsistent { reason, .. } => {
            ValidationError::Inconsistent { field, reason }
        }
        other @ ValidationError::Empty { .. } => other,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ItemKind, PaymentMethod};
    use chrono::Utc;

    fn invoice() -> SaleRequest {
        SaleRequest::new("biz-1", "user-1", Utc::now())
            .customer("cust-1")
            .line(LineItemRequest::manual("Widget", 2, 5000))
    }

    #[test]
    fn test_valid_invoice() {
        assert!(validate_sale_request(&invoice(), SaleChannel::Invoice).is_ok());
    }

    #[test]
    fn test_invoice_requires_customer() {
        let mut req = invoice();
        req.customer_id = None;
        assert_eq!(
            validate_sale_request(&req, SaleChannel::Invoice),
            Err(ValidationError::Required {
                field: "customer_id".to_string()
            })
        );
        assert!(validate_sale_request(&req, SaleChannel::PointOfSale).is_ok());
    }

    #[test]
    fn test_empty_lines_rejected() {
        let mut req = invoice();
        req.lines.clear();
        assert!(matches!(
            validate_sale_request(&req, SaleChannel::Invoice),
            Err(ValidationError::Empty { .. })
        ));
    }

    #[test]
    fn test_line_field_paths() {
        let req = invoice().line(LineItemRequest::manual("Bad", 0, 100));
        assert_eq!(
            validate_sale_request(&req, SaleChannel::Invoice),
            Err(ValidationError::MustBePositive {
                field: "lines[1].quantity".to_string()
            })
        );
    }

    #[test]
    fn test_kind_and_item_id_must_agree() {
        let mut line = LineItemRequest::manual("Thing", 1, 100);
        line.item_id = Some("prod-1".into());
        assert!(matches!(
            validate_line(0, &line),
            Err(ValidationError::Inconsistent { .. })
        ));

        let mut line = LineItemRequest::manual("Thing", 1, 100);
        line.kind = Some(ItemKind::Product);
        assert!(matches!(
            validate_line(0, &line),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_discount_bounds() {
        let line = LineItemRequest::manual("Thing", 2, 100).with_discount(201);
        assert!(validate_line(0, &line).is_err());

        let line = LineItemRequest::manual("Thing", 2, 100).with_discount(50);
        assert_eq!(validate_line(0, &line), Ok(Money::from_cents(150)));

        let mut req = invoice();
        req.discount_cents = 10001;
        assert!(validate_sale_request(&req, SaleChannel::Invoice).is_err());
        req.discount_cents = 10000;
        assert!(validate_sale_request(&req, SaleChannel::Invoice).is_ok());
    }

    #[test]
    fn test_negative_payment_rejected() {
        let req = invoice().paid(PaymentMethod::Cash, -1);
        assert!(validate_sale_request(&req, SaleChannel::Invoice).is_err());
    }

    #[test]
    fn test_pos_cannot_be_draft() {
        let req = invoice().draft();
        assert!(validate_sale_request(&req, SaleChannel::Invoice).is_ok());
        assert!(validate_sale_request(&req, SaleChannel::PointOfSale).is_err());
    }

    #[test]
    fn test_category_code_format() {
        assert!(validate_category_code("REDUCED_FOOD").is_ok());
        assert!(validate_category_code("").is_err());
        assert!(validate_category_code("no-dashes").is_err());
    }

    #[test]
    fn test_quantity_bounds() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
        assert!(validate_quantity(-1).is_err());
    }
}
