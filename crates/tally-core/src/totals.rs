//! # Sale Totals
//!
//! Running totals accumulated line by line, in submission order.
//!
//! ```text
//!   subtotal = Σ quantity × unit_price
//!   discount = Σ line discounts + header discount
//!   tax      = Σ line tax
//!   final    = subtotal - discount + tax
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::PaymentStatus;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
}

impl SaleTotals {
    pub fn new() -> Self {
        SaleTotals::default()
    }

    /// Adds one processed line.
    ///
    /// Fails without changing the totals when any running sum, or the final
    /// amount they imply, leaves the `i64` range.
    pub fn add_line(&mut self, gross: Money, discount: Money, tax: Money) -> CoreResult<()> {
        let next = SaleTotals {
            subtotal: checked(self.subtotal.checked_add(gross), "subtotal")?,
            discount: checked(self.discount.checked_add(discount), "discount")?,
            tax: checked(self.tax.checked_add(tax), "tax")?,
        };
        next.checked_final_amount()?;
        *self = next;
        Ok(())
    }

    pub fn add_header_discount(&mut self, discount: Money) -> CoreResult<()> {
        let next = SaleTotals {
            discount: checked(self.discount.checked_add(discount), "discount")?,
            ..*self
        };
        next.checked_final_amount()?;
        *self = next;
        Ok(())
    }

    /// `subtotal - discount + tax`. Totals built through `add_line` and
    /// `add_header_discount` always have a representable final amount.
    pub fn final_amount(&self) -> Money {
        self.subtotal - self.discount + self.tax
    }

    pub fn checked_final_amount(&self) -> CoreResult<Money> {
        let net = checked(self.subtotal.checked_sub(self.discount), "final amount")?;
        checked(net.checked_add(self.tax), "final amount")
    }

    /// Resolves the amount received: the request value capped at the final
    /// amount, or the channel default when none was given.
    pub fn amount_paid(&self, requested: Option<i64>, paid_in_full_by_default: bool) -> Money {
        let final_amount = self.final_amount();
        match requested {
            Some(cents) => Money::from_cents(cents).min(final_amount),
            None if paid_in_full_by_default => final_amount,
            None => Money::zero(),
        }
    }

    pub fn payment_status(&self, amount_paid: Money) -> PaymentStatus {
        PaymentStatus::derive(amount_paid, self.final_amount())
    }
}

fn checked(value: Option<Money>, field: &str) -> CoreResult<Money> {
    value.ok_or_else(|| CoreError::AmountOverflow {
        field: field.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_amount_identity() {
        let mut totals = SaleTotals::new();
        totals
            .add_line(Money::from_cents(10000), Money::zero(), Money::from_cents(1800))
            .unwrap();
        assert_eq!(totals.final_amount(), Money::from_cents(11800));

        totals
            .add_line(Money::from_cents(500), Money::from_cents(100), Money::zero())
            .unwrap();
        totals.add_header_discount(Money::from_cents(200)).unwrap();
        assert_eq!(totals.subtotal.cents(), 10500);
        assert_eq!(totals.discount.cents(), 300);
        assert_eq!(
            totals.final_amount(),
            totals.subtotal - totals.discount + totals.tax
        );
    }

    #[test]
    fn test_amount_paid_defaults_and_cap() {
        let mut totals = SaleTotals::new();
        totals
            .add_line(Money::from_cents(10000), Money::zero(), Money::from_cents(1800))
            .unwrap();

        assert_eq!(totals.amount_paid(None, true).cents(), 11800);
        assert_eq!(totals.amount_paid(None, false).cents(), 0);
        assert_eq!(totals.amount_paid(Some(20000), false).cents(), 11800);
        assert_eq!(totals.amount_paid(Some(5000), true).cents(), 5000);
        assert_eq!(
            totals.payment_status(Money::from_cents(5000)),
            PaymentStatus::Partial
        );
    }

    #[test]
    fn test_overflow_is_an_error_and_leaves_totals_alone() {
        let mut totals = SaleTotals::new();
        totals
            .add_line(Money::from_cents(i64::MAX - 100), Money::zero(), Money::zero())
            .unwrap();

        // Tax alone pushes the final amount past i64::MAX.
        let err = totals
            .add_line(Money::zero(), Money::zero(), Money::from_cents(200))
            .unwrap_err();
        assert!(matches!(err, CoreError::AmountOverflow { ref field } if field == "final amount"));
        assert_eq!(totals.tax, Money::zero());

        let err = totals
            .add_line(Money::from_cents(500), Money::zero(), Money::zero())
            .unwrap_err();
        assert!(matches!(err, CoreError::AmountOverflow { ref field } if field == "subtotal"));
        assert_eq!(totals.subtotal.cents(), i64::MAX - 100);
        assert_eq!(totals.checked_final_amount().unwrap().cents(), i64::MAX - 100);
    }
}
