//! # Tax Resolver
//!
//! Turns `(category, jurisdiction, date, customer class, amount)` into the
//! tax a line stores.
//!
//! The resolver reads no clock: the only date it sees is the one supplied,
//! already stripped to a day. A quote that comes back zero is normalized to
//! "untaxed" so the line stores no rate rather than a present zero.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use tally_core::validation::validate_tax_rate_bps;
use tally_core::{CustomerClass, LineTax, Money, SaleChannel};

use crate::error::TaxError;
use crate::services::{ItemTaxRequest, RateInfo, TaxRateService};

/// One resolution request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxQuery<'a> {
    pub business_id: &'a str,
    pub category: &'a str,
    pub jurisdiction: &'a str,
    pub as_of: NaiveDate,
    /// Required: it selects the rule variant and changes the liability.
    pub customer_class: CustomerClass,
    pub amount: Money,
    pub transaction_type: SaleChannel,
}

#[derive(Clone)]
pub struct TaxResolver {
    rates: Arc<dyn TaxRateService>,
}

impl TaxResolver {
    pub fn new(rates: Arc<dyn TaxRateService>) -> Self {
        TaxResolver { rates }
    }

    pub async fn resolve(&self, query: &TaxQuery<'_>) -> Result<LineTax, TaxError> {
        let request = ItemTaxRequest {
            business_id: query.business_id.to_string(),
            category: query.category.to_string(),
            jurisdiction: query.jurisdiction.to_string(),
            amount: query.amount,
            transaction_type: query.transaction_type,
            customer_class: query.customer_class,
            transaction_date: query.as_of,
        };

        let quote = self.rates.calculate_item_tax(&request).await?;

        validate_tax_rate_bps(quote.rate.bps())
            .map_err(|e| TaxError::Calculation(format!("rate service returned {}", e)))?;
        if quote.amount.is_negative() {
            return Err(TaxError::Calculation(format!(
                "rate service returned negative tax {}",
                quote.amount
            )));
        }

        debug!(
            category = query.category,
            jurisdiction = query.jurisdiction,
            rate = %quote.rate,
            tax = %quote.amount,
            "Tax resolved"
        );

        Ok(LineTax::from_quote(quote))
    }

    /// Published rate for a category, independent of any amount.
    pub async fn rate_for(
        &self,
        category: &str,
        jurisdiction: &str,
        as_of: NaiveDate,
    ) -> Result<RateInfo, TaxError> {
        self.rates.get_tax_rate(category, jurisdiction, as_of).await
    }
}
