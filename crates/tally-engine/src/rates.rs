//! # Rate Table
//!
//! A `TaxRateService` backed by the effective-dated rules in
//! `[[tax.rules]]`.
//!
//! ## Rule Selection
//! ```text
//!   rules for (jurisdiction, category) in effect on the date
//!        │
//!        ├── rule for the customer class?  ──► use it
//!        └── class-less rule?              ──► use it
//!                                              (latest effective_from wins)
//! ```

use async_trait::async_trait;
use chrono::NaiveDate;

use tally_core::{CustomerClass, TaxQuote, TaxRate};

use crate::config::RateRule;
use crate::error::TaxError;
use crate::services::{ItemTaxRequest, RateInfo, TaxRateService};

#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rules: Vec<RateRule>,
}

impl RateTable {
    pub fn new(rules: Vec<RateRule>) -> Self {
        RateTable { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn find(
        &self,
        category: &str,
        jurisdiction: &str,
        as_of: NaiveDate,
        class: Option<CustomerClass>,
    ) -> Result<&RateRule, TaxError> {
        let in_effect = || {
            self.rules.iter().filter(move |r| {
                r.category.eq_ignore_ascii_case(category)
                    && r.jurisdiction.eq_ignore_ascii_case(jurisdiction)
                    && r.applies_on(as_of)
            })
        };

        let class_specific = class.and_then(|class| {
            in_effect()
                .filter(|r| r.customer_class == Some(class))
                .max_by_key(|r| r.effective_from)
        });

        class_specific
            .or_else(|| {
                in_effect()
                    .filter(|r| r.customer_class.is_none())
                    .max_by_key(|r| r.effective_from)
            })
            .ok_or_else(|| TaxError::RateNotFound {
                category: category.to_string(),
                jurisdiction: jurisdiction.to_string(),
                as_of,
            })
    }
}

fn rate_info(rule: &RateRule) -> RateInfo {
    let rate_id = rule.rate_id.clone().unwrap_or_else(|| {
        format!(
            "{}:{}:{}",
            rule.jurisdiction.to_uppercase(),
            rule.category,
            rule.effective_from
        )
    });

    RateInfo {
        rate: TaxRate::from_bps(rule.rate_bps),
        tax_code: rule.tax_code.clone(),
        tax_type_id: rule.tax_type_id.clone(),
        tax_rate_id: Some(rate_id),
        effective_from: rule.effective_from,
    }
}

#[async_trait]
impl TaxRateService for RateTable {
    async fn calculate_item_tax(&self, request: &ItemTaxRequest) -> Result<TaxQuote, TaxError> {
        if request.amount.is_negative() {
            return Err(TaxError::Calculation(format!(
                "negative taxable amount {}",
                request.amount
            )));
        }

        let rule = self.find(
            &request.category,
            &request.jurisdiction,
            request.transaction_date,
            Some(request.customer_class),
        )?;
        let info = rate_info(rule);

        Ok(TaxQuote {
            rate: info.rate,
            amount: request.amount.calculate_tax(info.rate),
            tax_code: info.tax_code,
            tax_type_id: info.tax_type_id,
            tax_rate_id: info.tax_rate_id,
        })
    }

    async fn get_tax_rate(
        &self,
        category: &str,
        jurisdiction: &str,
        as_of: NaiveDate,
    ) -> Result<RateInfo, TaxError> {
        self.find(category, jurisdiction, as_of, None).map(rate_info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{Money, SaleChannel};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rule(category: &str, class: Option<CustomerClass>, from: NaiveDate, bps: u32) -> RateRule {
        RateRule {
            jurisdiction: "NG".into(),
            category: category.into(),
            customer_class: class,
            effective_from: from,
            effective_to: None,
            rate_bps: bps,
            tax_code: format!("T{}", bps),
            tax_type_id: Some("vat".into()),
            rate_id: None,
        }
    }

    fn request(category: &str, class: CustomerClass, on: NaiveDate) -> ItemTaxRequest {
        ItemTaxRequest {
            business_id: "biz-1".into(),
            category: category.into(),
            jurisdiction: "ng".into(),
            amount: Money::from_cents(10000),
            transaction_type: SaleChannel::Invoice,
            customer_class: class,
            transaction_date: on,
        }
    }

    fn table() -> RateTable {
        let mut old = rule("STANDARD_GOODS", None, date(2019, 1, 1), 500);
        old.effective_to = Some(date(2020, 1, 31));
        RateTable::new(vec![
            old,
            rule("STANDARD_GOODS", None, date(2020, 2, 1), 750),
            rule("SERVICES", None, date(2020, 2, 1), 750),
            rule("SERVICES", Some(CustomerClass::Company), date(2020, 2, 1), 1000),
        ])
    }

    #[tokio::test]
    async fn test_effective_dating() {
        let rates = table();
        let before = rates
            .calculate_item_tax(&request("STANDARD_GOODS", CustomerClass::Individual, date(2019, 6, 1)))
            .await
            .unwrap();
        assert_eq!(before.rate.bps(), 500);
        assert_eq!(before.amount.cents(), 500);

        let after = rates
            .calculate_item_tax(&request("STANDARD_GOODS", CustomerClass::Individual, date(2020, 2, 1)))
            .await
            .unwrap();
        assert_eq!(after.rate.bps(), 750);
        assert_eq!(after.tax_rate_id.as_deref(), Some("NG:STANDARD_GOODS:2020-02-01"));
    }

    #[tokio::test]
    async fn test_customer_class_variant() {
        let rates = table();
        let on = date(2026, 3, 1);
        let company = rates
            .calculate_item_tax(&request("SERVICES", CustomerClass::Company, on))
            .await
            .unwrap();
        let individual = rates
            .calculate_item_tax(&request("SERVICES", CustomerClass::Individual, on))
            .await
            .unwrap();
        assert_eq!(company.rate.bps(), 1000);
        assert_eq!(individual.rate.bps(), 750);

        let generic = rates.get_tax_rate("SERVICES", "NG", on).await.unwrap();
        assert_eq!(generic.rate.bps(), 750);
    }

    #[tokio::test]
    async fn test_miss_is_rate_not_found() {
        let rates = table();
        let err = rates
            .calculate_item_tax(&request("ALCOHOL", CustomerClass::Company, date(2026, 3, 1)))
            .await
            .unwrap_err();
        assert!(matches!(err, TaxError::RateNotFound { .. }));

        let err = rates
            .get_tax_rate("STANDARD_GOODS", "NG", date(2018, 1, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, TaxError::RateNotFound { .. }));
    }

    #[tokio::test]
    async fn test_negative_amount_is_calculation_error() {
        let rates = table();
        let mut req = request("STANDARD_GOODS", CustomerClass::Company, date(2026, 3, 1));
        req.amount = Money::from_cents(-1);
        assert!(matches!(
            rates.calculate_item_tax(&req).await,
            Err(TaxError::Calculation(_))
        ));
    }
}
