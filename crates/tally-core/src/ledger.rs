//! # Ledger Entries
//!
//! The journal-entry shape the accounting bridge hands to a ledger.
//!
//! ```text
//!   Sale POS-000007, paid 118.00 cash, goods only
//!
//!   ┌───────────────────────┬──────────┬──────────┐
//!   │ account               │   debit  │  credit  │
//!   ├───────────────────────┼──────────┼──────────┤
//!   │ 1000 cash             │   118.00 │          │
//!   │ 4000 sales revenue    │          │   118.00 │
//!   └───────────────────────┴──────────┴──────────┘
//!
//!   Reversal: same accounts, sides swapped, `reverses_entry_id` set.
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum EntrySide {
    Debit,
    Credit,
}

impl EntrySide {
    pub fn opposite(&self) -> EntrySide {
        match self {
            EntrySide::Debit => EntrySide::Credit,
            EntrySide::Credit => EntrySide::Debit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct JournalLine {
    pub account_code: String,
    pub description: String,
    pub side: EntrySide,
    /// Always positive; the side carries the direction.
    pub amount_cents: i64,
}

impl JournalLine {
    pub fn debit(account: impl Into<String>, description: impl Into<String>, amount: Money) -> Self {
        JournalLine {
            account_code: account.into(),
            description: description.into(),
            side: EntrySide::Debit,
            amount_cents: amount.cents(),
        }
    }

    pub fn credit(account: impl Into<String>, description: impl Into<String>, amount: Money) -> Self {
        JournalLine {
            account_code: account.into(),
            description: description.into(),
            side: EntrySide::Credit,
            amount_cents: amount.cents(),
        }
    }

    /// Signed amount: debits positive, credits negative.
    pub fn signed(&self) -> i64 {
        match self.side {
            EntrySide::Debit => self.amount_cents,
            EntrySide::Credit => -self.amount_cents,
        }
    }
}

/// A journal entry to be posted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntryRequest {
    pub business_id: String,
    pub description: String,
    pub entry_date: NaiveDate,
    /// What the entry records, e.g. `sale` or `sale_reversal`.
    pub reference_type: String,
    pub reference_id: String,
    /// Set on reversing entries.
    pub reverses_entry_id: Option<String>,
    pub lines: Vec<JournalLine>,
}

impl JournalEntryRequest {
    pub fn total_debits(&self) -> Money {
        self.side_total(EntrySide::Debit)
    }

    pub fn total_credits(&self) -> Money {
        self.side_total(EntrySide::Credit)
    }

    fn side_total(&self, side: EntrySide) -> Money {
        self.lines
            .iter()
            .filter(|l| l.side == side)
            .map(|l| Money::from_cents(l.amount_cents))
            .sum()
    }

    /// Debits equal credits, with at least one line on each side and no
    /// non-positive amounts.
    pub fn is_balanced(&self) -> bool {
        let has_both = self.lines.iter().any(|l| l.side == EntrySide::Debit)
            && self.lines.iter().any(|l| l.side == EntrySide::Credit);
        has_both
            && self.lines.iter().all(|l| l.amount_cents > 0)
            && self.lines.iter().map(JournalLine::signed).sum::<i64>() == 0
    }
}

/// An entry as stored by a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostedEntry {
    pub id: String,
    pub business_id: String,
    pub description: String,
    pub entry_date: NaiveDate,
    pub reference_type: String,
    pub reference_id: String,
    pub reverses_entry_id: Option<String>,
    pub lines: Vec<JournalLine>,
    pub created_at: DateTime<Utc>,
}

impl PostedEntry {
    /// Builds the equal-and-opposite entry for this one.
    pub fn reversal(
        &self,
        description: impl Into<String>,
        entry_date: NaiveDate,
        reference_type: impl Into<String>,
    ) -> JournalEntryRequest {
        JournalEntryRequest {
            business_id: self.business_id.clone(),
            description: description.into(),
            entry_date,
            reference_type: reference_type.into(),
            reference_id: self.reference_id.clone(),
            reverses_entry_id: Some(self.id.clone()),
            lines: self
                .lines
                .iter()
                .map(|l| JournalLine {
                    side: l.side.opposite(),
                    ..l.clone()
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sale_entry(amount: i64) -> JournalEntryRequest {
        JournalEntryRequest {
            business_id: "biz".into(),
            description: "Sale INV-000001".into(),
            entry_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            reference_type: "sale".into(),
            reference_id: "sale-1".into(),
            reverses_entry_id: None,
            lines: vec![
                JournalLine::debit("1000", "cash", Money::from_cents(amount)),
                JournalLine::credit("4000", "revenue", Money::from_cents(amount)),
            ],
        }
    }

    #[test]
    fn test_balanced_entry() {
        let entry = sale_entry(11800);
        assert!(entry.is_balanced());
        assert_eq!(entry.total_debits(), entry.total_credits());
    }

    #[test]
    fn test_unbalanced_and_degenerate_entries() {
        let mut entry = sale_entry(11800);
        entry.lines[1].amount_cents = 11700;
        assert!(!entry.is_balanced());

        let mut entry = sale_entry(11800);
        entry.lines.pop();
        assert!(!entry.is_balanced());

        assert!(!sale_entry(0).is_balanced());
    }

    #[test]
    fn test_reversal_swaps_sides() {
        let original = sale_entry(11800);
        let posted = PostedEntry {
            id: "je-1".into(),
            business_id: original.business_id.clone(),
            description: original.description.clone(),
            entry_date: original.entry_date,
            reference_type: original.reference_type.clone(),
            reference_id: original.reference_id.clone(),
            reverses_entry_id: None,
            lines: original.lines.clone(),
            created_at: Utc::now(),
        };

        let reversal = posted.reversal("Void INV-000001", original.entry_date, "sale_reversal");
        assert!(reversal.is_balanced());
        assert_eq!(reversal.reverses_entry_id.as_deref(), Some("je-1"));
        assert_eq!(reversal.lines[0].side, EntrySide::Credit);
        assert_eq!(reversal.lines[0].account_code, "1000");
        assert_eq!(reversal.lines[1].side, EntrySide::Debit);
        assert_eq!(reversal.total_debits().cents(), 11800);
    }
}
