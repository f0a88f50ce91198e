//! # Accounting Bridge
//!
//! Translates committed sales into ledger postings. Runs only after the
//! sale's transaction has committed and works on the pool, so nothing it
//! does can roll the sale back.
//!
//! ## Outcomes on the Sale Record
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  post_sale                                                              │
//! │    ledger Posted ─────────────► accounting_processed = 1, error = NULL │
//! │    ledger Rejected / Err ─────► accounting_processed = 0, error = msg  │
//! │                                                                         │
//! │  reverse_sale (after void / cancel)                                     │
//! │    reversing entry Posted ────► processed = 1                           │
//! │    nothing was posted ────────► processed = 1 (settled)                 │
//! │    ledger Rejected / Err ─────► processed = 0, error = "reversal ..."  │
//! │                                                                         │
//! │  No automatic retry. reconcile_pending re-drives failed or pending     │
//! │  sales when an operator asks for it.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Posting Shape
//! ```text
//!   Dr  cash | receivable        amount received
//!   Cr  goods | services revenue amount received
//! ```
//! Services revenue is used when any line of the sale is a service.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use tally_core::{
    ItemKind, JournalEntryRequest, JournalLine, PostedEntry, SaleChannel, SaleStatus,
    SaleTransaction,
};
use tally_db::SaleRepository;

use crate::config::{AccountCodes, AccountingSettings, DispatchMode};
use crate::error::{AccountingError, AccountingResult};
use crate::services::{LedgerOutcome, LedgerService};

/// Reference type of a sale posting.
pub const REFERENCE_SALE: &str = "sale";
/// Reference type of a reversing entry.
pub const REFERENCE_SALE_REVERSAL: &str = "sale_reversal";

/// What the bridge did for one sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountingOutcome {
    Posted { entry_id: String },
    Reversed {
        entry_id: String,
        original_entry_id: String,
    },
    /// The sale was voided before anything reached the ledger.
    NothingToReverse,
    Skipped { reason: String },
    /// Recorded on the sale's `accounting_error`.
    Failed { error: String },
    /// Handed to a background task.
    Queued,
    Disabled,
}

impl AccountingOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, AccountingOutcome::Failed { .. })
    }

    fn skipped(reason: impl Into<String>) -> Self {
        AccountingOutcome::Skipped {
            reason: reason.into(),
        }
    }
}

/// Counts from one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub examined: usize,
    pub posted: usize,
    pub reversed: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct AccountingBridge {
    sales: SaleRepository,
    ledger: Arc<dyn LedgerService>,
    settings: AccountingSettings,
}

impl AccountingBridge {
    pub fn new(
        sales: SaleRepository,
        ledger: Arc<dyn LedgerService>,
        settings: AccountingSettings,
    ) -> Self {
        AccountingBridge {
            sales,
            ledger,
            settings,
        }
    }

    pub fn dispatch_mode(&self) -> DispatchMode {
        self.settings.dispatch
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Posts a completed sale according to the configured dispatch mode.
    pub async fn dispatch_post(&self, sale_id: &str) -> AccountingOutcome {
        if !self.settings.enabled {
            return AccountingOutcome::Disabled;
        }

        match self.settings.dispatch {
            DispatchMode::Inline => self.post_sale(sale_id).await,
            DispatchMode::Background => {
                let bridge = self.clone();
                let sale_id = sale_id.to_string();
                tokio::spawn(async move {
                    let outcome = bridge.post_sale(&sale_id).await;
                    debug!(sale_id = %sale_id, ?outcome, "Background posting finished");
                });
                AccountingOutcome::Queued
            }
        }
    }

    /// Reverses a voided or cancelled sale according to the dispatch mode.
    pub async fn dispatch_reverse(&self, sale_id: &str) -> AccountingOutcome {
        if !self.settings.enabled {
            return AccountingOutcome::Disabled;
        }

        match self.settings.dispatch {
            DispatchMode::Inline => self.reverse_sale(sale_id).await,
            DispatchMode::Background => {
                let bridge = self.clone();
                let sale_id = sale_id.to_string();
                tokio::spawn(async move {
                    let outcome = bridge.reverse_sale(&sale_id).await;
                    debug!(sale_id = %sale_id, ?outcome, "Background reversal finished");
                });
                AccountingOutcome::Queued
            }
        }
    }

    // =========================================================================
    // Posting
    // =========================================================================

    /// Posts one balanced entry for a completed sale.
    ///
    /// Never returns an error: failures are written to the sale's
    /// `accounting_error` and reported as `Failed`.
    pub async fn post_sale(&self, sale_id: &str) -> AccountingOutcome {
        if !self.settings.enabled {
            return AccountingOutcome::Disabled;
        }

        match self.try_post(sale_id).await {
            Ok(outcome) => outcome,
            Err(e) => self.record_failure(sale_id, e.to_string()).await,
        }
    }

    async fn try_post(&self, sale_id: &str) -> AccountingResult<AccountingOutcome> {
        let sale = self.load(sale_id).await?;

        if sale.status != SaleStatus::Completed {
            return Ok(AccountingOutcome::skipped(format!("sale is {}", sale.status)));
        }
        if sale.accounting_processed {
            return Ok(AccountingOutcome::skipped("already posted"));
        }

        let existing = self
            .ledger
            .entries_for_reference(&sale.business_id, &sale.id)
            .await?;
        if let Some(original) = original_posting(&existing) {
            debug!(sale_id, entry_id = %original.id, "Sale already in ledger, marking processed");
            self.sales.mark_accounting_processed(sale_id).await?;
            return Ok(AccountingOutcome::skipped("already in ledger"));
        }

        let amount = sale.amount_paid();
        if !amount.is_positive() {
            self.sales.mark_accounting_processed(sale_id).await?;
            return Ok(AccountingOutcome::skipped("no payment received"));
        }

        let lines = self.sales.get_lines(sale_id).await?;
        let has_services = lines.iter().any(|l| l.item_kind == Some(ItemKind::Service));
        let entry = sale_entry(&sale, has_services, &self.settings.accounts);

        match self.ledger.create_journal_entry(&entry).await? {
            LedgerOutcome::Posted(posted) => {
                self.sales.mark_accounting_processed(sale_id).await?;
                info!(
                    sale_id,
                    sale_number = %sale.sale_number,
                    entry_id = %posted.id,
                    amount = %amount,
                    "Sale posted to ledger"
                );
                Ok(AccountingOutcome::Posted {
                    entry_id: posted.id,
                })
            }
            LedgerOutcome::Rejected { reason } => Err(AccountingError::Rejected { reason }),
        }
    }

    // =========================================================================
    // Reversal
    // =========================================================================

    /// Posts the equal-and-opposite entry for a voided or cancelled sale.
    /// The original entry is left as it is.
    pub async fn reverse_sale(&self, sale_id: &str) -> AccountingOutcome {
        if !self.settings.enabled {
            return AccountingOutcome::Disabled;
        }

        match self.try_reverse(sale_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.record_failure(sale_id, format!("reversal failed: {}", e))
                    .await
            }
        }
    }

    async fn try_reverse(&self, sale_id: &str) -> AccountingResult<AccountingOutcome> {
        let sale = self.load(sale_id).await?;

        if !sale.status.is_terminal() {
            return Ok(AccountingOutcome::skipped(format!("sale is {}", sale.status)));
        }

        let entries = self
            .ledger
            .entries_for_reference(&sale.business_id, &sale.id)
            .await?;

        let Some(original) = original_posting(&entries) else {
            self.sales.mark_accounting_processed(sale_id).await?;
            debug!(sale_id, "Nothing posted for sale, no reversal needed");
            return Ok(AccountingOutcome::NothingToReverse);
        };

        if entries
            .iter()
            .any(|e| e.reverses_entry_id.as_deref() == Some(original.id.as_str()))
        {
            self.sales.mark_accounting_processed(sale_id).await?;
            return Ok(AccountingOutcome::skipped("already reversed"));
        }

        let entry_date = sale
            .closed_at
            .unwrap_or_else(Utc::now)
            .date_naive();
        let reversal = original.reversal(
            format!("Reversal of sale {} ({})", sale.sale_number, sale.status),
            entry_date,
            REFERENCE_SALE_REVERSAL,
        );

        match self.ledger.create_journal_entry(&reversal).await? {
            LedgerOutcome::Posted(posted) => {
                self.sales.mark_accounting_processed(sale_id).await?;
                info!(
                    sale_id,
                    entry_id = %posted.id,
                    original_entry_id = %original.id,
                    "Sale reversed in ledger"
                );
                Ok(AccountingOutcome::Reversed {
                    entry_id: posted.id,
                    original_entry_id: original.id.clone(),
                })
            }
            LedgerOutcome::Rejected { reason } => Err(AccountingError::Rejected { reason }),
        }
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Re-drives sales the ledger does not yet reflect, oldest first.
    ///
    /// Operator-triggered; the bridge never schedules this itself.
    pub async fn reconcile_pending(
        &self,
        business_id: &str,
        limit: u32,
    ) -> AccountingResult<ReconcileReport> {
        let pending = self.sales.list_pending_accounting(business_id, limit).await?;
        let mut report = ReconcileReport {
            examined: pending.len(),
            ..ReconcileReport::default()
        };

        for sale in pending {
            let outcome = if sale.status.is_terminal() {
                self.reverse_sale(&sale.id).await
            } else {
                self.post_sale(&sale.id).await
            };

            match outcome {
                AccountingOutcome::Posted { .. } => report.posted += 1,
                AccountingOutcome::Reversed { .. } | AccountingOutcome::NothingToReverse => {
                    report.reversed += 1
                }
                AccountingOutcome::Failed { .. } => report.failed += 1,
                AccountingOutcome::Skipped { .. }
                | AccountingOutcome::Queued
                | AccountingOutcome::Disabled => report.skipped += 1,
            }
        }

        info!(business_id, ?report, "Accounting reconciliation finished");
        Ok(report)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn load(&self, sale_id: &str) -> AccountingResult<SaleTransaction> {
        self.sales
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| AccountingError::SaleNotFound(sale_id.to_string()))
    }

    /// Writes the error onto the sale. The sale itself is not touched.
    async fn record_failure(&self, sale_id: &str, message: String) -> AccountingOutcome {
        warn!(sale_id, error = %message, "Accounting failed, sale left as committed");

        if let Err(e) = self.sales.mark_accounting_failed(sale_id, &message).await {
            error!(sale_id, error = %e, "Could not record accounting failure");
        }

        AccountingOutcome::Failed { error: message }
    }
}

/// The entry a sale was originally posted with, if any.
fn original_posting(entries: &[PostedEntry]) -> Option<&PostedEntry> {
    entries
        .iter()
        .find(|e| e.reference_type == REFERENCE_SALE && e.reverses_entry_id.is_none())
}

/// Builds the two-line posting for a sale.
fn sale_entry(sale: &SaleTransaction, has_services: bool, accounts: &AccountCodes) -> JournalEntryRequest {
    let amount = sale.amount_paid();

    let settles_to_cash = sale
        .payment_method
        .map_or(sale.channel == SaleChannel::PointOfSale, |m| m.settles_to_cash());
    let debit_account = if settles_to_cash {
        &accounts.cash
    } else {
        &accounts.receivable
    };
    let revenue_account = if has_services {
        &accounts.services_revenue
    } else {
        &accounts.goods_revenue
    };

    JournalEntryRequest {
        business_id: sale.business_id.clone(),
        description: format!("Sale {}", sale.sale_number),
        entry_date: sale.tax_date,
        reference_type: REFERENCE_SALE.to_string(),
        reference_id: sale.id.clone(),
        reverses_entry_id: None,
        lines: vec![
            JournalLine::debit(debit_account.as_str(), "Payment received", amount),
            JournalLine::credit(revenue_account.as_str(), "Sales revenue", amount),
        ],
    }
}
