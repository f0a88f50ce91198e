//! # Audit Events
//!
//! The action-log shapes. Snapshots are a fixed record type rather than free
//! JSON so old/new values always carry the same fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{PaymentStatus, SaleChannel, SaleStatus, SaleTransaction};

/// Summary of a sale header captured before or after an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleAuditSnapshot {
    pub sale_number: String,
    pub channel: SaleChannel,
    pub status: SaleStatus,
    pub customer_id: Option<String>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub payment_status: PaymentStatus,
    pub amount_paid_cents: i64,
    pub line_count: usize,
}

impl SaleAuditSnapshot {
    pub fn of(sale: &SaleTransaction, line_count: usize) -> Self {
        SaleAuditSnapshot {
            sale_number: sale.sale_number.clone(),
            channel: sale.channel,
            status: sale.status,
            customer_id: sale.customer_id.clone(),
            subtotal_cents: sale.subtotal_cents,
            discount_cents: sale.discount_cents,
            tax_cents: sale.tax_cents,
            total_cents: sale.total_cents,
            payment_status: sale.payment_status,
            amount_paid_cents: sale.amount_paid_cents,
            line_count,
        }
    }

    /// Same snapshot with a different status.
    pub fn with_status(&self, status: SaleStatus) -> Self {
        SaleAuditSnapshot {
            status,
            ..self.clone()
        }
    }
}

/// Action names written to the log.
pub mod actions {
    pub const SALE_CREATED: &str = "sale.created";
    pub const SALE_COMPLETED: &str = "sale.completed";
    pub const SALE_VOIDED: &str = "sale.voided";
    pub const SALE_CANCELLED: &str = "sale.cancelled";
}

pub const RESOURCE_SALE: &str = "sale_transaction";

/// One mutating operation, as handed to the audit service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub business_id: String,
    pub actor_id: String,
    pub action: String,
    pub resource_type: String,
    pub resource_id: String,
    pub old_values: Option<SaleAuditSnapshot>,
    pub new_values: Option<SaleAuditSnapshot>,
}

/// A stored audit row; snapshots are kept as JSON text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AuditLogEntry {
    pub id: String,
    pub business_id: String,
    pub actor_id: String,
    pub action: String,
    pub resource_type: String,
    pub resource_id: String,
    pub old_values: Option<String>,
    pub new_values: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn new_snapshot(&self) -> serde_json::Result<Option<SaleAuditSnapshot>> {
        self.new_values
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
    }

    pub fn old_snapshot(&self) -> serde_json::Result<Option<SaleAuditSnapshot>> {
        self.old_values
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
    }
}
