//! # Audit Trail
//!
//! Records one entry per committed sale operation. Written after commit; a
//! failed write is logged and dropped so it never blocks or undoes the
//! operation it describes.

use std::sync::Arc;

use tracing::{debug, warn};

use tally_core::audit::{actions, RESOURCE_SALE};
use tally_core::{AuditEvent, SaleAuditSnapshot, SaleStatus, SaleTransaction};

use crate::services::AuditService;

#[derive(Clone)]
pub struct AuditTrail {
    service: Arc<dyn AuditService>,
}

impl AuditTrail {
    pub fn new(service: Arc<dyn AuditService>) -> Self {
        AuditTrail { service }
    }

    /// A new sale: no old values, new values summarize the header.
    pub async fn record_created(&self, sale: &SaleTransaction, line_count: usize) {
        self.write(AuditEvent {
            business_id: sale.business_id.clone(),
            actor_id: sale.created_by.clone(),
            action: actions::SALE_CREATED.to_string(),
            resource_type: RESOURCE_SALE.to_string(),
            resource_id: sale.id.clone(),
            old_values: None,
            new_values: Some(SaleAuditSnapshot::of(sale, line_count)),
        })
        .await;
    }

    /// A status change, with the header before and after.
    pub async fn record_transition(
        &self,
        before: &SaleTransaction,
        after: &SaleTransaction,
        line_count: usize,
        actor_id: &str,
    ) {
        let Some(action) = transition_action(after.status) else {
            warn!(status = %after.status, "No audit action for status, skipping entry");
            return;
        };

        self.write(AuditEvent {
            business_id: after.business_id.clone(),
            actor_id: actor_id.to_string(),
            action: action.to_string(),
            resource_type: RESOURCE_SALE.to_string(),
            resource_id: after.id.clone(),
            old_values: Some(SaleAuditSnapshot::of(before, line_count)),
            new_values: Some(SaleAuditSnapshot::of(after, line_count)),
        })
        .await;
    }

    async fn write(&self, event: AuditEvent) {
        match self.service.log_action(&event).await {
            Ok(()) => debug!(action = %event.action, resource_id = %event.resource_id, "Audit entry written"),
            Err(e) => warn!(
                action = %event.action,
                resource_id = %event.resource_id,
                error = %e,
                "Audit write failed, continuing"
            ),
        }
    }
}

fn transition_action(status: SaleStatus) -> Option<&'static str> {
    match status {
        SaleStatus::Completed => Some(actions::SALE_COMPLETED),
        SaleStatus::Void => Some(actions::SALE_VOIDED),
        SaleStatus::Cancelled => Some(actions::SALE_CANCELLED),
        SaleStatus::Draft => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::SqliteAuditLog;
    use crate::test_support::{self, FailingAudit};
    use tally_db::Database;

    async fn stored_sale(db: &Database) -> SaleTransaction {
        let sale = test_support::header(test_support::BUSINESS);
        let mut tx = db.begin().await.unwrap();
        tally_db::SaleRepository::insert_sale(&mut *tx, &sale).await.unwrap();
        tx.commit().await.unwrap();
        sale
    }

    #[tokio::test]
    async fn test_created_and_transition_entries() {
        let db = test_support::seeded_db().await;
        let trail = AuditTrail::new(Arc::new(SqliteAuditLog::new(db.audit_log())));
        let sale = stored_sale(&db).await;

        trail.record_created(&sale, 2).await;
        let mut voided = sale.clone();
        voided.status = SaleStatus::Void;
        trail.record_transition(&sale, &voided, 2, "manager-1").await;

        let entries = db
            .audit_log()
            .list_for_resource(RESOURCE_SALE, &sale.id)
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].action, actions::SALE_CREATED);
        assert_eq!(entries[0].old_values, None);
        let created = entries[0].new_snapshot().unwrap().unwrap();
        assert_eq!(created.total_cents, sale.total_cents);
        assert_eq!(created.line_count, 2);

        assert_eq!(entries[1].action, actions::SALE_VOIDED);
        assert_eq!(entries[1].actor_id, "manager-1");
        assert_eq!(
            entries[1].old_snapshot().unwrap().unwrap().status,
            SaleStatus::Completed
        );
        assert_eq!(
            entries[1].new_snapshot().unwrap().unwrap().status,
            SaleStatus::Void
        );
    }

    #[tokio::test]
    async fn test_failed_write_is_swallowed() {
        let trail = AuditTrail::new(Arc::new(FailingAudit));
        let sale = test_support::header(test_support::BUSINESS);
        trail.record_created(&sale, 1).await;
    }
}
