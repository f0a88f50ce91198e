//! # Audit Log Repository
//!
//! One row per completed mutating operation. Written after the operation
//! commits, in its own statement.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use tally_core::{new_id, AuditEvent, AuditLogEntry};

#[derive(Debug, Clone)]
pub struct AuditLogRepository {
    pool: SqlitePool,
}

impl AuditLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AuditLogRepository { pool }
    }

    pub async fn insert(&self, event: &AuditEvent) -> DbResult<AuditLogEntry> {
        let entry = AuditLogEntry {
            id: new_id(),
            business_id: event.business_id.clone(),
            actor_id: event.actor_id.clone(),
            action: event.action.clone(),
            resource_type: event.resource_type.clone(),
            resource_id: event.resource_id.clone(),
            old_values: event.old_values.as_ref().map(serde_json::to_string).transpose()?,
            new_values: event.new_values.as_ref().map(serde_json::to_string).transpose()?,
            created_at: Utc::now(),
        };

        debug!(action = %entry.action, resource_id = %entry.resource_id, "Writing audit entry");

        sqlx::query(
            r#"
            INSERT INTO audit_log (
                id, business_id, actor_id, action, resource_type, resource_id,
                old_values, new_values, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.business_id)
        .bind(&entry.actor_id)
        .bind(&entry.action)
        .bind(&entry.resource_type)
        .bind(&entry.resource_id)
        .bind(&entry.old_values)
        .bind(&entry.new_values)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Entries for one resource, oldest first.
    pub async fn list_for_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
    ) -> DbResult<Vec<AuditLogEntry>> {
        let entries = sqlx::query_as::<_, AuditLogEntry>(
            r#"
            SELECT * FROM audit_log
            WHERE resource_type = ?1 AND resource_id = ?2
            ORDER BY created_at, rowid
            "#,
        )
        .bind(resource_type)
        .bind(resource_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
