//! # Journal Repository
//!
//! Append-only double-entry storage.
//!
//! ```text
//!   journal_entries (header, debit total == credit total)
//!        │ 1:n
//!        ▼
//!   journal_lines   (account, side, positive amount)
//! ```
//!
//! An entry and its lines are written in one transaction; a reversal is a
//! new entry pointing at the one it offsets.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use tally_core::{new_id, JournalEntryRequest, JournalLine, PostedEntry};

#[derive(Debug, sqlx::FromRow)]
struct EntryRow {
    id: String,
    business_id: String,
    description: String,
    entry_date: NaiveDate,
    reference_type: String,
    reference_id: String,
    reverses_entry_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl EntryRow {
    fn with_lines(self, lines: Vec<JournalLine>) -> PostedEntry {
        PostedEntry {
            id: self.id,
            business_id: self.business_id,
            description: self.description,
            entry_date: self.entry_date,
            reference_type: self.reference_type,
            reference_id: self.reference_id,
            reverses_entry_id: self.reverses_entry_id,
            lines,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct JournalRepository {
    pool: SqlitePool,
}

impl JournalRepository {
    pub fn new(pool: SqlitePool) -> Self {
        JournalRepository { pool }
    }

    /// Stores an entry with its lines. Balance is also enforced by the
    /// schema, so an unbalanced request fails with a check violation.
    pub async fn insert(&self, request: &JournalEntryRequest) -> DbResult<PostedEntry> {
        let id = new_id();
        let created_at = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO journal_entries (
                id, business_id, description, entry_date,
                reference_type, reference_id, reverses_entry_id,
                total_debit_cents, total_credit_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&id)
        .bind(&request.business_id)
        .bind(&request.description)
        .bind(request.entry_date)
        .bind(&request.reference_type)
        .bind(&request.reference_id)
        .bind(&request.reverses_entry_id)
        .bind(request.total_debits().cents())
        .bind(request.total_credits().cents())
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        for (index, line) in request.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO journal_lines (
                    id, entry_id, line_no, account_code, description, side, amount_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(new_id())
            .bind(&id)
            .bind(index as i64 + 1)
            .bind(&line.account_code)
            .bind(&line.description)
            .bind(line.side)
            .bind(line.amount_cents)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(entry_id = %id, reference_id = %request.reference_id, "Journal entry stored");

        Ok(PostedEntry {
            id,
            business_id: request.business_id.clone(),
            description: request.description.clone(),
            entry_date: request.entry_date,
            reference_type: request.reference_type.clone(),
            reference_id: request.reference_id.clone(),
            reverses_entry_id: request.reverses_entry_id.clone(),
            lines: request.lines.clone(),
            created_at,
        })
    }

    /// All entries recorded against a reference, oldest first.
    pub async fn entries_for_reference(
        &self,
        business_id: &str,
        reference_id: &str,
    ) -> DbResult<Vec<PostedEntry>> {
        let rows = sqlx::query_as::<_, EntryRow>(
            r#"
            SELECT id, business_id, description, entry_date,
                   reference_type, reference_id, reverses_entry_id, created_at
            FROM journal_entries
            WHERE business_id = ?1 AND reference_id = ?2
            ORDER BY created_at, rowid
            "#,
        )
        .bind(business_id)
        .bind(reference_id)
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let lines = self.lines_for(&row.id).await?;
            entries.push(row.with_lines(lines));
        }

        Ok(entries)
    }

    async fn lines_for(&self, entry_id: &str) -> DbResult<Vec<JournalLine>> {
        let lines = sqlx::query_as::<_, JournalLine>(
            r#"
            SELECT account_code, description, side, amount_cents
            FROM journal_lines
            WHERE entry_id = ?1
            ORDER BY line_no
            "#,
        )
        .bind(entry_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    pub async fn count_entries(&self, business_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM journal_entries WHERE business_id = ?1")
                .bind(business_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}
