//! # Tax Audit Repository
//!
//! Append-only compliance rows, one per taxed line. Rows are written inside
//! the sale transaction and never updated; a correction is a new row.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::{DbError, DbResult};
use tally_core::{SaleChannel, TaxAuditRecord, TaxCalculationContext};

/// Storage shape; the context travels as JSON text.
#[derive(Debug, sqlx::FromRow)]
struct TaxAuditRow {
    id: String,
    business_id: String,
    sale_id: String,
    line_item_id: String,
    transaction_type: SaleChannel,
    transaction_date: NaiveDate,
    tax_type_id: Option<String>,
    tax_rate_id: Option<String>,
    tax_code: String,
    taxable_amount_cents: i64,
    tax_rate_bps: u32,
    tax_cents: i64,
    jurisdiction_code: String,
    tax_category_code: String,
    tax_period: String,
    calculation_context: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<TaxAuditRow> for TaxAuditRecord {
    type Error = DbError;

    fn try_from(row: TaxAuditRow) -> DbResult<Self> {
        Ok(TaxAuditRecord {
            context: TaxCalculationContext::from_json(&row.calculation_context)?,
            id: row.id,
            business_id: row.business_id,
            sale_id: row.sale_id,
            line_item_id: row.line_item_id,
            transaction_type: row.transaction_type,
            transaction_date: row.transaction_date,
            tax_type_id: row.tax_type_id,
            tax_rate_id: row.tax_rate_id,
            tax_code: row.tax_code,
            taxable_amount_cents: row.taxable_amount_cents,
            tax_rate_bps: row.tax_rate_bps,
            tax_cents: row.tax_cents,
            jurisdiction_code: row.jurisdiction_code,
            tax_category_code: row.tax_category_code,
            tax_period: row.tax_period,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TaxAuditRepository {
    pool: SqlitePool,
}

impl TaxAuditRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TaxAuditRepository { pool }
    }

    pub async fn insert(conn: &mut SqliteConnection, record: &TaxAuditRecord) -> DbResult<()> {
        let context = record.context.to_json()?;

        sqlx::query(
            r#"
            INSERT INTO tax_audit_records (
                id, business_id, sale_id, line_item_id,
                transaction_type, transaction_date,
                tax_type_id, tax_rate_id, tax_code,
                taxable_amount_cents, tax_rate_bps, tax_cents,
                jurisdiction_code, tax_category_code, tax_period,
                calculation_context, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6,
                ?7, ?8, ?9,
                ?10, ?11, ?12,
                ?13, ?14, ?15,
                ?16, ?17
            )
            "#,
        )
        .bind(&record.id)
        .bind(&record.business_id)
        .bind(&record.sale_id)
        .bind(&record.line_item_id)
        .bind(record.transaction_type)
        .bind(record.transaction_date)
        .bind(&record.tax_type_id)
        .bind(&record.tax_rate_id)
        .bind(&record.tax_code)
        .bind(record.taxable_amount_cents)
        .bind(record.tax_rate_bps)
        .bind(record.tax_cents)
        .bind(&record.jurisdiction_code)
        .bind(&record.tax_category_code)
        .bind(&record.tax_period)
        .bind(context)
        .bind(record.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Records for a sale, in line order.
    pub async fn list_for_sale(&self, sale_id: &str) -> DbResult<Vec<TaxAuditRecord>> {
        let rows = sqlx::query_as::<_, TaxAuditRow>(
            r#"
            SELECT t.* FROM tax_audit_records t
            JOIN line_items l ON l.id = t.line_item_id
            WHERE t.sale_id = ?1
            ORDER BY l.line_no
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TaxAuditRecord::try_from).collect()
    }

    pub async fn count_for_sale(&self, sale_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM tax_audit_records WHERE sale_id = ?1")
                .bind(sale_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Tax collected in a monthly period, for reporting.
    pub async fn total_for_period(&self, business_id: &str, tax_period: &str) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(tax_cents), 0) FROM tax_audit_records
            WHERE business_id = ?1 AND tax_period = ?2
            "#,
        )
        .bind(business_id)
        .bind(tax_period)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }
}
