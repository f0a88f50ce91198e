//! # Sale Repository
//!
//! Database operations for sale headers and line items.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE (one transaction, caller-owned)                             │
//! │     └── next_sale_number() → INV-000042                                │
//! │     └── insert_sale()      → header                                    │
//! │     └── insert_line() × n  → line items, in submission order           │
//! │                                                                         │
//! │  2. STATUS CHANGE (guarded by expected status)                         │
//! │     └── update_status(draft → completed)                               │
//! │     └── update_status(completed → void | cancelled)                    │
//! │                                                                         │
//! │  3. ACCOUNTING FLAGS (outside the sale transaction)                    │
//! │     └── mark_accounting_processed() / mark_accounting_failed()         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::{LineItem, SaleChannel, SaleStatus, SaleTransaction};

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    // =========================================================================
    // Transactional writes (caller owns the transaction)
    // =========================================================================

    /// Generates the next business-scoped number for a channel.
    ///
    /// Counts existing sales inside the caller's transaction. Two writers
    /// that race to the same number collide on the unique index and the
    /// later transaction fails.
    pub async fn next_sale_number(
        conn: &mut SqliteConnection,
        business_id: &str,
        channel: SaleChannel,
    ) -> DbResult<String> {
        let existing: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sale_transactions WHERE business_id = ?1 AND channel = ?2",
        )
        .bind(business_id)
        .bind(channel)
        .fetch_one(&mut *conn)
        .await?;

        Ok(format!("{}-{:06}", channel.number_prefix(), existing + 1))
    }

    pub async fn insert_sale(conn: &mut SqliteConnection, sale: &SaleTransaction) -> DbResult<()> {
        debug!(id = %sale.id, sale_number = %sale.sale_number, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sale_transactions (
                id, business_id, channel, sale_number, customer_id,
                transaction_date, tax_date, due_date,
                subtotal_cents, tax_cents, discount_cents, total_cents,
                status, payment_method, payment_status, amount_paid_cents,
                notes, created_by, accounting_processed, accounting_error,
                created_at, updated_at, completed_at, closed_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8,
                ?9, ?10, ?11, ?12,
                ?13, ?14, ?15, ?16,
                ?17, ?18, ?19, ?20,
                ?21, ?22, ?23, ?24
            )
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.business_id)
        .bind(sale.channel)
        .bind(&sale.sale_number)
        .bind(&sale.customer_id)
        .bind(sale.transaction_date)
        .bind(sale.tax_date)
        .bind(sale.due_date)
        .bind(sale.subtotal_cents)
        .bind(sale.tax_cents)
        .bind(sale.discount_cents)
        .bind(sale.total_cents)
        .bind(sale.status)
        .bind(sale.payment_method)
        .bind(sale.payment_status)
        .bind(sale.amount_paid_cents)
        .bind(&sale.notes)
        .bind(&sale.created_by)
        .bind(sale.accounting_processed)
        .bind(&sale.accounting_error)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .bind(sale.completed_at)
        .bind(sale.closed_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn insert_line(conn: &mut SqliteConnection, line: &LineItem) -> DbResult<()> {
        debug!(sale_id = %line.sale_id, line_no = line.line_no, "Inserting line item");

        sqlx::query(
            r#"
            INSERT INTO line_items (
                id, sale_id, line_no, item_kind,
                product_id, service_id, inventory_item_id,
                description, quantity, unit_price_cents, discount_cents,
                line_total_cents, tax_rate_bps, tax_cents, tax_category_code,
                created_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7,
                ?8, ?9, ?10, ?11,
                ?12, ?13, ?14, ?15,
                ?16
            )
            "#,
        )
        .bind(&line.id)
        .bind(&line.sale_id)
        .bind(line.line_no)
        .bind(line.item_kind)
        .bind(&line.product_id)
        .bind(&line.service_id)
        .bind(&line.inventory_item_id)
        .bind(&line.description)
        .bind(line.quantity)
        .bind(line.unit_price_cents)
        .bind(line.discount_cents)
        .bind(line.line_total_cents)
        .bind(line.tax_rate_bps)
        .bind(line.tax_cents)
        .bind(&line.tax_category_code)
        .bind(line.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Moves a sale from `expected` to `next`.
    ///
    /// Status and timestamp columns change. Closing a sale also reopens its
    /// accounting flags, so it stays pending until a reversal is recorded.
    /// Fails with `Conflict` when the row is no longer in `expected`.
    pub async fn update_status(
        conn: &mut SqliteConnection,
        sale_id: &str,
        expected: SaleStatus,
        next: SaleStatus,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        let completed_at = (next == SaleStatus::Completed).then_some(at);
        let closed_at = next.is_terminal().then_some(at);

        let result = sqlx::query(
            r#"
            UPDATE sale_transactions SET
                status = ?3,
                updated_at = ?4,
                completed_at = COALESCE(?5, completed_at),
                closed_at = COALESCE(?6, closed_at),
                accounting_processed = CASE WHEN ?7 THEN 0 ELSE accounting_processed END,
                accounting_error = CASE WHEN ?7 THEN NULL ELSE accounting_error END
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(sale_id)
        .bind(expected)
        .bind(next)
        .bind(at)
        .bind(completed_at)
        .bind(closed_at)
        .bind(next.is_terminal())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict(
                "Sale",
                sale_id,
                format!("expected status {}", expected),
            ));
        }

        Ok(())
    }

    /// Loads a sale through any executor (pool or open transaction).
    pub async fn find_by_id<'e, E>(executor: E, id: &str) -> DbResult<Option<SaleTransaction>>
    where
        E: SqliteExecutor<'e>,
    {
        let sale = sqlx::query_as::<_, SaleTransaction>(
            "SELECT * FROM sale_transactions WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(sale)
    }

    /// Number of line items on a sale, through any executor.
    pub async fn count_lines<'e, E>(executor: E, sale_id: &str) -> DbResult<i64>
    where
        E: SqliteExecutor<'e>,
    {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM line_items WHERE sale_id = ?1")
            .bind(sale_id)
            .fetch_one(executor)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<SaleTransaction>> {
        Self::find_by_id(&self.pool, id).await
    }

    pub async fn get_by_number(
        &self,
        business_id: &str,
        sale_number: &str,
    ) -> DbResult<Option<SaleTransaction>> {
        let sale = sqlx::query_as::<_, SaleTransaction>(
            "SELECT * FROM sale_transactions WHERE business_id = ?1 AND sale_number = ?2",
        )
        .bind(business_id)
        .bind(sale_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Line items in submission order.
    pub async fn get_lines(&self, sale_id: &str) -> DbResult<Vec<LineItem>> {
        let lines = sqlx::query_as::<_, LineItem>(
            "SELECT * FROM line_items WHERE sale_id = ?1 ORDER BY line_no",
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    pub async fn count_for_business(&self, business_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sale_transactions WHERE business_id = ?1")
                .bind(business_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Sales the ledger does not yet reflect: completed sales not yet
    /// posted, and closed sales whose reversal has not been recorded.
    pub async fn list_pending_accounting(
        &self,
        business_id: &str,
        limit: u32,
    ) -> DbResult<Vec<SaleTransaction>> {
        let sales = sqlx::query_as::<_, SaleTransaction>(
            r#"
            SELECT * FROM sale_transactions
            WHERE business_id = ?1
              AND accounting_processed = 0
              AND status IN ('completed', 'void', 'cancelled')
            ORDER BY created_at
            LIMIT ?2
            "#,
        )
        .bind(business_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    // =========================================================================
    // Accounting flags
    // =========================================================================
    // These touch only the two accounting columns; every other header field
    // stays as committed.

    pub async fn mark_accounting_processed(&self, sale_id: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE sale_transactions SET
                accounting_processed = 1,
                accounting_error = NULL
            WHERE id = ?1
            "#,
        )
        .bind(sale_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", sale_id));
        }

        Ok(())
    }

    pub async fn mark_accounting_failed(&self, sale_id: &str, error: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE sale_transactions SET
                accounting_processed = 0,
                accounting_error = ?2
            WHERE id = ?1
            "#,
        )
        .bind(sale_id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", sale_id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{line_fixture, sale_fixture, seed_business};
    use crate::{Database, DbConfig};
    use tally_core::AccountingState;

    async fn setup() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_business(&db, "biz-1").await;
        db
    }

    #[tokio::test]
    async fn test_numbering_per_channel() {
        let db = setup().await;
        let mut tx = db.begin().await.unwrap();

        let first = SaleRepository::next_sale_number(&mut tx, "biz-1", SaleChannel::Invoice)
            .await
            .unwrap();
        assert_eq!(first, "INV-000001");

        let sale = sale_fixture("biz-1", SaleChannel::Invoice, &first);
        SaleRepository::insert_sale(&mut tx, &sale).await.unwrap();

        let second = SaleRepository::next_sale_number(&mut tx, "biz-1", SaleChannel::Invoice)
            .await
            .unwrap();
        assert_eq!(second, "INV-000002");

        let pos = SaleRepository::next_sale_number(&mut tx, "biz-1", SaleChannel::PointOfSale)
            .await
            .unwrap();
        assert_eq!(pos, "POS-000001");

        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_number_is_conflict() {
        let db = setup().await;
        let mut tx = db.begin().await.unwrap();

        let a = sale_fixture("biz-1", SaleChannel::Invoice, "INV-000001");
        let b = sale_fixture("biz-1", SaleChannel::Invoice, "INV-000001");
        SaleRepository::insert_sale(&mut tx, &a).await.unwrap();
        let err = SaleRepository::insert_sale(&mut tx, &b).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_totals_identity_enforced_by_schema() {
        let db = setup().await;
        let mut tx = db.begin().await.unwrap();

        let mut sale = sale_fixture("biz-1", SaleChannel::Invoice, "INV-000001");
        sale.total_cents += 1;
        let err = SaleRepository::insert_sale(&mut tx, &sale).await.unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }

    #[tokio::test]
    async fn test_lines_round_trip_and_are_immutable() {
        let db = setup().await;
        let sale = sale_fixture("biz-1", SaleChannel::Invoice, "INV-000001");

        let mut tx = db.begin().await.unwrap();
        SaleRepository::insert_sale(&mut tx, &sale).await.unwrap();
        SaleRepository::insert_line(&mut tx, &line_fixture(&sale.id, 1, Some(1800)))
            .await
            .unwrap();
        SaleRepository::insert_line(&mut tx, &line_fixture(&sale.id, 2, None))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let lines = db.sales().get_lines(&sale.id).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].line_no, 1);
        assert_eq!(lines[0].tax_cents, Some(1800));
        assert_eq!(lines[1].tax_rate_bps, None);
        assert_eq!(lines[1].tax_cents, None);

        let err = sqlx::query("UPDATE line_items SET quantity = 5 WHERE sale_id = ?1")
            .bind(&sale.id)
            .execute(db.pool())
            .await
            .map_err(DbError::from)
            .unwrap_err();
        assert!(matches!(err, DbError::AppendOnly { .. }));
    }

    #[tokio::test]
    async fn test_zero_tax_cannot_be_stored() {
        let db = setup().await;
        let sale = sale_fixture("biz-1", SaleChannel::Invoice, "INV-000001");

        let mut tx = db.begin().await.unwrap();
        SaleRepository::insert_sale(&mut tx, &sale).await.unwrap();
        let mut line = line_fixture(&sale.id, 1, None);
        line.tax_rate_bps = Some(0);
        line.tax_cents = Some(0);
        let err = SaleRepository::insert_line(&mut tx, &line).await.unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }

    #[tokio::test]
    async fn test_guarded_status_update() {
        let db = setup().await;
        let sale = sale_fixture("biz-1", SaleChannel::Invoice, "INV-000001");

        let mut tx = db.begin().await.unwrap();
        SaleRepository::insert_sale(&mut tx, &sale).await.unwrap();
        SaleRepository::update_status(
            &mut tx,
            &sale.id,
            SaleStatus::Completed,
            SaleStatus::Void,
            Utc::now(),
        )
        .await
        .unwrap();

        let again = SaleRepository::update_status(
            &mut tx,
            &sale.id,
            SaleStatus::Completed,
            SaleStatus::Cancelled,
            Utc::now(),
        )
        .await;
        assert!(matches!(again, Err(DbError::Conflict { .. })));
        tx.commit().await.unwrap();

        let stored = db.sales().get_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SaleStatus::Void);
        assert!(stored.closed_at.is_some());
        assert_eq!(stored.updated_at.timestamp(), stored.closed_at.unwrap().timestamp());
    }

    #[tokio::test]
    async fn test_accounting_flags_and_pending_list() {
        let db = setup().await;
        let sale = sale_fixture("biz-1", SaleChannel::Invoice, "INV-000001");

        let mut tx = db.begin().await.unwrap();
        SaleRepository::insert_sale(&mut tx, &sale).await.unwrap();
        tx.commit().await.unwrap();

        let repo = db.sales();
        assert_eq!(repo.list_pending_accounting("biz-1", 10).await.unwrap().len(), 1);

        repo.mark_accounting_failed(&sale.id, "ledger offline").await.unwrap();
        let stored = repo.get_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(
            stored.accounting_state(),
            AccountingState::Failed("ledger offline".into())
        );
        assert_eq!(
            stored.updated_at.timestamp_millis(),
            sale.updated_at.timestamp_millis()
        );

        repo.mark_accounting_processed(&sale.id).await.unwrap();
        let stored = repo.get_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(stored.accounting_state(), AccountingState::Processed);
        assert!(repo.list_pending_accounting("biz-1", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_closing_a_settled_sale_reopens_accounting() {
        let db = setup().await;
        let sale = sale_fixture("biz-1", SaleChannel::PointOfSale, "POS-000001");
        let line = line_fixture(&sale.id, 1, Some(1800));

        let mut tx = db.begin().await.unwrap();
        SaleRepository::insert_sale(&mut tx, &sale).await.unwrap();
        SaleRepository::insert_line(&mut tx, &line).await.unwrap();
        assert_eq!(SaleRepository::count_lines(&mut *tx, &sale.id).await.unwrap(), 1);
        tx.commit().await.unwrap();

        let repo = db.sales();
        repo.mark_accounting_processed(&sale.id).await.unwrap();
        assert!(repo.list_pending_accounting("biz-1", 10).await.unwrap().is_empty());

        let mut tx = db.begin().await.unwrap();
        SaleRepository::update_status(
            &mut tx,
            &sale.id,
            SaleStatus::Completed,
            SaleStatus::Void,
            Utc::now(),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let stored = repo.get_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(stored.accounting_state(), AccountingState::Pending);
        let pending = repo.list_pending_accounting("biz-1", 10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, sale.id);

        repo.mark_accounting_processed(&sale.id).await.unwrap();
        assert!(repo.list_pending_accounting("biz-1", 10).await.unwrap().is_empty());
    }
}
