//! # Inventory Repository
//!
//! Stock records. This crate only answers "how many are on hand" and
//! materializes a record for a catalog product; stock movements belong to
//! inventory management, which lives elsewhere.

use chrono::Utc;
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::catalog::CatalogRepository;
use tally_core::{new_id, InventoryItem};

#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    pub async fn find_item<'e, E>(
        executor: E,
        business_id: &str,
        id: &str,
    ) -> DbResult<Option<InventoryItem>>
    where
        E: SqliteExecutor<'e>,
    {
        let item = sqlx::query_as::<_, InventoryItem>(
            "SELECT * FROM inventory_items WHERE id = ?1 AND business_id = ?2",
        )
        .bind(id)
        .bind(business_id)
        .fetch_optional(executor)
        .await?;

        Ok(item)
    }

    /// Category of the product an inventory record is linked to.
    ///
    /// `None` when the record itself is missing; `Some(None)` when it exists
    /// but has no linked product or the product has no category.
    pub async fn linked_product_category<'e, E>(
        executor: E,
        business_id: &str,
        item_id: &str,
    ) -> DbResult<Option<Option<String>>>
    where
        E: SqliteExecutor<'e>,
    {
        let row: Option<(Option<String>,)> = sqlx::query_as(
            r#"
            SELECT p.tax_category_code
            FROM inventory_items i
            LEFT JOIN products p
                ON p.id = i.product_id AND p.business_id = i.business_id
            WHERE i.id = ?1 AND i.business_id = ?2
            "#,
        )
        .bind(item_id)
        .bind(business_id)
        .fetch_optional(executor)
        .await?;

        Ok(row.map(|(code,)| code))
    }

    pub async fn get_item(&self, business_id: &str, id: &str) -> DbResult<Option<InventoryItem>> {
        Self::find_item(&self.pool, business_id, id).await
    }

    pub async fn find_for_product(
        &self,
        business_id: &str,
        product_id: &str,
    ) -> DbResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>(
            "SELECT * FROM inventory_items WHERE business_id = ?1 AND product_id = ?2",
        )
        .bind(business_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Current quantity on hand, `None` when the record does not exist.
    pub async fn stock_level(&self, business_id: &str, item_id: &str) -> DbResult<Option<i64>> {
        let qty: Option<i64> = sqlx::query_scalar(
            "SELECT quantity_on_hand FROM inventory_items WHERE id = ?1 AND business_id = ?2",
        )
        .bind(item_id)
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(qty)
    }

    /// Returns the stock record for a product, creating an empty one if the
    /// product has none yet.
    pub async fn sync_from_product(
        &self,
        business_id: &str,
        product_id: &str,
    ) -> DbResult<InventoryItem> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, InventoryItem>(
            "SELECT * FROM inventory_items WHERE business_id = ?1 AND product_id = ?2",
        )
        .bind(business_id)
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(item) = existing {
            debug!(item_id = %item.id, product_id, "Inventory record already present");
            return Ok(item);
        }

        let product = CatalogRepository::find_product(&mut *tx, business_id, product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;

        let now = Utc::now();
        let item = InventoryItem {
            id: new_id(),
            business_id: business_id.to_string(),
            product_id: Some(product.id.clone()),
            name: product.name.clone(),
            quantity_on_hand: 0,
            created_at: now,
            updated_at: now,
        };
        Self::insert(&mut *tx, &item).await?;
        tx.commit().await?;

        info!(item_id = %item.id, product_id, "Materialized inventory record from catalog");
        Ok(item)
    }

    pub async fn insert_item(&self, item: &InventoryItem) -> DbResult<()> {
        Self::insert(&self.pool, item).await
    }

    async fn insert<'e, E>(executor: E, item: &InventoryItem) -> DbResult<()>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO inventory_items (
                id, business_id, product_id, name, quantity_on_hand, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&item.id)
        .bind(&item.business_id)
        .bind(&item.product_id)
        .bind(&item.name)
        .bind(item.quantity_on_hand)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Overwrites the on-hand count (stock takes, seeding).
    pub async fn set_quantity(&self, business_id: &str, item_id: &str, qty: i64) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE inventory_items SET quantity_on_hand = ?3, updated_at = ?4
            WHERE id = ?1 AND business_id = ?2
            "#,
        )
        .bind(item_id)
        .bind(business_id)
        .bind(qty)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("InventoryItem", item_id));
        }

        Ok(())
    }
}
