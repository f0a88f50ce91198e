//! # Catalog Repository
//!
//! Businesses, customers, products and services.
//!
//! Lookups are business-scoped: an id that exists under another business is
//! "not found". The `find_*` functions run on any executor so the sales
//! engine can read inside its open transaction.

use chrono::Utc;
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tally_core::{Business, Customer, Product, Service};

#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // =========================================================================
    // Executor-generic lookups
    // =========================================================================

    pub async fn find_business<'e, E>(executor: E, id: &str) -> DbResult<Option<Business>>
    where
        E: SqliteExecutor<'e>,
    {
        let business = sqlx::query_as::<_, Business>("SELECT * FROM businesses WHERE id = ?1")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(business)
    }

    pub async fn find_customer<'e, E>(
        executor: E,
        business_id: &str,
        id: &str,
    ) -> DbResult<Option<Customer>>
    where
        E: SqliteExecutor<'e>,
    {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE id = ?1 AND business_id = ?2",
        )
        .bind(id)
        .bind(business_id)
        .fetch_optional(executor)
        .await?;

        Ok(customer)
    }

    pub async fn find_product<'e, E>(
        executor: E,
        business_id: &str,
        id: &str,
    ) -> DbResult<Option<Product>>
    where
        E: SqliteExecutor<'e>,
    {
        let product = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE id = ?1 AND business_id = ?2",
        )
        .bind(id)
        .bind(business_id)
        .fetch_optional(executor)
        .await?;

        Ok(product)
    }

    pub async fn find_service<'e, E>(
        executor: E,
        business_id: &str,
        id: &str,
    ) -> DbResult<Option<Service>>
    where
        E: SqliteExecutor<'e>,
    {
        let service = sqlx::query_as::<_, Service>(
            "SELECT * FROM services WHERE id = ?1 AND business_id = ?2",
        )
        .bind(id)
        .bind(business_id)
        .fetch_optional(executor)
        .await?;

        Ok(service)
    }

    // =========================================================================
    // Pool reads
    // =========================================================================

    pub async fn get_business(&self, id: &str) -> DbResult<Option<Business>> {
        Self::find_business(&self.pool, id).await
    }

    pub async fn get_product(&self, business_id: &str, id: &str) -> DbResult<Option<Product>> {
        Self::find_product(&self.pool, business_id, id).await
    }

    pub async fn count_products(&self, business_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE business_id = ?1")
            .bind(business_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    pub async fn insert_business(
        &self,
        id: &str,
        name: &str,
        country_code: Option<&str>,
    ) -> DbResult<Business> {
        let business = Business {
            id: id.to_string(),
            name: name.to_string(),
            country_code: country_code.map(str::to_string),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO businesses (id, name, country_code, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&business.id)
        .bind(&business.name)
        .bind(&business.country_code)
        .bind(business.created_at)
        .execute(&self.pool)
        .await?;

        Ok(business)
    }

    pub async fn insert_customer(&self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, class = %customer.customer_class, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (id, business_id, name, customer_class, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.business_id)
        .bind(&customer.name)
        .bind(customer.customer_class)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn insert_product(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, business_id, sku, name, unit_price_cents,
                tax_category_code, track_inventory, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(&product.business_id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.unit_price_cents)
        .bind(&product.tax_category_code)
        .bind(product.track_inventory)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn insert_service(&self, service: &Service) -> DbResult<()> {
        debug!(id = %service.id, "Inserting service");

        sqlx::query(
            r#"
            INSERT INTO services (
                id, business_id, name, rate_cents, tax_category_code,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&service.id)
        .bind(&service.business_id)
        .bind(&service.name)
        .bind(service.rate_cents)
        .bind(&service.tax_category_code)
        .bind(service.is_active)
        .bind(service.created_at)
        .bind(service.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
