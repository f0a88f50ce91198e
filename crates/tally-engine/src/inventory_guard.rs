//! # Inventory Guard
//!
//! Stock check for inventory-backed lines, run before the sale's storage
//! transaction opens.
//!
//! The check is read-then-decide: no row lock is held between reading the
//! quantity and committing the sale, so two concurrent sales can both pass
//! against the same stock. Stock is not decremented here; inventory
//! movements belong to the inventory system.

use std::sync::Arc;

use tracing::debug;

use tally_core::{ItemKind, LineItemRequest};
use tally_db::CatalogRepository;

use crate::error::{SaleError, SaleResult};
use crate::services::InventoryService;

/// Quantity a sale needs from one stock record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDemand {
    pub item_id: String,
    pub requested: i64,
}

#[derive(Clone)]
pub struct InventoryGuard {
    catalog: CatalogRepository,
    inventory: Arc<dyn InventoryService>,
}

impl InventoryGuard {
    pub fn new(catalog: CatalogRepository, inventory: Arc<dyn InventoryService>) -> Self {
        InventoryGuard { catalog, inventory }
    }

    /// Sums requested quantity per stock record, in first-seen order.
    ///
    /// Inventory lines count directly. Product lines count when the product
    /// tracks inventory; its stock record is synced from the catalog on
    /// demand. Product lines whose product is missing are left to the line
    /// processor's lookup policy.
    pub async fn demands(
        &self,
        business_id: &str,
        lines: &[LineItemRequest],
    ) -> SaleResult<Vec<StockDemand>> {
        let mut demands: Vec<StockDemand> = Vec::new();

        for line in lines {
            let Some(item_id) = line.item_id.as_deref().map(str::trim) else {
                continue;
            };

            let stock_id = match line.kind {
                Some(ItemKind::Inventory) => item_id.to_string(),
                Some(ItemKind::Product) => {
                    match self.catalog.get_product(business_id, item_id).await? {
                        Some(product) if product.track_inventory => {
                            self.inventory
                                .sync_from_catalog(business_id, &product.id)
                                .await
                                .map_err(SaleError::Inventory)?
                                .id
                        }
                        _ => continue,
                    }
                }
                _ => continue,
            };

            match demands.iter_mut().find(|d| d.item_id == stock_id) {
                Some(demand) => demand.requested += line.quantity,
                None => demands.push(StockDemand {
                    item_id: stock_id,
                    requested: line.quantity,
                }),
            }
        }

        Ok(demands)
    }

    /// Fails with `InsufficientStock` on the first record that cannot cover
    /// its demand. A missing record has nothing available.
    pub async fn check(&self, business_id: &str, lines: &[LineItemRequest]) -> SaleResult<()> {
        for demand in self.demands(business_id, lines).await? {
            let available = self
                .inventory
                .stock_level(business_id, &demand.item_id)
                .await
                .map_err(SaleError::Inventory)?
                .unwrap_or(0);

            debug!(
                item_id = %demand.item_id,
                requested = demand.requested,
                available,
                "Stock check"
            );

            if available < demand.requested {
                return Err(SaleError::InsufficientStock {
                    item_id: demand.item_id,
                    requested: demand.requested,
                    available,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::SqliteInventory;
    use crate::test_support;

    fn guard(db: &tally_db::Database) -> InventoryGuard {
        InventoryGuard::new(db.catalog(), Arc::new(SqliteInventory::new(db.inventory())))
    }

    #[tokio::test]
    async fn test_inventory_lines_aggregate() {
        let db = test_support::seeded_db().await;
        let lines = vec![
            LineItemRequest::catalog(ItemKind::Inventory, test_support::TV_STOCK, "TV", 4, 100),
            LineItemRequest::manual("Cable", 1, 100),
            LineItemRequest::catalog(ItemKind::Inventory, test_support::TV_STOCK, "TV", 2, 100),
        ];

        let demands = guard(&db).demands(test_support::BUSINESS, &lines).await.unwrap();
        assert_eq!(
            demands,
            vec![StockDemand {
                item_id: test_support::TV_STOCK.to_string(),
                requested: 6,
            }]
        );

        // 6 on hand
        assert!(guard(&db).check(test_support::BUSINESS, &lines).await.is_ok());

        let mut more = lines.clone();
        more.push(LineItemRequest::catalog(
            ItemKind::Inventory,
            test_support::TV_STOCK,
            "TV",
            1,
            100,
        ));
        let err = guard(&db).check(test_support::BUSINESS, &more).await.unwrap_err();
        assert!(matches!(
            err,
            SaleError::InsufficientStock {
                requested: 7,
                available: 6,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_tracked_product_is_synced_and_checked() {
        let db = test_support::seeded_db().await;
        assert!(db
            .inventory()
            .find_for_product(test_support::BUSINESS, test_support::RICE)
            .await
            .unwrap()
            .is_none());

        let lines = vec![LineItemRequest::catalog(
            ItemKind::Product,
            test_support::RICE,
            "Rice",
            1,
            8500,
        )];
        let err = guard(&db).check(test_support::BUSINESS, &lines).await.unwrap_err();
        assert!(matches!(err, SaleError::InsufficientStock { available: 0, .. }));

        let synced = db
            .inventory()
            .find_for_product(test_support::BUSINESS, test_support::RICE)
            .await
            .unwrap()
            .unwrap();
        db.inventory()
            .set_quantity(test_support::BUSINESS, &synced.id, 10)
            .await
            .unwrap();
        assert!(guard(&db).check(test_support::BUSINESS, &lines).await.is_ok());
    }

    #[tokio::test]
    async fn test_untracked_and_missing_products_are_skipped() {
        let db = test_support::seeded_db().await;
        let lines = vec![
            LineItemRequest::catalog(ItemKind::Product, test_support::WINE, "Wine", 500, 100),
            LineItemRequest::catalog(ItemKind::Product, "ghost", "Ghost", 1, 100),
        ];
        assert!(guard(&db)
            .demands(test_support::BUSINESS, &lines)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_missing_stock_record_has_nothing_available() {
        let db = test_support::seeded_db().await;
        let lines = vec![LineItemRequest::catalog(
            ItemKind::Inventory,
            "no-such-stock",
            "Bits",
            1,
            100,
        )];
        assert!(matches!(
            guard(&db).check(test_support::BUSINESS, &lines).await,
            Err(SaleError::InsufficientStock { available: 0, .. })
        ));
    }
}
