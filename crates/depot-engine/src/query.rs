//! # Inventory Query
//!
//! Read-only projections over the sharded store, plus allocation planning.
//!
//! Nothing here mutates stock. An allocation plan is a proposal; callers
//! reserve it afterwards with `lock_for_order`.

use std::collections::HashMap;

use tracing::{debug, warn};

use depot_core::validation::{validate_coordinates, validate_lines, validate_page};
use depot_core::{
    allocate, AllocationPlan, GeoPoint, Inventory, InventoryLog, OrderLine, PageRequest, Paginated,
    StockSource, Warehouse,
};
use depot_db::ShardedRepository;

use crate::error::{EngineError, EngineResult};
use crate::sold_out::SoldOutFilter;

#[derive(Debug, Clone)]
pub struct InventoryQuery {
    repo: ShardedRepository,
    sold_out: SoldOutFilter,
}

impl InventoryQuery {
    pub fn new(repo: ShardedRepository, sold_out: SoldOutFilter) -> Self {
        InventoryQuery { repo, sold_out }
    }

    pub async fn get_inventory(&self, sku_id: i64) -> EngineResult<Inventory> {
        self.repo
            .get_inventory(sku_id)
            .await?
            .ok_or(EngineError::NotFound { sku_id })
    }

    /// Rows for the SKUs that exist, ordered by SKU.
    pub async fn get_inventories(&self, sku_ids: &[i64]) -> EngineResult<Vec<Inventory>> {
        Ok(self.repo.get_inventories(sku_ids).await?)
    }

    /// One page across all shards. Ordering across shards is by SKU.
    pub async fn list_inventories(&self, page: u32, page_size: u32) -> EngineResult<Paginated<Inventory>> {
        let page = validate_page(PageRequest::new(page, page_size))?;
        Ok(self.repo.list_inventories(page).await?)
    }

    /// Audit trail of one inventory, newest first.
    pub async fn get_inventory_logs(
        &self,
        inventory_id: &str,
        page: u32,
        page_size: u32,
    ) -> EngineResult<Paginated<InventoryLog>> {
        let page = validate_page(PageRequest::new(page, page_size))?;
        Ok(self.repo.list_logs(inventory_id, page).await?)
    }

    /// Filter lookup only; may report a SKU that has since been restocked.
    pub async fn is_likely_sold_out(&self, sku_id: i64) -> bool {
        self.sold_out.is_likely_sold_out(sku_id).await
    }

    pub async fn list_warehouses(&self) -> EngineResult<Vec<Warehouse>> {
        Ok(self.repo.list_warehouses().await?)
    }

    /// Plans which warehouses should ship each line.
    ///
    /// Reads the SKUs in one batch, joins each row to its warehouse and runs
    /// the allocator. Rows whose warehouse is not registered are ignored.
    pub async fn allocate_stock(&self, lat: f64, lon: f64, lines: &[OrderLine]) -> EngineResult<Vec<AllocationPlan>> {
        validate_coordinates(lat, lon)?;
        validate_lines(lines)?;

        let mut sku_ids: Vec<i64> = lines.iter().map(|line| line.sku_id).collect();
        sku_ids.sort_unstable();
        sku_ids.dedup();

        let inventories = self.repo.get_inventories(&sku_ids).await?;
        let warehouses: HashMap<i64, Warehouse> = self
            .repo
            .list_warehouses()
            .await?
            .into_iter()
            .map(|w| (w.id, w))
            .collect();

        let mut sources = Vec::with_capacity(inventories.len());
        for inventory in &inventories {
            match warehouses.get(&inventory.warehouse_id) {
                Some(warehouse) => sources.push(StockSource::new(
                    warehouse,
                    inventory.sku_id,
                    inventory.available_stock,
                )),
                None => warn!(
                    sku_id = inventory.sku_id,
                    warehouse_id = inventory.warehouse_id,
                    "Inventory references unknown warehouse, not allocatable"
                ),
            }
        }

        let plans = allocate(GeoPoint::new(lat, lon), lines, &sources)?;
        debug!(
            lines = lines.len(),
            sources = sources.len(),
            unfulfilled = plans.iter().filter(|p| !p.is_fully_allocated()).count(),
            "Allocation planned"
        );
        Ok(plans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_core::{NewWarehouse, ValidationError};

    use crate::manager::{InventoryManager, NewInventory};
    use crate::retry::RetryPolicy;

    async fn setup() -> (InventoryManager, InventoryQuery) {
        let repo = ShardedRepository::in_memory(3).await.unwrap();
        let sold_out = SoldOutFilter::new(1024);
        let manager = InventoryManager::new(repo.clone(), sold_out.clone(), RetryPolicy::default());
        (manager, InventoryQuery::new(repo, sold_out))
    }

    fn inventory(sku_id: i64, warehouse_id: i64, total: i64) -> NewInventory {
        NewInventory {
            sku_id,
            product_id: 1,
            warehouse_id,
            total_stock: total,
            warning_threshold: 0,
        }
    }

    #[tokio::test]
    async fn test_get_and_batch() {
        let (manager, query) = setup().await;
        for sku in 1..=5 {
            manager.create_inventory(inventory(sku, 1, sku)).await.unwrap();
        }

        assert_eq!(query.get_inventory(3).await.unwrap().available_stock, 3);
        assert!(matches!(
            query.get_inventory(9).await.unwrap_err(),
            EngineError::NotFound { sku_id: 9 }
        ));

        let batch = query.get_inventories(&[5, 2, 9]).await.unwrap();
        assert_eq!(batch.iter().map(|i| i.sku_id).collect::<Vec<_>>(), vec![2, 5]);
    }

    #[tokio::test]
    async fn test_list_pages_across_shards() {
        let (manager, query) = setup().await;
        for sku in 1..=7 {
            manager.create_inventory(inventory(sku, 1, 10)).await.unwrap();
        }

        let first = query.list_inventories(1, 3).await.unwrap();
        assert_eq!(first.total, 7);
        assert_eq!(first.items.iter().map(|i| i.sku_id).collect::<Vec<_>>(), vec![1, 2, 3]);

        let last = query.list_inventories(3, 3).await.unwrap();
        assert_eq!(last.items.iter().map(|i| i.sku_id).collect::<Vec<_>>(), vec![7]);

        let err = query.list_inventories(0, 10).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(ValidationError::InvalidPagination { .. })));
        assert!(query.list_inventories(1, 101).await.is_err());
    }

    #[tokio::test]
    async fn test_logs_and_sold_out() {
        let (manager, query) = setup().await;
        let inv = manager.create_inventory(inventory(1, 1, 3)).await.unwrap();
        manager.deduct_stock(1, 1, "a").await.unwrap();
        manager.deduct_stock(1, 2, "b").await.unwrap();

        let logs = query.get_inventory_logs(&inv.id, 1, 1).await.unwrap();
        assert_eq!(logs.total, 2);
        assert_eq!(logs.items.len(), 1);
        assert_eq!(logs.items[0].reason, "b");

        assert!(query.is_likely_sold_out(1).await);
        assert!(query.get_inventory_logs("missing", 1, 10).await.unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn test_allocate_from_nearest_warehouse() {
        let (manager, query) = setup().await;
        // Shanghai and Beijing.
        for (id, lat, lon) in [(1, 31.23, 121.47), (2, 39.90, 116.40)] {
            manager
                .create_warehouse(NewWarehouse {
                    id,
                    name: format!("WH-{id}"),
                    lat,
                    lon,
                    priority: 1,
                    ship_cost: 1,
                })
                .await
                .unwrap();
        }
        // One SKU row per warehouse: SKU 10 in Shanghai, SKU 11 in Beijing.
        manager.create_inventory(inventory(10, 1, 4)).await.unwrap();
        manager.create_inventory(inventory(11, 2, 2)).await.unwrap();

        let plans = query
            .allocate_stock(31.0, 121.0, &[OrderLine::new(10, 3), OrderLine::new(11, 5)])
            .await
            .unwrap();

        assert_eq!(plans.len(), 2);
        assert!(plans[0].is_fully_allocated());
        assert_eq!(plans[0].shares[0].warehouse_id, 1);
        assert_eq!(plans[1].allocated(), 2);
        assert_eq!(plans[1].unfulfilled, 3);

        // Planning does not touch stock.
        assert_eq!(query.get_inventory(10).await.unwrap().available_stock, 4);
        assert_eq!(query.list_warehouses().await.unwrap().len(), 2);

        assert!(query.allocate_stock(91.0, 0.0, &[OrderLine::new(10, 1)]).await.is_err());
        assert!(query.allocate_stock(0.0, 0.0, &[OrderLine::new(10, 0)]).await.is_err());
    }
}
