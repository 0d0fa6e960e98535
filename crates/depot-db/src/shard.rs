//! # Shard Routing & Sharded Repository
//!
//! Partitions inventory rows across N SQLite databases keyed by SKU.
//!
//! ## Routing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         SKU → Shard                                     │
//! │                                                                         │
//! │  sku_id ──► ShardRouter::route(sku_id, N) ──► k ∈ [0, N)               │
//! │                                                                         │
//! │  JumpHashRouter (default)         ModuloRouter                         │
//! │  ────────────────────────         ────────────                         │
//! │  • ~1/N keys move when N grows    • sku mod N                          │
//! │  • no lookup table                • every key may move on resize       │
//! │                                                                         │
//! │  Single-SKU ops       → exactly one shard                              │
//! │  Batch by SKU set     → group per shard, one query per shard, merge    │
//! │  Full listing         → every shard, merge by sku_id, cut the page     │
//! │  Warehouses           → shard 0 (home shard)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info};

use depot_core::{Inventory, InventoryLog, NewWarehouse, PageRequest, Paginated, Warehouse};

use crate::error::{DbError, DbResult};
use crate::pool::{Database, DbConfig};

// =============================================================================
// Routers
// =============================================================================

/// Strategy mapping a SKU to a shard index.
pub trait ShardRouter: Send + Sync + fmt::Debug {
    /// Returns the shard for `sku_id`, always `< shard_count`.
    fn route(&self, sku_id: i64, shard_count: usize) -> usize;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Jump consistent hash (Lamping & Veach).
#[derive(Debug, Clone, Copy, Default)]
pub struct JumpHashRouter;

impl ShardRouter for JumpHashRouter {
    fn route(&self, sku_id: i64, shard_count: usize) -> usize {
        let mut hasher = DefaultHasher::new();
        sku_id.hash(&mut hasher);
        jump_consistent_hash(hasher.finish(), shard_count)
    }

    fn name(&self) -> &'static str {
        "jump_hash"
    }
}

/// `sku_id mod shard_count`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModuloRouter;

impl ShardRouter for ModuloRouter {
    fn route(&self, sku_id: i64, shard_count: usize) -> usize {
        if shard_count <= 1 {
            return 0;
        }
        sku_id.rem_euclid(shard_count as i64) as usize
    }

    fn name(&self) -> &'static str {
        "modulo"
    }
}

/// Maps a 64-bit key onto `[0, buckets)`.
pub fn jump_consistent_hash(mut key: u64, buckets: usize) -> usize {
    if buckets <= 1 {
        return 0;
    }
    let mut b: i64 = -1;
    let mut j: i64 = 0;
    while j < buckets as i64 {
        b = j;
        key = key.wrapping_mul(2_862_933_555_777_941_757).wrapping_add(1);
        j = ((b + 1) as f64 * ((1u64 << 31) as f64 / ((key >> 33) + 1) as f64)) as i64;
    }
    b as usize
}

// =============================================================================
// Sharded Repository
// =============================================================================

/// Routes inventory and log access to the owning shard.
///
/// Cheap to clone; every clone shares the same pools.
#[derive(Debug, Clone)]
pub struct ShardedRepository {
    shards: Arc<Vec<Database>>,
    router: Arc<dyn ShardRouter>,
}

impl ShardedRepository {
    /// Wraps already opened shards.
    pub fn new(shards: Vec<Database>, router: Arc<dyn ShardRouter>) -> DbResult<Self> {
        if shards.is_empty() {
            return Err(DbError::InvalidShardConfig("at least one shard is required".into()));
        }
        Ok(ShardedRepository {
            shards: Arc::new(shards),
            router,
        })
    }

    /// Opens every configured shard in order (index = position).
    pub async fn connect(configs: Vec<DbConfig>, router: Arc<dyn ShardRouter>) -> DbResult<Self> {
        let mut shards = Vec::with_capacity(configs.len());
        for config in configs {
            shards.push(Database::new(config).await?);
        }
        info!(shards = shards.len(), router = router.name(), "Sharded repository ready");
        Self::new(shards, router)
    }

    /// Opens `count` isolated in-memory shards (for testing).
    pub async fn in_memory(count: usize) -> DbResult<Self> {
        let configs = (0..count).map(|_| DbConfig::in_memory()).collect();
        Self::connect(configs, Arc::new(JumpHashRouter)).await
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Index of the shard owning `sku_id`.
    pub fn shard_index(&self, sku_id: i64) -> usize {
        self.router.route(sku_id, self.shards.len()).min(self.shards.len() - 1)
    }

    /// The shard owning `sku_id`.
    pub fn shard_for(&self, sku_id: i64) -> &Database {
        &self.shards[self.shard_index(sku_id)]
    }

    /// The shard holding reference data.
    pub fn home(&self) -> &Database {
        &self.shards[0]
    }

    // =========================================================================
    // Inventory
    // =========================================================================

    pub async fn insert_inventory(&self, inventory: &Inventory) -> DbResult<()> {
        self.shard_for(inventory.sku_id).inventories().insert(inventory).await
    }

    pub async fn get_inventory(&self, sku_id: i64) -> DbResult<Option<Inventory>> {
        self.shard_for(sku_id).inventories().get_by_sku(sku_id).await
    }

    /// Conditional update on the owning shard. Returns the new version.
    pub async fn update_inventory(&self, inventory: &Inventory, expected_version: i64) -> DbResult<i64> {
        self.shard_for(inventory.sku_id)
            .inventories()
            .update_versioned(inventory, expected_version)
            .await
    }

    pub async fn delete_inventory(&self, sku_id: i64) -> DbResult<bool> {
        self.shard_for(sku_id).inventories().delete(sku_id).await
    }

    /// Batch read: one query per touched shard, merged in SKU order.
    pub async fn get_inventories(&self, sku_ids: &[i64]) -> DbResult<Vec<Inventory>> {
        let mut by_shard: BTreeMap<usize, Vec<i64>> = BTreeMap::new();
        for &sku_id in sku_ids {
            let skus = by_shard.entry(self.shard_index(sku_id)).or_default();
            if !skus.contains(&sku_id) {
                skus.push(sku_id);
            }
        }

        let mut set = JoinSet::new();
        for (index, skus) in by_shard {
            let shard = self.shards[index].clone();
            set.spawn(async move { shard.inventories().get_by_skus(&skus).await });
        }

        let mut merged = Vec::with_capacity(sku_ids.len());
        while let Some(joined) = set.join_next().await {
            let rows = joined.map_err(|e| DbError::Internal(e.to_string()))??;
            merged.extend(rows);
        }
        merged.sort_by_key(|inv| inv.sku_id);
        Ok(merged)
    }

    /// Lists one page across all shards, ordered by SKU.
    ///
    /// Each shard returns its first `offset + limit` rows, so the merged cut
    /// is exact; cost grows with the page number.
    pub async fn list_inventories(&self, page: PageRequest) -> DbResult<Paginated<Inventory>> {
        let fetch = page.fan_out_limit();
        let per_shard = self
            .fan_out(move |db| async move {
                let inventories = db.inventories();
                let rows = inventories.list(fetch, 0).await?;
                let count = inventories.count().await?;
                Ok::<_, DbError>((rows, count))
            })
            .await?;

        let mut total = 0;
        let mut merged = Vec::new();
        for (rows, count) in per_shard {
            total += count;
            merged.extend(rows);
        }
        merged.sort_by_key(|inv| inv.sku_id);

        let items = merged
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();

        debug!(page = page.page, page_size = page.page_size, total, "Listed inventories");
        Ok(Paginated { items, total })
    }

    pub async fn count_inventories(&self) -> DbResult<i64> {
        let counts = self
            .fan_out(|db| async move { db.inventories().count().await })
            .await?;
        Ok(counts.into_iter().sum())
    }

    /// SKUs with zero available stock on every shard.
    pub async fn sold_out_skus(&self) -> DbResult<Vec<i64>> {
        let per_shard = self
            .fan_out(|db| async move { db.inventories().sold_out_skus().await })
            .await?;
        let mut skus: Vec<i64> = per_shard.into_iter().flatten().collect();
        skus.sort_unstable();
        Ok(skus)
    }

    // =========================================================================
    // Logs
    // =========================================================================

    /// Appends a log entry on the shard of its SKU.
    pub async fn insert_log(&self, log: &InventoryLog) -> DbResult<()> {
        self.shard_for(log.sku_id).logs().insert(log).await
    }

    /// Pages through the logs of one inventory, newest first.
    ///
    /// Logs are keyed by inventory id, not SKU, so the owning shard is found
    /// by counting; only that shard is then paged.
    pub async fn list_logs(&self, inventory_id: &str, page: PageRequest) -> DbResult<Paginated<InventoryLog>> {
        let id = inventory_id.to_string();
        let counts = self
            .fan_out(move |db| {
                let id = id.clone();
                async move { db.logs().count_by_inventory(&id).await }
            })
            .await?;

        let Some((index, total)) = counts.into_iter().enumerate().find(|(_, count)| *count > 0) else {
            return Ok(Paginated::empty());
        };

        let items = self.shards[index]
            .logs()
            .list_by_inventory(inventory_id, page.limit(), page.offset())
            .await?;
        Ok(Paginated { items, total })
    }

    // =========================================================================
    // Warehouses (home shard)
    // =========================================================================

    pub async fn insert_warehouse(&self, warehouse: &NewWarehouse) -> DbResult<Warehouse> {
        self.home().warehouses().insert(warehouse).await
    }

    pub async fn get_warehouse(&self, id: i64) -> DbResult<Option<Warehouse>> {
        self.home().warehouses().get(id).await
    }

    pub async fn list_warehouses(&self) -> DbResult<Vec<Warehouse>> {
        self.home().warehouses().list().await
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// True when every shard answers.
    pub async fn health_check(&self) -> bool {
        for shard in self.shards.iter() {
            if !shard.health_check().await {
                return false;
            }
        }
        true
    }

    pub async fn close(&self) {
        for shard in self.shards.iter() {
            shard.close().await;
        }
    }

    /// Runs `op` against every shard concurrently, results in shard order.
    async fn fan_out<T, F, Fut>(&self, op: F) -> DbResult<Vec<T>>
    where
        F: Fn(Database) -> Fut,
        Fut: Future<Output = DbResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        let mut set = JoinSet::new();
        for (index, shard) in self.shards.iter().enumerate() {
            let fut = op(shard.clone());
            set.spawn(async move { (index, fut.await) });
        }

        let mut results: Vec<(usize, T)> = Vec::with_capacity(self.shards.len());
        while let Some(joined) = set.join_next().await {
            let (index, result) = joined.map_err(|e| DbError::Internal(e.to_string()))?;
            results.push((index, result?));
        }
        results.sort_by_key(|(index, _)| *index);
        Ok(results.into_iter().map(|(_, value)| value).collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jump_hash_in_range_and_stable() {
        let router = JumpHashRouter;
        for sku in 0..2_000i64 {
            let shard = router.route(sku, 7);
            assert!(shard < 7);
            assert_eq!(shard, router.route(sku, 7));
        }
        assert_eq!(router.route(42, 1), 0);
        assert_eq!(router.route(42, 0), 0);
    }

    #[test]
    fn test_jump_hash_moves_few_keys_on_growth() {
        let router = JumpHashRouter;
        let moved = (0..10_000i64)
            .filter(|&sku| router.route(sku, 8) != router.route(sku, 9))
            .count();
        // Ideal is 1/9 of the keys.
        assert!(moved < 2_000, "moved {moved}");
        // Keys that move always land on the new shard.
        for sku in 0..10_000i64 {
            let (before, after) = (router.route(sku, 8), router.route(sku, 9));
            assert!(before == after || after == 8);
        }
    }

    #[test]
    fn test_jump_hash_spreads_keys() {
        let router = JumpHashRouter;
        let mut counts = [0usize; 4];
        for sku in 0..8_000i64 {
            counts[router.route(sku, 4)] += 1;
        }
        for count in counts {
            assert!((1_500..2_500).contains(&count), "{counts:?}");
        }
    }

    #[test]
    fn test_modulo_router() {
        let router = ModuloRouter;
        assert_eq!(router.route(10, 4), 2);
        assert_eq!(router.route(-1, 4), 3);
        assert_eq!(router.route(10, 1), 0);
    }

    #[tokio::test]
    async fn test_empty_shard_list_rejected() {
        let err = ShardedRepository::new(Vec::new(), Arc::new(ModuloRouter)).unwrap_err();
        assert!(matches!(err, DbError::InvalidShardConfig(_)));
    }

    #[tokio::test]
    async fn test_rows_land_on_routed_shard() {
        let configs = (0..3).map(|_| DbConfig::in_memory()).collect();
        let repo = ShardedRepository::connect(configs, Arc::new(ModuloRouter)).await.unwrap();

        for sku in 1..=9 {
            repo.insert_inventory(&Inventory::new(sku, 1, 1, 5, 0).unwrap()).await.unwrap();
        }
        for index in 0..3 {
            assert_eq!(repo.shards[index].inventories().count().await.unwrap(), 3);
        }
        let inv = repo.shards[1].inventories().get_by_sku(4).await.unwrap();
        assert!(inv.is_some());
        assert!(repo.get_inventory(4).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_batch_and_list_merge_across_shards() {
        let repo = ShardedRepository::in_memory(4).await.unwrap();
        for sku in (1..=25).rev() {
            repo.insert_inventory(&Inventory::new(sku, 1, 1, sku, 0).unwrap()).await.unwrap();
        }

        let batch = repo.get_inventories(&[20, 3, 3, 17, 99]).await.unwrap();
        assert_eq!(batch.iter().map(|i| i.sku_id).collect::<Vec<_>>(), vec![3, 17, 20]);

        let page = repo.list_inventories(PageRequest::new(2, 10)).await.unwrap();
        assert_eq!(page.total, 25);
        assert_eq!(page.items.iter().map(|i| i.sku_id).collect::<Vec<_>>(), (11..=20).collect::<Vec<_>>());

        let last = repo.list_inventories(PageRequest::new(3, 10)).await.unwrap();
        assert_eq!(last.items.len(), 5);
        assert_eq!(repo.count_inventories().await.unwrap(), 25);
    }

    #[tokio::test]
    async fn test_logs_found_on_owning_shard() {
        let repo = ShardedRepository::in_memory(3).await.unwrap();
        let inv = Inventory::new(8, 1, 1, 10, 0).unwrap();
        repo.insert_inventory(&inv).await.unwrap();

        let change = inv.lock(2, "order").unwrap();
        for log in &change.logs {
            repo.insert_log(log).await.unwrap();
        }

        let logs = repo.list_logs(&inv.id, PageRequest::default()).await.unwrap();
        assert_eq!(logs.total, 2);
        assert_eq!(logs.items[0].change_quantity, 2);
        assert_eq!(logs.items[0].new_locked, 2);

        let none = repo.list_logs("missing", PageRequest::default()).await.unwrap();
        assert_eq!(none.total, 0);
        assert!(none.items.is_empty());
    }

    #[tokio::test]
    async fn test_sold_out_skus_and_warehouses() {
        let repo = ShardedRepository::in_memory(2).await.unwrap();
        for (sku, total) in [(1, 0), (2, 5), (3, 0)] {
            repo.insert_inventory(&Inventory::new(sku, 1, 1, total, 0).unwrap()).await.unwrap();
        }
        assert_eq!(repo.sold_out_skus().await.unwrap(), vec![1, 3]);

        let wh = NewWarehouse {
            id: 1,
            name: "North".into(),
            lat: 1.0,
            lon: 2.0,
            priority: 0,
            ship_cost: 5,
        };
        repo.insert_warehouse(&wh).await.unwrap();
        assert_eq!(repo.list_warehouses().await.unwrap().len(), 1);
        assert!(repo.get_warehouse(1).await.unwrap().is_some());
        assert!(repo.health_check().await);
    }
}
