//! # Inventory Manager
//!
//! Every stock mutation goes through here.
//!
//! ## Optimistic Update Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ┌──────────────┐    ┌──────────────────┐    ┌─────────────────────┐  │
//! │   │ load by SKU  │───►│ pure transition  │───►│ UPDATE … WHERE      │  │
//! │   │ (version v)  │    │ (depot-core)     │    │   version = v       │  │
//! │   └──────▲───────┘    └────────┬─────────┘    └──────────┬──────────┘  │
//! │          │                     │ InvalidQuantity         │             │
//! │          │                     │ InsufficientStock       │             │
//! │          │                     ▼                         │             │
//! │          │               return at once                  │             │
//! │          │                                               │             │
//! │          │   VersionConflict: sleep attempt × base       │ committed   │
//! │          └───────────────────────────────────────────────┤             │
//! │                  (bound spent → ConcurrentUpdateFailed)  ▼             │
//! │                                                   ┌─────────────────┐  │
//! │                                                   │ append log      │  │
//! │                                                   │ (best effort)   │  │
//! │                                                   │ sold-out filter │  │
//! │                                                   │ replenishment   │  │
//! │                                                   └─────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No in-process lock is held across a storage round-trip; the row version is
//! the only concurrency token.

use backoff::backoff::Backoff;
use tracing::{debug, info, warn};

use depot_core::validation::{validate_coordinates, validate_id, validate_lines};
use depot_core::{
    CoreResult, Inventory, InventoryLog, NewWarehouse, OrderLine, StockChange, StockOperation,
    Warehouse,
};
use depot_db::{DbError, ShardedRepository};

use crate::error::{EngineError, EngineResult};
use crate::replenish::Replenisher;
use crate::retry::RetryPolicy;
use crate::sold_out::SoldOutFilter;

/// Fields for a new inventory row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewInventory {
    pub sku_id: i64,
    pub product_id: i64,
    pub warehouse_id: i64,
    pub total_stock: i64,
    pub warning_threshold: i64,
}

/// Stock mutation service. Clones share storage, filter and replenisher.
#[derive(Debug, Clone)]
pub struct InventoryManager {
    repo: ShardedRepository,
    sold_out: SoldOutFilter,
    retry: RetryPolicy,
    replenisher: Option<Replenisher>,
}

impl InventoryManager {
    pub fn new(repo: ShardedRepository, sold_out: SoldOutFilter, retry: RetryPolicy) -> Self {
        InventoryManager {
            repo,
            sold_out,
            retry,
            replenisher: None,
        }
    }

    /// Enables low-stock replenishment after deductions.
    pub fn with_replenisher(mut self, replenisher: Replenisher) -> Self {
        self.replenisher = Some(replenisher);
        self
    }

    pub fn sold_out(&self) -> &SoldOutFilter {
        &self.sold_out
    }

    pub fn repository(&self) -> &ShardedRepository {
        &self.repo
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Creates the inventory row for a SKU.
    ///
    /// ## Returns
    /// * `Err(EngineError::AlreadyExists)` - The SKU already has a row
    /// * `Err(EngineError::Validation)` - Bad ids or negative figures
    pub async fn create_inventory(&self, new: NewInventory) -> EngineResult<Inventory> {
        validate_id("sku_id", new.sku_id)?;
        validate_id("product_id", new.product_id)?;
        validate_id("warehouse_id", new.warehouse_id)?;

        let inventory = Inventory::new(
            new.sku_id,
            new.product_id,
            new.warehouse_id,
            new.total_stock,
            new.warning_threshold,
        )?;

        match self.repo.insert_inventory(&inventory).await {
            Ok(()) => {}
            Err(DbError::UniqueViolation { .. }) => {
                return Err(EngineError::AlreadyExists { sku_id: new.sku_id });
            }
            Err(e) => return Err(e.into()),
        }

        self.sold_out
            .observe(inventory.sku_id, inventory.version, inventory.available_stock)
            .await;

        info!(
            sku_id = inventory.sku_id,
            warehouse_id = inventory.warehouse_id,
            total = inventory.total_stock,
            threshold = inventory.warning_threshold,
            "Inventory created"
        );
        Ok(inventory)
    }

    /// Removes the row for a SKU without a version check.
    pub async fn delete_inventory(&self, sku_id: i64) -> EngineResult<()> {
        if !self.repo.delete_inventory(sku_id).await? {
            return Err(EngineError::NotFound { sku_id });
        }
        self.sold_out.forget(sku_id).await;
        info!(sku_id, "Inventory deleted");
        Ok(())
    }

    /// Registers a warehouse.
    ///
    /// ## Returns
    /// * `Err(EngineError::Storage(DbError::UniqueViolation))` - The id is taken
    pub async fn create_warehouse(&self, warehouse: NewWarehouse) -> EngineResult<Warehouse> {
        validate_id("warehouse_id", warehouse.id)?;
        validate_coordinates(warehouse.lat, warehouse.lon)?;

        let created = self.repo.insert_warehouse(&warehouse).await?;

        info!(warehouse_id = created.id, name = %created.name, "Warehouse created");
        Ok(created)
    }

    // =========================================================================
    // Stock Operations
    // =========================================================================

    pub async fn add_stock(&self, sku_id: i64, quantity: i64, reason: &str) -> EngineResult<Inventory> {
        let op = StockOperation::add(quantity, reason);
        self.apply(sku_id, &op).await
    }

    /// Sells stock outright. May spawn a replenishment order.
    pub async fn deduct_stock(&self, sku_id: i64, quantity: i64, reason: &str) -> EngineResult<Inventory> {
        let op = StockOperation::deduct(quantity, reason);
        let inventory = self.apply(sku_id, &op).await?;

        if inventory.is_below_threshold() {
            if let Some(replenisher) = &self.replenisher {
                debug!(
                    sku_id,
                    available = inventory.available_stock,
                    threshold = inventory.warning_threshold,
                    "Below warning threshold, requesting replenishment"
                );
                // Detached: the caller never waits on the order service.
                drop(replenisher.spawn(&inventory));
            }
        }

        Ok(inventory)
    }

    /// Reserves stock for an order.
    pub async fn lock_stock(&self, sku_id: i64, quantity: i64, reason: &str) -> EngineResult<Inventory> {
        let op = StockOperation::lock(quantity, reason);
        self.apply(sku_id, &op).await
    }

    /// Returns reserved stock to available.
    pub async fn unlock_stock(&self, sku_id: i64, quantity: i64, reason: &str) -> EngineResult<Inventory> {
        let op = StockOperation::unlock(quantity, reason);
        self.apply(sku_id, &op).await
    }

    /// Turns reserved stock into a completed sale.
    pub async fn confirm_deduction(&self, sku_id: i64, quantity: i64, reason: &str) -> EngineResult<Inventory> {
        let op = StockOperation::confirm(quantity, reason);
        self.apply(sku_id, &op).await
    }

    /// Locks every line, or none of them.
    ///
    /// Lines are locked in order. When one fails, the lines already locked
    /// are unlocked in reverse and the original error is returned.
    pub async fn lock_for_order(&self, lines: &[OrderLine], reason: &str) -> EngineResult<Vec<Inventory>> {
        validate_lines(lines)?;

        let mut locked: Vec<Inventory> = Vec::with_capacity(lines.len());
        for (index, line) in lines.iter().enumerate() {
            match self.lock_stock(line.sku_id, line.quantity, reason).await {
                Ok(inventory) => locked.push(inventory),
                Err(e) => {
                    warn!(
                        sku_id = line.sku_id,
                        line = index,
                        error = %e,
                        "Order lock failed, releasing earlier lines"
                    );
                    self.release_lines(&lines[..index], reason).await;
                    return Err(e);
                }
            }
        }

        debug!(lines = lines.len(), "Order lines locked");
        Ok(locked)
    }

    async fn release_lines(&self, lines: &[OrderLine], reason: &str) {
        let reason = format!("compensation: {reason}");
        for line in lines.iter().rev() {
            if let Err(e) = self.unlock_stock(line.sku_id, line.quantity, &reason).await {
                warn!(
                    sku_id = line.sku_id,
                    quantity = line.quantity,
                    error = %e,
                    "Compensating unlock failed"
                );
            }
        }
    }

    /// Re-seeds the sold-out filter from every shard.
    pub async fn rebuild_sold_out_filter(&self) -> EngineResult<usize> {
        let skus = self.repo.sold_out_skus().await?;
        Ok(self.sold_out.rebuild(&skus).await)
    }

    // =========================================================================
    // Retry Driver
    // =========================================================================

    async fn apply(&self, sku_id: i64, op: &StockOperation) -> EngineResult<Inventory> {
        if op.quantity <= 0 {
            return Err(EngineError::InvalidQuantity { quantity: op.quantity });
        }
        let change = self.update_with_retry(sku_id, |current| current.apply(op)).await?;
        Ok(change.inventory)
    }

    /// Load, transition, conditional save; repeat on version conflict.
    ///
    /// On success the returned inventory carries the committed version, the
    /// logs have been offered to storage and the sold-out filter is updated.
    pub async fn update_with_retry<F>(&self, sku_id: i64, transition: F) -> EngineResult<StockChange>
    where
        F: Fn(&Inventory) -> CoreResult<StockChange>,
    {
        let mut backoff = self.retry.backoff();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let current = self
                .repo
                .get_inventory(sku_id)
                .await?
                .ok_or(EngineError::NotFound { sku_id })?;

            let mut change = transition(&current)?;

            match self.repo.update_inventory(&change.inventory, current.version).await {
                Ok(version) => {
                    change.inventory.version = version;
                    debug!(
                        sku_id,
                        logs = change.logs.len(),
                        attempt,
                        version,
                        available = change.inventory.available_stock,
                        locked = change.inventory.locked_stock,
                        "Stock change committed"
                    );
                    self.after_commit(&change).await;
                    return Ok(change);
                }
                Err(DbError::VersionConflict { .. }) => match backoff.next_backoff() {
                    Some(delay) => {
                        debug!(
                            sku_id,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "Version conflict, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        warn!(sku_id, attempts = attempt, "Retries exhausted under contention");
                        return Err(EngineError::ConcurrentUpdateFailed {
                            sku_id,
                            attempts: attempt,
                        });
                    }
                },
                Err(DbError::NotFound { .. }) => return Err(EngineError::NotFound { sku_id }),
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn after_commit(&self, change: &StockChange) {
        for log in &change.logs {
            self.record_log(log).await;
        }

        // Applied by committed version, so a late update cannot undo a newer one.
        let inventory = &change.inventory;
        self.sold_out
            .observe(inventory.sku_id, inventory.version, inventory.available_stock)
            .await;
    }

    /// Appends one log entry. A failure here never undoes the counter change.
    async fn record_log(&self, log: &InventoryLog) {
        if let Err(e) = self.repo.insert_log(log).await {
            warn!(
                sku_id = log.sku_id,
                action = %log.action,
                quantity = log.change_quantity,
                error = %e,
                "Inventory log write failed; counter change kept"
            );
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use depot_core::{InventoryStatus, LogAction, PageRequest};
    use tokio::sync::mpsc;

    use crate::config::ReplenishSettings;
    use crate::order_client::{CreateOrderRequest, OrderService, OrderSnapshot};

    #[derive(Debug)]
    struct ChannelOrders {
        tx: mpsc::UnboundedSender<CreateOrderRequest>,
    }

    #[async_trait]
    impl OrderService for ChannelOrders {
        async fn create_order(&self, request: CreateOrderRequest, _: Duration) -> EngineResult<i64> {
            let _ = self.tx.send(request);
            Ok(1)
        }

        async fn get_order_by_id(&self, _: i64, _: i64, _: Duration) -> EngineResult<Option<OrderSnapshot>> {
            Ok(None)
        }
    }

    async fn manager_with(retry: RetryPolicy) -> InventoryManager {
        let repo = ShardedRepository::in_memory(2).await.unwrap();
        InventoryManager::new(repo, SoldOutFilter::new(1024), retry)
    }

    async fn manager() -> InventoryManager {
        manager_with(RetryPolicy::default()).await
    }

    fn new_inventory(sku_id: i64, total: i64, threshold: i64) -> NewInventory {
        NewInventory {
            sku_id,
            product_id: 100,
            warehouse_id: 1,
            total_stock: total,
            warning_threshold: threshold,
        }
    }

    #[tokio::test]
    async fn test_create_and_duplicate() {
        let manager = manager().await;
        let inv = manager.create_inventory(new_inventory(1, 10, 3)).await.unwrap();
        assert_eq!(inv.status, InventoryStatus::Normal);
        assert_eq!(inv.version, 1);

        let err = manager.create_inventory(new_inventory(1, 5, 0)).await.unwrap_err();
        assert!(matches!(err, EngineError::AlreadyExists { sku_id: 1 }));

        let err = manager.create_inventory(new_inventory(2, -1, 0)).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_empty_marks_sold_out() {
        let manager = manager().await;
        manager.create_inventory(new_inventory(4, 0, 0)).await.unwrap();
        assert!(manager.sold_out().is_likely_sold_out(4).await);
    }

    #[tokio::test]
    async fn test_deduct_to_zero_scenario() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let replenisher = Replenisher::new(Arc::new(ChannelOrders { tx }), ReplenishSettings::default());
        let manager = manager().await.with_replenisher(replenisher);
        manager.create_inventory(new_inventory(1, 10, 3)).await.unwrap();

        let inv = manager.deduct_stock(1, 8, "sale").await.unwrap();
        assert_eq!((inv.available_stock, inv.total_stock), (2, 2));
        assert_eq!(inv.status, InventoryStatus::Warning);
        assert_eq!(inv.version, 2);
        assert!(!manager.sold_out().is_likely_sold_out(1).await);

        // 2 < 3: a replenishment order for 2 x threshold goes out.
        let request = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.lines[0].sku_id, 1);
        assert_eq!(request.lines[0].quantity, 6);

        let inv = manager.deduct_stock(1, 2, "sale").await.unwrap();
        assert_eq!((inv.available_stock, inv.total_stock), (0, 0));
        assert_eq!(inv.status, InventoryStatus::OutOfStock);
        assert!(manager.sold_out().is_likely_sold_out(1).await);

        // The filter is advisory; the counter still decides.
        let err = manager.deduct_stock(1, 1, "sale").await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::InsufficientStock { sku_id: 1, available: 0, required: 1 }
        ));

        manager.add_stock(1, 5, "restock").await.unwrap();
        assert!(!manager.sold_out().is_likely_sold_out(1).await);
    }

    #[tokio::test]
    async fn test_lock_unlock_confirm() {
        let manager = manager().await;
        manager.create_inventory(new_inventory(2, 10, 0)).await.unwrap();

        let inv = manager.lock_stock(2, 5, "order 9").await.unwrap();
        assert_eq!((inv.available_stock, inv.locked_stock, inv.total_stock), (5, 5, 10));

        let inv = manager.unlock_stock(2, 5, "order 9 cancelled").await.unwrap();
        assert_eq!((inv.available_stock, inv.locked_stock, inv.total_stock), (10, 0, 10));

        manager.lock_stock(2, 4, "order 10").await.unwrap();
        let inv = manager.confirm_deduction(2, 4, "order 10 paid").await.unwrap();
        assert_eq!((inv.available_stock, inv.locked_stock, inv.total_stock), (6, 0, 6));
        assert_eq!(inv.version, 5);

        let err = manager.unlock_stock(2, 1, "nothing locked").await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::InsufficientStock { available: 0, required: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_lock_everything_marks_sold_out() {
        let manager = manager().await;
        manager.create_inventory(new_inventory(3, 4, 0)).await.unwrap();

        let inv = manager.lock_stock(3, 4, "order").await.unwrap();
        assert_eq!(inv.status, InventoryStatus::Locked);
        assert!(manager.sold_out().is_likely_sold_out(3).await);

        manager.unlock_stock(3, 1, "partial cancel").await.unwrap();
        assert!(!manager.sold_out().is_likely_sold_out(3).await);
    }

    #[tokio::test]
    async fn test_caller_errors_are_immediate() {
        let manager = manager().await;
        manager.create_inventory(new_inventory(5, 3, 0)).await.unwrap();

        let err = manager.deduct_stock(5, 0, "zero").await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidQuantity { quantity: 0 }));

        let err = manager.add_stock(5, -2, "negative").await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidQuantity { quantity: -2 }));

        let err = manager.deduct_stock(99, 1, "missing").await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { sku_id: 99 }));

        let unchanged = manager.repository().get_inventory(5).await.unwrap().unwrap();
        assert_eq!(unchanged.available_stock, 3);
        assert_eq!(unchanged.version, 1);
    }

    #[tokio::test]
    async fn test_logs_written_per_change() {
        let manager = manager().await;
        let inv = manager.create_inventory(new_inventory(6, 10, 0)).await.unwrap();

        manager.lock_stock(6, 3, "order").await.unwrap();
        let logs = manager
            .repository()
            .list_logs(&inv.id, PageRequest::new(1, 10))
            .await
            .unwrap();
        assert_eq!(logs.total, 2);
        assert!(logs.items.iter().all(|l| l.action == LogAction::Lock));
        // Newest first: the locked side, then the available side.
        assert_eq!((logs.items[0].old_locked, logs.items[0].new_locked), (0, 3));
        assert_eq!((logs.items[1].old_available, logs.items[1].new_available), (10, 7));

        manager.unlock_stock(6, 1, "partial cancel").await.unwrap();
        manager.deduct_stock(6, 2, "walk-in").await.unwrap();

        let logs = manager
            .repository()
            .list_logs(&inv.id, PageRequest::new(1, 10))
            .await
            .unwrap();
        assert_eq!(logs.total, 5);
        assert_eq!(logs.items[0].action, LogAction::Deduct);
        assert_eq!(logs.items[1].action, LogAction::Unlock);
        assert_eq!(logs.items[2].action, LogAction::Unlock);
    }

    #[tokio::test]
    async fn test_filter_follows_latest_commit() {
        let manager = manager().await;
        manager.create_inventory(new_inventory(8, 0, 0)).await.unwrap();

        // v2: 0 -> 5, then v3: 5 -> 0.
        let refill = manager.add_stock(8, 5, "restock").await.unwrap();
        let drained = manager.deduct_stock(8, 5, "sale").await.unwrap();
        assert!(manager.sold_out().is_likely_sold_out(8).await);

        // A delayed filter update for v2 arrives after v3 was applied.
        let applied = manager
            .sold_out()
            .observe(8, refill.version, refill.available_stock)
            .await;
        assert!(!applied);
        assert_eq!(drained.version, refill.version + 1);
        assert!(manager.sold_out().is_likely_sold_out(8).await);
    }

    #[tokio::test]
    async fn test_lock_for_order_rolls_back() {
        let manager = manager().await;
        manager.create_inventory(new_inventory(10, 5, 0)).await.unwrap();
        manager.create_inventory(new_inventory(11, 5, 0)).await.unwrap();
        manager.create_inventory(new_inventory(12, 1, 0)).await.unwrap();

        let lines = [OrderLine::new(10, 2), OrderLine::new(11, 3), OrderLine::new(12, 4)];
        let err = manager.lock_for_order(&lines, "order 1").await.unwrap_err();
        assert!(matches!(err, EngineError::InsufficientStock { sku_id: 12, .. }));

        for sku in [10, 11] {
            let inv = manager.repository().get_inventory(sku).await.unwrap().unwrap();
            assert_eq!(inv.locked_stock, 0);
            assert_eq!(inv.available_stock, 5);
        }

        let locked = manager
            .lock_for_order(&[OrderLine::new(10, 2), OrderLine::new(11, 3)], "order 2")
            .await
            .unwrap();
        assert_eq!(locked.len(), 2);
        assert_eq!(locked[1].locked_stock, 3);
    }

    #[tokio::test]
    async fn test_delete_inventory() {
        let manager = manager().await;
        manager.create_inventory(new_inventory(7, 0, 0)).await.unwrap();
        assert!(manager.sold_out().is_likely_sold_out(7).await);

        manager.delete_inventory(7).await.unwrap();
        assert!(!manager.sold_out().is_likely_sold_out(7).await);

        let err = manager.delete_inventory(7).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { sku_id: 7 }));
        let err = manager.add_stock(7, 1, "gone").await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { sku_id: 7 }));
    }

    #[tokio::test]
    async fn test_rebuild_sold_out_filter() {
        let manager = manager().await;
        for sku in 20..25 {
            manager.create_inventory(new_inventory(sku, sku % 2, 0)).await.unwrap();
        }

        // A fresh filter over the same storage starts empty.
        let fresh = InventoryManager::new(
            manager.repository().clone(),
            SoldOutFilter::new(1024),
            RetryPolicy::default(),
        );
        assert!(!fresh.sold_out().is_likely_sold_out(20).await);

        let stored = fresh.rebuild_sold_out_filter().await.unwrap();
        assert_eq!(stored, 3);
        for sku in [20, 22, 24] {
            assert!(fresh.sold_out().is_likely_sold_out(sku).await);
        }
    }

    #[tokio::test]
    async fn test_replenishment_after_low_deduct() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let replenisher = Replenisher::new(Arc::new(ChannelOrders { tx }), ReplenishSettings::default());
        let manager = manager().await.with_replenisher(replenisher);
        manager.create_inventory(new_inventory(1, 10, 3)).await.unwrap();

        // 10 → 5: still above the threshold.
        manager.deduct_stock(1, 5, "sale").await.unwrap();
        // 5 → 2: below 3.
        manager.deduct_stock(1, 3, "sale").await.unwrap();

        let request = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.lines[0].sku_id, 1);
        assert_eq!(request.lines[0].quantity, 6);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_deducts_never_oversell() {
        const N: i64 = 16;
        let manager = manager_with(RetryPolicy::new(200, Duration::from_millis(1))).await;
        manager.create_inventory(new_inventory(1, N, 0)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..N {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move { manager.deduct_stock(1, 1, "flash sale").await }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, N);

        let inv = manager.repository().get_inventory(1).await.unwrap().unwrap();
        assert_eq!(inv.available_stock, 0);
        assert_eq!(inv.total_stock, 0);
        assert_eq!(inv.version, 1 + N);
        assert!(manager.sold_out().is_likely_sold_out(1).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_contention_with_default_bound() {
        const N: i64 = 12;
        let manager = manager().await;
        manager.create_inventory(new_inventory(1, N, 0)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..N {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move { manager.deduct_stock(1, 1, "rush").await }));
        }

        let mut successes = 0;
        let mut gave_up = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(EngineError::ConcurrentUpdateFailed { attempts, .. }) => {
                    assert_eq!(attempts, 3);
                    gave_up += 1;
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(successes + gave_up, N);

        let inv = manager.repository().get_inventory(1).await.unwrap().unwrap();
        assert_eq!(inv.available_stock, N - successes);
        assert!(inv.available_stock >= 0);
    }
}
