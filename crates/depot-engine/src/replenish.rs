//! # Low-Stock Replenishment
//!
//! Fire-and-forget replenishment orders, placed after a deduction leaves a
//! SKU below its warning threshold.
//!
//! ```text
//! deduct_stock ──commit──► below threshold? ──yes──► tokio::spawn ─┐
//!      │                                                             │
//!      ▼                                                             ▼
//!  returns to caller                          create_order under timeout
//!  (never waits)                              ok  → info!
//!                                             err → warn!, dropped
//! ```

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use depot_core::Inventory;

use crate::config::ReplenishSettings;
use crate::order_client::{CreateOrderRequest, OrderService};

/// Places replenishment orders on a background task.
#[derive(Debug, Clone)]
pub struct Replenisher {
    orders: Arc<dyn OrderService>,
    settings: ReplenishSettings,
}

impl Replenisher {
    pub fn new(orders: Arc<dyn OrderService>, settings: ReplenishSettings) -> Self {
        Replenisher { orders, settings }
    }

    /// Quantity to order for this inventory.
    pub fn quantity_for(&self, inventory: &Inventory) -> i64 {
        inventory.replenish_quantity(self.settings.multiplier, self.settings.min_quantity)
    }

    /// Spawns the CreateOrder call and returns its handle.
    ///
    /// Dropping the handle detaches the task; `abort()` cancels it.
    pub fn spawn(&self, inventory: &Inventory) -> JoinHandle<()> {
        let sku_id = inventory.sku_id;
        let quantity = self.quantity_for(inventory);
        let available = inventory.available_stock;
        let request = CreateOrderRequest::replenishment(self.settings.requester_id, sku_id, quantity);
        let orders = Arc::clone(&self.orders);
        let timeout = self.settings.timeout();

        tokio::spawn(async move {
            match tokio::time::timeout(timeout, orders.create_order(request, timeout)).await {
                Ok(Ok(order_id)) => {
                    info!(sku_id, quantity, available, order_id, "Replenishment order placed");
                }
                Ok(Err(e)) => {
                    warn!(sku_id, quantity, error = %e, "Replenishment order failed");
                }
                Err(_) => {
                    warn!(
                        sku_id,
                        quantity,
                        timeout_ms = timeout.as_millis() as u64,
                        "Replenishment order timed out"
                    );
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use crate::error::{EngineError, EngineResult};
    use crate::order_client::OrderSnapshot;

    #[derive(Debug, Default)]
    struct RecordingOrders {
        created: Mutex<Vec<CreateOrderRequest>>,
        fail: bool,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl OrderService for RecordingOrders {
        async fn create_order(&self, request: CreateOrderRequest, _timeout: Duration) -> EngineResult<i64> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let mut created = self.created.lock().await;
            created.push(request);
            if self.fail {
                return Err(EngineError::RemoteCallFailed("unavailable".into()));
            }
            Ok(created.len() as i64)
        }

        async fn get_order_by_id(&self, _: i64, _: i64, _: Duration) -> EngineResult<Option<OrderSnapshot>> {
            Ok(None)
        }
    }

    #[test]
    fn test_quantity_rule() {
        let orders = Arc::new(RecordingOrders::default());
        let replenisher = Replenisher::new(orders, ReplenishSettings::default());

        let inv = Inventory::new(1, 1, 1, 10, 3).unwrap();
        assert_eq!(replenisher.quantity_for(&inv), 6);

        let no_threshold = Inventory::new(2, 1, 1, 10, 0).unwrap();
        assert_eq!(replenisher.quantity_for(&no_threshold), 100);

        let floored = Replenisher::new(
            Arc::new(RecordingOrders::default()),
            ReplenishSettings {
                min_quantity: 50,
                ..Default::default()
            },
        );
        assert_eq!(floored.quantity_for(&inv), 50);
    }

    #[tokio::test]
    async fn test_spawn_places_order() {
        let orders = Arc::new(RecordingOrders::default());
        let replenisher = Replenisher::new(orders.clone(), ReplenishSettings {
            requester_id: 77,
            ..Default::default()
        });

        let inv = Inventory::new(5, 1, 1, 2, 4).unwrap();
        replenisher.spawn(&inv).await.unwrap();

        let created = orders.created.lock().await;
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].user_id, 77);
        assert_eq!(created[0].lines[0].sku_id, 5);
        assert_eq!(created[0].lines[0].quantity, 8);
    }

    #[tokio::test]
    async fn test_failures_end_in_the_task() {
        let orders = Arc::new(RecordingOrders {
            fail: true,
            ..Default::default()
        });
        let replenisher = Replenisher::new(orders.clone(), ReplenishSettings::default());

        let inv = Inventory::new(5, 1, 1, 2, 4).unwrap();
        // The task completes normally even though the call failed.
        replenisher.spawn(&inv).await.unwrap();
        assert_eq!(orders.created.lock().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_service_times_out() {
        let orders = Arc::new(RecordingOrders {
            delay: Some(Duration::from_secs(60)),
            ..Default::default()
        });
        let replenisher = Replenisher::new(orders.clone(), ReplenishSettings {
            timeout_ms: 100,
            ..Default::default()
        });

        let inv = Inventory::new(5, 1, 1, 2, 4).unwrap();
        replenisher.spawn(&inv).await.unwrap();
        assert!(orders.created.lock().await.is_empty());
    }
}
