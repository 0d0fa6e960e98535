//! # Depot Engine
//!
//! Wires configuration into a running set of services.
//!
//! ```text
//! EngineConfig
//!     │
//!     ├── [shards]        ──► ShardedRepository (JumpHashRouter)
//!     ├── [sold_out]      ──► SoldOutFilter ──rebuilt from storage
//!     ├── [retry]         ──► RetryPolicy
//!     ├── [order_service] ──► GrpcOrderClient (lazy channel)
//!     └── [replenish]     ──► Replenisher (if enabled)
//!                                  │
//!            InventoryManager ◄────┘     InventoryQuery     OrderTimeoutHandler
//! ```

use std::sync::Arc;

use tracing::info;

use depot_db::{JumpHashRouter, ShardedRepository};

use crate::compensation::{CompensationReport, OrderTimeoutEvent, OrderTimeoutHandler};
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::manager::InventoryManager;
use crate::order_client::{GrpcOrderClient, OrderService};
use crate::query::InventoryQuery;
use crate::replenish::Replenisher;
use crate::retry::RetryPolicy;
use crate::sold_out::SoldOutFilter;

/// All engine services over one set of shards.
#[derive(Debug, Clone)]
pub struct Depot {
    manager: InventoryManager,
    query: InventoryQuery,
    timeouts: OrderTimeoutHandler,
}

impl Depot {
    /// Opens the shards and connects (lazily) to the configured order service.
    pub async fn open(config: &EngineConfig) -> EngineResult<Self> {
        let orders: Arc<dyn OrderService> = Arc::new(GrpcOrderClient::connect_lazy(&config.order_service)?);
        Self::open_with(config, orders).await
    }

    /// Opens the shards with a caller-supplied order service.
    pub async fn open_with(config: &EngineConfig, orders: Arc<dyn OrderService>) -> EngineResult<Self> {
        config.validate()?;

        let repo = ShardedRepository::connect(config.shards.db_configs(), Arc::new(JumpHashRouter)).await?;
        let sold_out = SoldOutFilter::new(config.sold_out.capacity);

        let mut manager = InventoryManager::new(repo.clone(), sold_out.clone(), RetryPolicy::from(&config.retry));
        if config.replenish.enabled {
            manager = manager.with_replenisher(Replenisher::new(Arc::clone(&orders), config.replenish.clone()));
        }

        let seeded = manager.rebuild_sold_out_filter().await?;
        let query = InventoryQuery::new(repo.clone(), sold_out);
        let timeouts = OrderTimeoutHandler::new(manager.clone(), orders, config.order_service.request_timeout());

        info!(
            shards = repo.shard_count(),
            sold_out = seeded,
            replenish = config.replenish.enabled,
            "Depot engine ready"
        );

        Ok(Depot {
            manager,
            query,
            timeouts,
        })
    }

    pub fn manager(&self) -> &InventoryManager {
        &self.manager
    }

    pub fn query(&self) -> &InventoryQuery {
        &self.query
    }

    /// Releases the stock of a timed-out order if it is still unpaid.
    pub async fn handle_order_timeout(&self, event: &OrderTimeoutEvent) -> EngineResult<CompensationReport> {
        self.timeouts.handle(event).await
    }

    pub async fn health_check(&self) -> bool {
        self.manager.repository().health_check().await
    }

    /// Closes every shard pool.
    pub async fn shutdown(&self) {
        self.manager.repository().close().await;
        info!("Depot engine stopped");
    }
}
