//! # depot-engine: Inventory Services for Depot
//!
//! Stock mutations with optimistic concurrency, the sold-out quick check,
//! allocation queries and the compensation flows that couple inventory to
//! the order service.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         depot-engine                                    │
//! │                                                                         │
//! │  caller ──► InventoryManager ──► ShardedRepository (depot-db)          │
//! │                 │     │                                                 │
//! │                 │     └──► SoldOutFilter ◄── InventoryQuery ◄── caller │
//! │                 │                                                       │
//! │                 └──► Replenisher ──spawn──► OrderService                │
//! │                                                  ▲                      │
//! │  order timeout ──► OrderTimeoutHandler ──────────┘                      │
//! │                         │                                               │
//! │                         └──► InventoryManager::unlock_stock             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`manager`] - Mutations and the retry driver
//! - [`query`] - Read side and allocation planning
//! - [`sold_out`] - Shared sold-out filter
//! - [`replenish`] / [`compensation`] - Order-service sagas
//! - [`order_client`] - Order-service trait and gRPC client
//! - [`config`] / [`retry`] / [`error`] - Ambient plumbing
//!
//! ## Usage
//!
//! ```rust,ignore
//! use depot_engine::{Depot, EngineConfig};
//!
//! let config = EngineConfig::load(None)?;
//! let depot = Depot::open(&config).await?;
//!
//! depot.manager().deduct_stock(42, 1, "order 1001").await?;
//! if depot.query().is_likely_sold_out(42).await {
//!     // hide the buy button
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod compensation;
pub mod config;
pub mod engine;
pub mod error;
pub mod manager;
pub mod order_client;
pub mod query;
pub mod replenish;
pub mod retry;
pub mod sold_out;

// =============================================================================
// Re-exports
// =============================================================================

pub use compensation::{
    CompensationOutcome, CompensationReport, LineFailure, OrderTimeoutEvent, OrderTimeoutHandler,
};
pub use config::{
    EngineConfig, OrderServiceSettings, ReplenishSettings, RetrySettings, ShardSettings,
    SoldOutSettings,
};
pub use engine::Depot;
pub use error::{EngineError, EngineResult};
pub use manager::{InventoryManager, NewInventory};
pub use order_client::{CreateOrderRequest, GrpcOrderClient, OrderService, OrderSnapshot, OrderStatus};
pub use query::InventoryQuery;
pub use replenish::Replenisher;
pub use retry::{LinearBackoff, RetryPolicy};
pub use sold_out::SoldOutFilter;
