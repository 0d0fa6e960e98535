//! # depot-db: Sharded Storage for Depot
//!
//! SQLite shards behind a SKU router, with the conditional update the
//! inventory manager builds its optimistic concurrency on.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Depot Data Flow                                │
//! │                                                                         │
//! │  InventoryManager::deduct_stock(sku 42, 3)                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     depot-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ShardedRepo    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │ (shard.rs)    │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ Inventory     │    │              │  │   │
//! │  │   │ ShardRouter   │───►│ InventoryLog  │    │ 001_...sql   │  │   │
//! │  │   │ fan-out/merge │    │ Warehouse     │    │              │  │   │
//! │  │   └───────┬───────┘    └───────────────┘    └──────────────┘  │   │
//! │  │           │                                                     │   │
//! │  │   ┌───────▼───────┐ ┌───────────────┐ ┌───────────────┐       │   │
//! │  │   │ Database #0   │ │ Database #1   │ │ Database #N   │       │   │
//! │  │   │ (pool.rs)     │ │               │ │               │       │   │
//! │  │   └───────────────┘ └───────────────┘ └───────────────┘       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`pool`] - Per-shard connection pool ([`Database`], [`DbConfig`])
//! - [`migrations`] - Embedded schema migrations
//! - [`repository`] - Per-table repositories
//! - [`shard`] - Routing and the cross-shard [`ShardedRepository`]
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use depot_db::{DbConfig, JumpHashRouter, ShardedRepository};
//!
//! let configs = vec![DbConfig::new("shard-0.db"), DbConfig::new("shard-1.db")];
//! let repo = ShardedRepository::connect(configs, Arc::new(JumpHashRouter)).await?;
//!
//! let inventory = repo.get_inventory(42).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod shard;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use shard::{JumpHashRouter, ModuloRouter, ShardRouter, ShardedRepository};

pub use repository::inventory::InventoryRepository;
pub use repository::log::InventoryLogRepository;
pub use repository::warehouse::WarehouseRepository;
