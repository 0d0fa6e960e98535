//! # Repository Module
//!
//! Per-shard SQL, one repository per table.
//!
//! ## Layering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  InventoryManager / InventoryQuery (depot-engine)                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ShardedRepository ── routes by sku_id, fans out, merges               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database (one shard)                                                  │
//! │  ├── inventories()  → InventoryRepository                              │
//! │  │                    get / insert / update_versioned / list / delete  │
//! │  ├── logs()         → InventoryLogRepository                           │
//! │  │                    insert / list_by_inventory / count_by_inventory  │
//! │  └── warehouses()   → WarehouseRepository                              │
//! │                       insert / get / list                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (or in-memory database)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`InventoryRepository`](inventory::InventoryRepository) - Stock rows with conditional update
//! - [`InventoryLogRepository`](log::InventoryLogRepository) - Append-only audit trail
//! - [`WarehouseRepository`](warehouse::WarehouseRepository) - Allocation reference data

pub mod inventory;
pub mod log;
pub mod warehouse;

/// Column list shared by every inventory SELECT.
pub(crate) const INVENTORY_COLUMNS: &str = "id, sku_id, product_id, warehouse_id, \
     available_stock, locked_stock, total_stock, warning_threshold, \
     status, version, created_at, updated_at";

/// Column list shared by every log SELECT.
pub(crate) const LOG_COLUMNS: &str = "id, inventory_id, sku_id, action, change_quantity, \
     old_available, new_available, old_locked, new_locked, reason, created_at";
