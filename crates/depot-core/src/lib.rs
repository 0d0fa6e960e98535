//! # depot-core: Pure Inventory Logic
//!
//! Stock counters and every rule that governs them, with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Depot Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 depot-engine (Manager, sagas)                   │   │
//! │  │    load ──► transition ──► conditional save ──► retry          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ depot-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │ inventory │  │allocation │  │  cuckoo   │  │ validation│  │   │
//! │  │   │  5 stock  │  │  greedy   │  │ sold-out  │  │  qty, geo │  │   │
//! │  │   │transitions│  │  by cost  │  │  filter   │  │ pagination│  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 depot-db (sharded SQLite)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entities (Inventory, InventoryLog, Warehouse, OrderLine)
//! - [`inventory`] - Stock state machine (add, deduct, lock, unlock, confirm)
//! - [`allocation`] - Multi-warehouse allocation planner
//! - [`cuckoo`] - Cuckoo filter backing the sold-out quick check
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use depot_core::{Inventory, StockOperation};
//!
//! let inv = Inventory::new(1, 100, 7, 10, 3).unwrap();
//! let change = inv.apply(&StockOperation::lock(4, "order 42")).unwrap();
//!
//! assert_eq!(change.inventory.available_stock, 6);
//! assert_eq!(change.inventory.locked_stock, 4);
//! assert_eq!(change.inventory.total_stock, 10);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocation;
pub mod cuckoo;
pub mod error;
pub mod inventory;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use allocation::{allocate, AllocationPlan, GeoPoint, StockSource, WarehouseShare};
pub use cuckoo::CuckooFilter;
pub use error::{CoreError, CoreResult, ValidationError};
pub use inventory::{StockChange, StockOperation};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Largest page a listing call may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page size used when a caller does not specify one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Replenishment quantity used when a SKU has no warning threshold.
pub const DEFAULT_REPLENISH_QUANTITY: i64 = 100;
