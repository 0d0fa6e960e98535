//! # Domain Types
//!
//! Entities shared by every layer.
//!
//! ## Entity Relationships
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Warehouse (reference data)          Inventory (one per SKU)          │
//! │   ┌──────────────────────┐            ┌──────────────────────────┐     │
//! │   │ id, name             │◄───────────│ warehouse_id             │     │
//! │   │ lat, lon             │            │ sku_id, product_id       │     │
//! │   │ priority, ship_cost  │            │ available + locked       │     │
//! │   └──────────────────────┘            │   == total               │     │
//! │                                       │ status (derived)         │     │
//! │                                       │ version (OCC token)      │     │
//! │                                       └────────────┬─────────────┘     │
//! │                                                    │ 1:N               │
//! │                                       ┌────────────▼─────────────┐     │
//! │                                       │ InventoryLog (immutable) │     │
//! │                                       │ action, change_quantity  │     │
//! │                                       │ old/new available+locked │     │
//! │                                       └──────────────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

// =============================================================================
// Inventory Status
// =============================================================================

/// Stock status of a SKU, always derived from the counters.
///
/// ## Derivation (first match wins)
/// ```text
/// total == 0                          → OutOfStock
/// available == 0 && locked > 0        → Locked
/// available <= warning_threshold      → Warning
/// otherwise                           → Normal
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum InventoryStatus {
    Normal,
    /// Everything on hand is reserved by unpaid orders.
    Locked,
    /// At or below the warning threshold.
    Warning,
    OutOfStock,
}

impl std::fmt::Display for InventoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InventoryStatus::Normal => write!(f, "normal"),
            InventoryStatus::Locked => write!(f, "locked"),
            InventoryStatus::Warning => write!(f, "warning"),
            InventoryStatus::OutOfStock => write!(f, "out_of_stock"),
        }
    }
}

// =============================================================================
// Log Action
// =============================================================================

/// The stock transition an [`InventoryLog`] entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    /// Inbound stock (receiving, returns, replenishment).
    Add,
    /// Direct sale without a reservation step.
    Deduct,
    /// Reserve stock for an unpaid order.
    Lock,
    /// Release a reservation (cancel, timeout).
    Unlock,
    /// Settle a reservation after payment.
    ConfirmDeduction,
}

impl std::fmt::Display for LogAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogAction::Add => write!(f, "add"),
            LogAction::Deduct => write!(f, "deduct"),
            LogAction::Lock => write!(f, "lock"),
            LogAction::Unlock => write!(f, "unlock"),
            LogAction::ConfirmDeduction => write!(f, "confirm_deduction"),
        }
    }
}

// =============================================================================
// Inventory
// =============================================================================

/// Stock record for a single SKU.
///
/// ## Counter Invariant
/// `total_stock == available_stock + locked_stock`, every counter `>= 0`.
/// Only the transitions in [`crate::inventory`] produce new values, so the
/// invariant holds for every value that reaches storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Inventory {
    pub id: String,
    pub sku_id: i64,
    pub product_id: i64,
    pub warehouse_id: i64,
    pub available_stock: i64,
    pub locked_stock: i64,
    pub total_stock: i64,
    pub warning_threshold: i64,
    pub status: InventoryStatus,
    /// Optimistic concurrency token, bumped by every committed mutation.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Inventory Log
// =============================================================================

/// Immutable audit record of one stock transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryLog {
    pub id: String,
    pub inventory_id: String,
    pub sku_id: i64,
    pub action: LogAction,
    pub change_quantity: i64,
    pub old_available: i64,
    pub new_available: i64,
    pub old_locked: i64,
    pub new_locked: i64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Warehouse
// =============================================================================

/// A stocking location, read by the allocator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Warehouse {
    pub id: i64,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Tie-breaker between equally cheap warehouses (higher wins).
    pub priority: i32,
    /// Shipping cost in cents per unit per kilometre.
    pub ship_cost: i64,
    pub created_at: DateTime<Utc>,
}

/// Input for registering a warehouse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWarehouse {
    pub id: i64,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub priority: i32,
    pub ship_cost: i64,
}

// =============================================================================
// Order Line
// =============================================================================

/// A SKU and quantity pair, as carried by orders and allocation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub sku_id: i64,
    pub quantity: i64,
}

impl OrderLine {
    pub fn new(sku_id: i64, quantity: i64) -> Self {
        OrderLine { sku_id, quantity }
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// A 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        PageRequest { page, page_size }
    }

    /// Rows to skip for this page.
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    /// Rows a single shard must return so the merged result can fill this page.
    pub fn fan_out_limit(&self) -> i64 {
        self.offset() + self.limit()
    }

    pub fn is_valid(&self) -> bool {
        self.page >= 1 && (1..=MAX_PAGE_SIZE).contains(&self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of results plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
}

impl<T> Paginated<T> {
    pub fn empty() -> Self {
        Paginated {
            items: Vec::new(),
            total: 0,
        }
    }
}
