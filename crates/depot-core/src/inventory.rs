//! # Inventory State Machine
//!
//! The five stock transitions and status derivation.
//!
//! ## Counter Movements
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │               Add(q)                     Deduct(q)                      │
//! │   inbound ───────────► ┌───────────┐ ─────────────► shipped             │
//! │                        │ available │                                    │
//! │              Unlock(q) └─────┬─────┘                                    │
//! │           ┌──────────────────┤ Lock(q)                                  │
//! │           │                  ▼                                          │
//! │           │            ┌───────────┐  ConfirmDeduction(q)               │
//! │           └────────────│  locked   │ ─────────────────────► shipped     │
//! │                        └───────────┘                                    │
//! │                                                                         │
//! │   total = available + locked, recomputed on every move                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Purity
//! Transitions borrow the current value and return a new one together with
//! the log entries describing the move. A failed precondition returns an error
//! and the caller's value is unchanged, so a retry loop can re-read and call
//! again without cleanup.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{Inventory, InventoryLog, InventoryStatus, LogAction};
use crate::DEFAULT_REPLENISH_QUANTITY;

// =============================================================================
// Stock Operation
// =============================================================================

/// A requested stock transition.
///
/// Carried by value through the manager's retry loop and re-applied to a
/// freshly loaded inventory on every attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockOperation {
    pub action: LogAction,
    pub quantity: i64,
    pub reason: String,
}

impl StockOperation {
    pub fn new(action: LogAction, quantity: i64, reason: impl Into<String>) -> Self {
        StockOperation {
            action,
            quantity,
            reason: reason.into(),
        }
    }

    pub fn add(quantity: i64, reason: impl Into<String>) -> Self {
        Self::new(LogAction::Add, quantity, reason)
    }

    pub fn deduct(quantity: i64, reason: impl Into<String>) -> Self {
        Self::new(LogAction::Deduct, quantity, reason)
    }

    pub fn lock(quantity: i64, reason: impl Into<String>) -> Self {
        Self::new(LogAction::Lock, quantity, reason)
    }

    pub fn unlock(quantity: i64, reason: impl Into<String>) -> Self {
        Self::new(LogAction::Unlock, quantity, reason)
    }

    pub fn confirm(quantity: i64, reason: impl Into<String>) -> Self {
        Self::new(LogAction::ConfirmDeduction, quantity, reason)
    }
}

/// Result of a successful transition.
#[derive(Debug, Clone, PartialEq)]
pub struct StockChange {
    /// The new value. `version` still holds the value that was read; storage
    /// bumps it when the conditional write commits.
    pub inventory: Inventory,
    /// One entry, or two for Lock and Unlock (the counter the stock leaves,
    /// then the counter it enters).
    pub logs: Vec<InventoryLog>,
}

impl StockChange {
    /// Available stock before the change.
    pub fn previous_available(&self) -> i64 {
        self.logs
            .first()
            .map_or(self.inventory.available_stock, |log| log.old_available)
    }

    /// True when this change drained the available counter.
    pub fn became_unavailable(&self) -> bool {
        self.previous_available() > 0 && self.inventory.available_stock == 0
    }

    /// True when this change refilled an empty available counter.
    pub fn became_available(&self) -> bool {
        self.previous_available() == 0 && self.inventory.available_stock > 0
    }
}

// =============================================================================
// Status Derivation
// =============================================================================

/// Derives the status from the counters.
pub fn derive_status(available: i64, locked: i64, total: i64, threshold: i64) -> InventoryStatus {
    if total == 0 {
        InventoryStatus::OutOfStock
    } else if available == 0 && locked > 0 {
        InventoryStatus::Locked
    } else if available <= threshold {
        InventoryStatus::Warning
    } else {
        InventoryStatus::Normal
    }
}

// =============================================================================
// Transitions
// =============================================================================

impl Inventory {
    /// Creates the stock record for a SKU with everything available.
    ///
    /// ## Arguments
    /// * `total_stock` - Opening stock, `>= 0`
    /// * `warning_threshold` - Low-stock threshold, `>= 0`
    ///
    /// ## Example
    /// ```rust
    /// use depot_core::{Inventory, InventoryStatus};
    ///
    /// let inv = Inventory::new(1, 10, 1, 0, 3).unwrap();
    /// assert_eq!(inv.status, InventoryStatus::OutOfStock);
    /// assert_eq!(inv.version, 1);
    /// ```
    pub fn new(
        sku_id: i64,
        product_id: i64,
        warehouse_id: i64,
        total_stock: i64,
        warning_threshold: i64,
    ) -> CoreResult<Self> {
        if total_stock < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "total_stock".to_string(),
            }
            .into());
        }
        if warning_threshold < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "warning_threshold".to_string(),
            }
            .into());
        }

        let now = Utc::now();
        Ok(Inventory {
            id: Uuid::new_v4().to_string(),
            sku_id,
            product_id,
            warehouse_id,
            available_stock: total_stock,
            locked_stock: 0,
            total_stock,
            warning_threshold,
            status: derive_status(total_stock, 0, total_stock, warning_threshold),
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies any stock operation.
    pub fn apply(&self, op: &StockOperation) -> CoreResult<StockChange> {
        if op.quantity <= 0 {
            return Err(CoreError::InvalidQuantity {
                quantity: op.quantity,
            });
        }
        let q = op.quantity;

        let (available, locked, total) = match op.action {
            LogAction::Add => {
                let available = self.available_stock.checked_add(q);
                let total = self.total_stock.checked_add(q);
                match (available, total) {
                    (Some(a), Some(t)) => (a, self.locked_stock, t),
                    _ => return Err(CoreError::InvalidQuantity { quantity: q }),
                }
            }
            LogAction::Deduct => {
                self.require(self.available_stock, q)?;
                (self.available_stock - q, self.locked_stock, self.total_stock - q)
            }
            LogAction::Lock => {
                self.require(self.available_stock, q)?;
                (self.available_stock - q, self.locked_stock + q, self.total_stock)
            }
            LogAction::Unlock => {
                self.require(self.locked_stock, q)?;
                (self.available_stock + q, self.locked_stock - q, self.total_stock)
            }
            LogAction::ConfirmDeduction => {
                self.require(self.locked_stock, q)?;
                (self.available_stock, self.locked_stock - q, self.total_stock - q)
            }
        };

        let now = Utc::now();
        let entry = |available: (i64, i64), locked: (i64, i64)| InventoryLog {
            id: Uuid::new_v4().to_string(),
            inventory_id: self.id.clone(),
            sku_id: self.sku_id,
            action: op.action,
            change_quantity: q,
            old_available: available.0,
            new_available: available.1,
            old_locked: locked.0,
            new_locked: locked.1,
            reason: op.reason.clone(),
            created_at: now,
        };

        let (was_available, was_locked) = (self.available_stock, self.locked_stock);
        let logs = match op.action {
            LogAction::Lock => vec![
                entry((was_available, available), (was_locked, was_locked)),
                entry((available, available), (was_locked, locked)),
            ],
            LogAction::Unlock => vec![
                entry((was_available, was_available), (was_locked, locked)),
                entry((was_available, available), (locked, locked)),
            ],
            _ => vec![entry((was_available, available), (was_locked, locked))],
        };

        let inventory = Inventory {
            available_stock: available,
            locked_stock: locked,
            total_stock: total,
            status: derive_status(available, locked, total, self.warning_threshold),
            updated_at: now,
            ..self.clone()
        };

        Ok(StockChange { inventory, logs })
    }

    /// Inbound stock.
    pub fn add(&self, quantity: i64, reason: &str) -> CoreResult<StockChange> {
        self.apply(&StockOperation::add(quantity, reason))
    }

    /// Direct deduction from available stock.
    pub fn deduct(&self, quantity: i64, reason: &str) -> CoreResult<StockChange> {
        self.apply(&StockOperation::deduct(quantity, reason))
    }

    /// Moves stock from available to locked.
    pub fn lock(&self, quantity: i64, reason: &str) -> CoreResult<StockChange> {
        self.apply(&StockOperation::lock(quantity, reason))
    }

    /// Moves stock from locked back to available.
    pub fn unlock(&self, quantity: i64, reason: &str) -> CoreResult<StockChange> {
        self.apply(&StockOperation::unlock(quantity, reason))
    }

    /// Removes settled stock from locked and total.
    pub fn confirm_deduction(&self, quantity: i64, reason: &str) -> CoreResult<StockChange> {
        self.apply(&StockOperation::confirm(quantity, reason))
    }

    fn require(&self, have: i64, required: i64) -> CoreResult<()> {
        if have < required {
            return Err(CoreError::InsufficientStock {
                sku_id: self.sku_id,
                available: have,
                required,
            });
        }
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// True when available stock has dropped below the warning threshold.
    pub fn is_below_threshold(&self) -> bool {
        self.available_stock < self.warning_threshold
    }

    /// Quantity to request when this SKU runs low.
    ///
    /// `multiplier × threshold`, floored at `min_quantity`. A SKU without a
    /// threshold falls back to [`DEFAULT_REPLENISH_QUANTITY`].
    pub fn replenish_quantity(&self, multiplier: i64, min_quantity: i64) -> i64 {
        if self.warning_threshold <= 0 {
            return DEFAULT_REPLENISH_QUANTITY;
        }
        self.warning_threshold
            .saturating_mul(multiplier)
            .max(min_quantity)
    }

    /// Checks `total == available + locked` with no negative counter.
    pub fn counters_consistent(&self) -> bool {
        self.available_stock >= 0
            && self.locked_stock >= 0
            && self.total_stock == self.available_stock + self.locked_stock
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
