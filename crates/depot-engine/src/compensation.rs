//! # Order-Timeout Compensation
//!
//! Releases stock an unpaid order was holding once that order times out.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  OrderTimeoutEvent { order_id, user_id, lines }                        │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  get_order_by_id (timeout) ──error──► RemoteCallFailed, nothing freed  │
//! │        │                                                                │
//! │        ├── not found / paid / shipped / completed / cancelled           │
//! │        │        └──► skipped, locked stock untouched                    │
//! │        │                                                                │
//! │        └── pending                                                      │
//! │                 └──► unlock each line on its own;                       │
//! │                      a failing line is reported, the rest still run     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use depot_core::validation::validate_lines;
use depot_core::OrderLine;

use crate::error::{EngineError, EngineResult};
use crate::manager::InventoryManager;
use crate::order_client::{OrderService, OrderStatus};

/// An order that was not paid in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTimeoutEvent {
    pub order_id: i64,
    pub user_id: i64,
    pub lines: Vec<OrderLine>,
}

/// What the handler decided for the order as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompensationOutcome {
    /// The order was pending; its lines were unlocked.
    Released,
    /// The order has moved on; nothing was touched.
    Skipped(OrderStatus),
    /// The order service does not know the order; nothing was touched.
    OrderMissing,
}

/// A line whose unlock failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFailure {
    pub line: OrderLine,
    pub error: String,
}

/// Result of handling one timeout event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompensationReport {
    pub order_id: i64,
    pub outcome: CompensationOutcome,
    pub released: Vec<OrderLine>,
    pub failed: Vec<LineFailure>,
}

impl CompensationReport {
    fn untouched(order_id: i64, outcome: CompensationOutcome) -> Self {
        CompensationReport {
            order_id,
            outcome,
            released: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// True when every line of a pending order was released.
    pub fn is_complete(&self) -> bool {
        self.outcome == CompensationOutcome::Released && self.failed.is_empty()
    }
}

/// Handles order-timeout events against the inventory manager.
#[derive(Debug, Clone)]
pub struct OrderTimeoutHandler {
    manager: InventoryManager,
    orders: Arc<dyn OrderService>,
    lookup_timeout: Duration,
}

impl OrderTimeoutHandler {
    pub fn new(manager: InventoryManager, orders: Arc<dyn OrderService>, lookup_timeout: Duration) -> Self {
        OrderTimeoutHandler {
            manager,
            orders,
            lookup_timeout,
        }
    }

    /// Confirms the order is still unpaid, then unlocks its lines.
    ///
    /// ## Returns
    /// * `Ok(report)` - Lookup succeeded; see `report.outcome`
    /// * `Err(EngineError::RemoteCallFailed)` - Lookup failed, nothing unlocked
    pub async fn handle(&self, event: &OrderTimeoutEvent) -> EngineResult<CompensationReport> {
        validate_lines(&event.lines)?;

        let order = self
            .orders
            .get_order_by_id(event.order_id, event.user_id, self.lookup_timeout)
            .await
            .map_err(|e| {
                error!(order_id = event.order_id, error = %e, "Order status lookup failed");
                match e {
                    remote @ EngineError::RemoteCallFailed(_) => remote,
                    other => EngineError::RemoteCallFailed(other.to_string()),
                }
            })?;

        let Some(order) = order else {
            info!(order_id = event.order_id, "Timed-out order unknown to order service, skipping");
            return Ok(CompensationReport::untouched(event.order_id, CompensationOutcome::OrderMissing));
        };

        if !order.status.is_pending() {
            info!(
                order_id = event.order_id,
                status = %order.status,
                "Order no longer pending, keeping its stock locked"
            );
            return Ok(CompensationReport::untouched(
                event.order_id,
                CompensationOutcome::Skipped(order.status),
            ));
        }

        let reason = format!("order {} timed out", event.order_id);
        let mut report = CompensationReport::untouched(event.order_id, CompensationOutcome::Released);

        for line in &event.lines {
            match self.manager.unlock_stock(line.sku_id, line.quantity, &reason).await {
                Ok(_) => report.released.push(*line),
                Err(e) => {
                    warn!(
                        order_id = event.order_id,
                        sku_id = line.sku_id,
                        quantity = line.quantity,
                        error = %e,
                        "Timed-out order line could not be released"
                    );
                    report.failed.push(LineFailure {
                        line: *line,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            order_id = event.order_id,
            released = report.released.len(),
            failed = report.failed.len(),
            "Timed-out order compensated"
        );
        Ok(report)
    }
}
