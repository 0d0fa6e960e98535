//! # Sold-Out Filter
//!
//! Advisory set of SKUs believed to have nothing available, answered
//! without touching storage.
//!
//! ## Maintenance
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  committed (sku, version, available)      filter action                 │
//! │  ───────────────────────────────────      ─────────────                 │
//! │  version <= last applied for sku          ignored (stale)               │
//! │  available == 0, sku not stored           insert                        │
//! │  available  > 0, sku stored               remove                        │
//! │  anything else                            untouched                     │
//! │                                                                         │
//! │  Readers take the read lock; the manager takes the write lock only     │
//! │  after its conditional update has committed.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each SKU stores at most one fingerprint and only ever removes its own, so
//! two SKUs sharing a fingerprint are counted twice and a restock of one
//! leaves the other visible. Updates carry the committed row version; one
//! that arrives after a newer one for the same SKU is dropped.
//!
//! A positive answer may be wrong (fingerprint collision, or a refill that
//! has not reached the filter yet). Deduct always re-checks the counter.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use depot_core::CuckooFilter;

/// Last committed state applied for one SKU.
#[derive(Debug, Clone, Copy)]
struct Applied {
    version: i64,
    stored: bool,
}

#[derive(Debug)]
struct FilterState {
    filter: CuckooFilter,
    applied: HashMap<i64, Applied>,
}

impl FilterState {
    /// Inserts the SKU and reports whether its fingerprint is now held.
    fn store(&mut self, sku_id: i64) -> bool {
        match self.filter.insert(&sku_id) {
            Ok(()) => true,
            Err(e) => {
                warn!(sku_id, error = %e, "Sold-out filter rejected SKU");
                // A saturated insert may still have parked the key as a victim.
                self.filter.contains(&sku_id)
            }
        }
    }
}

/// Shared handle to the filter. Clones see the same set.
#[derive(Debug, Clone)]
pub struct SoldOutFilter {
    inner: Arc<RwLock<FilterState>>,
}

impl SoldOutFilter {
    pub fn new(capacity: usize) -> Self {
        SoldOutFilter {
            inner: Arc::new(RwLock::new(FilterState {
                filter: CuckooFilter::with_capacity(capacity),
                applied: HashMap::new(),
            })),
        }
    }

    pub async fn is_likely_sold_out(&self, sku_id: i64) -> bool {
        self.inner.read().await.filter.contains(&sku_id)
    }

    /// Applies the committed state of a SKU at `version`.
    ///
    /// Returns false when a newer version was already applied.
    pub async fn observe(&self, sku_id: i64, version: i64, available: i64) -> bool {
        let mut guard = self.inner.write().await;
        let state = &mut *guard;

        let stored = match state.applied.get(&sku_id) {
            Some(last) if last.version >= version => {
                debug!(sku_id, version, applied = last.version, "Stale sold-out update dropped");
                return false;
            }
            Some(last) => last.stored,
            None => false,
        };

        let stored = match (available == 0, stored) {
            (true, false) => {
                let stored = state.store(sku_id);
                if stored {
                    debug!(sku_id, version, "SKU marked sold out");
                }
                stored
            }
            (false, true) => {
                state.filter.remove(&sku_id);
                debug!(sku_id, version, "SKU cleared from sold-out filter");
                false
            }
            (_, unchanged) => unchanged,
        };

        state.applied.insert(sku_id, Applied { version, stored });
        true
    }

    /// Drops a SKU whose row was deleted.
    pub async fn forget(&self, sku_id: i64) {
        let mut state = self.inner.write().await;
        if let Some(last) = state.applied.remove(&sku_id) {
            if last.stored {
                state.filter.remove(&sku_id);
                debug!(sku_id, "Deleted SKU cleared from sold-out filter");
            }
        }
    }

    /// Replaces the contents with `sku_ids`. Returns how many were stored.
    pub async fn rebuild(&self, sku_ids: &[i64]) -> usize {
        let mut guard = self.inner.write().await;
        let state = &mut *guard;
        state.filter.clear();
        state.applied.clear();

        let mut stored = 0;
        for &sku_id in sku_ids {
            if state.applied.contains_key(&sku_id) {
                continue;
            }
            let held = state.store(sku_id);
            // Version 0 sits below every committed row, so any later change applies.
            state.applied.insert(sku_id, Applied { version: 0, stored: held });
            if held {
                stored += 1;
            }
        }

        info!(stored, requested = sku_ids.len(), "Sold-out filter rebuilt");
        stored
    }

    /// Number of stored fingerprints.
    pub async fn len(&self) -> usize {
        self.inner.read().await.filter.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.filter.is_empty()
    }
}
