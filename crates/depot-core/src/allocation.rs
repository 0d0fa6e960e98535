//! # Warehouse Allocation
//!
//! Splits order lines across warehouses, cheapest shipping first.
//!
//! ## Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Greedy Allocation per Line                           │
//! │                                                                         │
//! │  requester (lat, lon) + line { sku 7, qty 12 }                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  sources holding sku 7 with remaining stock > 0                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  unit cost = ship_cost × haversine_km(requester, warehouse)            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  sort: cost ↑, distance ↑, priority ↓, warehouse id ↑                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  WH-A (cost 120, has 5)  → take 5                                      │
//! │  WH-C (cost 310, has 4)  → take 4                                      │
//! │  WH-B (cost 900, has 2)  → take 2                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  allocated 11, unfulfilled 1                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Remaining stock is tracked across lines, so two lines for the same SKU
//! never draw the same unit twice. Planning only: nothing is reserved.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::types::{OrderLine, Warehouse};
use crate::validation::{validate_coordinates, validate_lines};

/// Mean Earth radius in kilometres.
const EARTH_RADIUS_KM: f64 = 6371.0;

// =============================================================================
// Geometry
// =============================================================================

/// A point on the globe in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        GeoPoint { lat, lon }
    }

    /// Great-circle distance in kilometres (haversine).
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos()
                * other.lat.to_radians().cos()
                * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

// =============================================================================
// Inputs & Outputs
// =============================================================================

/// Available stock of one SKU in one warehouse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSource {
    pub warehouse_id: i64,
    pub location: GeoPoint,
    pub priority: i32,
    pub ship_cost: i64,
    pub sku_id: i64,
    pub available: i64,
}

impl StockSource {
    pub fn new(warehouse: &Warehouse, sku_id: i64, available: i64) -> Self {
        StockSource {
            warehouse_id: warehouse.id,
            location: GeoPoint::new(warehouse.lat, warehouse.lon),
            priority: warehouse.priority,
            ship_cost: warehouse.ship_cost,
            sku_id,
            available,
        }
    }
}

/// Quantity assigned to one warehouse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseShare {
    pub warehouse_id: i64,
    pub quantity: i64,
    pub distance_km: f64,
    /// Cost in cents to ship one unit from this warehouse.
    pub unit_cost_cents: i64,
}

/// Allocation result for one order line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub sku_id: i64,
    pub requested: i64,
    pub shares: Vec<WarehouseShare>,
    /// Demand no warehouse could cover.
    pub unfulfilled: i64,
}

impl AllocationPlan {
    pub fn allocated(&self) -> i64 {
        self.shares.iter().map(|s| s.quantity).sum()
    }

    pub fn is_fully_allocated(&self) -> bool {
        self.unfulfilled == 0
    }

    /// Total shipping cost for the allocated units, in cents.
    pub fn total_cost_cents(&self) -> i64 {
        self.shares
            .iter()
            .map(|s| s.unit_cost_cents.saturating_mul(s.quantity))
            .fold(0i64, i64::saturating_add)
    }
}

// =============================================================================
// Planner
// =============================================================================

struct Candidate {
    index: usize,
    distance_km: f64,
    unit_cost_cents: i64,
}

/// Plans allocation of every line against the given sources.
///
/// ## Arguments
/// * `origin` - Requester location
/// * `lines` - Requested SKUs and quantities (validated, must be non-empty)
/// * `sources` - Stock per warehouse and SKU
///
/// ## Returns
/// One plan per line, in input order.
///
/// ## Example
/// ```rust
/// use depot_core::{allocate, GeoPoint, OrderLine, StockSource};
///
/// let near = StockSource {
///     warehouse_id: 1,
///     location: GeoPoint::new(0.0, 0.1),
///     priority: 0,
///     ship_cost: 10,
///     sku_id: 5,
///     available: 3,
/// };
/// let plans = allocate(GeoPoint::new(0.0, 0.0), &[OrderLine::new(5, 4)], &[near]).unwrap();
/// assert_eq!(plans[0].allocated(), 3);
/// assert_eq!(plans[0].unfulfilled, 1);
/// ```
pub fn allocate(
    origin: GeoPoint,
    lines: &[OrderLine],
    sources: &[StockSource],
) -> CoreResult<Vec<AllocationPlan>> {
    validate_coordinates(origin.lat, origin.lon)?;
    validate_lines(lines)?;

    let mut remaining: HashMap<(i64, i64), i64> = HashMap::new();
    for source in sources {
        *remaining
            .entry((source.warehouse_id, source.sku_id))
            .or_insert(0) += source.available.max(0);
    }

    let mut plans = Vec::with_capacity(lines.len());
    for line in lines {
        let mut candidates: Vec<Candidate> = sources
            .iter()
            .enumerate()
            .filter(|(_, s)| s.sku_id == line.sku_id)
            .map(|(index, s)| {
                let distance_km = origin.distance_km(&s.location);
                Candidate {
                    index,
                    distance_km,
                    unit_cost_cents: (s.ship_cost as f64 * distance_km).round() as i64,
                }
            })
            .collect();

        candidates.sort_by(|a, b| {
            let (sa, sb) = (&sources[a.index], &sources[b.index]);
            a.unit_cost_cents
                .cmp(&b.unit_cost_cents)
                .then_with(|| a.distance_km.total_cmp(&b.distance_km))
                .then_with(|| sb.priority.cmp(&sa.priority))
                .then_with(|| sa.warehouse_id.cmp(&sb.warehouse_id))
        });

        let mut need = line.quantity;
        let mut shares: Vec<WarehouseShare> = Vec::new();
        for candidate in candidates {
            if need == 0 {
                break;
            }
            let source = &sources[candidate.index];
            let Some(left) = remaining.get_mut(&(source.warehouse_id, source.sku_id)) else {
                continue;
            };
            if *left == 0 {
                continue;
            }
            let take = need.min(*left);
            *left -= take;
            need -= take;

            // Duplicate source rows for one warehouse fold into a single share.
            match shares
                .iter_mut()
                .find(|s| s.warehouse_id == source.warehouse_id)
            {
                Some(share) => share.quantity += take,
                None => shares.push(WarehouseShare {
                    warehouse_id: source.warehouse_id,
                    quantity: take,
                    distance_km: candidate.distance_km,
                    unit_cost_cents: candidate.unit_cost_cents,
                }),
            }
        }

        plans.push(AllocationPlan {
            sku_id: line.sku_id,
            requested: line.quantity,
            shares,
            unfulfilled: need,
        });
    }

    Ok(plans)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    fn source(warehouse_id: i64, lat: f64, lon: f64, ship_cost: i64, sku_id: i64, available: i64) -> StockSource {
        StockSource {
            warehouse_id,
            location: GeoPoint::new(lat, lon),
            priority: 0,
            ship_cost,
            sku_id,
            available,
        }
    }

    #[test]
    fn test_haversine_known_distance() {
        // Shanghai to Beijing, roughly 1067 km.
        let shanghai = GeoPoint::new(31.2304, 121.4737);
        let beijing = GeoPoint::new(39.9042, 116.4074);
        let d = shanghai.distance_km(&beijing);
        assert!((d - 1067.0).abs() < 10.0, "got {d}");
        assert_eq!(shanghai.distance_km(&shanghai), 0.0);
    }

    #[test]
    fn test_nearest_warehouse_first() {
        let origin = GeoPoint::new(0.0, 0.0);
        let sources = vec![
            source(1, 0.0, 5.0, 10, 7, 10),
            source(2, 0.0, 1.0, 10, 7, 10),
        ];
        let plans = allocate(origin, &[OrderLine::new(7, 4)], &sources).unwrap();
        assert_eq!(plans[0].shares.len(), 1);
        assert_eq!(plans[0].shares[0].warehouse_id, 2);
        assert!(plans[0].is_fully_allocated());
    }

    #[test]
    fn test_cheap_far_beats_expensive_near() {
        let origin = GeoPoint::new(0.0, 0.0);
        let sources = vec![
            source(1, 0.0, 1.0, 100, 7, 10), // ~111 km × 100
            source(2, 0.0, 2.0, 10, 7, 10),  // ~222 km × 10
        ];
        let plans = allocate(origin, &[OrderLine::new(7, 2)], &sources).unwrap();
        assert_eq!(plans[0].shares[0].warehouse_id, 2);
    }

    #[test]
    fn test_split_and_residual_demand() {
        let origin = GeoPoint::new(0.0, 0.0);
        let sources = vec![
            source(1, 0.0, 1.0, 10, 7, 5),
            source(2, 0.0, 2.0, 10, 7, 4),
            source(3, 0.0, 3.0, 10, 7, 2),
        ];
        let plans = allocate(origin, &[OrderLine::new(7, 12)], &sources).unwrap();
        let plan = &plans[0];
        let taken: Vec<(i64, i64)> = plan.shares.iter().map(|s| (s.warehouse_id, s.quantity)).collect();
        assert_eq!(taken, vec![(1, 5), (2, 4), (3, 2)]);
        assert_eq!(plan.allocated(), 11);
        assert_eq!(plan.unfulfilled, 1);
        assert!(!plan.is_fully_allocated());
        assert!(plan.total_cost_cents() > 0);
    }

    #[test]
    fn test_priority_breaks_ties() {
        let origin = GeoPoint::new(0.0, 0.0);
        let mut low = source(1, 0.0, 1.0, 10, 7, 5);
        let mut high = source(2, 0.0, 1.0, 10, 7, 5);
        low.priority = 1;
        high.priority = 9;
        let plans = allocate(origin, &[OrderLine::new(7, 1)], &[low, high]).unwrap();
        assert_eq!(plans[0].shares[0].warehouse_id, 2);
    }

    #[test]
    fn test_duplicate_lines_share_stock() {
        let origin = GeoPoint::new(0.0, 0.0);
        let sources = vec![source(1, 0.0, 1.0, 10, 7, 5)];
        let lines = [OrderLine::new(7, 3), OrderLine::new(7, 3)];
        let plans = allocate(origin, &lines, &sources).unwrap();
        assert_eq!(plans[0].allocated(), 3);
        assert_eq!(plans[1].allocated(), 2);
        assert_eq!(plans[1].unfulfilled, 1);
    }

    #[test]
    fn test_unknown_sku_fully_unfulfilled() {
        let origin = GeoPoint::new(0.0, 0.0);
        let sources = vec![source(1, 0.0, 1.0, 10, 7, 5), source(1, 0.0, 1.0, 10, 8, 0)];
        let plans = allocate(origin, &[OrderLine::new(8, 2), OrderLine::new(9, 1)], &sources).unwrap();
        assert!(plans[0].shares.is_empty());
        assert_eq!(plans[0].unfulfilled, 2);
        assert_eq!(plans[1].unfulfilled, 1);
    }

    #[test]
    fn test_invalid_input_rejected() {
        let sources = vec![source(1, 0.0, 1.0, 10, 7, 5)];
        assert!(matches!(
            allocate(GeoPoint::new(95.0, 0.0), &[OrderLine::new(7, 1)], &sources),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            allocate(GeoPoint::new(0.0, 0.0), &[OrderLine::new(7, 0)], &sources),
            Err(CoreError::Validation(_))
        ));
        assert!(allocate(GeoPoint::new(0.0, 0.0), &[], &sources).is_err());
    }
}
