//! # Validation Module
//!
//! Input checks run before any storage round-trip.
//!
//! ## Where Checks Live
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE                                                  │
//! │  ├── quantities, thresholds, coordinates, pagination                   │
//! │  └── fails before the manager touches a shard                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Inventory transitions                                        │
//! │  └── counter preconditions (InsufficientStock)                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── CHECK constraints on counters                                     │
//! │  └── UNIQUE sku_id                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{OrderLine, PageRequest};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a stock movement quantity.
///
/// ## Example
/// ```rust
/// use depot_core::validation::validate_quantity;
///
/// assert!(validate_quantity(5).is_ok());
/// assert!(validate_quantity(0).is_err());
/// ```
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

/// Validates a SKU, product or warehouse identifier.
pub fn validate_id(field: &str, id: i64) -> ValidationResult<()> {
    if id <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates every line of an order or allocation request.
pub fn validate_lines(lines: &[OrderLine]) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }
    for line in lines {
        validate_id("sku_id", line.sku_id)?;
        validate_quantity(line.quantity)?;
    }
    Ok(())
}

// =============================================================================
// Geographic Validators
// =============================================================================

/// Validates a latitude/longitude pair in degrees.
pub fn validate_coordinates(lat: f64, lon: f64) -> ValidationResult<()> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(ValidationError::OutOfRange {
            field: "lat".to_string(),
            min: -90,
            max: 90,
        });
    }
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(ValidationError::OutOfRange {
            field: "lon".to_string(),
            min: -180,
            max: 180,
        });
    }
    Ok(())
}

// =============================================================================
// Pagination
// =============================================================================

/// Validates a page request (`page >= 1`, `1 <= page_size <= 100`).
pub fn validate_page(page: PageRequest) -> ValidationResult<PageRequest> {
    if !page.is_valid() {
        return Err(ValidationError::InvalidPagination {
            page: page.page,
            page_size: page.page_size,
        });
    }
    Ok(page)
}
