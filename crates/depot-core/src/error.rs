//! # Error Types
//!
//! Domain errors for depot-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  depot-core errors (this file)                                         │
//! │  ├── CoreError        - Stock rule violations                          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  depot-db errors                                                       │
//! │  └── DbError          - Storage failures, version conflicts            │
//! │                                                                         │
//! │  depot-engine errors                                                   │
//! │  └── EngineError      - What callers of the manager see                │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError ← DbError             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed transition never partially applies: the error carries the exact
//! figures and the inventory value it was called on is untouched.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Stock rule violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Quantity is zero, negative, or would overflow a counter.
    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity { quantity: i64 },

    /// Not enough stock in the counter the operation draws from.
    ///
    /// ## Which Counter
    /// ```text
    /// Deduct / Lock              → available
    /// Unlock / ConfirmDeduction  → locked
    /// ```
    #[error("Insufficient stock for SKU {sku_id}: available {available}, required {required}")]
    InsufficientStock {
        sku_id: i64,
        available: i64,
        required: i64,
    },

    /// The cuckoo filter could not place a fingerprint.
    #[error("Filter is full (capacity {capacity})")]
    FilterFull { capacity: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or greater.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Page or page size outside the accepted window.
    #[error("Invalid pagination: page {page}, page_size {page_size}")]
    InvalidPagination { page: u32, page_size: u32 },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
