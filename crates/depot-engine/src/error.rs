//! # Engine Error Types
//!
//! The error every public engine operation returns.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Error Propagation                                │
//! │                                                                         │
//! │  depot-core            depot-db              depot-engine               │
//! │  ──────────            ────────              ────────────               │
//! │  InvalidQuantity ─────────────────────────►  InvalidQuantity            │
//! │  InsufficientStock ───────────────────────►  InsufficientStock          │
//! │  Validation ──────────────────────────────►  Validation                 │
//! │                        NotFound ──────────►  NotFound                   │
//! │                        UniqueViolation ───►  AlreadyExists              │
//! │                        VersionConflict ───►  (retried, then             │
//! │                                               ConcurrentUpdateFailed)   │
//! │                        everything else ───►  Storage(DbError)           │
//! │                                                                         │
//! │  tonic::Status / timeout ─────────────────►  RemoteCallFailed           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use depot_core::{CoreError, ValidationError};
use depot_db::DbError;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine error covering every failure a caller can observe.
#[derive(Debug, Error)]
pub enum EngineError {
    // =========================================================================
    // Caller Errors
    // =========================================================================
    /// No inventory row for the SKU.
    #[error("Inventory not found for SKU {sku_id}")]
    NotFound { sku_id: i64 },

    /// The SKU already has an inventory row.
    #[error("Inventory already exists for SKU {sku_id}")]
    AlreadyExists { sku_id: i64 },

    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity { quantity: i64 },

    /// The relevant counter cannot cover the request.
    #[error("Insufficient stock for SKU {sku_id}: available {available}, required {required}")]
    InsufficientStock {
        sku_id: i64,
        available: i64,
        required: i64,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    // =========================================================================
    // Concurrency / Remote Errors
    // =========================================================================
    /// Every attempt lost the conditional update to another writer.
    #[error("Concurrent update failed for SKU {sku_id} after {attempts} attempts")]
    ConcurrentUpdateFailed { sku_id: i64, attempts: u32 },

    /// Order service unreachable, timed out, or answered with an error status.
    #[error("Remote call failed: {0}")]
    RemoteCallFailed(String),

    // =========================================================================
    // Infrastructure Errors
    // =========================================================================
    #[error("Storage error: {0}")]
    Storage(DbError),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Unexpected state, e.g. a filter that can take no more entries.
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidQuantity { quantity } => EngineError::InvalidQuantity { quantity },
            CoreError::InsufficientStock {
                sku_id,
                available,
                required,
            } => EngineError::InsufficientStock {
                sku_id,
                available,
                required,
            },
            CoreError::Validation(e) => EngineError::Validation(e),
            other @ CoreError::FilterFull { .. } => EngineError::Internal(other.to_string()),
        }
    }
}

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        EngineError::Storage(err)
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for EngineError {
    fn from(err: toml::ser::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

impl From<tonic::Status> for EngineError {
    fn from(status: tonic::Status) -> Self {
        EngineError::RemoteCallFailed(format!("{:?}: {}", status.code(), status.message()))
    }
}

impl From<tonic::transport::Error> for EngineError {
    fn from(err: tonic::transport::Error) -> Self {
        EngineError::RemoteCallFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl EngineError {
    /// True when repeating the same call may succeed.
    ///
    /// ## Retryable Errors
    /// - Lost optimistic updates
    /// - Order service failures and timeouts
    /// - Pool exhaustion on a shard
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::ConcurrentUpdateFailed { .. }
                | EngineError::RemoteCallFailed(_)
                | EngineError::Storage(DbError::PoolExhausted)
        )
    }

    /// True when the request itself was wrong and must change before a retry.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            EngineError::NotFound { .. }
                | EngineError::AlreadyExists { .. }
                | EngineError::InvalidQuantity { .. }
                | EngineError::InsufficientStock { .. }
                | EngineError::Validation(_)
        )
    }
}
