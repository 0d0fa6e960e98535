//! # Engine Configuration
//!
//! Shard layout, retry bounds, filter sizing, replenishment and the order
//! service endpoint.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     DEPOT_SHARD_PATHS=/data/s0.db,/data/s1.db                          │
//! │     DEPOT_ORDER_SERVICE_URL=http://orders:9090                         │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     --config PATH, or                                                  │
//! │     ~/.config/depot/engine.toml (Linux)                                │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     4 in-memory shards, 3 attempts, 10 ms base delay                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [shards]
//! paths = ["/var/lib/depot/shard-0.db", "/var/lib/depot/shard-1.db"]
//! max_connections = 5
//!
//! [retry]
//! max_attempts = 3
//! base_delay_ms = 10
//!
//! [sold_out]
//! capacity = 100000
//!
//! [replenish]
//! enabled = true
//! multiplier = 2
//! min_quantity = 1
//! timeout_ms = 3000
//! requester_id = 0
//!
//! [order_service]
//! url = "http://127.0.0.1:9090"
//! connect_timeout_ms = 2000
//! request_timeout_ms = 3000
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use depot_db::DbConfig;

use crate::error::{EngineError, EngineResult};

// =============================================================================
// Shard Settings
// =============================================================================

/// Where the shards live.
///
/// With `paths` empty the engine opens `in_memory` throwaway shards, which is
/// what tests and the seed tool's dry runs use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardSettings {
    /// One SQLite file per shard, in routing order.
    #[serde(default)]
    pub paths: Vec<PathBuf>,

    /// Shard count when `paths` is empty.
    #[serde(default = "default_in_memory")]
    pub in_memory: usize,

    /// Pool size per file-backed shard.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_in_memory() -> usize {
    4
}

fn default_max_connections() -> u32 {
    5
}

impl Default for ShardSettings {
    fn default() -> Self {
        ShardSettings {
            paths: Vec::new(),
            in_memory: default_in_memory(),
            max_connections: default_max_connections(),
        }
    }
}

impl ShardSettings {
    /// Pool configurations for file-backed shards, or in-memory ones.
    pub fn db_configs(&self) -> Vec<DbConfig> {
        if self.paths.is_empty() {
            return (0..self.in_memory).map(|_| DbConfig::in_memory()).collect();
        }
        self.paths
            .iter()
            .map(|path| DbConfig::new(path.clone()).max_connections(self.max_connections))
            .collect()
    }

    pub fn shard_count(&self) -> usize {
        if self.paths.is_empty() {
            self.in_memory
        } else {
            self.paths.len()
        }
    }
}

// =============================================================================
// Retry Settings
// =============================================================================

/// Optimistic-update retry bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay unit; attempt `n` waits `n × base_delay_ms`.
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay() -> u64 {
    10
}

impl Default for RetrySettings {
    fn default() -> Self {
        RetrySettings {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay(),
        }
    }
}

// =============================================================================
// Sold-Out Filter Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoldOutSettings {
    /// Number of SKUs the filter is sized for.
    #[serde(default = "default_filter_capacity")]
    pub capacity: usize,
}

fn default_filter_capacity() -> usize {
    100_000
}

impl Default for SoldOutSettings {
    fn default() -> Self {
        SoldOutSettings {
            capacity: default_filter_capacity(),
        }
    }
}

// =============================================================================
// Replenishment Settings
// =============================================================================

/// Low-stock replenishment.
///
/// The requested quantity is `multiplier × warning_threshold`, never below
/// `min_quantity`; SKUs without a threshold request a fixed 100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplenishSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_multiplier")]
    pub multiplier: i64,

    #[serde(default = "default_min_quantity")]
    pub min_quantity: i64,

    /// Bound on the whole CreateOrder call.
    #[serde(default = "default_replenish_timeout")]
    pub timeout_ms: u64,

    /// User id stamped on replenishment orders.
    #[serde(default)]
    pub requester_id: i64,
}

fn default_true() -> bool {
    true
}

fn default_multiplier() -> i64 {
    2
}

fn default_min_quantity() -> i64 {
    1
}

fn default_replenish_timeout() -> u64 {
    3000
}

impl Default for ReplenishSettings {
    fn default() -> Self {
        ReplenishSettings {
            enabled: true,
            multiplier: default_multiplier(),
            min_quantity: default_min_quantity(),
            timeout_ms: default_replenish_timeout(),
            requester_id: 0,
        }
    }
}

impl ReplenishSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// =============================================================================
// Order Service Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderServiceSettings {
    /// gRPC endpoint, `http://` or `https://`.
    #[serde(default = "default_order_url")]
    pub url: String,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Used for order-status lookups during timeout handling.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_order_url() -> String {
    "http://127.0.0.1:9090".to_string()
}

fn default_connect_timeout() -> u64 {
    2000
}

fn default_request_timeout() -> u64 {
    3000
}

impl Default for OrderServiceSettings {
    fn default() -> Self {
        OrderServiceSettings {
            url: default_order_url(),
            connect_timeout_ms: default_connect_timeout(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

impl OrderServiceSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

// =============================================================================
// Main Engine Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub shards: ShardSettings,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub sold_out: SoldOutSettings,

    #[serde(default)]
    pub replenish: ReplenishSettings,

    #[serde(default)]
    pub order_service: OrderServiceSettings,
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (engine.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> EngineResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load engine config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> EngineResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| EngineError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Engine config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> EngineResult<()> {
        if self.shards.shard_count() == 0 {
            return Err(EngineError::Config(
                "at least one shard is required".into(),
            ));
        }

        if self.shards.max_connections == 0 {
            return Err(EngineError::Config(
                "shards.max_connections must be greater than 0".into(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(EngineError::Config(
                "retry.max_attempts must be greater than 0".into(),
            ));
        }

        if self.sold_out.capacity == 0 {
            return Err(EngineError::Config(
                "sold_out.capacity must be greater than 0".into(),
            ));
        }

        if self.replenish.multiplier < 1 || self.replenish.min_quantity < 1 {
            return Err(EngineError::Config(
                "replenish.multiplier and replenish.min_quantity must be at least 1".into(),
            ));
        }

        if self.replenish.timeout_ms == 0 || self.order_service.request_timeout_ms == 0 {
            return Err(EngineError::Config("timeouts must be greater than 0".into()));
        }

        let url = &self.order_service.url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(EngineError::Config(format!(
                "Order service URL must start with http:// or https://, got: {}",
                url
            )));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(paths) = std::env::var("DEPOT_SHARD_PATHS") {
            debug!(paths = %paths, "Overriding shard paths from environment");
            self.shards.paths = paths
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .collect();
        }

        if let Ok(count) = std::env::var("DEPOT_SHARD_COUNT") {
            if let Ok(n) = count.parse::<usize>() {
                self.shards.in_memory = n;
            }
        }

        if let Ok(attempts) = std::env::var("DEPOT_RETRY_MAX_ATTEMPTS") {
            if let Ok(n) = attempts.parse::<u32>() {
                debug!(max_attempts = n, "Overriding retry bound from environment");
                self.retry.max_attempts = n;
            }
        }

        if let Ok(delay) = std::env::var("DEPOT_RETRY_BASE_DELAY_MS") {
            if let Ok(ms) = delay.parse::<u64>() {
                self.retry.base_delay_ms = ms;
            }
        }

        if let Ok(capacity) = std::env::var("DEPOT_SOLD_OUT_CAPACITY") {
            if let Ok(n) = capacity.parse::<usize>() {
                self.sold_out.capacity = n;
            }
        }

        if let Ok(enabled) = std::env::var("DEPOT_REPLENISH_ENABLED") {
            match enabled.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.replenish.enabled = true,
                "0" | "false" | "no" => self.replenish.enabled = false,
                _ => warn!(value = %enabled, "Unknown DEPOT_REPLENISH_ENABLED value"),
            }
        }

        if let Ok(url) = std::env::var("DEPOT_ORDER_SERVICE_URL") {
            debug!(url = %url, "Overriding order service URL from environment");
            self.order_service.url = url;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "depot", "depot")
            .map(|dirs| dirs.config_dir().join("engine.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.retry.base_delay_ms)
    }
}
