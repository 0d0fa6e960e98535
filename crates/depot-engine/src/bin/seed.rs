//! # Depot Seed Tool
//!
//! Fills the configured shards with sample warehouses and inventories.
//!
//! ## Usage
//! ```bash
//! # 1,000 SKUs (default) into the shards named by engine.toml
//! cargo run -p depot-engine --bin depot-seed
//!
//! # Custom amount and config
//! cargo run -p depot-engine --bin depot-seed -- --count 20000 --config ./engine.toml
//! ```
//!
//! SKUs are numbered from 1 and spread round-robin over the warehouses.
//! Every seventh SKU starts empty so the sold-out filter has content.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use depot_core::NewWarehouse;
use depot_engine::{Depot, EngineConfig, EngineError, GrpcOrderClient, NewInventory};

/// Sample warehouses: (id, name, lat, lon, priority, ship cost per km).
const WAREHOUSES: &[(i64, &str, f64, f64, i32, i64)] = &[
    (1, "Shanghai Pudong", 31.2304, 121.4737, 5, 2),
    (2, "Beijing Daxing", 39.9042, 116.4074, 4, 2),
    (3, "Guangzhou Baiyun", 23.1291, 113.2644, 3, 3),
    (4, "Chengdu Shuangliu", 30.5728, 104.0668, 2, 4),
    (5, "Wuhan Dongxihu", 30.5928, 114.3055, 1, 3),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let args: Vec<String> = env::args().collect();

    let mut count: i64 = 1000;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                let value = args.get(i + 1).context("--count needs a value")?;
                count = value.parse().with_context(|| format!("invalid --count '{value}'"))?;
                i += 1;
            }
            "--config" | "-f" => {
                let value = args.get(i + 1).context("--config needs a value")?;
                config_path = Some(PathBuf::from(value));
                i += 1;
            }
            "--help" | "-h" => {
                println!("Depot Seed Tool");
                println!();
                println!("Usage: depot-seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>       Number of SKUs to create (default: 1000)");
                println!("  -f, --config <PATH>   Engine config file (default: platform config dir)");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            other => bail!("unknown argument '{other}'"),
        }
        i += 1;
    }

    if count < 1 {
        bail!("--count must be at least 1");
    }

    let mut config = EngineConfig::load(config_path).context("loading engine config")?;
    // Seeding never needs to place orders.
    config.replenish.enabled = false;

    let orders = Arc::new(GrpcOrderClient::connect_lazy(&config.order_service)?);
    let depot = Depot::open_with(&config, orders).await.context("opening shards")?;
    info!(shards = config.shards.shard_count(), count, "Seeding");

    for &(id, name, lat, lon, priority, ship_cost) in WAREHOUSES {
        let warehouse = NewWarehouse {
            id,
            name: name.to_string(),
            lat,
            lon,
            priority,
            ship_cost,
        };
        match depot.manager().create_warehouse(warehouse).await {
            Ok(_) => {}
            Err(EngineError::Storage(e)) if e.is_unique_violation() => {
                info!(warehouse_id = id, "Warehouse already present");
            }
            Err(e) => return Err(e).context("creating warehouse"),
        }
    }

    let start = std::time::Instant::now();
    let mut created = 0;
    let mut skipped = 0;

    for sku_id in 1..=count {
        let warehouse_id = WAREHOUSES[(sku_id as usize - 1) % WAREHOUSES.len()].0;
        let total_stock = if sku_id % 7 == 0 { 0 } else { 20 + (sku_id * 37) % 480 };
        let new = NewInventory {
            sku_id,
            product_id: 1_000 + sku_id / 4,
            warehouse_id,
            total_stock,
            warning_threshold: 10 + sku_id % 20,
        };

        match depot.manager().create_inventory(new).await {
            Ok(_) => created += 1,
            Err(EngineError::AlreadyExists { .. }) => skipped += 1,
            Err(e) => {
                warn!(sku_id, error = %e, "Failed to create inventory");
                continue;
            }
        }

        if (created + skipped) % 500 == 0 {
            info!(created, skipped, "Progress");
        }
    }

    let elapsed = start.elapsed();
    let listed = depot.query().list_inventories(1, 1).await?;
    info!(
        created,
        skipped,
        total = listed.total,
        elapsed_ms = elapsed.as_millis() as u64,
        "Seed complete"
    );

    depot.shutdown().await;
    Ok(())
}
