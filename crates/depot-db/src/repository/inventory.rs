//! # Inventory Repository
//!
//! Stock rows for the SKUs routed to one shard.
//!
//! ## Conditional Update
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  UPDATE inventories                                                    │
//! │     SET available_stock = ?, locked_stock = ?, total_stock = ?,        │
//! │         status = ?, updated_at = ?, version = version + 1              │
//! │   WHERE sku_id = ? AND version = ?      ◄── version the caller read    │
//! │                                                                         │
//! │  rows_affected == 1  → committed, new version = read + 1               │
//! │  rows_affected == 0  → row exists?  yes → VersionConflict              │
//! │                                     no  → NotFound                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use depot_core::Inventory;

use super::INVENTORY_COLUMNS;
use crate::error::{DbError, DbResult};

/// Repository for inventory rows on one shard.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Inserts a new inventory row.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - The SKU already has a row
    pub async fn insert(&self, inventory: &Inventory) -> DbResult<()> {
        debug!(sku_id = inventory.sku_id, "Inserting inventory");

        let result = sqlx::query(
            r#"
            INSERT INTO inventories (
                id, sku_id, product_id, warehouse_id,
                available_stock, locked_stock, total_stock, warning_threshold,
                status, version, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&inventory.id)
        .bind(inventory.sku_id)
        .bind(inventory.product_id)
        .bind(inventory.warehouse_id)
        .bind(inventory.available_stock)
        .bind(inventory.locked_stock)
        .bind(inventory.total_stock)
        .bind(inventory.warning_threshold)
        .bind(inventory.status)
        .bind(inventory.version)
        .bind(inventory.created_at)
        .bind(inventory.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => match DbError::from(e) {
                DbError::UniqueViolation { .. } => Err(DbError::duplicate("sku_id", inventory.sku_id)),
                other => Err(other),
            },
        }
    }

    /// Gets the inventory row for a SKU.
    pub async fn get_by_sku(&self, sku_id: i64) -> DbResult<Option<Inventory>> {
        let sql = format!("SELECT {INVENTORY_COLUMNS} FROM inventories WHERE sku_id = ?1");
        let inventory = sqlx::query_as::<_, Inventory>(&sql)
            .bind(sku_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(inventory)
    }

    /// Gets an inventory row by its id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Inventory>> {
        let sql = format!("SELECT {INVENTORY_COLUMNS} FROM inventories WHERE id = ?1");
        let inventory = sqlx::query_as::<_, Inventory>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(inventory)
    }

    /// Gets the rows for a set of SKUs in one query. Missing SKUs are skipped.
    pub async fn get_by_skus(&self, sku_ids: &[i64]) -> DbResult<Vec<Inventory>> {
        if sku_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {INVENTORY_COLUMNS} FROM inventories WHERE sku_id IN ("));
        let mut separated = builder.separated(", ");
        for sku_id in sku_ids {
            separated.push_bind(*sku_id);
        }
        separated.push_unseparated(") ORDER BY sku_id");

        let rows = builder
            .build_query_as::<Inventory>()
            .fetch_all(&self.pool)
            .await?;

        debug!(requested = sku_ids.len(), found = rows.len(), "Batch inventory read");
        Ok(rows)
    }

    /// Writes new counters if the row still carries `expected_version`.
    ///
    /// ## Returns
    /// * `Ok(new_version)` - Committed
    /// * `Err(DbError::VersionConflict)` - Another writer got there first
    /// * `Err(DbError::NotFound)` - The row was deleted
    pub async fn update_versioned(&self, inventory: &Inventory, expected_version: i64) -> DbResult<i64> {
        let result = sqlx::query(
            r#"
            UPDATE inventories
               SET available_stock = ?1,
                   locked_stock = ?2,
                   total_stock = ?3,
                   warning_threshold = ?4,
                   status = ?5,
                   updated_at = ?6,
                   version = version + 1
             WHERE sku_id = ?7 AND version = ?8
            "#,
        )
        .bind(inventory.available_stock)
        .bind(inventory.locked_stock)
        .bind(inventory.total_stock)
        .bind(inventory.warning_threshold)
        .bind(inventory.status)
        .bind(inventory.updated_at)
        .bind(inventory.sku_id)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(expected_version + 1);
        }

        let exists: Option<i64> = sqlx::query_scalar("SELECT version FROM inventories WHERE sku_id = ?1")
            .bind(inventory.sku_id)
            .fetch_optional(&self.pool)
            .await?;

        match exists {
            Some(current) => {
                debug!(
                    sku_id = inventory.sku_id,
                    expected_version,
                    current_version = current,
                    "Conditional update lost the race"
                );
                Err(DbError::VersionConflict {
                    sku_id: inventory.sku_id,
                    expected_version,
                })
            }
            None => Err(DbError::not_found("Inventory", inventory.sku_id)),
        }
    }

    /// Lists rows ordered by SKU.
    pub async fn list(&self, limit: i64, offset: i64) -> DbResult<Vec<Inventory>> {
        let sql = format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventories ORDER BY sku_id LIMIT ?1 OFFSET ?2"
        );
        let rows = sqlx::query_as::<_, Inventory>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventories")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// SKUs with nothing available, used to seed the sold-out filter.
    pub async fn sold_out_skus(&self) -> DbResult<Vec<i64>> {
        let skus: Vec<i64> =
            sqlx::query_scalar("SELECT sku_id FROM inventories WHERE available_stock = 0 ORDER BY sku_id")
                .fetch_all(&self.pool)
                .await?;
        Ok(skus)
    }

    /// Deletes the row for a SKU regardless of version.
    ///
    /// ## Returns
    /// * `Ok(true)` - Deleted
    /// * `Ok(false)` - No such row
    pub async fn delete(&self, sku_id: i64) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM inventories WHERE sku_id = ?1")
            .bind(sku_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
