//! # Inventory Log Repository
//!
//! Append-only audit trail. Rows are never updated; a log write that fails
//! after its counter update committed is not retried here.

use sqlx::SqlitePool;
use tracing::debug;

use depot_core::InventoryLog;

use super::LOG_COLUMNS;
use crate::error::DbResult;

/// Repository for inventory log rows on one shard.
#[derive(Debug, Clone)]
pub struct InventoryLogRepository {
    pool: SqlitePool,
}

impl InventoryLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryLogRepository { pool }
    }

    /// Appends one entry.
    pub async fn insert(&self, log: &InventoryLog) -> DbResult<()> {
        debug!(
            sku_id = log.sku_id,
            action = %log.action,
            quantity = log.change_quantity,
            "Appending inventory log"
        );

        sqlx::query(
            r#"
            INSERT INTO inventory_logs (
                id, inventory_id, sku_id, action, change_quantity,
                old_available, new_available, old_locked, new_locked,
                reason, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&log.id)
        .bind(&log.inventory_id)
        .bind(log.sku_id)
        .bind(log.action)
        .bind(log.change_quantity)
        .bind(log.old_available)
        .bind(log.new_available)
        .bind(log.old_locked)
        .bind(log.new_locked)
        .bind(&log.reason)
        .bind(log.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lists entries for an inventory, newest first.
    pub async fn list_by_inventory(
        &self,
        inventory_id: &str,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<InventoryLog>> {
        let sql = format!(
            "SELECT {LOG_COLUMNS} FROM inventory_logs \
             WHERE inventory_id = ?1 \
             ORDER BY created_at DESC, rowid DESC \
             LIMIT ?2 OFFSET ?3"
        );
        let rows = sqlx::query_as::<_, InventoryLog>(&sql)
            .bind(inventory_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn count_by_inventory(&self, inventory_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory_logs WHERE inventory_id = ?1")
            .bind(inventory_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use depot_core::{Inventory, LogAction};

    #[tokio::test]
    async fn test_append_and_page() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let logs = db.logs();

        let mut inv = Inventory::new(5, 1, 1, 10, 2).unwrap();
        for q in 1..=3 {
            let change = inv.deduct(q, "sale").unwrap();
            logs.insert(&change.logs[0]).await.unwrap();
            inv = change.inventory;
        }

        assert_eq!(logs.count_by_inventory(&inv.id).await.unwrap(), 3);
        assert_eq!(logs.count_by_inventory("other").await.unwrap(), 0);

        let newest = logs.list_by_inventory(&inv.id, 2, 0).await.unwrap();
        assert_eq!(newest.len(), 2);
        assert_eq!(newest[0].change_quantity, 3);
        assert_eq!(newest[0].action, LogAction::Deduct);
        assert_eq!(newest[0].new_available, 4);

        let rest = logs.list_by_inventory(&inv.id, 2, 2).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].change_quantity, 1);
    }
}
