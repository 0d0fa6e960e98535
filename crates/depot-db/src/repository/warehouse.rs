//! # Warehouse Repository
//!
//! Reference data read by the allocator. Low write frequency; lives on the
//! home shard only.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use depot_core::{NewWarehouse, Warehouse};

use crate::error::{DbError, DbResult};

const WAREHOUSE_COLUMNS: &str = "id, name, lat, lon, priority, ship_cost, created_at";

#[derive(Debug, Clone)]
pub struct WarehouseRepository {
    pool: SqlitePool,
}

impl WarehouseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        WarehouseRepository { pool }
    }

    /// Registers a warehouse.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - The id is taken
    pub async fn insert(&self, new: &NewWarehouse) -> DbResult<Warehouse> {
        debug!(warehouse_id = new.id, name = %new.name, "Inserting warehouse");

        let warehouse = Warehouse {
            id: new.id,
            name: new.name.clone(),
            lat: new.lat,
            lon: new.lon,
            priority: new.priority,
            ship_cost: new.ship_cost,
            created_at: Utc::now(),
        };

        let result = sqlx::query(
            "INSERT INTO warehouses (id, name, lat, lon, priority, ship_cost, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(warehouse.id)
        .bind(&warehouse.name)
        .bind(warehouse.lat)
        .bind(warehouse.lon)
        .bind(warehouse.priority)
        .bind(warehouse.ship_cost)
        .bind(warehouse.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(warehouse),
            Err(e) => match DbError::from(e) {
                DbError::UniqueViolation { .. } => Err(DbError::duplicate("warehouse.id", new.id)),
                other => Err(other),
            },
        }
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<Warehouse>> {
        let sql = format!("SELECT {WAREHOUSE_COLUMNS} FROM warehouses WHERE id = ?1");
        let warehouse = sqlx::query_as::<_, Warehouse>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(warehouse)
    }

    /// All warehouses ordered by id.
    pub async fn list(&self) -> DbResult<Vec<Warehouse>> {
        let sql = format!("SELECT {WAREHOUSE_COLUMNS} FROM warehouses ORDER BY id");
        let rows = sqlx::query_as::<_, Warehouse>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn new_warehouse(id: i64) -> NewWarehouse {
        NewWarehouse {
            id,
            name: format!("WH-{id}"),
            lat: 31.2,
            lon: 121.5,
            priority: 3,
            ship_cost: 12,
        }
    }

    #[tokio::test]
    async fn test_insert_get_list() {
        let repo = Database::new(DbConfig::in_memory()).await.unwrap().warehouses();
        repo.insert(&new_warehouse(2)).await.unwrap();
        repo.insert(&new_warehouse(1)).await.unwrap();

        let wh = repo.get(2).await.unwrap().unwrap();
        assert_eq!(wh.name, "WH-2");
        assert_eq!(wh.priority, 3);
        assert!((wh.lat - 31.2).abs() < f64::EPSILON);
        assert!(repo.get(9).await.unwrap().is_none());

        let all = repo.list().await.unwrap();
        assert_eq!(all.iter().map(|w| w.id).collect::<Vec<_>>(), vec![1, 2]);

        let err = repo.insert(&new_warehouse(1)).await.unwrap_err();
        assert!(err.is_unique_violation());
    }
}
