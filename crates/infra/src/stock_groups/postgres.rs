//! Postgres-backed membership lookups (`stock_group_stores` table).
//!
//! The table carries `UNIQUE (store_id)`, so `group_of` is a point query.

use std::sync::Arc;

use sqlx::{PgPool, Row};
use tracing::instrument;

use stocksync_core::{StockGroupId, StoreId};
use stocksync_inventory::siblings_of;

use super::{StockGroupError, StockGroupResolver};
use crate::db::describe_sqlx_error;

#[derive(Debug, Clone)]
pub struct PostgresStockGroupResolver {
    pool: Arc<PgPool>,
}

impl PostgresStockGroupResolver {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StockGroupError {
    StockGroupError::Storage(describe_sqlx_error(operation, &err))
}

fn store_ids(rows: &[sqlx::postgres::PgRow]) -> Result<Vec<StoreId>, StockGroupError> {
    rows.iter()
        .map(|row| {
            row.try_get::<uuid::Uuid, _>("store_id")
                .map(StoreId::from_uuid)
                .map_err(|e| map_sqlx_error("decode_store_id", e))
        })
        .collect()
}

#[async_trait::async_trait]
impl StockGroupResolver for PostgresStockGroupResolver {
    #[instrument(skip(self), fields(store_id = %store_id), err)]
    async fn group_of(&self, store_id: StoreId) -> Result<Option<StockGroupId>, StockGroupError> {
        let row = sqlx::query("SELECT stock_group_id FROM stock_group_stores WHERE store_id = $1")
            .bind(store_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("group_of", e))?;

        row.map(|r| {
            r.try_get::<uuid::Uuid, _>("stock_group_id")
                .map(StockGroupId::from_uuid)
                .map_err(|e| map_sqlx_error("decode_stock_group_id", e))
        })
        .transpose()
    }

    #[instrument(skip(self), fields(stock_group_id = %stock_group_id), err)]
    async fn members(&self, stock_group_id: StockGroupId) -> Result<Vec<StoreId>, StockGroupError> {
        let rows = sqlx::query(
            r#"
            SELECT store_id
            FROM stock_group_stores
            WHERE stock_group_id = $1
            ORDER BY store_id ASC
            "#,
        )
        .bind(stock_group_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("group_members", e))?;

        store_ids(&rows)
    }

    /// Single round trip: self-join on the membership table.
    #[instrument(skip(self), fields(store_id = %store_id), err)]
    async fn siblings_of(&self, store_id: StoreId) -> Result<Vec<StoreId>, StockGroupError> {
        let rows = sqlx::query(
            r#"
            SELECT other.store_id
            FROM stock_group_stores me
            JOIN stock_group_stores other ON other.stock_group_id = me.stock_group_id
            WHERE me.store_id = $1
            ORDER BY other.store_id ASC
            "#,
        )
        .bind(store_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("siblings_of", e))?;

        Ok(siblings_of(store_id, store_ids(&rows)?))
    }
}
