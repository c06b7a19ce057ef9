//! Postgres-backed inventory records (`inventory` table).
//!
//! `UNIQUE (sku, store_id)` on the table backs the one-record-per-pair rule;
//! `upsert` relies on it through `ON CONFLICT ... DO UPDATE`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::instrument;

use stocksync_core::{RemoteInventoryItemId, Sku, StoreId};
use stocksync_inventory::InventoryRecord;

use super::{InventoryRecordError, InventoryRecordStore};
use crate::db::describe_sqlx_error;

#[derive(Debug, Clone)]
pub struct PostgresInventoryRecordStore {
    pool: Arc<PgPool>,
}

impl PostgresInventoryRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> InventoryRecordError {
    InventoryRecordError::Storage(describe_sqlx_error(operation, &err))
}

fn record_from_row(row: &sqlx::postgres::PgRow) -> Result<InventoryRecord, InventoryRecordError> {
    let corrupt = |e: sqlx::Error| InventoryRecordError::Corrupt(e.to_string());

    let sku: String = row.try_get("sku").map_err(corrupt)?;
    let store_id: uuid::Uuid = row.try_get("store_id").map_err(corrupt)?;
    let item_id: String = row.try_get("inventory_item_id").map_err(corrupt)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(corrupt)?;

    Ok(InventoryRecord::new(
        Sku::parse(sku).map_err(|e| InventoryRecordError::Corrupt(e.to_string()))?,
        StoreId::from_uuid(store_id),
        RemoteInventoryItemId::parse(item_id).map_err(|e| InventoryRecordError::Corrupt(e.to_string()))?,
        updated_at,
    ))
}

#[async_trait::async_trait]
impl InventoryRecordStore for PostgresInventoryRecordStore {
    #[instrument(skip(self), fields(sku = %sku, store_id = %store_id, item_id = %item_id), err)]
    async fn upsert(
        &self,
        sku: &Sku,
        store_id: StoreId,
        item_id: &RemoteInventoryItemId,
    ) -> Result<InventoryRecord, InventoryRecordError> {
        let row = sqlx::query(
            r#"
            INSERT INTO inventory (sku, store_id, inventory_item_id, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (sku, store_id) DO UPDATE
                SET inventory_item_id = EXCLUDED.inventory_item_id,
                    updated_at = EXCLUDED.updated_at
            RETURNING sku, store_id, inventory_item_id, updated_at
            "#,
        )
        .bind(sku.as_str())
        .bind(store_id.as_uuid())
        .bind(item_id.as_str())
        .bind(Utc::now())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_inventory_record", e))?;

        record_from_row(&row)
    }

    #[instrument(skip(self), fields(sku = %sku, store_id = %store_id), err)]
    async fn lookup(&self, sku: &Sku, store_id: StoreId) -> Result<Option<RemoteInventoryItemId>, InventoryRecordError> {
        let row = sqlx::query(
            r#"
            SELECT inventory_item_id
            FROM inventory
            WHERE sku = $1 AND store_id = $2
            "#,
        )
        .bind(sku.as_str())
        .bind(store_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("lookup_inventory_record", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let raw: String = row
            .try_get("inventory_item_id")
            .map_err(|e| InventoryRecordError::Corrupt(e.to_string()))?;
        RemoteInventoryItemId::parse(raw)
            .map(Some)
            .map_err(|e| InventoryRecordError::Corrupt(e.to_string()))
    }
}
