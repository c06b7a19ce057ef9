//! Postgres-backed delivery log (`processed_webhooks` and `webhook_settled_lines` tables).

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use stocksync_core::{Sku, StoreId};
use stocksync_events::WebhookTopic;

use super::{WebhookLog, WebhookLogError};
use crate::db::describe_sqlx_error;

#[derive(Debug, Clone)]
pub struct PostgresWebhookLog {
    pool: Arc<PgPool>,
}

impl PostgresWebhookLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> WebhookLogError {
    WebhookLogError::Storage(describe_sqlx_error(operation, &err))
}

#[async_trait::async_trait]
impl WebhookLog for PostgresWebhookLog {
    #[instrument(skip(self), err)]
    async fn seen(&self, webhook_id: &str) -> Result<bool, WebhookLogError> {
        let row = sqlx::query("SELECT 1 FROM processed_webhooks WHERE webhook_id = $1")
            .bind(webhook_id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("webhook_seen", e))?;
        Ok(row.is_some())
    }

    #[instrument(skip(self), fields(store_id = %store_id, topic = %topic), err)]
    async fn record(&self, webhook_id: &str, store_id: StoreId, topic: WebhookTopic) -> Result<bool, WebhookLogError> {
        let result = sqlx::query(
            r#"
            INSERT INTO processed_webhooks (webhook_id, store_id, topic, processed_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (webhook_id) DO NOTHING
            "#,
        )
        .bind(webhook_id)
        .bind(store_id.as_uuid())
        .bind(topic.as_str())
        .bind(Utc::now())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("record_webhook", e))?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self), err)]
    async fn settled_lines(&self, webhook_id: &str) -> Result<HashSet<(StoreId, Sku)>, WebhookLogError> {
        let rows = sqlx::query("SELECT sibling_store_id, sku FROM webhook_settled_lines WHERE webhook_id = $1")
            .bind(webhook_id)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("settled_lines", e))?;

        rows.iter()
            .map(|row| {
                let store: Uuid = row.try_get("sibling_store_id").map_err(|e| map_sqlx_error("settled_lines", e))?;
                let sku: String = row.try_get("sku").map_err(|e| map_sqlx_error("settled_lines", e))?;
                let sku = Sku::parse(sku).map_err(|e| WebhookLogError::Storage(format!("settled_lines: {e}")))?;
                Ok((StoreId::from_uuid(store), sku))
            })
            .collect()
    }

    #[instrument(skip(self, skus), fields(sibling_store_id = %sibling, lines = skus.len()), err)]
    async fn settle_lines(&self, webhook_id: &str, sibling: StoreId, skus: &[Sku]) -> Result<(), WebhookLogError> {
        if skus.is_empty() {
            return Ok(());
        }
        let skus: Vec<String> = skus.iter().map(|s| s.as_str().to_string()).collect();
        sqlx::query(
            r#"
            INSERT INTO webhook_settled_lines (webhook_id, sibling_store_id, sku, settled_at)
            SELECT $1, $2, sku, $4 FROM UNNEST($3::text[]) AS sku
            ON CONFLICT (webhook_id, sibling_store_id, sku) DO NOTHING
            "#,
        )
        .bind(webhook_id)
        .bind(sibling.as_uuid())
        .bind(skus)
        .bind(Utc::now())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("settle_lines", e))?;
        Ok(())
    }
}
