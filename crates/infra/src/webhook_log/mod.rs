//! Record of processed webhook deliveries, keyed by the storefront's delivery id.
//!
//! Besides whole deliveries, the log remembers which `(sibling, sku)` lines of an
//! order delivery have already reached the sibling, so a redelivery after a
//! partial failure only sends what is still outstanding.

pub mod in_memory;
pub mod postgres;

pub use in_memory::{InMemoryWebhookLog, ProcessedDelivery};
pub use postgres::PostgresWebhookLog;

use std::collections::HashSet;

use stocksync_core::{Sku, StoreId};
use stocksync_events::WebhookTopic;

#[derive(Debug, thiserror::Error)]
pub enum WebhookLogError {
    #[error("storage error: {0}")]
    Storage(String),
}

#[async_trait::async_trait]
pub trait WebhookLog: Send + Sync {
    async fn seen(&self, webhook_id: &str) -> Result<bool, WebhookLogError>;

    /// Mark a delivery processed. Returns `false` if it already was.
    async fn record(&self, webhook_id: &str, store_id: StoreId, topic: WebhookTopic) -> Result<bool, WebhookLogError>;

    /// Lines of `webhook_id` that need no further work, per sibling.
    async fn settled_lines(&self, webhook_id: &str) -> Result<HashSet<(StoreId, Sku)>, WebhookLogError>;

    /// Mark lines of `webhook_id` at `sibling` as done. Re-settling is a no-op.
    async fn settle_lines(&self, webhook_id: &str, sibling: StoreId, skus: &[Sku]) -> Result<(), WebhookLogError>;
}
