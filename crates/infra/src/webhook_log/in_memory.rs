use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use stocksync_core::{Sku, StoreId};
use stocksync_events::WebhookTopic;

use super::{WebhookLog, WebhookLogError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessedDelivery {
    pub store_id: StoreId,
    pub topic: WebhookTopic,
    pub processed_at: DateTime<Utc>,
}

/// In-memory delivery log.
///
/// Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryWebhookLog {
    entries: RwLock<HashMap<String, ProcessedDelivery>>,
    settled: RwLock<HashMap<String, HashSet<(StoreId, Sku)>>>,
}

impl InMemoryWebhookLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, webhook_id: &str) -> Option<ProcessedDelivery> {
        self.entries.read().ok()?.get(webhook_id).copied()
    }
}

fn poisoned() -> WebhookLogError {
    WebhookLogError::Storage("lock poisoned".to_string())
}

#[async_trait::async_trait]
impl WebhookLog for InMemoryWebhookLog {
    async fn seen(&self, webhook_id: &str) -> Result<bool, WebhookLogError> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.contains_key(webhook_id))
    }

    async fn record(&self, webhook_id: &str, store_id: StoreId, topic: WebhookTopic) -> Result<bool, WebhookLogError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        if entries.contains_key(webhook_id) {
            return Ok(false);
        }
        entries.insert(
            webhook_id.to_string(),
            ProcessedDelivery {
                store_id,
                topic,
                processed_at: Utc::now(),
            },
        );
        Ok(true)
    }

    async fn settled_lines(&self, webhook_id: &str) -> Result<HashSet<(StoreId, Sku)>, WebhookLogError> {
        let settled = self.settled.read().map_err(|_| poisoned())?;
        Ok(settled.get(webhook_id).cloned().unwrap_or_default())
    }

    async fn settle_lines(&self, webhook_id: &str, sibling: StoreId, skus: &[Sku]) -> Result<(), WebhookLogError> {
        if skus.is_empty() {
            return Ok(());
        }
        let mut settled = self.settled.write().map_err(|_| poisoned())?;
        let lines = settled.entry(webhook_id.to_string()).or_default();
        lines.extend(skus.iter().map(|sku| (sibling, sku.clone())));
        Ok(())
    }
}
