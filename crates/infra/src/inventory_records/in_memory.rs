use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use stocksync_core::{RemoteInventoryItemId, Sku, StoreId};
use stocksync_inventory::InventoryRecord;

use super::{InventoryRecordError, InventoryRecordStore};

/// In-memory inventory records.
///
/// Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryInventoryRecordStore {
    records: RwLock<HashMap<(StoreId, Sku), InventoryRecord>>,
}

impl InMemoryInventoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> InventoryRecordError {
    InventoryRecordError::Storage("lock poisoned".to_string())
}

#[async_trait::async_trait]
impl InventoryRecordStore for InMemoryInventoryRecordStore {
    async fn upsert(
        &self,
        sku: &Sku,
        store_id: StoreId,
        item_id: &RemoteInventoryItemId,
    ) -> Result<InventoryRecord, InventoryRecordError> {
        let now = Utc::now();
        let mut records = self.records.write().map_err(|_| poisoned())?;

        let record = records
            .entry((store_id, sku.clone()))
            .and_modify(|r| {
                r.refresh(item_id.clone(), now);
            })
            .or_insert_with(|| InventoryRecord::new(sku.clone(), store_id, item_id.clone(), now));

        Ok(record.clone())
    }

    async fn lookup(&self, sku: &Sku, store_id: StoreId) -> Result<Option<RemoteInventoryItemId>, InventoryRecordError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records
            .get(&(store_id, sku.clone()))
            .map(|r| r.remote_inventory_item_id.clone()))
    }
}
