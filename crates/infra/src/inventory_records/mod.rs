//! Durable mapping `(sku, store) -> remote inventory item id`.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryInventoryRecordStore;
pub use postgres::PostgresInventoryRecordStore;

use stocksync_core::{RemoteInventoryItemId, Sku, StoreId};
use stocksync_inventory::InventoryRecord;

#[derive(Debug, thiserror::Error)]
pub enum InventoryRecordError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("corrupt inventory record: {0}")]
    Corrupt(String),
}

/// Inventory record storage.
///
/// `upsert` is idempotent and last-writer-wins. A missing record is
/// `Ok(None)` from `lookup`, never an error.
#[async_trait::async_trait]
pub trait InventoryRecordStore: Send + Sync {
    /// Create the record for `(sku, store_id)` or point it at `item_id`,
    /// refreshing `updated_at` either way.
    async fn upsert(
        &self,
        sku: &Sku,
        store_id: StoreId,
        item_id: &RemoteInventoryItemId,
    ) -> Result<InventoryRecord, InventoryRecordError>;

    async fn lookup(&self, sku: &Sku, store_id: StoreId) -> Result<Option<RemoteInventoryItemId>, InventoryRecordError>;
}
