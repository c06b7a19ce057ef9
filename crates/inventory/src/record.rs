use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stocksync_core::{RemoteInventoryItemId, Sku, StoreId};

/// Mapping from a SKU at one store to that store's inventory item.
///
/// At most one record exists per `(sku, store_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub sku: Sku,
    pub store_id: StoreId,
    pub remote_inventory_item_id: RemoteInventoryItemId,
    pub updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    pub fn new(
        sku: Sku,
        store_id: StoreId,
        remote_inventory_item_id: RemoteInventoryItemId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            sku,
            store_id,
            remote_inventory_item_id,
            updated_at: now,
        }
    }

    /// Point the record at `item_id` and refresh `updated_at`.
    ///
    /// Returns whether the item id changed.
    pub fn refresh(&mut self, item_id: RemoteInventoryItemId, now: DateTime<Utc>) -> bool {
        let changed = self.remote_inventory_item_id != item_id;
        self.remote_inventory_item_id = item_id;
        self.updated_at = now;
        changed
    }
}
