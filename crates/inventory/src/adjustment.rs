use serde::{Deserialize, Serialize};

use stocksync_core::{DomainError, DomainResult, LocationId, RemoteInventoryItemId, Sku};

/// Upper bound on adjustments sent in one remote mutation request.
pub const MAX_BATCH_SIZE: usize = 250;

/// A single stock change to apply at a remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryAdjustment {
    /// SKU the adjustment was derived from (diagnostics only; not sent remotely).
    pub sku: Sku,
    pub inventory_item_id: RemoteInventoryItemId,
    pub location_id: LocationId,
    pub delta: i64,
}

impl InventoryAdjustment {
    /// Adjustment that mirrors a sale of `quantity` units elsewhere in the group.
    pub fn for_sale(
        sku: Sku,
        inventory_item_id: RemoteInventoryItemId,
        location_id: LocationId,
        quantity: u32,
    ) -> Self {
        Self {
            sku,
            inventory_item_id,
            location_id,
            delta: -i64::from(quantity),
        }
    }
}

/// A non-empty group of at most [`MAX_BATCH_SIZE`] adjustments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustmentBatch(Vec<InventoryAdjustment>);

impl AdjustmentBatch {
    pub fn new(adjustments: Vec<InventoryAdjustment>) -> DomainResult<Self> {
        if adjustments.is_empty() {
            return Err(DomainError::invariant("adjustment batch cannot be empty"));
        }
        if adjustments.len() > MAX_BATCH_SIZE {
            return Err(DomainError::invariant(format!(
                "adjustment batch holds {} entries (max {MAX_BATCH_SIZE})",
                adjustments.len()
            )));
        }
        Ok(Self(adjustments))
    }

    pub fn adjustments(&self) -> &[InventoryAdjustment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<InventoryAdjustment> {
        self.0
    }
}

/// Split adjustments into sequential batches of at most `batch_size` entries.
///
/// `batch_size` is clamped to `1..=MAX_BATCH_SIZE`. Order is preserved.
pub fn plan_batches(adjustments: Vec<InventoryAdjustment>, batch_size: usize) -> Vec<AdjustmentBatch> {
    let size = batch_size.clamp(1, MAX_BATCH_SIZE);
    let mut batches = Vec::with_capacity(adjustments.len().div_ceil(size));
    let mut current = Vec::with_capacity(size.min(adjustments.len()));

    for adjustment in adjustments {
        current.push(adjustment);
        if current.len() == size {
            batches.push(AdjustmentBatch(std::mem::take(&mut current)));
        }
    }
    if !current.is_empty() {
        batches.push(AdjustmentBatch(current));
    }
    batches
}
