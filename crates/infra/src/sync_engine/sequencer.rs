//! Per-source-store serialisation of webhook processing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;

use stocksync_core::StoreId;

type Lanes = Arc<Mutex<HashMap<StoreId, Arc<tokio::sync::Mutex<()>>>>>;

/// Hands out one turn at a time per store.
///
/// Turns for the same store are granted in request order (tokio's mutex is
/// FIFO); different stores never wait on each other. Idle lanes are removed.
#[derive(Debug, Clone, Default)]
pub struct StoreSequencer {
    lanes: Lanes,
}

/// Held while a webhook for `store_id` is being processed.
#[derive(Debug)]
pub struct StoreTurn {
    store_id: StoreId,
    lanes: Lanes,
    _guard: OwnedMutexGuard<()>,
}

impl StoreSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, store_id: StoreId) -> StoreTurn {
        let lane = {
            let mut lanes = self.lanes.lock().unwrap_or_else(|p| p.into_inner());
            lanes.entry(store_id).or_default().clone()
        };
        StoreTurn {
            store_id,
            lanes: self.lanes.clone(),
            _guard: lane.lock_owned().await,
        }
    }

    /// Lanes currently tracked (busy or queued stores).
    pub fn active_lanes(&self) -> usize {
        self.lanes.lock().map(|l| l.len()).unwrap_or(0)
    }
}

impl Drop for StoreTurn {
    fn drop(&mut self) {
        let mut lanes = self.lanes.lock().unwrap_or_else(|p| p.into_inner());
        // Only the map and this turn's guard reference the lane: nobody is queued.
        if lanes.get(&self.store_id).is_some_and(|lane| Arc::strong_count(lane) <= 2) {
            lanes.remove(&self.store_id);
        }
    }
}
