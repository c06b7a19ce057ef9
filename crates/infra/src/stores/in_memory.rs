use std::collections::HashMap;
use std::sync::RwLock;

use stocksync_core::{CompanyId, ShopDomain, StoreId};
use stocksync_inventory::Store;

use super::{StoreDirectory, StoreDirectoryError};

/// In-memory store directory.
///
/// Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryStoreDirectory {
    stores: RwLock<HashMap<StoreId, Store>>,
}

fn poisoned() -> StoreDirectoryError {
    StoreDirectoryError::Storage("lock poisoned".to_string())
}

impl InMemoryStoreDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a store.
    pub fn insert(&self, store: Store) -> Result<(), StoreDirectoryError> {
        let mut stores = self.stores.write().map_err(|_| poisoned())?;
        stores.insert(store.id, store);
        Ok(())
    }
}

#[async_trait::async_trait]
impl StoreDirectory for InMemoryStoreDirectory {
    async fn get(&self, store_id: StoreId) -> Result<Option<Store>, StoreDirectoryError> {
        let stores = self.stores.read().map_err(|_| poisoned())?;
        Ok(stores.get(&store_id).cloned())
    }

    async fn find_by_domain(&self, domain: &ShopDomain) -> Result<Option<Store>, StoreDirectoryError> {
        let stores = self.stores.read().map_err(|_| poisoned())?;
        Ok(stores.values().find(|s| &s.domain == domain).cloned())
    }

    async fn list_for_company(&self, company_id: CompanyId) -> Result<Vec<Store>, StoreDirectoryError> {
        let stores = self.stores.read().map_err(|_| poisoned())?;
        let mut out: Vec<Store> = stores
            .values()
            .filter(|s| s.company_id == company_id)
            .cloned()
            .collect();
        out.sort_by_key(|s| s.id);
        Ok(out)
    }
}
