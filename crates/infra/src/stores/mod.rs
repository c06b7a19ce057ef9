//! Read access to integrated stores and their credentials.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryStoreDirectory;
pub use postgres::PostgresStoreDirectory;

use stocksync_core::{CompanyId, ShopDomain, StoreId};
use stocksync_inventory::Store;

#[derive(Debug, thiserror::Error)]
pub enum StoreDirectoryError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("store {store_id} is misconfigured: {reason}")]
    Misconfigured { store_id: StoreId, reason: String },
}

/// Store lookups. Stores are owned by an external collaborator; nothing here mutates them.
#[async_trait::async_trait]
pub trait StoreDirectory: Send + Sync {
    async fn get(&self, store_id: StoreId) -> Result<Option<Store>, StoreDirectoryError>;

    async fn find_by_domain(&self, domain: &ShopDomain) -> Result<Option<Store>, StoreDirectoryError>;

    /// Stores of one company, ordered by id.
    async fn list_for_company(&self, company_id: CompanyId) -> Result<Vec<Store>, StoreDirectoryError>;
}
