//! Stock group membership: which stores share stock with which.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryStockGroupResolver;
pub use postgres::PostgresStockGroupResolver;

use stocksync_core::{StockGroupId, StoreId};
use stocksync_inventory::siblings_of;

#[derive(Debug, thiserror::Error)]
pub enum StockGroupError {
    #[error("store {store_id} already belongs to stock group {stock_group_id}")]
    AlreadyGrouped {
        store_id: StoreId,
        stock_group_id: StockGroupId,
    },

    #[error("stock group not found: {0}")]
    UnknownGroup(StockGroupId),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Read side of stock group membership.
///
/// A store belongs to at most one group. A store in no group has no
/// siblings; that is not an error.
#[async_trait::async_trait]
pub trait StockGroupResolver: Send + Sync {
    async fn group_of(&self, store_id: StoreId) -> Result<Option<StockGroupId>, StockGroupError>;

    async fn members(&self, stock_group_id: StockGroupId) -> Result<Vec<StoreId>, StockGroupError>;

    /// Other members of `store_id`'s group, sorted by id.
    async fn siblings_of(&self, store_id: StoreId) -> Result<Vec<StoreId>, StockGroupError> {
        match self.group_of(store_id).await? {
            Some(group) => Ok(siblings_of(store_id, self.members(group).await?)),
            None => Ok(Vec::new()),
        }
    }
}
