use std::collections::HashMap;
use std::sync::RwLock;

use stocksync_core::{CompanyId, StockGroupId, StoreId};
use stocksync_inventory::{StockGroup, StockGroupMembership};

use super::{StockGroupError, StockGroupResolver};

#[derive(Debug, Default)]
struct State {
    groups: HashMap<StockGroupId, StockGroup>,
    /// store -> group; one entry per store.
    membership: HashMap<StoreId, StockGroupId>,
}

/// In-memory stock groups, including the write operations the external
/// CRUD surface would normally own.
///
/// Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryStockGroupResolver {
    state: RwLock<State>,
}

fn poisoned() -> StockGroupError {
    StockGroupError::Storage("lock poisoned".to_string())
}

impl InMemoryStockGroupResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_group(&self, company_id: CompanyId, name: impl Into<String>) -> Result<StockGroup, StockGroupError> {
        let group = StockGroup {
            id: StockGroupId::new(),
            company_id,
            name: name.into(),
        };
        let mut state = self.state.write().map_err(|_| poisoned())?;
        state.groups.insert(group.id, group.clone());
        Ok(group)
    }

    /// Add `store_id` to a group. Re-adding to the same group is a no-op;
    /// joining a second group is rejected.
    pub fn add_member(&self, stock_group_id: StockGroupId, store_id: StoreId) -> Result<StockGroupMembership, StockGroupError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        if !state.groups.contains_key(&stock_group_id) {
            return Err(StockGroupError::UnknownGroup(stock_group_id));
        }
        match state.membership.get(&store_id) {
            Some(existing) if *existing != stock_group_id => Err(StockGroupError::AlreadyGrouped {
                store_id,
                stock_group_id: *existing,
            }),
            _ => {
                state.membership.insert(store_id, stock_group_id);
                Ok(StockGroupMembership {
                    stock_group_id,
                    store_id,
                })
            }
        }
    }

    /// Returns whether the store was a member.
    pub fn remove_member(&self, store_id: StoreId) -> Result<bool, StockGroupError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        Ok(state.membership.remove(&store_id).is_some())
    }
}

#[async_trait::async_trait]
impl StockGroupResolver for InMemoryStockGroupResolver {
    async fn group_of(&self, store_id: StoreId) -> Result<Option<StockGroupId>, StockGroupError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state.membership.get(&store_id).copied())
    }

    async fn members(&self, stock_group_id: StockGroupId) -> Result<Vec<StoreId>, StockGroupError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        if !state.groups.contains_key(&stock_group_id) {
            return Err(StockGroupError::UnknownGroup(stock_group_id));
        }
        let mut members: Vec<StoreId> = state
            .membership
            .iter()
            .filter(|(_, g)| **g == stock_group_id)
            .map(|(s, _)| *s)
            .collect();
        members.sort();
        Ok(members)
    }
}
