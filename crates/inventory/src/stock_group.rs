use serde::{Deserialize, Serialize};

use stocksync_core::{CompanyId, StockGroupId, StoreId};

/// A set of stores whose shared SKUs are kept in sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockGroup {
    pub id: StockGroupId,
    pub company_id: CompanyId,
    pub name: String,
}

/// Membership of a store in a stock group.
///
/// A store belongs to at most one stock group at a time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StockGroupMembership {
    pub stock_group_id: StockGroupId,
    pub store_id: StoreId,
}

/// Members of a group other than `store_id`, deduplicated and sorted by id.
///
/// The sort gives a stable fan-out order for one sync invocation.
pub fn siblings_of(store_id: StoreId, members: impl IntoIterator<Item = StoreId>) -> Vec<StoreId> {
    let mut siblings: Vec<StoreId> = members.into_iter().filter(|m| *m != store_id).collect();
    siblings.sort();
    siblings.dedup();
    siblings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn siblings_exclude_self_and_are_sorted() {
        let a = StoreId::new();
        let b = StoreId::new();
        let c = StoreId::new();

        let siblings = siblings_of(b, vec![c, b, a, c]);
        let mut expected = vec![a, c];
        expected.sort();
        assert_eq!(siblings, expected);
    }

    #[test]
    fn lone_member_has_no_siblings() {
        let a = StoreId::new();
        assert!(siblings_of(a, vec![a]).is_empty());
    }
}
