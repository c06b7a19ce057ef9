use serde::Serialize;

use stocksync_core::{CompanyId, ShopDomain, StoreId};
use stocksync_inventory::Store;

use crate::signature::{self, SignatureError};

/// A store whose webhook signature has been verified.
///
/// This is the identity the sync engine acts on behalf of. It can only be
/// obtained through [`authenticate`] or, for trusted in-process callers,
/// [`AuthenticatedStore::trusted`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedStore {
    store_id: StoreId,
    company_id: CompanyId,
    domain: ShopDomain,
}

impl AuthenticatedStore {
    /// Identity for callers that did not come through a webhook (replays, jobs).
    pub fn trusted(store: &Store) -> Self {
        Self {
            store_id: store.id,
            company_id: store.company_id,
            domain: store.domain.clone(),
        }
    }

    pub fn store_id(&self) -> StoreId {
        self.store_id
    }

    pub fn company_id(&self) -> CompanyId {
        self.company_id
    }

    pub fn domain(&self) -> &ShopDomain {
        &self.domain
    }
}

/// Verify `body` was signed with `store`'s webhook secret.
pub fn authenticate(
    store: &Store,
    body: &[u8],
    signature_header: Option<&str>,
) -> Result<AuthenticatedStore, SignatureError> {
    signature::verify(store.webhook_secret.expose().as_bytes(), body, signature_header)?;
    Ok(AuthenticatedStore::trusted(store))
}
