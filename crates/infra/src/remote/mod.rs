//! Remote Adjustment Client: the storefront admin API wire adapter.

pub mod client;
pub mod error;
pub mod graphql;

pub use client::GraphqlInventoryClient;
pub use error::RemoteError;

use serde::Serialize;

use stocksync_core::{RemoteInventoryItemId, Sku};
use stocksync_inventory::{AdjustmentBatch, RemoteCredentials};

/// One adjustment the remote API refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PerItemError {
    pub sku: Sku,
    pub inventory_item_id: RemoteInventoryItemId,
    /// Path of the offending input field, as reported by the remote.
    pub field: Vec<String>,
    pub message: String,
}

/// Outcome of a batch the remote accepted at the transport level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjustmentResult {
    /// Adjustments not listed as erroring.
    pub applied: usize,
    pub errors: Vec<PerItemError>,
}

/// A product variant as listed by the remote catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteVariant {
    pub sku: Option<Sku>,
    pub inventory_item_id: RemoteInventoryItemId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantPage {
    pub variants: Vec<RemoteVariant>,
    /// Cursor for the next page; `None` on the last page.
    pub next_cursor: Option<String>,
}

/// Stateless access to one storefront's inventory API.
///
/// Implementations never retry; callers decide what a failure means.
#[async_trait::async_trait]
pub trait RemoteInventoryClient: Send + Sync {
    /// Apply `batch` in a single request.
    ///
    /// `reference` names the document that caused the adjustment (an order).
    async fn adjust_inventory(
        &self,
        credentials: &RemoteCredentials,
        batch: &AdjustmentBatch,
        reference: Option<&str>,
    ) -> Result<AdjustmentResult, RemoteError>;

    async fn fetch_variants_page(
        &self,
        credentials: &RemoteCredentials,
        cursor: Option<&str>,
    ) -> Result<VariantPage, RemoteError>;

    /// Every variant of the store, following cursors until the last page.
    async fn fetch_variants(&self, credentials: &RemoteCredentials) -> Result<Vec<RemoteVariant>, RemoteError> {
        let mut variants = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self.fetch_variants_page(credentials, cursor.as_deref()).await?;
            variants.extend(page.variants);
            match page.next_cursor {
                Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
                _ => return Ok(variants),
            }
        }
    }
}
