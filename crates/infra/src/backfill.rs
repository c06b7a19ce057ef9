//! Record backfill: seed inventory records from each store's remote catalogue.
//!
//! Product webhooks keep records current, but a freshly integrated store has
//! none until its products change. A backfill walks the catalogue once.

use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use stocksync_core::{CompanyId, StoreId};
use stocksync_inventory::Store;
use stocksync_observability::Logger;

use crate::inventory_records::InventoryRecordStore;
use crate::remote::RemoteInventoryClient;
use crate::stores::{StoreDirectory, StoreDirectoryError};

/// Outcome for one store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreBackfill {
    pub store_id: StoreId,
    pub variants_seen: usize,
    pub records_upserted: usize,
    /// Variants without a SKU.
    pub skipped: usize,
    pub upsert_failures: usize,
    /// Set when the catalogue could not be fetched; nothing was written then.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub stores: Vec<StoreBackfill>,
}

impl BackfillReport {
    pub fn records_upserted(&self) -> usize {
        self.stores.iter().map(|s| s.records_upserted).sum()
    }

    pub fn failed_stores(&self) -> impl Iterator<Item = &StoreBackfill> {
        self.stores.iter().filter(|s| s.error.is_some())
    }
}

pub struct Backfill {
    stores: Arc<dyn StoreDirectory>,
    records: Arc<dyn InventoryRecordStore>,
    remote: Arc<dyn RemoteInventoryClient>,
    logger: Logger,
}

impl Backfill {
    pub fn new(
        stores: Arc<dyn StoreDirectory>,
        records: Arc<dyn InventoryRecordStore>,
        remote: Arc<dyn RemoteInventoryClient>,
        logger: Logger,
    ) -> Self {
        Self {
            stores,
            records,
            remote,
            logger,
        }
    }

    /// Backfill every store of `company_id`, one after another.
    ///
    /// A store whose catalogue cannot be fetched is reported and skipped.
    pub async fn run_company(&self, company_id: CompanyId) -> Result<BackfillReport, StoreDirectoryError> {
        self.logger.scope(self.run_company_inner(company_id)).await
    }

    #[instrument(name = "backfill.company", skip(self), fields(company_id = %company_id))]
    async fn run_company_inner(&self, company_id: CompanyId) -> Result<BackfillReport, StoreDirectoryError> {
        let stores = self.stores.list_for_company(company_id).await?;
        tracing::info!(stores = stores.len(), "backfill started");

        let mut report = BackfillReport::default();
        for store in &stores {
            report.stores.push(self.backfill_store(store).await);
        }

        tracing::info!(
            records_upserted = report.records_upserted(),
            failed_stores = report.failed_stores().count(),
            "backfill finished"
        );
        Ok(report)
    }

    #[instrument(name = "backfill.store", skip_all, fields(store_id = %store.id, domain = %store.domain))]
    async fn backfill_store(&self, store: &Store) -> StoreBackfill {
        let mut outcome = StoreBackfill {
            store_id: store.id,
            variants_seen: 0,
            records_upserted: 0,
            skipped: 0,
            upsert_failures: 0,
            error: None,
        };

        let variants = match self.remote.fetch_variants(&store.remote_credentials()).await {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, kind = e.kind(), "catalogue fetch failed");
                outcome.error = Some(e.to_string());
                return outcome;
            }
        };
        outcome.variants_seen = variants.len();

        for variant in variants {
            let Some(sku) = variant.sku else {
                outcome.skipped += 1;
                continue;
            };
            match self.records.upsert(&sku, store.id, &variant.inventory_item_id).await {
                Ok(_) => outcome.records_upserted += 1,
                Err(e) => {
                    outcome.upsert_failures += 1;
                    tracing::warn!(sku = %sku, error = %e, "record upsert failed");
                }
            }
        }

        tracing::info!(
            variants = outcome.variants_seen,
            upserted = outcome.records_upserted,
            skipped = outcome.skipped,
            "store backfilled"
        );
        outcome
    }
}
