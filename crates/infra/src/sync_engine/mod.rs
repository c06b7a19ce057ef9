//! The sync engine: turns authenticated webhook events into record updates
//! (product events) and sibling stock adjustments (order events).

mod fanout;
pub mod report;
pub mod sequencer;

pub use report::{Diagnostic, DiagnosticKind, SiblingSummary, SyncReport};
pub use sequencer::{StoreSequencer, StoreTurn};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use stocksync_auth::AuthenticatedStore;
use stocksync_core::{ShopDomain, Sku, StoreId};
use stocksync_events::{LineItem, OrderPlaced, ProductUpdated, WebhookEnvelope, WebhookEvent, WebhookTopic};
use stocksync_inventory::{InventoryAdjustment, MAX_BATCH_SIZE, plan_batches};
use stocksync_observability::Logger;

use crate::inventory_records::InventoryRecordStore;
use crate::remote::RemoteInventoryClient;
use crate::stock_groups::{StockGroupError, StockGroupResolver};
use crate::stores::StoreDirectory;
use crate::webhook_log::{WebhookLog, WebhookLogError};

use fanout::{Slot, fan_out};

/// Tuning knobs for order fan-out.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    max_concurrency: usize,
    batch_size: usize,
}

impl SyncSettings {
    /// `max_concurrency` is at least 1; `batch_size` is clamped to `1..=MAX_BATCH_SIZE`.
    pub fn new(max_concurrency: usize, batch_size: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
            batch_size: batch_size.clamp(1, MAX_BATCH_SIZE),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self::new(4, MAX_BATCH_SIZE)
    }
}

/// Hard failures: the webhook could not be processed at all.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("stock group lookup failed: {0}")]
    Resolution(#[from] StockGroupError),

    #[error("webhook log unavailable: {0}")]
    WebhookLog(#[from] WebhookLogError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Processed(SyncReport),
    /// The delivery id was already processed; nothing was done.
    Duplicate { webhook_id: String },
}

struct Inner {
    stores: Arc<dyn StoreDirectory>,
    groups: Arc<dyn StockGroupResolver>,
    records: Arc<dyn InventoryRecordStore>,
    remote: Arc<dyn RemoteInventoryClient>,
    webhook_log: Arc<dyn WebhookLog>,
    sequencer: StoreSequencer,
    settings: SyncSettings,
    logger: Logger,
}

/// Cheap-clone handle; clones share collaborators and the store sequencer.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<Inner>,
}

impl core::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("settings", &self.inner.settings)
            .finish_non_exhaustive()
    }
}

/// `referenceDocumentUri` sent with adjustments caused by an order.
pub fn order_reference(source: &ShopDomain, order_id: &str) -> String {
    format!("stocksync://{}/orders/{}", source.as_str(), order_id)
}

type DiagnosticSink = mpsc::UnboundedSender<Diagnostic>;

impl SyncEngine {
    pub fn new(
        stores: Arc<dyn StoreDirectory>,
        groups: Arc<dyn StockGroupResolver>,
        records: Arc<dyn InventoryRecordStore>,
        remote: Arc<dyn RemoteInventoryClient>,
        webhook_log: Arc<dyn WebhookLog>,
        settings: SyncSettings,
        logger: Logger,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                stores,
                groups,
                records,
                remote,
                webhook_log,
                sequencer: StoreSequencer::new(),
                settings,
                logger,
            }),
        }
    }

    pub fn settings(&self) -> SyncSettings {
        self.inner.settings
    }

    /// Process one authenticated webhook for `source`.
    ///
    /// Webhooks of the same source store are processed one at a time in
    /// arrival order. Cancelling `cancel` stops new sibling work from being
    /// scheduled; batches already sent are waited for.
    ///
    /// A delivery id is only recorded once nothing is left to deliver. Until
    /// then a redelivery resumes with the lines that have not reached their
    /// sibling yet.
    pub async fn handle(
        &self,
        source: &AuthenticatedStore,
        envelope: &WebhookEnvelope<WebhookEvent>,
        cancel: CancellationToken,
    ) -> Result<SyncOutcome, SyncError> {
        self.inner
            .logger
            .scope(self.handle_in_turn(source, envelope, cancel))
            .await
    }

    #[instrument(
        name = "sync.handle",
        skip_all,
        fields(store_id = %source.store_id(), topic = %envelope.topic(), webhook_id = envelope.webhook_id())
    )]
    async fn handle_in_turn(
        &self,
        source: &AuthenticatedStore,
        envelope: &WebhookEnvelope<WebhookEvent>,
        cancel: CancellationToken,
    ) -> Result<SyncOutcome, SyncError> {
        let _turn = self.inner.sequencer.acquire(source.store_id()).await;

        if let Some(webhook_id) = envelope.webhook_id() {
            if self.inner.webhook_log.seen(webhook_id).await? {
                tracing::info!("duplicate delivery acknowledged without reprocessing");
                return Ok(SyncOutcome::Duplicate {
                    webhook_id: webhook_id.to_string(),
                });
            }
        }

        let report = match envelope.payload() {
            WebhookEvent::OrderPlaced(order) => {
                self.order_placed(source, order, envelope.webhook_id(), &cancel)
                    .await?
            }
            WebhookEvent::ProductUpdated(product) => self.product_updated(source, product).await,
        };

        if let Some(webhook_id) = envelope.webhook_id() {
            if cancel.is_cancelled() {
                tracing::warn!("processing was cancelled; delivery left unrecorded for redelivery");
            } else if !report.is_settled() {
                tracing::warn!("adjustments still outstanding; delivery left unrecorded for redelivery");
            } else if let Err(e) = self.inner.webhook_log.record(webhook_id, source.store_id(), envelope.topic()).await {
                tracing::warn!(error = %e, "failed to record processed delivery");
            }
        }

        tracing::info!(
            siblings = report.siblings.len(),
            applied = report.adjustments_applied(),
            upserted = report.records_upserted,
            diagnostics = report.diagnostics.len(),
            "webhook processed"
        );
        Ok(SyncOutcome::Processed(report))
    }

    /// Propagate an order to every other store of the source's stock group.
    ///
    /// With a `delivery` id, lines already settled for that delivery are not
    /// sent again and newly delivered lines are settled as batches succeed.
    pub async fn order_placed(
        &self,
        source: &AuthenticatedStore,
        order: &OrderPlaced,
        delivery: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        let source_id = source.store_id();
        let mut report = SyncReport::new(WebhookTopic::OrderPlaced, source_id);

        let siblings = self.inner.groups.siblings_of(source_id).await?;
        if siblings.is_empty() {
            tracing::info!("store belongs to no stock group; nothing to propagate");
            report.resolution_miss = true;
            return Ok(report);
        }

        let lines = sold_quantities(source_id, &order.line_items, &mut report);
        if lines.is_empty() {
            return Ok(report);
        }

        let settled = match delivery {
            Some(webhook_id) => self.inner.webhook_log.settled_lines(webhook_id).await?,
            None => HashSet::new(),
        };
        if !settled.is_empty() {
            tracing::info!(settled = settled.len(), "resuming a partially delivered order");
        }

        let work = Arc::new(OrderWork {
            lines,
            settled,
            delivery: delivery.map(str::to_string),
            reference: order
                .order_id
                .as_deref()
                .map(|id| order_reference(source.domain(), id)),
        });

        let (sink, mut collected) = mpsc::unbounded_channel::<Diagnostic>();
        let slots = fan_out(
            siblings.clone(),
            self.inner.settings.max_concurrency(),
            cancel,
            &self.inner.logger,
            |sibling| {
                let engine = self.clone();
                let work = work.clone();
                let cancel = cancel.clone();
                let sink = sink.clone();
                async move { engine.sync_sibling(sibling, &work, &cancel, &sink).await }
            },
        )
        .await;
        drop(sink);

        for (sibling, slot) in siblings.iter().zip(slots) {
            match slot {
                Slot::Completed(summary) => report.siblings.push(summary),
                Slot::NotStarted => {
                    report.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::Cancelled,
                        Some(*sibling),
                        "cancelled before the sibling was processed",
                    ));
                    let mut summary = SiblingSummary::new(*sibling);
                    summary.cancelled = work.pending_for(*sibling).count();
                    summary.already_settled = work.lines.len() - summary.cancelled;
                    report.siblings.push(summary);
                }
                Slot::Failed(reason) => {
                    tracing::error!(sibling_store_id = %sibling, %reason, "sibling worker failed");
                    report.diagnostics.push(Diagnostic::new(DiagnosticKind::WorkerFailed, Some(*sibling), reason));
                    let mut summary = SiblingSummary::new(*sibling);
                    summary.aborted = true;
                    report.siblings.push(summary);
                }
            }
        }

        let mut from_workers = Vec::new();
        while let Ok(d) = collected.try_recv() {
            from_workers.push(d);
        }
        let rank: HashMap<StoreId, usize> = siblings.iter().enumerate().map(|(i, s)| (*s, i)).collect();
        from_workers.sort_by_key(|d| d.store_id.and_then(|s| rank.get(&s).copied()).unwrap_or(usize::MAX));
        report.diagnostics.extend(from_workers);

        Ok(report)
    }

    #[instrument(name = "sync.sibling", skip_all, fields(sibling_store_id = %sibling))]
    async fn sync_sibling(
        &self,
        sibling: StoreId,
        work: &OrderWork,
        cancel: &CancellationToken,
        sink: &DiagnosticSink,
    ) -> SiblingSummary {
        let mut summary = SiblingSummary::new(sibling);
        let emit = |d: Diagnostic| {
            let _ = sink.send(d);
        };

        let pending: Vec<&(Sku, u32)> = work.pending_for(sibling).collect();
        summary.already_settled = work.lines.len() - pending.len();
        if pending.is_empty() {
            tracing::info!("every line already reached this sibling");
            return summary;
        }

        let store = match self.inner.stores.get(sibling).await {
            Ok(Some(store)) => store,
            Ok(None) => {
                tracing::error!("sibling store not found in directory");
                summary.aborted = true;
                emit(Diagnostic::new(
                    DiagnosticKind::CredentialsUnavailable,
                    Some(sibling),
                    "store not found",
                ));
                return summary;
            }
            Err(e) => {
                tracing::error!(error = %e, "could not load sibling store");
                summary.aborted = true;
                emit(Diagnostic::new(DiagnosticKind::CredentialsUnavailable, Some(sibling), e.to_string()));
                return summary;
            }
        };

        let mut adjustments = Vec::with_capacity(pending.len());
        let mut missing = Vec::new();
        for (sku, quantity) in pending {
            match self.inner.records.lookup(sku, sibling).await {
                Ok(Some(item_id)) => adjustments.push(InventoryAdjustment::for_sale(
                    sku.clone(),
                    item_id,
                    store.location_id.clone(),
                    *quantity,
                )),
                Ok(None) => {
                    summary.not_found += 1;
                    missing.push(sku.clone());
                    tracing::warn!(sku = %sku, "no inventory record at sibling; line skipped");
                    emit(Diagnostic::for_sku(
                        DiagnosticKind::RecordNotFound,
                        sibling,
                        sku,
                        "no inventory record for sku",
                    ));
                }
                Err(e) => {
                    summary.lookup_failed += 1;
                    tracing::error!(sku = %sku, error = %e, "inventory record lookup failed; line skipped");
                    emit(Diagnostic::for_sku(DiagnosticKind::RecordLookupFailed, sibling, sku, e.to_string()));
                }
            }
        }
        summary.planned = adjustments.len();
        self.settle(work, sibling, &missing).await;

        let credentials = store.remote_credentials();
        let mut batches = plan_batches(adjustments, self.inner.settings.batch_size()).into_iter();
        while let Some(batch) = batches.next() {
            if cancel.is_cancelled() {
                let unsent = batch.len() + batches.by_ref().map(|b| b.len()).sum::<usize>();
                summary.cancelled += unsent;
                tracing::warn!(unsent, "cancelled; remaining batches not sent");
                emit(Diagnostic::new(
                    DiagnosticKind::Cancelled,
                    Some(sibling),
                    format!("{unsent} adjustments not sent"),
                ));
                break;
            }

            summary.batches_sent += 1;
            match self
                .inner
                .remote
                .adjust_inventory(&credentials, &batch, work.reference.as_deref())
                .await
            {
                Ok(result) => {
                    let delivered: Vec<Sku> = batch.adjustments().iter().map(|a| a.sku.clone()).collect();
                    self.settle(work, sibling, &delivered).await;
                    summary.applied += result.applied;
                    summary.rejected += batch.len() - result.applied.min(batch.len());
                    tracing::info!(batch_size = batch.len(), applied = result.applied, "batch applied");
                    for e in result.errors {
                        tracing::warn!(sku = %e.sku, field = ?e.field, message = %e.message, "remote rejected adjustment");
                        emit(Diagnostic::for_sku(DiagnosticKind::RemoteUserError, sibling, &e.sku, e.message));
                    }
                }
                Err(e) => {
                    summary.batches_failed += 1;
                    summary.failed += batch.len();
                    tracing::error!(batch_size = batch.len(), error = %e, "batch failed");
                    emit(Diagnostic::new(
                        DiagnosticKind::TransportFailure,
                        Some(sibling),
                        format!("batch of {} failed: {e}", batch.len()),
                    ));
                }
            }
        }

        summary
    }

    /// Remember lines that need no further work for this delivery.
    ///
    /// Refused and not-found lines count as settled: resending them would not
    /// change the outcome.
    async fn settle(&self, work: &OrderWork, sibling: StoreId, skus: &[Sku]) {
        let Some(webhook_id) = work.delivery.as_deref() else {
            return;
        };
        if let Err(e) = self.inner.webhook_log.settle_lines(webhook_id, sibling, skus).await {
            tracing::warn!(error = %e, lines = skus.len(), "failed to mark lines as delivered");
        }
    }

    /// Upsert the source store's records from a product payload. No remote calls.
    pub async fn product_updated(&self, source: &AuthenticatedStore, product: &ProductUpdated) -> SyncReport {
        let source_id = source.store_id();
        let mut report = SyncReport::new(WebhookTopic::ProductUpdated, source_id);

        for variant in &product.variants {
            let (Some(sku), Some(item_id)) = (&variant.sku, &variant.inventory_item_id) else {
                tracing::info!(sku = ?variant.sku, item_id = ?variant.inventory_item_id, "variant skipped: sku or inventory item missing");
                report.diagnostics.push(Diagnostic {
                    kind: DiagnosticKind::SkippedVariant,
                    store_id: Some(source_id),
                    sku: variant.sku.clone(),
                    message: "variant lacks sku or inventory item id".to_string(),
                });
                continue;
            };

            match self.inner.records.upsert(sku, source_id, item_id).await {
                Ok(_) => {
                    report.records_upserted += 1;
                    tracing::debug!(sku = %sku, item_id = %item_id, "inventory record upserted");
                }
                Err(e) => {
                    tracing::error!(sku = %sku, error = %e, "inventory record upsert failed");
                    report
                        .diagnostics
                        .push(Diagnostic::for_sku(DiagnosticKind::UpsertFailed, source_id, sku, e.to_string()));
                }
            }
        }

        report
    }
}

/// Read-only input shared by the sibling workers of one order.
struct OrderWork {
    lines: Vec<(Sku, u32)>,
    /// `(sibling, sku)` pairs delivered by an earlier attempt.
    settled: HashSet<(StoreId, Sku)>,
    delivery: Option<String>,
    reference: Option<String>,
}

impl OrderWork {
    fn pending_for(&self, sibling: StoreId) -> impl Iterator<Item = &(Sku, u32)> + '_ {
        self.lines
            .iter()
            .filter(move |(sku, _)| !self.settled.contains(&(sibling, sku.clone())))
    }
}

/// Quantities to deduct per SKU, in first-seen order.
///
/// Lines for the same SKU are summed; lines without a SKU are reported and
/// dropped; zero quantities are dropped silently.
fn sold_quantities(source: StoreId, lines: &[LineItem], report: &mut SyncReport) -> Vec<(Sku, u32)> {
    let mut out: Vec<(Sku, u32)> = Vec::with_capacity(lines.len());
    for line in lines {
        let Some(sku) = &line.sku else {
            tracing::info!(quantity = line.quantity, "order line without sku skipped");
            report.diagnostics.push(Diagnostic::new(
                DiagnosticKind::SkippedLineItem,
                Some(source),
                "order line has no sku",
            ));
            continue;
        };
        if line.quantity == 0 {
            continue;
        }
        match out.iter_mut().find(|(s, _)| s == sku) {
            Some((_, qty)) => *qty = qty.saturating_add(line.quantity),
            None => out.push((sku.clone(), line.quantity)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(sku: Option<&str>, quantity: u32) -> LineItem {
        LineItem {
            sku: sku.map(|s| Sku::parse(s).unwrap()),
            quantity,
        }
    }

    #[test]
    fn settings_are_clamped() {
        let s = SyncSettings::new(0, 10_000);
        assert_eq!(s.max_concurrency(), 1);
        assert_eq!(s.batch_size(), MAX_BATCH_SIZE);
        assert_eq!(SyncSettings::new(8, 0).batch_size(), 1);
    }

    #[test]
    fn sold_quantities_merge_and_skip() {
        let source = StoreId::new();
        let mut report = SyncReport::new(WebhookTopic::OrderPlaced, source);
        let lines = vec![
            line(Some("A"), 2),
            line(None, 1),
            line(Some("B"), 0),
            line(Some("C"), 1),
            line(Some("A"), 3),
        ];

        let sold = sold_quantities(source, &lines, &mut report);
        let sold: Vec<(&str, u32)> = sold.iter().map(|(s, q)| (s.as_str(), *q)).collect();
        assert_eq!(sold, vec![("A", 5), ("C", 1)]);
        assert_eq!(report.diagnostics_of(DiagnosticKind::SkippedLineItem).count(), 1);
    }

    #[test]
    fn order_reference_names_source_and_order() {
        let domain = ShopDomain::parse("s1").unwrap();
        assert_eq!(order_reference(&domain, "1001"), "stocksync://s1.myshopify.com/orders/1001");
    }
}
