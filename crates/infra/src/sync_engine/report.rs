use serde::Serialize;

use stocksync_core::{Sku, StoreId};
use stocksync_events::WebhookTopic;

/// Soft outcome recorded while processing a webhook.
///
/// None of these make the webhook fail; they are reported back to the caller.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// The sibling has no record for the SKU; the line item was skipped there.
    RecordNotFound,
    /// The record store failed while looking up a SKU for a sibling.
    RecordLookupFailed,
    /// A whole batch failed (transport, status, timeout, undecodable response).
    TransportFailure,
    /// The remote refused one adjustment.
    RemoteUserError,
    /// The sibling's store record or credentials could not be loaded.
    CredentialsUnavailable,
    /// An order line without a SKU.
    SkippedLineItem,
    /// A product variant without SKU or inventory item id.
    SkippedVariant,
    UpsertFailed,
    /// Work not started because the request was cancelled.
    Cancelled,
    /// A sibling worker panicked.
    WorkerFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Store the diagnostic is about (a sibling for order events).
    pub store_id: Option<StoreId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<Sku>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, store_id: Option<StoreId>, message: impl Into<String>) -> Self {
        Self {
            kind,
            store_id,
            sku: None,
            message: message.into(),
        }
    }

    pub fn for_sku(kind: DiagnosticKind, store_id: StoreId, sku: &Sku, message: impl Into<String>) -> Self {
        Self {
            kind,
            store_id: Some(store_id),
            sku: Some(sku.clone()),
            message: message.into(),
        }
    }
}

/// Per-sibling counters for one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiblingSummary {
    pub store_id: StoreId,
    /// Adjustments built from records found at the sibling.
    pub planned: usize,
    pub applied: usize,
    /// Adjustments the remote refused individually.
    pub rejected: usize,
    /// Adjustments in batches that failed as a whole.
    pub failed: usize,
    /// Adjustments never sent because of cancellation.
    pub cancelled: usize,
    pub not_found: usize,
    /// Lines whose record lookup failed; retried on redelivery.
    pub lookup_failed: usize,
    /// Lines already delivered by an earlier attempt of the same webhook.
    pub already_settled: usize,
    /// The sibling was given up before its adjustments were attempted
    /// (store unavailable, worker failure).
    pub aborted: bool,
    pub batches_sent: usize,
    pub batches_failed: usize,
}

impl SiblingSummary {
    pub fn new(store_id: StoreId) -> Self {
        Self {
            store_id,
            planned: 0,
            applied: 0,
            rejected: 0,
            failed: 0,
            cancelled: 0,
            not_found: 0,
            lookup_failed: 0,
            already_settled: 0,
            aborted: false,
            batches_sent: 0,
            batches_failed: 0,
        }
    }

    /// Nothing is left to deliver to this sibling.
    pub fn is_settled(&self) -> bool {
        !self.aborted && self.failed == 0 && self.cancelled == 0 && self.lookup_failed == 0
    }
}

/// Everything that happened while processing one webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub topic: WebhookTopic,
    pub source_store_id: StoreId,
    /// The source store belongs to no stock group (orders only).
    pub resolution_miss: bool,
    /// One entry per sibling, in resolver order.
    pub siblings: Vec<SiblingSummary>,
    pub records_upserted: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl SyncReport {
    pub fn new(topic: WebhookTopic, source_store_id: StoreId) -> Self {
        Self {
            topic,
            source_store_id,
            resolution_miss: false,
            siblings: Vec::new(),
            records_upserted: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn adjustments_applied(&self) -> usize {
        self.siblings.iter().map(|s| s.applied).sum()
    }

    pub fn batches_sent(&self) -> usize {
        self.siblings.iter().map(|s| s.batches_sent).sum()
    }

    pub fn diagnostics_of(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }

    /// Every sibling is settled and every product record was written.
    pub fn is_settled(&self) -> bool {
        self.siblings.iter().all(SiblingSummary::is_settled)
            && self.diagnostics_of(DiagnosticKind::UpsertFailed).next().is_none()
    }

    pub fn sibling(&self, store_id: StoreId) -> Option<&SiblingSummary> {
        self.siblings.iter().find(|s| s.store_id == store_id)
    }
}
