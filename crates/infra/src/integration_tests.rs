//! Integration tests for the sync pipeline.
//!
//! Tests: signed webhook → ingest → sync engine → remote client (recorded)
//!
//! Verifies:
//! - Orders fan out to every sibling except the source
//! - Missing records are soft skips, failing siblings are isolated
//! - Batching, deduplication and cancellation behave end to end

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use chrono::Utc;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    use stocksync_auth::{AuthenticatedStore, sign};
    use stocksync_core::{CompanyId, LocationId, RemoteInventoryItemId, ShopDomain, Sku, StoreId};
    use stocksync_events::{LineItem, OrderPlaced, WebhookEnvelope, WebhookEvent, WebhookTopic};
    use stocksync_inventory::{AdjustmentBatch, RemoteCredentials, Secret, Store, StoreAuth};
    use stocksync_observability::{LogCapture, Logger};

    use crate::ingest::{WebhookIngestor, WebhookRequest};
    use crate::inventory_records::{InMemoryInventoryRecordStore, InventoryRecordStore};
    use crate::remote::{AdjustmentResult, PerItemError, RemoteError, RemoteInventoryClient, VariantPage};
    use crate::stock_groups::InMemoryStockGroupResolver;
    use crate::stores::InMemoryStoreDirectory;
    use crate::sync_engine::{DiagnosticKind, SyncEngine, SyncOutcome, SyncReport, SyncSettings};
    use crate::webhook_log::InMemoryWebhookLog;

    #[derive(Debug, Clone)]
    struct Call {
        domain: String,
        deltas: Vec<(String, i64)>,
        reference: Option<String>,
    }

    /// Records every adjustment call.
    ///
    /// Behaviour is keyed by shop handle: `slow-*` times out, `down-*` fails
    /// at the transport, item id "999" is refused by the remote. Shops marked
    /// unreachable fail at the transport until cleared.
    #[derive(Default)]
    struct RecordingRemote {
        calls: Mutex<Vec<Call>>,
        unreachable: Mutex<HashSet<String>>,
        cancel_on_call: Mutex<Option<CancellationToken>>,
    }

    impl RecordingRemote {
        fn set_unreachable(&self, store: &Store, unreachable: bool) {
            let mut shops = self.unreachable.lock().unwrap();
            let domain = store.domain.as_str().to_string();
            if unreachable {
                shops.insert(domain);
            } else {
                shops.remove(&domain);
            }
        }

        /// Cancel `token` while the next adjustment call is in flight.
        fn cancel_during_next_call(&self, token: CancellationToken) {
            *self.cancel_on_call.lock().unwrap() = Some(token);
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn calls_to(&self, store: &Store) -> Vec<Call> {
            self.calls()
                .into_iter()
                .filter(|c| c.domain == store.domain.as_str())
                .collect()
        }
    }

    #[async_trait::async_trait]
    impl RemoteInventoryClient for RecordingRemote {
        async fn adjust_inventory(
            &self,
            credentials: &RemoteCredentials,
            batch: &AdjustmentBatch,
            reference: Option<&str>,
        ) -> Result<AdjustmentResult, RemoteError> {
            let domain = credentials.domain.as_str().to_string();
            self.calls.lock().unwrap().push(Call {
                domain: domain.clone(),
                deltas: batch
                    .adjustments()
                    .iter()
                    .map(|a| (a.sku.as_str().to_string(), a.delta))
                    .collect(),
                reference: reference.map(str::to_string),
            });

            if let Some(token) = self.cancel_on_call.lock().unwrap().take() {
                token.cancel();
            }
            if self.unreachable.lock().unwrap().contains(&domain) {
                return Err(RemoteError::Transport("connection reset".to_string()));
            }
            if domain.starts_with("slow-") {
                tokio::time::sleep(Duration::from_millis(20)).await;
                return Err(RemoteError::Timeout(Duration::from_millis(20)));
            }
            if domain.starts_with("down-") {
                return Err(RemoteError::Transport("connection refused".to_string()));
            }

            let errors: Vec<PerItemError> = batch
                .adjustments()
                .iter()
                .filter(|a| a.inventory_item_id.as_str() == "999")
                .map(|a| PerItemError {
                    sku: a.sku.clone(),
                    inventory_item_id: a.inventory_item_id.clone(),
                    field: vec!["input".to_string(), "changes".to_string()],
                    message: "inventory item does not exist".to_string(),
                })
                .collect();
            Ok(AdjustmentResult {
                applied: batch.len() - errors.len(),
                errors,
            })
        }

        async fn fetch_variants_page(&self, _: &RemoteCredentials, _: Option<&str>) -> Result<VariantPage, RemoteError> {
            Ok(VariantPage::default())
        }
    }

    struct Harness {
        company: CompanyId,
        stores: Arc<InMemoryStoreDirectory>,
        groups: Arc<InMemoryStockGroupResolver>,
        records: Arc<InMemoryInventoryRecordStore>,
        remote: Arc<RecordingRemote>,
        webhook_log: Arc<InMemoryWebhookLog>,
        engine: SyncEngine,
        capture: LogCapture,
    }

    impl Harness {
        fn new(settings: SyncSettings) -> Self {
            let stores = Arc::new(InMemoryStoreDirectory::new());
            let groups = Arc::new(InMemoryStockGroupResolver::new());
            let records = Arc::new(InMemoryInventoryRecordStore::new());
            let remote = Arc::new(RecordingRemote::default());
            let webhook_log = Arc::new(InMemoryWebhookLog::new());
            let (logger, capture) = Logger::capture();
            let engine = SyncEngine::new(
                stores.clone(),
                groups.clone(),
                records.clone(),
                remote.clone(),
                webhook_log.clone(),
                settings,
                logger,
            );
            Self {
                company: CompanyId::new(),
                stores,
                groups,
                records,
                remote,
                webhook_log,
                engine,
                capture,
            }
        }

        fn store(&self, handle: &str) -> Store {
            let store = Store {
                id: StoreId::new(),
                company_id: self.company,
                domain: ShopDomain::parse(handle).unwrap(),
                auth: StoreAuth::AccessToken {
                    token: Secret::new(format!("tok-{handle}")),
                },
                webhook_secret: Secret::new(format!("whsec-{handle}")),
                location_id: LocationId::parse("77").unwrap(),
            };
            self.stores.insert(store.clone()).unwrap();
            store
        }

        fn group(&self, members: &[&Store]) {
            let group = self.groups.create_group(self.company, "shared").unwrap();
            for m in members {
                self.groups.add_member(group.id, m.id).unwrap();
            }
        }

        async fn record(&self, store: &Store, sku: &str, item: &str) {
            self.records
                .upsert(&Sku::parse(sku).unwrap(), store.id, &RemoteInventoryItemId::parse(item).unwrap())
                .await
                .unwrap();
        }

        async fn order(&self, source: &Store, webhook_id: Option<&str>, lines: &[(&str, u32)]) -> SyncOutcome {
            self.order_with(source, webhook_id, lines, CancellationToken::new()).await
        }

        async fn order_with(
            &self,
            source: &Store,
            webhook_id: Option<&str>,
            lines: &[(&str, u32)],
            cancel: CancellationToken,
        ) -> SyncOutcome {
            let event = WebhookEvent::OrderPlaced(OrderPlaced {
                order_id: Some("1001".to_string()),
                line_items: lines
                    .iter()
                    .map(|(sku, q)| LineItem {
                        sku: Some(Sku::parse(*sku).unwrap()),
                        quantity: *q,
                    })
                    .collect(),
            });
            let envelope = WebhookEnvelope::new(
                webhook_id.map(str::to_string),
                WebhookTopic::OrderPlaced,
                source.domain.clone(),
                Utc::now(),
                event,
            );
            self.engine
                .handle(&AuthenticatedStore::trusted(source), &envelope, cancel)
                .await
                .unwrap()
        }
    }

    fn processed(outcome: SyncOutcome) -> SyncReport {
        match outcome {
            SyncOutcome::Processed(report) => report,
            other => panic!("expected a processed webhook, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn order_fans_out_to_siblings_and_skips_missing_records() {
        let h = Harness::new(SyncSettings::default());
        let s1 = h.store("s1");
        let s2 = h.store("s2");
        let s3 = h.store("s3");
        h.group(&[&s1, &s2, &s3]);
        h.record(&s2, "A", "201").await;
        h.record(&s2, "B", "202").await;
        h.record(&s3, "A", "301").await;

        let report = processed(h.order(&s1, Some("d-1"), &[("A", 2), ("B", 1)]).await);

        let to_s2 = h.remote.calls_to(&s2);
        assert_eq!(to_s2.len(), 1);
        assert_eq!(to_s2[0].deltas, vec![("A".to_string(), -2), ("B".to_string(), -1)]);
        assert_eq!(
            to_s2[0].reference.as_deref(),
            Some("stocksync://s1.myshopify.com/orders/1001")
        );

        let to_s3 = h.remote.calls_to(&s3);
        assert_eq!(to_s3.len(), 1);
        assert_eq!(to_s3[0].deltas, vec![("A".to_string(), -2)]);

        assert!(h.remote.calls_to(&s1).is_empty());

        let missing: Vec<_> = report.diagnostics_of(DiagnosticKind::RecordNotFound).collect();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].store_id, Some(s3.id));
        assert_eq!(missing[0].sku.as_ref().map(Sku::as_str), Some("B"));

        assert_eq!(report.adjustments_applied(), 3);
        assert_eq!(report.sibling(s3.id).unwrap().not_found, 1);
        assert!(h.webhook_log.get("d-1").is_some());
    }

    #[tokio::test]
    async fn store_without_group_makes_no_remote_calls() {
        let h = Harness::new(SyncSettings::default());
        let lonely = h.store("lonely");

        let report = processed(h.order(&lonely, None, &[("A", 1)]).await);

        assert!(report.resolution_miss);
        assert!(report.siblings.is_empty());
        assert!(h.remote.calls().is_empty());
    }

    #[tokio::test]
    async fn large_orders_are_split_into_bounded_batches() {
        let h = Harness::new(SyncSettings::default());
        let s1 = h.store("s1");
        let s2 = h.store("s2");
        h.group(&[&s1, &s2]);

        let skus: Vec<String> = (0..600).map(|i| format!("SKU-{i:04}")).collect();
        for (i, sku) in skus.iter().enumerate() {
            h.record(&s2, sku, &(10_000 + i).to_string()).await;
        }
        let lines: Vec<(&str, u32)> = skus.iter().map(|s| (s.as_str(), 1)).collect();

        let report = processed(h.order(&s1, None, &lines).await);

        let sizes: Vec<usize> = h.remote.calls_to(&s2).iter().map(|c| c.deltas.len()).collect();
        assert_eq!(sizes, vec![250, 250, 100]);
        assert_eq!(report.batches_sent(), 3);
        assert_eq!(report.adjustments_applied(), 600);

        let first_skus: Vec<String> = h.remote.calls_to(&s2)[0].deltas.iter().take(2).map(|d| d.0.clone()).collect();
        assert_eq!(first_skus, vec!["SKU-0000".to_string(), "SKU-0001".to_string()]);
    }

    #[tokio::test]
    async fn failing_sibling_does_not_affect_the_others() {
        let h = Harness::new(SyncSettings::new(1, 250));
        let s1 = h.store("s1");
        let slow = h.store("slow-s2");
        let down = h.store("down-s3");
        let s4 = h.store("s4");
        h.group(&[&s1, &slow, &down, &s4]);
        for sibling in [&slow, &down, &s4] {
            h.record(sibling, "A", "400").await;
        }

        let report = processed(h.order(&s1, Some("d-2"), &[("A", 1)]).await);

        assert_eq!(report.siblings.len(), 3);
        assert_eq!(report.sibling(s4.id).unwrap().applied, 1);
        assert_eq!(report.sibling(slow.id).unwrap().batches_failed, 1);
        assert_eq!(report.sibling(down.id).unwrap().failed, 1);
        assert_eq!(report.diagnostics_of(DiagnosticKind::TransportFailure).count(), 2);
        assert_eq!(h.capture.count_message("batch failed"), 2);
        assert!(!report.is_settled());
        assert!(h.webhook_log.get("d-2").is_none());
    }

    #[tokio::test]
    async fn remote_user_errors_are_reported_per_item() {
        let h = Harness::new(SyncSettings::default());
        let s1 = h.store("s1");
        let s2 = h.store("s2");
        h.group(&[&s1, &s2]);
        h.record(&s2, "A", "201").await;
        h.record(&s2, "GHOST", "999").await;

        let report = processed(h.order(&s1, None, &[("A", 1), ("GHOST", 1)]).await);

        let summary = report.sibling(s2.id).unwrap();
        assert_eq!(summary.applied, 1);
        assert_eq!(summary.rejected, 1);
        let refused: Vec<_> = report.diagnostics_of(DiagnosticKind::RemoteUserError).collect();
        assert_eq!(refused.len(), 1);
        assert_eq!(refused[0].sku.as_ref().map(Sku::as_str), Some("GHOST"));
    }

    #[tokio::test]
    async fn redelivered_webhook_is_not_reprocessed() {
        let h = Harness::new(SyncSettings::default());
        let s1 = h.store("s1");
        let s2 = h.store("s2");
        h.group(&[&s1, &s2]);
        h.record(&s2, "A", "201").await;

        processed(h.order(&s1, Some("same"), &[("A", 1)]).await);
        let second = h.order(&s1, Some("same"), &[("A", 1)]).await;

        assert_eq!(
            second,
            SyncOutcome::Duplicate {
                webhook_id: "same".to_string()
            }
        );
        assert_eq!(h.remote.calls().len(), 1);
        assert_eq!(h.capture.count_message("duplicate delivery acknowledged without reprocessing"), 1);
    }

    #[tokio::test]
    async fn redelivery_after_a_failed_sibling_only_sends_what_is_outstanding() {
        let h = Harness::new(SyncSettings::default());
        let s1 = h.store("s1");
        let s2 = h.store("s2");
        let s3 = h.store("s3");
        h.group(&[&s1, &s2, &s3]);
        for sibling in [&s2, &s3] {
            h.record(sibling, "A", "201").await;
        }
        h.record(&s3, "B", "302").await;

        h.remote.set_unreachable(&s3, true);
        let first = processed(h.order(&s1, Some("retry-me"), &[("A", 1), ("B", 2)]).await);
        assert_eq!(first.sibling(s2.id).unwrap().applied, 1);
        assert_eq!(first.sibling(s3.id).unwrap().failed, 2);
        assert!(h.webhook_log.get("retry-me").is_none());
        assert_eq!(
            h.capture
                .count_message("adjustments still outstanding; delivery left unrecorded for redelivery"),
            1
        );

        h.remote.set_unreachable(&s3, false);
        let second = processed(h.order(&s1, Some("retry-me"), &[("A", 1), ("B", 2)]).await);

        // s2 got A once; B had no record there and is not looked up again.
        assert_eq!(h.remote.calls_to(&s2).len(), 1);
        assert_eq!(second.sibling(s2.id).unwrap().already_settled, 2);
        assert_eq!(second.sibling(s2.id).unwrap().batches_sent, 0);

        let to_s3 = h.remote.calls_to(&s3);
        assert_eq!(to_s3.len(), 2);
        assert_eq!(to_s3[1].deltas, vec![("A".to_string(), -1), ("B".to_string(), -2)]);
        assert_eq!(second.sibling(s3.id).unwrap().applied, 2);
        assert!(second.is_settled());
        assert!(h.webhook_log.get("retry-me").is_some());

        let third = h.order(&s1, Some("retry-me"), &[("A", 1), ("B", 2)]).await;
        assert!(matches!(third, SyncOutcome::Duplicate { .. }));
        assert_eq!(h.remote.calls().len(), 3);
    }

    #[tokio::test]
    async fn cancelled_request_sends_nothing_and_stays_unrecorded() {
        let h = Harness::new(SyncSettings::default());
        let s1 = h.store("s1");
        let s2 = h.store("s2");
        h.group(&[&s1, &s2]);
        h.record(&s2, "A", "201").await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = processed(h.order_with(&s1, Some("d-c"), &[("A", 1)], cancel).await);

        assert!(h.remote.calls().is_empty());
        assert_eq!(report.diagnostics_of(DiagnosticKind::Cancelled).count(), 1);
        assert_eq!(report.sibling(s2.id).unwrap().cancelled, 1);
        assert!(h.webhook_log.get("d-c").is_none());
    }

    #[tokio::test]
    async fn cancellation_mid_sibling_lets_the_sent_batch_finish_and_keeps_the_rest() {
        let h = Harness::new(SyncSettings::default());
        let s1 = h.store("s1");
        let s2 = h.store("s2");
        h.group(&[&s1, &s2]);

        let skus: Vec<String> = (0..600).map(|i| format!("SKU-{i:04}")).collect();
        for (i, sku) in skus.iter().enumerate() {
            h.record(&s2, sku, &(10_000 + i).to_string()).await;
        }
        let lines: Vec<(&str, u32)> = skus.iter().map(|s| (s.as_str(), 1)).collect();

        let cancel = CancellationToken::new();
        h.remote.cancel_during_next_call(cancel.clone());
        let report = processed(h.order_with(&s1, Some("d-mid"), &lines, cancel).await);

        assert_eq!(h.remote.calls().len(), 1);
        let summary = report.sibling(s2.id).unwrap();
        assert_eq!(summary.applied, 250);
        assert_eq!(summary.batches_sent, 1);
        assert_eq!(summary.cancelled, 350);
        assert_eq!(report.diagnostics_of(DiagnosticKind::Cancelled).count(), 1);
        assert!(h.webhook_log.get("d-mid").is_none());

        // The redelivery picks up where the cancelled attempt stopped.
        let resumed = processed(h.order(&s1, Some("d-mid"), &lines).await);
        let sizes: Vec<usize> = h.remote.calls_to(&s2).iter().map(|c| c.deltas.len()).collect();
        assert_eq!(sizes, vec![250, 250, 100]);
        assert_eq!(h.remote.calls_to(&s2)[1].deltas[0].0, "SKU-0250");
        assert_eq!(resumed.sibling(s2.id).unwrap().already_settled, 250);
        assert!(h.webhook_log.get("d-mid").is_some());
    }

    #[tokio::test]
    async fn signed_product_webhook_updates_records_end_to_end() {
        let h = Harness::new(SyncSettings::default());
        let s1 = h.store("s1");
        let ingestor = WebhookIngestor::new(h.stores.clone(), Logger::disabled());

        let body = serde_json::to_vec(&json!({
            "id": 42,
            "variants": [
                { "sku": "A", "inventory_item_id": 5001 },
                { "sku": "", "inventory_item_id": 5002 },
                { "sku": "C", "inventory_item_id": "gid://shopify/InventoryItem/5003" }
            ]
        }))
        .unwrap();
        let sig = sign(b"whsec-s1", &body).unwrap();

        let ingested = ingestor
            .ingest(WebhookRequest {
                topic: WebhookTopic::ProductUpdated,
                shop_domain: Some("s1.myshopify.com"),
                signature: Some(&sig),
                webhook_id: Some("p-1"),
                body: &body,
            })
            .await
            .unwrap();
        let report = processed(
            h.engine
                .handle(&ingested.identity, &ingested.envelope, CancellationToken::new())
                .await
                .unwrap(),
        );

        assert_eq!(report.records_upserted, 2);
        assert_eq!(report.diagnostics_of(DiagnosticKind::SkippedVariant).count(), 1);
        let c = h.records.lookup(&Sku::parse("C").unwrap(), s1.id).await.unwrap();
        assert_eq!(c.map(|id| id.as_str().to_string()), Some("5003".to_string()));
        assert!(h.remote.calls().is_empty());
    }

    #[tokio::test]
    async fn malformed_product_payload_writes_nothing() {
        let h = Harness::new(SyncSettings::default());
        h.store("s1");
        let ingestor = WebhookIngestor::new(h.stores.clone(), Logger::disabled());

        let body = br#"{"id": 42}"#;
        let sig = sign(b"whsec-s1", body).unwrap();
        let result = ingestor
            .ingest(WebhookRequest {
                topic: WebhookTopic::ProductUpdated,
                shop_domain: Some("s1"),
                signature: Some(&sig),
                webhook_id: None,
                body,
            })
            .await;

        assert!(matches!(result, Err(crate::ingest::IngestError::Malformed(_))));
        assert!(h.records.is_empty());
    }

    #[tokio::test]
    async fn orders_from_one_store_are_processed_in_arrival_order() {
        let h = Harness::new(SyncSettings::default());
        let s1 = h.store("s1");
        let s2 = h.store("s2");
        h.group(&[&s1, &s2]);
        h.record(&s2, "A", "201").await;
        h.record(&s2, "B", "202").await;

        let first = h.order(&s1, None, &[("A", 1)]);
        let second = h.order(&s1, None, &[("B", 1)]);
        let (a, b) = tokio::join!(first, second);
        processed(a);
        processed(b);

        let skus: Vec<String> = h.remote.calls().iter().map(|c| c.deltas[0].0.clone()).collect();
        assert_eq!(skus, vec!["A".to_string(), "B".to_string()]);
    }
}
