use std::sync::{Arc, Mutex};

use reqwest::StatusCode;
use serde_json::json;

use stocksync_api::app::{AppServices, Repositories, build_app};
use stocksync_auth::sign;
use stocksync_core::{CompanyId, LocationId, RemoteInventoryItemId, ShopDomain, Sku, StoreId};
use stocksync_infra::{
    AdjustmentResult, InMemoryInventoryRecordStore, InMemoryStockGroupResolver, InMemoryStoreDirectory,
    InMemoryWebhookLog, InventoryRecordStore, RemoteError, RemoteInventoryClient, SyncSettings, VariantPage,
    WebhookHeaders,
};
use stocksync_inventory::{AdjustmentBatch, RemoteCredentials, Secret, Store, StoreAuth};
use stocksync_observability::Logger;

/// Remembers `(shop domain, deltas)` for every adjustment request.
#[derive(Default)]
struct FakeRemote {
    calls: Mutex<Vec<(String, Vec<i64>)>>,
}

#[async_trait::async_trait]
impl RemoteInventoryClient for FakeRemote {
    async fn adjust_inventory(
        &self,
        credentials: &RemoteCredentials,
        batch: &AdjustmentBatch,
        _: Option<&str>,
    ) -> Result<AdjustmentResult, RemoteError> {
        self.calls.lock().unwrap().push((
            credentials.domain.as_str().to_string(),
            batch.adjustments().iter().map(|a| a.delta).collect(),
        ));
        Ok(AdjustmentResult {
            applied: batch.len(),
            errors: Vec::new(),
        })
    }

    async fn fetch_variants_page(&self, _: &RemoteCredentials, _: Option<&str>) -> Result<VariantPage, RemoteError> {
        Ok(VariantPage::default())
    }
}

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
    remote: Arc<FakeRemote>,
    records: Arc<InMemoryInventoryRecordStore>,
    s1: Store,
    s2: Store,
}

fn store(company_id: CompanyId, handle: &str) -> Store {
    Store {
        id: StoreId::new(),
        company_id,
        domain: ShopDomain::parse(handle).unwrap(),
        auth: StoreAuth::AccessToken {
            token: Secret::new(format!("tok-{handle}")),
        },
        webhook_secret: Secret::new(format!("whsec-{handle}")),
        location_id: LocationId::parse("1").unwrap(),
    }
}

impl TestServer {
    /// Two grouped stores, `s1` and `s2`; `s2` knows SKU "A" as item 201.
    async fn spawn() -> Self {
        let company = CompanyId::new();
        let s1 = store(company, "s1");
        let s2 = store(company, "s2");

        let stores = Arc::new(InMemoryStoreDirectory::new());
        stores.insert(s1.clone()).unwrap();
        stores.insert(s2.clone()).unwrap();

        let groups = Arc::new(InMemoryStockGroupResolver::new());
        let group = groups.create_group(company, "shared").unwrap();
        groups.add_member(group.id, s1.id).unwrap();
        groups.add_member(group.id, s2.id).unwrap();

        let records = Arc::new(InMemoryInventoryRecordStore::new());
        records
            .upsert(&Sku::parse("A").unwrap(), s2.id, &RemoteInventoryItemId::parse("201").unwrap())
            .await
            .unwrap();

        let remote = Arc::new(FakeRemote::default());
        let services = AppServices::new(
            Repositories {
                stores,
                groups,
                records: records.clone(),
                webhook_log: Arc::new(InMemoryWebhookLog::new()),
            },
            remote.clone(),
            SyncSettings::default(),
            WebhookHeaders::default(),
            Logger::disabled(),
        );

        // Same router as prod, bound to an ephemeral port.
        let app = build_app(services);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            handle,
            remote,
            records,
            s1,
            s2,
        }
    }

    async fn post_signed(&self, path: &str, shop: &Store, webhook_id: &str, body: &serde_json::Value) -> reqwest::Response {
        let bytes = serde_json::to_vec(body).unwrap();
        let signature = sign(shop.webhook_secret.expose().as_bytes(), &bytes).unwrap();
        reqwest::Client::new()
            .post(format!("{}{}", self.base_url, path))
            .header("x-shopify-shop-domain", shop.domain.as_str())
            .header("x-shopify-hmac-sha256", signature)
            .header("x-shopify-webhook-id", webhook_id)
            .header("content-type", "application/json")
            .body(bytes)
            .send()
            .await
            .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(format!("{}/health", srv.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn unsigned_webhook_is_unauthorized() {
    let srv = TestServer::spawn().await;

    let res = reqwest::Client::new()
        .post(format!("{}/webhooks/orders", srv.base_url))
        .header("x-shopify-shop-domain", "s1.myshopify.com")
        .body(r#"{"line_items": []}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");
    assert!(srv.remote.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_shop_and_missing_header_are_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/webhooks/orders", srv.base_url))
        .header("x-shopify-shop-domain", "stranger.myshopify.com")
        .header("x-shopify-hmac-sha256", "AAAA")
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .post(format!("{}/webhooks/orders", srv.base_url))
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn signed_order_adjusts_the_sibling_once() {
    let srv = TestServer::spawn().await;
    let order = json!({ "id": 1001, "line_items": [{ "sku": "A", "quantity": 2 }, { "sku": "Z", "quantity": 1 }] });

    let res = srv.post_signed("/webhooks/orders", &srv.s1, "delivery-1", &order).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "processed");
    assert_eq!(body["report"]["siblings"][0]["applied"], 1);
    assert_eq!(body["report"]["diagnostics"][0]["kind"], "record_not_found");

    {
        let calls = srv.remote.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], (srv.s2.domain.as_str().to_string(), vec![-2]));
    }

    // Redelivery with the same id is acknowledged but not applied again.
    let res = srv.post_signed("/webhooks/orders", &srv.s1, "delivery-1", &order).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "duplicate");
    assert_eq!(srv.remote.calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn product_webhook_updates_records_and_rejects_malformed_payloads() {
    let srv = TestServer::spawn().await;

    let product = json!({ "id": 9, "variants": [{ "sku": "B", "inventory_item_id": 555 }] });
    let res = srv.post_signed("/webhooks/products", &srv.s1, "p-1", &product).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["report"]["records_upserted"], 1);

    let b = srv.records.lookup(&Sku::parse("B").unwrap(), srv.s1.id).await.unwrap();
    assert_eq!(b.map(|id| id.as_str().to_string()), Some("555".to_string()));

    let res = srv.post_signed("/webhooks/products", &srv.s1, "p-2", &json!({ "id": 9 })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "malformed_payload");
    assert!(srv.remote.calls.lock().unwrap().is_empty());
}
