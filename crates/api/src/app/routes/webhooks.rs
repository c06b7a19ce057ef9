use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tokio_util::sync::CancellationToken;

use stocksync_events::WebhookTopic;
use stocksync_infra::WebhookRequest;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::DeliveryContext;

pub async fn orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(delivery): Extension<DeliveryContext>,
    body: Bytes,
) -> Response {
    receive(services, delivery, WebhookTopic::OrderPlaced, body).await
}

pub async fn products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(delivery): Extension<DeliveryContext>,
    body: Bytes,
) -> Response {
    receive(services, delivery, WebhookTopic::ProductUpdated, body).await
}

/// Authenticate and decode on the request task, then sync on a spawned one.
///
/// The spawned task outlives a dropped connection. Dropping the guard only
/// stops it from scheduling more sibling work.
async fn receive(services: Arc<AppServices>, delivery: DeliveryContext, topic: WebhookTopic, body: Bytes) -> Response {
    let ingested = match services
        .ingestor
        .ingest(WebhookRequest {
            topic,
            shop_domain: delivery.shop_domain(),
            signature: delivery.signature(),
            webhook_id: delivery.webhook_id(),
            body: &body,
        })
        .await
    {
        Ok(i) => i,
        Err(e) => return errors::ingest_error_to_response(e),
    };

    let cancel = CancellationToken::new();
    let _disconnect_guard = cancel.clone().drop_guard();

    let engine = services.engine.clone();
    let task = tokio::spawn(async move { engine.handle(&ingested.identity, &ingested.envelope, cancel).await });

    match task.await {
        Ok(Ok(outcome)) => (StatusCode::OK, Json(dto::WebhookResponse::from(outcome))).into_response(),
        Ok(Err(e)) => errors::sync_error_to_response(e),
        Err(e) => {
            tracing::error!(error = %e, "sync task failed");
            errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "sync task failed")
        }
    }
}
