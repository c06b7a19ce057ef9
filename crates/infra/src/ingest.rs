//! Webhook ingestion: resolve the claimed store, verify the signature,
//! decode the body.
//!
//! Nothing is decoded before the signature checks out, so an unauthenticated
//! caller can never learn anything about payload validation.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::instrument;

use stocksync_auth::{AuthenticatedStore, SignatureError, authenticate};
use stocksync_core::ShopDomain;
use stocksync_events::{DecodeError, WebhookEnvelope, WebhookEvent, WebhookTopic, decode};
use stocksync_observability::Logger;

use crate::stores::{StoreDirectory, StoreDirectoryError};

/// A raw inbound delivery, as read off the transport.
#[derive(Debug, Clone, Copy)]
pub struct WebhookRequest<'a> {
    pub topic: WebhookTopic,
    pub shop_domain: Option<&'a str>,
    pub signature: Option<&'a str>,
    pub webhook_id: Option<&'a str>,
    pub body: &'a [u8],
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("missing shop domain header")]
    MissingShopDomain,

    #[error("invalid shop domain '{0}'")]
    InvalidShopDomain(String),

    #[error("unknown store: {0}")]
    UnknownStore(ShopDomain),

    #[error("authentication failed: {0}")]
    Authentication(#[from] SignatureError),

    #[error(transparent)]
    Malformed(#[from] DecodeError),

    #[error("store directory unavailable: {0}")]
    Directory(#[from] StoreDirectoryError),
}

/// An authenticated, decoded webhook ready for the sync engine.
#[derive(Debug, Clone)]
pub struct IngestedWebhook {
    pub identity: AuthenticatedStore,
    pub envelope: WebhookEnvelope<WebhookEvent>,
}

#[derive(Clone)]
pub struct WebhookIngestor {
    stores: Arc<dyn StoreDirectory>,
    logger: Logger,
}

impl WebhookIngestor {
    pub fn new(stores: Arc<dyn StoreDirectory>, logger: Logger) -> Self {
        Self { stores, logger }
    }

    pub async fn ingest(&self, request: WebhookRequest<'_>) -> Result<IngestedWebhook, IngestError> {
        self.logger.scope(self.ingest_inner(request)).await
    }

    #[instrument(
        name = "webhook.ingest",
        skip_all,
        fields(topic = %request.topic, shop = request.shop_domain, webhook_id = request.webhook_id, bytes = request.body.len())
    )]
    async fn ingest_inner(&self, request: WebhookRequest<'_>) -> Result<IngestedWebhook, IngestError> {
        let raw = request.shop_domain.ok_or(IngestError::MissingShopDomain)?;
        let domain = ShopDomain::parse(raw).map_err(|_| IngestError::InvalidShopDomain(raw.to_string()))?;

        let store = match self.stores.find_by_domain(&domain).await {
            Ok(Some(store)) => store,
            Ok(None) => {
                tracing::warn!(%domain, "webhook from unknown store rejected");
                return Err(IngestError::UnknownStore(domain));
            }
            Err(e) => {
                tracing::error!(error = %e, "store directory lookup failed");
                return Err(e.into());
            }
        };

        let identity = authenticate(&store, request.body, request.signature).map_err(|e| {
            tracing::warn!(store_id = %store.id, reason = %e, "webhook signature rejected");
            IngestError::from(e)
        })?;

        let event = decode(request.topic, request.body).map_err(|e| {
            tracing::warn!(store_id = %store.id, error = %e, "webhook payload rejected");
            IngestError::from(e)
        })?;

        tracing::debug!(store_id = %store.id, "webhook authenticated and decoded");
        Ok(IngestedWebhook {
            identity,
            envelope: WebhookEnvelope::new(
                request.webhook_id.map(str::to_string),
                request.topic,
                domain,
                Utc::now(),
                event,
            ),
        })
    }
}
