use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stocksync_core::ShopDomain;

use crate::topic::WebhookTopic;

/// A webhook together with its delivery metadata.
///
/// Notes:
/// - `webhook_id` is the storefront's delivery id. Redeliveries reuse it, so it
///   is the deduplication key when present.
/// - `shop_domain` is the *claimed* origin; it is only trustworthy once the
///   signature has been verified against that store's secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEnvelope<E> {
    webhook_id: Option<String>,
    topic: WebhookTopic,
    shop_domain: ShopDomain,
    received_at: DateTime<Utc>,

    payload: E,
}

impl<E> WebhookEnvelope<E> {
    pub fn new(
        webhook_id: Option<String>,
        topic: WebhookTopic,
        shop_domain: ShopDomain,
        received_at: DateTime<Utc>,
        payload: E,
    ) -> Self {
        Self {
            webhook_id: webhook_id.filter(|id| !id.trim().is_empty()),
            topic,
            shop_domain,
            received_at,
            payload,
        }
    }

    pub fn webhook_id(&self) -> Option<&str> {
        self.webhook_id.as_deref()
    }

    pub fn topic(&self) -> WebhookTopic {
        self.topic
    }

    pub fn shop_domain(&self) -> &ShopDomain {
        &self.shop_domain
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }

    /// Replace the payload, keeping delivery metadata.
    pub fn map<F, T>(self, f: F) -> WebhookEnvelope<T>
    where
        F: FnOnce(E) -> T,
    {
        WebhookEnvelope {
            webhook_id: self.webhook_id,
            topic: self.topic,
            shop_domain: self.shop_domain,
            received_at: self.received_at,
            payload: f(self.payload),
        }
    }
}
