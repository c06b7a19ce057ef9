//! Wire-format decoding of storefront webhook bodies.

use serde::Deserialize;
use thiserror::Error;

use stocksync_core::{RemoteInventoryItemId, Sku};

use crate::event::{LineItem, OrderPlaced, ProductUpdated, Variant, WebhookEvent};
use crate::topic::WebhookTopic;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed {topic} payload: {message}")]
    Malformed { topic: WebhookTopic, message: String },
}

impl DecodeError {
    fn malformed(topic: WebhookTopic, message: impl Into<String>) -> Self {
        Self::Malformed {
            topic,
            message: message.into(),
        }
    }
}

/// Storefronts send ids as JSON numbers; tolerate strings too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Number(u64),
    Text(String),
}

impl IdRepr {
    fn into_string(self) -> String {
        match self {
            IdRepr::Number(n) => n.to_string(),
            IdRepr::Text(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawOrder {
    id: Option<IdRepr>,
    line_items: Vec<RawLineItem>,
}

#[derive(Debug, Deserialize)]
struct RawLineItem {
    sku: Option<String>,
    quantity: u32,
}

#[derive(Debug, Deserialize)]
struct RawProduct {
    id: Option<IdRepr>,
    variants: Vec<RawVariant>,
}

#[derive(Debug, Deserialize)]
struct RawVariant {
    sku: Option<String>,
    inventory_item_id: Option<IdRepr>,
}

/// Decode a raw webhook body for `topic`.
///
/// The whole payload is rejected if any required field is missing or mistyped.
/// Blank SKUs and blank item ids decode to `None`; deciding what to do with
/// them is the caller's business.
pub fn decode(topic: WebhookTopic, body: &[u8]) -> Result<WebhookEvent, DecodeError> {
    match topic {
        WebhookTopic::OrderPlaced => {
            let raw: RawOrder = serde_json::from_slice(body)
                .map_err(|e| DecodeError::malformed(topic, e.to_string()))?;

            let line_items = raw
                .line_items
                .into_iter()
                .map(|li| LineItem {
                    sku: li.sku.and_then(|s| Sku::parse(s).ok()),
                    quantity: li.quantity,
                })
                .collect();

            Ok(WebhookEvent::OrderPlaced(OrderPlaced {
                order_id: raw.id.map(IdRepr::into_string),
                line_items,
            }))
        }
        WebhookTopic::ProductUpdated => {
            let raw: RawProduct = serde_json::from_slice(body)
                .map_err(|e| DecodeError::malformed(topic, e.to_string()))?;

            let variants = raw
                .variants
                .into_iter()
                .map(|v| Variant {
                    sku: v.sku.and_then(|s| Sku::parse(s).ok()),
                    inventory_item_id: v
                        .inventory_item_id
                        .and_then(|id| RemoteInventoryItemId::parse(id.into_string()).ok()),
                })
                .collect();

            Ok(WebhookEvent::ProductUpdated(ProductUpdated {
                product_id: raw.id.map(IdRepr::into_string),
                variants,
            }))
        }
    }
}
