use serde::{Deserialize, Serialize};

use stocksync_core::{RemoteInventoryItemId, Sku};

use crate::topic::WebhookTopic;

/// One order line. `sku` is `None` for custom/untracked lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub sku: Option<Sku>,
    pub quantity: u32,
}

/// An order was placed at the source store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    /// Storefront's own order id, when present (used as adjustment reference).
    pub order_id: Option<String>,
    pub line_items: Vec<LineItem>,
}

/// One product variant. Either field may be absent in the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub sku: Option<Sku>,
    pub inventory_item_id: Option<RemoteInventoryItemId>,
}

/// A product was created or updated at the source store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdated {
    pub product_id: Option<String>,
    pub variants: Vec<Variant>,
}

/// A decoded storefront notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WebhookEvent {
    OrderPlaced(OrderPlaced),
    ProductUpdated(ProductUpdated),
}

impl WebhookEvent {
    pub fn topic(&self) -> WebhookTopic {
        match self {
            WebhookEvent::OrderPlaced(_) => WebhookTopic::OrderPlaced,
            WebhookEvent::ProductUpdated(_) => WebhookTopic::ProductUpdated,
        }
    }
}
