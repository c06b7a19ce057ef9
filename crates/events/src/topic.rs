use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of notification a storefront delivered.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookTopic {
    OrderPlaced,
    ProductUpdated,
}

impl WebhookTopic {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookTopic::OrderPlaced => "orders.placed",
            WebhookTopic::ProductUpdated => "products.updated",
        }
    }
}

impl core::fmt::Display for WebhookTopic {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses both our own names and the storefront's topic header values
/// (`orders/create`, `products/update`, ...).
impl FromStr for WebhookTopic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "orders.placed" | "orders/create" | "orders/paid" => Ok(WebhookTopic::OrderPlaced),
            "products.updated" | "products/create" | "products/update" => {
                Ok(WebhookTopic::ProductUpdated)
            }
            other => Err(format!("unsupported webhook topic: {other}")),
        }
    }
}
