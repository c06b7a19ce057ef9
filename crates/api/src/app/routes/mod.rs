use axum::{Router, routing::post};

pub mod system;
pub mod webhooks;

/// Webhook endpoints; each expects a [`crate::context::DeliveryContext`] extension.
pub fn router() -> Router {
    Router::new()
        .route("/orders", post(webhooks::orders))
        .route("/products", post(webhooks::products))
}
