//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: repositories, remote client, ingestor and engine
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: response bodies
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, Repositories, build_services};

/// Build the full HTTP router around already-wired services.
pub fn build_app(services: AppServices) -> Router {
    let header_state = middleware::HeaderState {
        names: Arc::new(services.headers.clone()),
    };

    let webhooks = routes::router()
        .layer(Extension(Arc::new(services)))
        .layer(axum::middleware::from_fn_with_state(
            header_state,
            middleware::delivery_context,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/webhooks", webhooks)
        .layer(ServiceBuilder::new())
}
