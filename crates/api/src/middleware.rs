use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use stocksync_infra::WebhookHeaders;

use crate::context::DeliveryContext;

#[derive(Clone)]
pub struct HeaderState {
    pub names: Arc<WebhookHeaders>,
}

/// Copy the configured webhook headers into a [`DeliveryContext`] extension.
///
/// Absent headers are left for the ingestor to judge; a header that is not
/// valid visible ASCII is rejected here.
pub async fn delivery_context(
    State(state): State<HeaderState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let headers = req.headers();
    let context = DeliveryContext::new(
        header(headers, &state.names.shop_domain)?,
        header(headers, &state.names.signature)?,
        header(headers, &state.names.webhook_id)?,
    );

    req.extensions_mut().insert(context);
    Ok(next.run(req).await)
}

fn header(headers: &HeaderMap, name: &str) -> Result<Option<String>, StatusCode> {
    let Some(value) = headers.get(name) else {
        return Ok(None);
    };

    let value = value.to_str().map_err(|_| StatusCode::BAD_REQUEST)?.trim();
    if value.is_empty() {
        return Ok(None);
    }

    Ok(Some(value.to_string()))
}
