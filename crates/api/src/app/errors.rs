use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stocksync_infra::{IngestError, SyncError};

pub fn ingest_error_to_response(err: IngestError) -> axum::response::Response {
    match err {
        IngestError::MissingShopDomain => json_error(StatusCode::BAD_REQUEST, "missing_shop_domain", err.to_string()),
        IngestError::InvalidShopDomain(_) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_shop_domain", err.to_string())
        }
        IngestError::UnknownStore(_) => json_error(StatusCode::NOT_FOUND, "unknown_store", err.to_string()),
        IngestError::Authentication(_) => json_error(StatusCode::UNAUTHORIZED, "unauthorized", err.to_string()),
        IngestError::Malformed(_) => json_error(StatusCode::BAD_REQUEST, "malformed_payload", err.to_string()),
        IngestError::Directory(_) => json_error(StatusCode::SERVICE_UNAVAILABLE, "unavailable", err.to_string()),
    }
}

pub fn sync_error_to_response(err: SyncError) -> axum::response::Response {
    json_error(StatusCode::SERVICE_UNAVAILABLE, "unavailable", err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
