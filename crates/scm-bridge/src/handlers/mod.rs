//! Inbound webhook receivers, one per provider.

pub mod azure;
pub mod github;
pub mod gitlab;

use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use serde_json::{json, Value};

/// Error response produced by the receivers.
pub(crate) type WebhookRejection = (StatusCode, Json<Value>);

pub(crate) fn unauthorized(message: &str) -> WebhookRejection {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "success": false, "error": message })),
    )
}

pub(crate) fn parse_failure() -> WebhookRejection {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "error": "Failed to process webhook" })),
    )
}

/// Read a header as UTF-8, if present.
pub(crate) fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Walk a JSON path and return the string at the end, if any.
pub(crate) fn json_str<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(value, |v, key| v.get(key))
        .and_then(Value::as_str)
}

/// Walk a JSON path and return the number at the end, if any.
pub(crate) fn json_u64(value: &Value, path: &[&str]) -> Option<u64> {
    path.iter()
        .try_fold(value, |v, key| v.get(key))
        .and_then(Value::as_u64)
}

/// Short commit id for log lines.
pub(crate) fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}
