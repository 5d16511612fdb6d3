//! GitHub webhook receiver.
//!
//! Verifies the HMAC-SHA256 body signature when a secret is configured, then
//! logs the salient fields of the event and acknowledges.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::Json,
};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use super::{header_str, json_str, json_u64, parse_failure, unauthorized, WebhookRejection};
use crate::server::AppState;
use crate::webhooks::verify_github_signature;

pub async fn github_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, WebhookRejection> {
    let event = header_str(&headers, "x-github-event").unwrap_or("unknown");
    let delivery = header_str(&headers, "x-github-delivery").unwrap_or("unknown");

    if let Some(secret) = &state.config.github_webhook_secret {
        let verified = header_str(&headers, "x-hub-signature-256")
            .is_some_and(|signature| verify_github_signature(secret, &body, signature));
        if !verified {
            warn!(delivery_id = %delivery, "Invalid or missing webhook signature");
            return Err(unauthorized("Invalid signature"));
        }
    } else {
        warn!("GITHUB_WEBHOOK_SECRET not set - accepting webhook without verification");
    }

    let payload: Value = serde_json::from_slice(&body).map_err(|e| {
        error!(error = %e, delivery_id = %delivery, "Failed to parse webhook payload");
        parse_failure()
    })?;

    info!(
        event_type = %event,
        delivery_id = %delivery,
        "Received GitHub webhook"
    );

    match event {
        "pull_request" => {
            info!(
                action = json_str(&payload, &["action"]).unwrap_or("unknown"),
                number = json_u64(&payload, &["pull_request", "number"]).unwrap_or(0),
                title = json_str(&payload, &["pull_request", "title"]).unwrap_or(""),
                state = json_str(&payload, &["pull_request", "state"]).unwrap_or(""),
                url = json_str(&payload, &["pull_request", "html_url"]).unwrap_or(""),
                "Pull request event"
            );
        }
        "push" => {
            info!(
                git_ref = json_str(&payload, &["ref"]).unwrap_or("unknown"),
                pusher = json_str(&payload, &["pusher", "name"]).unwrap_or("unknown"),
                "Push event"
            );
        }
        "issues" => {
            info!(
                action = json_str(&payload, &["action"]).unwrap_or("unknown"),
                number = json_u64(&payload, &["issue", "number"]).unwrap_or(0),
                title = json_str(&payload, &["issue", "title"]).unwrap_or(""),
                "Issue event"
            );
        }
        "issue_comment" => {
            info!(
                action = json_str(&payload, &["action"]).unwrap_or("unknown"),
                issue = json_u64(&payload, &["issue", "number"]).unwrap_or(0),
                "Issue comment event"
            );
        }
        other => {
            info!(event_type = %other, "Received unrecognized event");
        }
    }

    Ok(Json(json!({
        "success": true,
        "received": true,
        "event": event,
        "delivery": delivery,
    })))
}
