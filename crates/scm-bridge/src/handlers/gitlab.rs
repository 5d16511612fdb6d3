//! GitLab webhook receiver.
//!
//! Checks the static `x-gitlab-token` header when a token is configured, then
//! logs the salient fields of the event and acknowledges. GitLab has no body
//! signature; the token is the only authenticity signal.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::Json,
};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use super::{header_str, json_str, json_u64, parse_failure, short_sha, unauthorized, WebhookRejection};
use crate::server::AppState;
use crate::webhooks::verify_gitlab_token;

pub async fn gitlab_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, WebhookRejection> {
    let event = header_str(&headers, "x-gitlab-event").unwrap_or("unknown");

    if let Some(expected) = &state.config.gitlab_webhook_token {
        let verified = header_str(&headers, "x-gitlab-token")
            .is_some_and(|token| verify_gitlab_token(expected, token));
        if !verified {
            warn!(event_type = %event, "Invalid or missing webhook token");
            return Err(unauthorized("Invalid token"));
        }
    } else {
        warn!("GITLAB_WEBHOOK_TOKEN not set - accepting webhook without verification");
    }

    let payload: Value = serde_json::from_slice(&body).map_err(|e| {
        error!(error = %e, "Failed to parse webhook payload");
        parse_failure()
    })?;

    info!(event_type = %event, "Received GitLab webhook");

    match event {
        "Merge Request Hook" => {
            info!(
                action = json_str(&payload, &["object_attributes", "action"]).unwrap_or("unknown"),
                iid = json_u64(&payload, &["object_attributes", "iid"]).unwrap_or(0),
                title = json_str(&payload, &["object_attributes", "title"]).unwrap_or(""),
                author = json_str(&payload, &["user", "name"]).unwrap_or("unknown"),
                source = json_str(&payload, &["object_attributes", "source_branch"]).unwrap_or(""),
                target = json_str(&payload, &["object_attributes", "target_branch"]).unwrap_or(""),
                state = json_str(&payload, &["object_attributes", "state"]).unwrap_or(""),
                merge_status = json_str(&payload, &["object_attributes", "merge_status"]).unwrap_or(""),
                "Merge request event"
            );
        }
        "Push Hook" => {
            info!(
                git_ref = json_str(&payload, &["ref"]).unwrap_or("unknown"),
                pusher = json_str(&payload, &["user_name"]).unwrap_or("unknown"),
                commits = json_u64(&payload, &["total_commits_count"]).unwrap_or(0),
                "Push event"
            );
            if let Some(commits) = payload.get("commits").and_then(Value::as_array) {
                for commit in commits {
                    info!(
                        sha = short_sha(json_str(commit, &["id"]).unwrap_or("")),
                        message = json_str(commit, &["message"]).unwrap_or(""),
                        "Commit"
                    );
                }
            }
        }
        "Issue Hook" => {
            info!(
                action = json_str(&payload, &["object_attributes", "action"]).unwrap_or("unknown"),
                iid = json_u64(&payload, &["object_attributes", "iid"]).unwrap_or(0),
                title = json_str(&payload, &["object_attributes", "title"]).unwrap_or(""),
                state = json_str(&payload, &["object_attributes", "state"]).unwrap_or(""),
                "Issue event"
            );
        }
        "Note Hook" => {
            let noteable = json_str(&payload, &["object_attributes", "noteable_type"])
                .unwrap_or("unknown");
            if noteable == "MergeRequest" {
                info!(
                    noteable_type = %noteable,
                    mr_iid = json_u64(&payload, &["merge_request", "iid"]).unwrap_or(0),
                    "Comment event"
                );
            } else {
                info!(noteable_type = %noteable, "Comment event");
            }
        }
        "Pipeline Hook" => {
            info!(
                status = json_str(&payload, &["object_attributes", "status"]).unwrap_or("unknown"),
                id = json_u64(&payload, &["object_attributes", "id"]).unwrap_or(0),
                git_ref = json_str(&payload, &["object_attributes", "ref"]).unwrap_or(""),
                "Pipeline event"
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
    })))
}
