//! Azure DevOps webhook receiver.
//!
//! Checks HTTP Basic credentials when a password is configured, then logs the
//! salient fields of the event and acknowledges. The event discriminator is
//! carried inside the payload (`eventType`), not in a header.

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
use crate::webhooks::verify_basic_auth;

pub async fn azure_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, WebhookRejection> {
    if let Some(password) = &state.config.azure_webhook_password {
        let verified = header_str(&headers, "authorization").is_some_and(|header| {
            verify_basic_auth(&state.config.azure_webhook_username, password, header)
        });
        if !verified {
            warn!("Invalid or missing Basic credentials");
            return Err(unauthorized("Unauthorized"));
        }
    } else {
        warn!("Azure webhook auth not configured - accepting webhook without verification");
    }

    let payload: Value = serde_json::from_slice(&body).map_err(|e| {
        error!(error = %e, "Failed to parse webhook payload");
        parse_failure()
    })?;

    let event_type = json_str(&payload, &["eventType"]).unwrap_or("unknown").to_string();
    let resource_type = json_str(&payload, &["resource", "repository", "name"])
        .unwrap_or("unknown")
        .to_string();

    info!(
        event_type = %event_type,
        repository = %resource_type,
        "Received Azure DevOps webhook"
    );

    match event_type.as_str() {
        "git.pullrequest.created" => {
            info!(
                id = json_u64(&payload, &["resource", "pullRequestId"]).unwrap_or(0),
                title = json_str(&payload, &["resource", "title"]).unwrap_or(""),
                author = json_str(&payload, &["resource", "createdBy", "displayName"]).unwrap_or("unknown"),
                source = json_str(&payload, &["resource", "sourceRefName"]).unwrap_or(""),
                target = json_str(&payload, &["resource", "targetRefName"]).unwrap_or(""),
                "Pull request created"
            );
        }
        "git.pullrequest.updated" => {
            info!(
                id = json_u64(&payload, &["resource", "pullRequestId"]).unwrap_or(0),
                title = json_str(&payload, &["resource", "title"]).unwrap_or(""),
                status = json_str(&payload, &["resource", "status"]).unwrap_or(""),
                "Pull request updated"
            );
        }
        "git.pullrequest.merged" => {
            info!(
                id = json_u64(&payload, &["resource", "pullRequestId"]).unwrap_or(0),
                title = json_str(&payload, &["resource", "title"]).unwrap_or(""),
                merged_by = json_str(&payload, &["resource", "closedBy", "displayName"]).unwrap_or("unknown"),
                "Pull request merged"
            );
        }
        "git.push" => {
            let commits = payload
                .pointer("/resource/commits")
                .and_then(Value::as_array);
            info!(
                git_ref = payload
                    .pointer("/resource/refUpdates/0/name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown"),
                pusher = json_str(&payload, &["resource", "pushedBy", "displayName"]).unwrap_or("unknown"),
                commits = commits.map_or(0, Vec::len),
                "Push event"
            );
            if let Some(commits) = commits {
                for commit in commits {
                    info!(
                        sha = short_sha(json_str(commit, &["commitId"]).unwrap_or("")),
                        message = json_str(commit, &["comment"]).unwrap_or(""),
                        "Commit"
                    );
                }
            }
        }
        "workitem.created" => {
            info!(
                id = json_u64(&payload, &["resource", "id"]).unwrap_or(0),
                title = json_str(&payload, &["resource", "fields", "System.Title"]).unwrap_or(""),
                "Work item created"
            );
        }
        "workitem.updated" => {
            info!(
                id = json_u64(&payload, &["resource", "id"]).unwrap_or(0),
                title = json_str(&payload, &["resource", "fields", "System.Title"]).unwrap_or(""),
                "Work item updated"
            );
        }
        other => {
            info!(event_type = %other, "Received unrecognized event");
        }
    }

    Ok(Json(json!({
        "success": true,
        "received": true,
        "eventType": event_type,
        "resourceType": resource_type,
    })))
}
