//! Azure DevOps REST API payloads, limited to the fields this service touches.

use serde::{Deserialize, Serialize};

/// Project or repository lookup response; only the id is used.
#[derive(Debug, Deserialize)]
pub struct Resource {
    pub id: String,
}

/// Service hook subscription as returned by the subscriptions list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    #[serde(default)]
    pub consumer_inputs: Option<ConsumerInputs>,
}

/// Consumer-side settings of a service hook.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerInputs {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basic_auth_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basic_auth_password: Option<String>,
}

/// Publisher-side settings of a service hook.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublisherInputs {
    pub project_id: String,
    pub repository: String,
}

/// Request to create a service hook subscription.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    pub publisher_id: String,
    pub event_type: String,
    pub resource_version: String,
    pub consumer_id: String,
    pub consumer_action_id: String,
    pub publisher_inputs: PublisherInputs,
    pub consumer_inputs: ConsumerInputs,
}

/// Envelope most Azure list endpoints use.
#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    pub value: Vec<T>,
}

/// A git ref as returned by the refs endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureRef {
    pub name: String,
    pub object_id: String,
}

/// One entry of a ref update request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefUpdate {
    pub name: String,
    pub old_object_id: String,
    pub new_object_id: String,
}

/// Result of a ref update; Azure reports failures with a 200 response and
/// `success: false`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefUpdateResult {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub update_status: Option<String>,
}

/// `POST /pushes` request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRequest {
    pub ref_updates: Vec<PushRefUpdate>,
    pub commits: Vec<PushCommit>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRefUpdate {
    pub name: String,
    pub old_object_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushCommit {
    pub comment: String,
    pub changes: Vec<PushChange>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushChange {
    pub change_type: String,
    pub item: PushItem,
    pub new_content: PushContent,
}

#[derive(Debug, Serialize)]
pub struct PushItem {
    pub path: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushContent {
    pub content: String,
    pub content_type: String,
}

/// Request to open a pull request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePullRequest {
    pub source_ref_name: String,
    pub target_ref_name: String,
    pub title: String,
    pub description: String,
}

/// The slice of a pull request response returned to callers.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub pull_request_id: u64,
    pub title: String,
}
