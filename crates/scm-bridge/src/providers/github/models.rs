//! GitHub REST API payloads, limited to the fields this service touches.

use serde::{Deserialize, Serialize};

/// Webhook delivery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    pub content_type: String,
    #[serde(default)]
    pub insecure_ssl: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

/// A registered repository webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct Webhook {
    pub id: u64,
    pub config: WebhookConfig,
}

/// Request to create a webhook.
#[derive(Debug, Serialize)]
pub struct CreateWebhookRequest {
    pub name: String,
    pub active: bool,
    pub events: Vec<String>,
    pub config: WebhookConfig,
}

/// `GET /git/ref/...` response.
#[derive(Debug, Deserialize)]
pub struct GitRef {
    pub object: GitObject,
}

#[derive(Debug, Deserialize)]
pub struct GitObject {
    pub sha: String,
}

/// Request to create a git ref.
#[derive(Debug, Serialize)]
pub struct CreateRefRequest {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub sha: String,
}

/// The slice of a contents response needed to update the file later.
#[derive(Debug, Deserialize)]
pub struct ContentFile {
    pub sha: String,
}

/// `PUT /contents/{path}` request body.
#[derive(Debug, Serialize)]
pub struct WriteFileRequest {
    pub message: String,
    pub content: String,
    pub branch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

/// Request to open a pull request.
#[derive(Debug, Serialize)]
pub struct CreatePullRequest {
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: String,
}

/// The slice of a pull request response returned to callers.
#[derive(Debug, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub html_url: String,
    pub title: String,
}
