//! HTTP server: application state, router and trigger endpoints.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, Json},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::config::Config;
use crate::handlers;
use crate::providers::{AzureProvider, GitHubProvider, GitLabProvider, ProviderError};
use crate::workflow::run_change_workflow;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Configuration.
    pub config: Arc<Config>,
}

/// Build the HTTP router for the service.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Demonstration page
        .route("/", get(demo_page))
        // Workflow trigger endpoints
        .route("/api/create-pr", post(create_pr))
        .route("/api/azure-create-pr", post(azure_create_pr))
        .route("/api/gitlab-create-mr", post(gitlab_create_mr))
        // Inbound webhook endpoints
        .route("/api/webhook", post(handlers::github::github_webhook))
        .route("/api/gitlab-webhook", post(handlers::gitlab::gitlab_webhook))
        .route("/api/azure-webhook", post(handlers::azure::azure_webhook))
        // Health check
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Demonstration page driving the GitHub workflow.
const DEMO_PAGE: &str = include_str!("../static/demo.html");

async fn demo_page() -> Html<&'static str> {
    Html(DEMO_PAGE)
}

/// Health check endpoint.
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Run the GitHub change workflow.
async fn create_pr(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let Some(config) = state.config.github.clone() else {
        return not_configured("GitHub App credentials are not configured");
    };

    let provider = match GitHubProvider::new(config) {
        Ok(provider) => provider,
        Err(e) => return failure("github", &e),
    };

    match run_change_workflow(&provider, state.config.webhook_base_url.as_deref()).await {
        Ok(summary) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "pullRequest": {
                    "number": summary.id,
                    "url": summary.url,
                    "title": summary.title,
                    "branch": summary.branch,
                },
            })),
        ),
        Err(e) => failure("github", &e),
    }
}

/// Run the Azure DevOps change workflow.
async fn azure_create_pr(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let Some(config) = state.config.azure.clone() else {
        return not_configured("Azure DevOps credentials are not configured");
    };

    let provider = match AzureProvider::new(config) {
        Ok(provider) => provider,
        Err(e) => return failure("azure", &e),
    };

    match run_change_workflow(&provider, state.config.webhook_base_url.as_deref()).await {
        Ok(summary) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "pullRequest": {
                    "id": summary.id,
                    "url": summary.url,
                    "title": summary.title,
                    "branch": summary.branch,
                },
            })),
        ),
        Err(e) => failure("azure", &e),
    }
}

/// Run the GitLab change workflow.
async fn gitlab_create_mr(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let Some(config) = state.config.gitlab.clone() else {
        return not_configured("GitLab credentials are not configured");
    };

    let provider = match GitLabProvider::new(config) {
        Ok(provider) => provider,
        Err(e) => return failure("gitlab", &e),
    };

    match run_change_workflow(&provider, state.config.webhook_base_url.as_deref()).await {
        Ok(summary) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "mergeRequest": {
                    "iid": summary.id,
                    "url": summary.url,
                    "title": summary.title,
                    "branch": summary.branch,
                },
            })),
        ),
        Err(e) => failure("gitlab", &e),
    }
}

fn not_configured(message: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "error": message, "details": Value::Null })),
    )
}

/// Map a workflow failure onto the provider's status code (default 500) and
/// the raw provider error body as details.
fn failure(provider: &str, error: &ProviderError) -> (StatusCode, Json<Value>) {
    error!(provider = provider, error = %error, "Change workflow failed");

    let status = StatusCode::from_u16(error.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let details = match error {
        ProviderError::Api { message, .. } => {
            serde_json::from_str(message).unwrap_or_else(|_| Value::String(message.clone()))
        }
        ProviderError::NotFound(message) => Value::String(message.clone()),
        _ => Value::Null,
    };

    (
        status,
        Json(json!({
            "success": false,
            "error": error.to_string(),
            "details": details,
        })),
    )
}
