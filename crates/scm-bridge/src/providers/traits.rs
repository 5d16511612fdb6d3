//! Provider trait and common types for source-control providers.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::ChangeConfig;

/// Errors that can occur during provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Credential missing or rejected before any API call was made.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProviderError {
    /// HTTP status to surface to the caller of a trigger endpoint.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Api { status, .. } => *status,
            Self::NotFound(_) => 404,
            _ => 500,
        }
    }
}

/// Identifiers that scope all repository-level calls for one workflow run.
///
/// GitHub fills both fields from configuration (owner and repo); GitLab
/// resolves a numeric project id and repeats it; Azure resolves a project id
/// and a repository id.
#[derive(Debug, Clone)]
pub struct ProjectRef {
    /// Provider-side project identifier.
    pub project_id: String,
    /// Provider-side repository identifier.
    pub repo_id: String,
}

/// A branch and the commit its head points at.
#[derive(Debug, Clone)]
pub struct Branch {
    /// Branch name, without the `refs/heads/` prefix.
    pub name: String,
    /// Head commit identifier (SHA / objectId).
    pub sha: String,
}

/// A file that already exists on a branch, with whatever update token the
/// provider requires to overwrite it.
#[derive(Debug, Clone)]
pub struct RemoteFile {
    /// Repository path.
    pub path: String,
    /// Content identifier required for updates (GitHub blob sha). Providers
    /// that key updates on something else leave this empty.
    pub sha: Option<String>,
}

/// The file write a workflow run performs.
#[derive(Debug, Clone)]
pub struct FileChange {
    /// Repository path of the file.
    pub path: String,
    /// New file content.
    pub content: String,
    /// Commit message.
    pub message: String,
}

/// An opened pull/merge request.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeRequest {
    /// Provider-visible number (`number` / `iid` / `pullRequestId`).
    pub id: u64,
    /// Canonical web URL.
    pub url: String,
    /// Title as stored by the provider.
    pub title: String,
}

/// A webhook subscription registered with a provider.
#[derive(Debug, Clone)]
pub struct WebhookSubscription {
    /// Provider-side hook identifier.
    pub id: String,
    /// Callback URL the provider will deliver to.
    pub url: String,
}

/// Capability set every provider exposes to the change workflow.
///
/// One implementation per provider; the workflow itself is provider-agnostic.
#[async_trait]
pub trait ScmProvider: Send + Sync {
    /// Short provider label used in logs and error envelopes.
    fn name(&self) -> &'static str;

    /// Change template this provider applies on each run.
    fn change(&self) -> &ChangeConfig;

    /// Prefix for generated branch names; the run-unique suffix is appended.
    fn branch_prefix(&self) -> &'static str;

    /// Path on this service the provider's webhooks should deliver to.
    fn webhook_path(&self) -> &'static str;

    /// Resolve the credential used by subsequent calls. GitHub mints a
    /// short-lived installation access token here; PAT providers only check
    /// that a credential is present.
    async fn authenticate(&self) -> Result<(), ProviderError>;

    /// Resolve project/repository identifiers.
    async fn resolve_project(&self) -> Result<ProjectRef, ProviderError>;

    /// Return the webhook subscription registered for `url`, creating it if
    /// absent. Equality is exact string match on the stored URL. Returns
    /// `None` when the provider tolerates a permission shortfall instead of
    /// failing the run (GitLab 403).
    async fn ensure_webhook(
        &self,
        project: &ProjectRef,
        url: &str,
    ) -> Result<Option<WebhookSubscription>, ProviderError>;

    /// Fetch a branch and its head commit. `NotFound` if the branch is absent.
    async fn get_branch(&self, project: &ProjectRef, name: &str)
        -> Result<Branch, ProviderError>;

    /// Create a branch pointing at exactly `sha`.
    async fn create_branch(
        &self,
        project: &ProjectRef,
        name: &str,
        sha: &str,
    ) -> Result<(), ProviderError>;

    /// Look up a file on a branch. Absence is a valid outcome, not an error.
    async fn get_file(
        &self,
        project: &ProjectRef,
        path: &str,
        branch: &str,
    ) -> Result<Option<RemoteFile>, ProviderError>;

    /// Write the file on `branch`, using update semantics iff `existing` is
    /// set (and carrying its update token where the provider requires one).
    async fn write_file(
        &self,
        project: &ProjectRef,
        branch: &Branch,
        change: &FileChange,
        existing: Option<&RemoteFile>,
    ) -> Result<(), ProviderError>;

    /// Open a pull/merge request from `source` into `target`.
    async fn open_change_request(
        &self,
        project: &ProjectRef,
        source: &str,
        target: &str,
        title: &str,
        body: &str,
    ) -> Result<ChangeRequest, ProviderError>;
}
