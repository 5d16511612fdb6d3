//! GitLab REST client authenticated with a personal access token.
//!
//! API Documentation: <https://docs.gitlab.com/ee/api/>

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use super::models::{
    CreateBranchRequest, CreateHookRequest, CreateMergeRequest, GitLabBranch, Hook, MergeRequest,
    Project, WriteFileRequest,
};
use crate::config::{ChangeConfig, GitlabConfig};
use crate::providers::traits::{
    Branch, ChangeRequest, FileChange, ProjectRef, ProviderError, RemoteFile, ScmProvider,
    WebhookSubscription,
};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Header carrying the personal access token.
const TOKEN_HEADER: &str = "PRIVATE-TOKEN";

/// GitLab provider.
pub struct GitLabProvider {
    /// HTTP client.
    client: reqwest::Client,
    /// Credentials, project coordinates and change template.
    config: GitlabConfig,
}

/// Percent-encode a path segment the way the API expects project paths,
/// branch names and file paths (`group/project` -> `group%2Fproject`).
fn encode_segment(segment: &str) -> String {
    segment.replace('/', "%2F")
}

impl GitLabProvider {
    /// Create a new GitLab provider.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: GitlabConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self { client, config })
    }

    /// Build an API v4 URL.
    fn api_url(&self, path: &str) -> String {
        format!("{}/api/v4{path}", self.config.url)
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, ProviderError> {
        debug!(url = %url, "GET request");
        let response = self
            .client
            .get(url)
            .header(TOKEN_HEADER, &self.config.token)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn post<T, B>(&self, url: &str, body: &B) -> Result<T, ProviderError>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize,
    {
        debug!(url = %url, "POST request");
        let response = self
            .client
            .post(url)
            .header(TOKEN_HEADER, &self.config.token)
            .json(body)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn put<T, B>(&self, url: &str, body: &B) -> Result<T, ProviderError>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize,
    {
        debug!(url = %url, "PUT request");
        let response = self
            .client
            .put(url)
            .header(TOKEN_HEADER, &self.config.token)
            .json(body)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Handle API response, parsing JSON or error.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str(&text).map_err(|e| {
                warn!(error = %e, body = %text, "Failed to parse response");
                ProviderError::Serialization(e)
            })
        } else if status == StatusCode::NOT_FOUND {
            Err(ProviderError::NotFound(text))
        } else {
            Err(ProviderError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }
}

#[async_trait]
impl ScmProvider for GitLabProvider {
    fn name(&self) -> &'static str {
        "gitlab"
    }

    fn change(&self) -> &ChangeConfig {
        &self.config.change
    }

    fn branch_prefix(&self) -> &'static str {
        "feature/auto-mr-"
    }

    fn webhook_path(&self) -> &'static str {
        "/api/gitlab-webhook"
    }

    async fn authenticate(&self) -> Result<(), ProviderError> {
        // The PAT is static; its presence was checked at configuration time.
        Ok(())
    }

    async fn resolve_project(&self) -> Result<ProjectRef, ProviderError> {
        let project: Project = self
            .get(&self.api_url(&format!(
                "/projects/{}",
                encode_segment(&self.config.project_path)
            )))
            .await?;

        info!(project_id = project.id, path = %self.config.project_path, "Resolved project");
        Ok(ProjectRef {
            project_id: project.id.to_string(),
            repo_id: project.id.to_string(),
        })
    }

    async fn ensure_webhook(
        &self,
        project: &ProjectRef,
        url: &str,
    ) -> Result<Option<WebhookSubscription>, ProviderError> {
        let hooks_url = self.api_url(&format!("/projects/{}/hooks", project.project_id));

        let result: Result<Vec<Hook>, ProviderError> = self.get(&hooks_url).await;
        let hooks = match result {
            Ok(hooks) => hooks,
            Err(ProviderError::Api { status: 403, .. }) => {
                // PAT lacks webhook permissions; the run proceeds without one.
                warn!(
                    "Unable to manage webhooks: the GitLab PAT needs 'api' scope with \
                     Maintainer/Owner permissions. Continuing without webhook setup"
                );
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if let Some(hook) = hooks.iter().find(|h| h.url == url) {
            info!(hook_id = hook.id, url = %url, "Webhook already exists");
            return Ok(Some(WebhookSubscription {
                id: hook.id.to_string(),
                url: hook.url.clone(),
            }));
        }

        info!(url = %url, "Creating webhook");
        match self
            .post::<Hook, _>(&hooks_url, &CreateHookRequest::merge_requests_only(url))
            .await
        {
            Ok(hook) => {
                info!(hook_id = hook.id, "Webhook created");
                Ok(Some(WebhookSubscription {
                    id: hook.id.to_string(),
                    url: hook.url,
                }))
            }
            Err(ProviderError::Api { status: 403, .. }) => {
                warn!(
                    "Unable to manage webhooks: the GitLab PAT needs 'api' scope with \
                     Maintainer/Owner permissions. Continuing without webhook setup"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn get_branch(
        &self,
        project: &ProjectRef,
        name: &str,
    ) -> Result<Branch, ProviderError> {
        let branch: GitLabBranch = self
            .get(&self.api_url(&format!(
                "/projects/{}/repository/branches/{}",
                project.project_id,
                encode_segment(name)
            )))
            .await
            .map_err(|e| match e {
                ProviderError::NotFound(_) => {
                    ProviderError::NotFound(format!("base branch '{name}' not found"))
                }
                other => other,
            })?;

        Ok(Branch {
            name: branch.name,
            sha: branch.commit.id,
        })
    }

    async fn create_branch(
        &self,
        project: &ProjectRef,
        name: &str,
        sha: &str,
    ) -> Result<(), ProviderError> {
        let request = CreateBranchRequest {
            branch: name.to_string(),
            ref_name: sha.to_string(),
        };
        let _: GitLabBranch = self
            .post(
                &self.api_url(&format!(
                    "/projects/{}/repository/branches",
                    project.project_id
                )),
                &request,
            )
            .await?;
        Ok(())
    }

    async fn get_file(
        &self,
        project: &ProjectRef,
        path: &str,
        branch: &str,
    ) -> Result<Option<RemoteFile>, ProviderError> {
        let url = self.api_url(&format!(
            "/projects/{}/repository/files/{}?ref={}",
            project.project_id,
            encode_segment(path),
            encode_segment(branch)
        ));
        match self.get::<serde_json::Value>(&url).await {
            Ok(_) => Ok(Some(RemoteFile {
                path: path.to_string(),
                // Updates are keyed on branch + path; no content token needed.
                sha: None,
            })),
            Err(ProviderError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn write_file(
        &self,
        project: &ProjectRef,
        branch: &Branch,
        change: &FileChange,
        existing: Option<&RemoteFile>,
    ) -> Result<(), ProviderError> {
        let url = self.api_url(&format!(
            "/projects/{}/repository/files/{}",
            project.project_id,
            encode_segment(&change.path)
        ));
        let request = WriteFileRequest {
            branch: branch.name.clone(),
            content: change.content.clone(),
            commit_message: change.message.clone(),
        };

        // POST creates, PUT updates.
        let _: serde_json::Value = if existing.is_some() {
            self.put(&url, &request).await?
        } else {
            self.post(&url, &request).await?
        };
        Ok(())
    }

    async fn open_change_request(
        &self,
        project: &ProjectRef,
        source: &str,
        target: &str,
        title: &str,
        body: &str,
    ) -> Result<ChangeRequest, ProviderError> {
        let request = CreateMergeRequest {
            source_branch: source.to_string(),
            target_branch: target.to_string(),
            title: title.to_string(),
            description: body.to_string(),
        };
        let mr: MergeRequest = self
            .post(
                &self.api_url(&format!("/projects/{}/merge_requests", project.project_id)),
                &request,
            )
            .await?;

        Ok(ChangeRequest {
            id: mr.iid,
            url: mr.web_url,
            title: mr.title,
        })
    }
}
