//! GitHub REST client backed by App installation tokens.
//!
//! API Documentation: <https://docs.github.com/en/rest>

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::app_auth::AppAuth;
use super::models::{
    ContentFile, CreatePullRequest, CreateRefRequest, CreateWebhookRequest, GitRef, PullRequest,
    Webhook, WebhookConfig, WriteFileRequest,
};
use crate::config::{ChangeConfig, GithubConfig};
use crate::providers::traits::{
    Branch, ChangeRequest, FileChange, ProjectRef, ProviderError, RemoteFile, ScmProvider,
    WebhookSubscription,
};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// GitHub provider.
pub struct GitHubProvider {
    /// HTTP client.
    client: reqwest::Client,
    /// Credentials, repository coordinates and change template.
    config: GithubConfig,
    /// Installation access token, minted once per provider instance.
    token: OnceCell<String>,
}

impl GitHubProvider {
    /// Create a new GitHub provider.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: GithubConfig) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("scm-bridge/0.1"));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            config,
            token: OnceCell::new(),
        })
    }

    /// Installation token, minted on first use.
    async fn token(&self) -> Result<&str, ProviderError> {
        self.token
            .get_or_try_init(|| async {
                let auth = AppAuth {
                    app_id: &self.config.app_id,
                    private_key: &self.config.private_key,
                    installation_id: &self.config.installation_id,
                    api_url: &self.config.api_url,
                };
                let token = auth.installation_token(&self.client).await?;
                info!(app_id = %self.config.app_id, "Obtained installation access token");
                Ok(token)
            })
            .await
            .map(String::as_str)
    }

    /// Build a repository-scoped API URL.
    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}{path}",
            self.config.api_url, self.config.owner, self.config.repo
        )
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, ProviderError> {
        debug!(url = %url, "GET request");
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token().await?))
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
            .header(AUTHORIZATION, format!("Bearer {}", self.token().await?))
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
            .header(AUTHORIZATION, format!("Bearer {}", self.token().await?))
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
impl ScmProvider for GitHubProvider {
    fn name(&self) -> &'static str {
        "github"
    }

    fn change(&self) -> &ChangeConfig {
        &self.config.change
    }

    fn branch_prefix(&self) -> &'static str {
        "feature/auto-pr-"
    }

    fn webhook_path(&self) -> &'static str {
        "/api/webhook"
    }

    async fn authenticate(&self) -> Result<(), ProviderError> {
        self.token().await.map(|_| ())
    }

    async fn resolve_project(&self) -> Result<ProjectRef, ProviderError> {
        // Owner and repo name address everything directly; nothing to resolve.
        Ok(ProjectRef {
            project_id: self.config.owner.clone(),
            repo_id: self.config.repo.clone(),
        })
    }

    async fn ensure_webhook(
        &self,
        _project: &ProjectRef,
        url: &str,
    ) -> Result<Option<WebhookSubscription>, ProviderError> {
        let hooks: Vec<Webhook> = self.get(&self.repo_url("/hooks")).await?;

        if let Some(hook) = hooks.iter().find(|h| h.config.url == url) {
            info!(hook_id = hook.id, url = %url, "Webhook already exists");
            return Ok(Some(WebhookSubscription {
                id: hook.id.to_string(),
                url: hook.config.url.clone(),
            }));
        }

        if self.config.webhook_secret.is_none() {
            warn!("GITHUB_WEBHOOK_SECRET not set - webhook will be created without signature verification");
        }

        info!(url = %url, "Creating webhook");
        let request = CreateWebhookRequest {
            name: "web".to_string(),
            active: true,
            events: vec!["pull_request".to_string()],
            config: WebhookConfig {
                url: url.to_string(),
                content_type: "json".to_string(),
                insecure_ssl: "0".to_string(),
                secret: self.config.webhook_secret.clone(),
            },
        };
        let hook: Webhook = self.post(&self.repo_url("/hooks"), &request).await?;
        info!(hook_id = hook.id, "Webhook created");

        Ok(Some(WebhookSubscription {
            id: hook.id.to_string(),
            url: hook.config.url,
        }))
    }

    async fn get_branch(
        &self,
        _project: &ProjectRef,
        name: &str,
    ) -> Result<Branch, ProviderError> {
        let git_ref: GitRef = self
            .get(&self.repo_url(&format!("/git/ref/heads/{name}")))
            .await
            .map_err(|e| match e {
                ProviderError::NotFound(_) => {
                    ProviderError::NotFound(format!("base branch '{name}' not found"))
                }
                other => other,
            })?;

        Ok(Branch {
            name: name.to_string(),
            sha: git_ref.object.sha,
        })
    }

    async fn create_branch(
        &self,
        _project: &ProjectRef,
        name: &str,
        sha: &str,
    ) -> Result<(), ProviderError> {
        let request = CreateRefRequest {
            ref_name: format!("refs/heads/{name}"),
            sha: sha.to_string(),
        };
        let _: GitRef = self.post(&self.repo_url("/git/refs"), &request).await?;
        Ok(())
    }

    async fn get_file(
        &self,
        _project: &ProjectRef,
        path: &str,
        branch: &str,
    ) -> Result<Option<RemoteFile>, ProviderError> {
        let url = self.repo_url(&format!("/contents/{path}?ref={branch}"));
        match self.get::<ContentFile>(&url).await {
            Ok(file) => Ok(Some(RemoteFile {
                path: path.to_string(),
                sha: Some(file.sha),
            })),
            Err(ProviderError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn write_file(
        &self,
        _project: &ProjectRef,
        branch: &Branch,
        change: &FileChange,
        existing: Option<&RemoteFile>,
    ) -> Result<(), ProviderError> {
        let request = WriteFileRequest {
            message: change.message.clone(),
            content: BASE64.encode(&change.content),
            branch: branch.name.clone(),
            // Updating an existing file requires its current blob sha.
            sha: existing.and_then(|f| f.sha.clone()),
        };
        let _: serde_json::Value = self
            .put(&self.repo_url(&format!("/contents/{}", change.path)), &request)
            .await?;
        Ok(())
    }

    async fn open_change_request(
        &self,
        _project: &ProjectRef,
        source: &str,
        target: &str,
        title: &str,
        body: &str,
    ) -> Result<ChangeRequest, ProviderError> {
        let request = CreatePullRequest {
            title: title.to_string(),
            body: body.to_string(),
            head: source.to_string(),
            base: target.to_string(),
        };
        let pr: PullRequest = self.post(&self.repo_url("/pulls"), &request).await?;

        Ok(ChangeRequest {
            id: pr.number,
            url: pr.html_url,
            title: pr.title,
        })
    }
}
