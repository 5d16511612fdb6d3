//! Azure DevOps REST client authenticated with a personal access token.
//!
//! API Documentation: <https://learn.microsoft.com/en-us/rest/api/azure/devops/>
//!
//! PATs ride HTTP Basic auth with an empty username. Service hook
//! subscriptions live at the organization level, not under the project.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use super::models::{
    AzureRef, ConsumerInputs, CreatePullRequest, CreateSubscriptionRequest, ListResponse,
    PublisherInputs, PullRequest, PushChange, PushCommit, PushContent, PushItem, PushRefUpdate,
    PushRequest, RefUpdate, RefUpdateResult, Resource, Subscription,
};
use crate::config::{AzureConfig, ChangeConfig};
use crate::providers::traits::{
    Branch, ChangeRequest, FileChange, ProjectRef, ProviderError, RemoteFile, ScmProvider,
    WebhookSubscription,
};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// REST API version appended to every call.
const API_VERSION: &str = "7.1";

/// Placeholder object id for "this ref does not exist yet".
const ZERO_OBJECT_ID: &str = "0000000000000000000000000000000000000000";

/// Event the created service hook subscribes to.
const WEBHOOK_EVENT_TYPE: &str = "git.pullrequest.updated";

/// Azure DevOps provider.
pub struct AzureProvider {
    /// HTTP client.
    client: reqwest::Client,
    /// Credentials, project coordinates and change template.
    config: AzureConfig,
}

impl AzureProvider {
    /// Create a new Azure DevOps provider.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: AzureConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self { client, config })
    }

    /// Build an organization-scoped API URL.
    fn org_url(&self, path: &str) -> String {
        format!(
            "{}{path}?api-version={API_VERSION}",
            self.config.org_url
        )
    }

    /// Build a repository-scoped API URL.
    fn repo_url(&self, repo_id: &str, path: &str) -> String {
        format!(
            "{}/{}/_apis/git/repositories/{repo_id}{path}?api-version={API_VERSION}",
            self.config.org_url, self.config.project
        )
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, ProviderError> {
        debug!(url = %url, "GET request");
        let response = self
            .client
            .get(url)
            .basic_auth("", Some(&self.config.token))
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
            .basic_auth("", Some(&self.config.token))
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
impl ScmProvider for AzureProvider {
    fn name(&self) -> &'static str {
        "azure"
    }

    fn change(&self) -> &ChangeConfig {
        &self.config.change
    }

    fn branch_prefix(&self) -> &'static str {
        "feature/auto-pr-"
    }

    fn webhook_path(&self) -> &'static str {
        "/api/azure-webhook"
    }

    async fn authenticate(&self) -> Result<(), ProviderError> {
        // The PAT is static; its presence was checked at configuration time.
        Ok(())
    }

    async fn resolve_project(&self) -> Result<ProjectRef, ProviderError> {
        let project: Resource = self
            .get(&self.org_url(&format!("/_apis/projects/{}", self.config.project)))
            .await?;

        let repo: Resource = self
            .get(&format!(
                "{}/{}/_apis/git/repositories/{}?api-version={API_VERSION}",
                self.config.org_url, self.config.project, self.config.repo
            ))
            .await?;

        info!(project_id = %project.id, repo_id = %repo.id, "Resolved project and repository");
        Ok(ProjectRef {
            project_id: project.id,
            repo_id: repo.id,
        })
    }

    async fn ensure_webhook(
        &self,
        project: &ProjectRef,
        url: &str,
    ) -> Result<Option<WebhookSubscription>, ProviderError> {
        let subscriptions: ListResponse<Subscription> = self
            .get(&self.org_url("/_apis/hooks/subscriptions"))
            .await?;

        let existing = subscriptions.value.iter().find(|s| {
            s.consumer_inputs
                .as_ref()
                .and_then(|c| c.url.as_deref())
                .is_some_and(|u| u == url)
        });

        if let Some(subscription) = existing {
            info!(subscription_id = %subscription.id, url = %url, "Webhook already exists");
            return Ok(Some(WebhookSubscription {
                id: subscription.id.clone(),
                url: url.to_string(),
            }));
        }

        info!(url = %url, event_type = WEBHOOK_EVENT_TYPE, "Creating webhook");
        let request = CreateSubscriptionRequest {
            publisher_id: "tfs".to_string(),
            event_type: WEBHOOK_EVENT_TYPE.to_string(),
            resource_version: "1.0".to_string(),
            consumer_id: "webHooks".to_string(),
            consumer_action_id: "httpRequest".to_string(),
            publisher_inputs: PublisherInputs {
                project_id: project.project_id.clone(),
                repository: project.repo_id.clone(),
            },
            consumer_inputs: ConsumerInputs {
                url: Some(url.to_string()),
                // Basic credentials ride along only when a password is configured.
                basic_auth_username: self
                    .config
                    .webhook_password
                    .as_ref()
                    .map(|_| self.config.webhook_username.clone()),
                basic_auth_password: self.config.webhook_password.clone(),
            },
        };
        let subscription: Subscription = self
            .post(&self.org_url("/_apis/hooks/subscriptions"), &request)
            .await?;
        info!(subscription_id = %subscription.id, "Webhook created");

        Ok(Some(WebhookSubscription {
            id: subscription.id,
            url: url.to_string(),
        }))
    }

    async fn get_branch(
        &self,
        project: &ProjectRef,
        name: &str,
    ) -> Result<Branch, ProviderError> {
        let url = format!(
            "{}/{}/_apis/git/repositories/{}/refs?filter=heads/{name}&api-version={API_VERSION}",
            self.config.org_url, self.config.project, project.repo_id
        );
        let refs: ListResponse<AzureRef> = self.get(&url).await?;

        let git_ref = refs
            .value
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::NotFound(format!("base branch '{name}' not found")))?;

        Ok(Branch {
            name: name.to_string(),
            sha: git_ref.object_id,
        })
    }

    async fn create_branch(
        &self,
        project: &ProjectRef,
        name: &str,
        sha: &str,
    ) -> Result<(), ProviderError> {
        let request = vec![RefUpdate {
            name: format!("refs/heads/{name}"),
            old_object_id: ZERO_OBJECT_ID.to_string(),
            new_object_id: sha.to_string(),
        }];
        let result: ListResponse<RefUpdateResult> = self
            .post(&self.repo_url(&project.repo_id, "/refs"), &request)
            .await?;

        // Ref updates report failure inside a 200 response.
        if let Some(update) = result.value.first() {
            if update.success == Some(false) {
                return Err(ProviderError::Api {
                    status: 500,
                    message: format!(
                        "ref update for '{name}' was rejected: {}",
                        update.update_status.as_deref().unwrap_or("unknown")
                    ),
                });
            }
        }
        Ok(())
    }

    async fn get_file(
        &self,
        project: &ProjectRef,
        path: &str,
        branch: &str,
    ) -> Result<Option<RemoteFile>, ProviderError> {
        let item_path = format!("/{}", path.trim_start_matches('/'));
        let url = format!(
            "{}/{}/_apis/git/repositories/{}/items?path={item_path}&versionDescriptor.version={branch}&api-version={API_VERSION}",
            self.config.org_url, self.config.project, project.repo_id
        );
        debug!(url = %url, "GET request");

        // The items endpoint answers with raw file content; only the status
        // matters here.
        let response = self
            .client
            .get(&url)
            .basic_auth("", Some(&self.config.token))
            .send()
            .await?;
        let status = response.status();

        if status.is_success() {
            Ok(Some(RemoteFile {
                path: path.to_string(),
                sha: None,
            }))
        } else if status == StatusCode::NOT_FOUND {
            Ok(None)
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(ProviderError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }

    async fn write_file(
        &self,
        project: &ProjectRef,
        branch: &Branch,
        change: &FileChange,
        existing: Option<&RemoteFile>,
    ) -> Result<(), ProviderError> {
        let change_type = if existing.is_some() { "edit" } else { "add" };
        let request = PushRequest {
            ref_updates: vec![PushRefUpdate {
                name: format!("refs/heads/{}", branch.name),
                // The branch was just cut from this commit; it is still the head.
                old_object_id: branch.sha.clone(),
            }],
            commits: vec![PushCommit {
                comment: change.message.clone(),
                changes: vec![PushChange {
                    change_type: change_type.to_string(),
                    item: PushItem {
                        path: format!("/{}", change.path.trim_start_matches('/')),
                    },
                    new_content: PushContent {
                        content: change.content.clone(),
                        content_type: "rawtext".to_string(),
                    },
                }],
            }],
        };
        let _: serde_json::Value = self
            .post(&self.repo_url(&project.repo_id, "/pushes"), &request)
            .await?;
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
        let request = CreatePullRequest {
            source_ref_name: format!("refs/heads/{source}"),
            target_ref_name: format!("refs/heads/{target}"),
            title: title.to_string(),
            description: body.to_string(),
        };
        let pr: PullRequest = self
            .post(&self.repo_url(&project.repo_id, "/pullrequests"), &request)
            .await?;

        // The API response carries no browse URL; it follows a fixed shape.
        let url = format!(
            "{}/{}/_git/{}/pullrequest/{}",
            self.config.org_url, self.config.project, self.config.repo, pr.pull_request_id
        );

        Ok(ChangeRequest {
            id: pr.pull_request_id,
            url,
            title: pr.title,
        })
    }
}
