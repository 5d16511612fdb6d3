//! The change-request workflow.
//!
//! One provider-agnostic sequence: authenticate, resolve identifiers, ensure
//! the webhook, branch from the base ref, write the file, open the pull/merge
//! request. Steps run strictly in order; the first failure aborts the run.
//! There is no retry and no partial-failure cleanup, so branches from failed
//! runs remain on the remote.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::providers::{FileChange, ProviderError, ScmProvider};

/// Normalized result of a successful workflow run.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeSummary {
    /// Provider-visible PR/MR number.
    pub id: u64,
    /// Canonical web URL.
    pub url: String,
    /// Title as stored by the provider.
    pub title: String,
    /// Name of the branch the run created.
    pub branch: String,
}

/// Run the full change workflow against one provider.
///
/// `webhook_base_url` is the public host of this service (no scheme). When
/// absent, webhook registration is skipped with a warning rather than
/// registering an unreachable URL.
pub async fn run_change_workflow(
    provider: &dyn ScmProvider,
    webhook_base_url: Option<&str>,
) -> Result<ChangeSummary, ProviderError> {
    let change = provider.change().clone();

    provider.authenticate().await?;

    let project = provider.resolve_project().await?;

    match webhook_base_url {
        Some(base) => {
            let callback_url = format!("https://{base}{}", provider.webhook_path());
            match provider.ensure_webhook(&project, &callback_url).await? {
                Some(subscription) => {
                    info!(
                        provider = provider.name(),
                        hook_id = %subscription.id,
                        url = %subscription.url,
                        "Webhook in place"
                    );
                }
                None => {
                    warn!(provider = provider.name(), "Proceeding without a webhook");
                }
            }
        }
        None => {
            warn!(
                provider = provider.name(),
                "WEBHOOK_BASE_URL not set - skipping webhook registration"
            );
        }
    }

    let base = provider.get_branch(&project, &change.base_branch).await?;
    info!(
        provider = provider.name(),
        base_branch = %base.name,
        sha = %base.sha,
        "Resolved base branch"
    );

    // Run-unique branch name; collisions would need two runs in the same
    // millisecond against the same repository.
    let branch_name = format!("{}{}", provider.branch_prefix(), Utc::now().timestamp_millis());
    provider.create_branch(&project, &branch_name, &base.sha).await?;
    info!(provider = provider.name(), branch = %branch_name, "Created branch");

    // Absence means create semantics; presence supplies the update token.
    let existing = provider
        .get_file(&project, &change.file_path, &branch_name)
        .await?;

    let file_change = FileChange {
        path: change.file_path.clone(),
        content: change.file_content.clone(),
        message: change.commit_message.clone(),
    };
    let new_branch = crate::providers::Branch {
        name: branch_name.clone(),
        sha: base.sha.clone(),
    };
    provider
        .write_file(&project, &new_branch, &file_change, existing.as_ref())
        .await?;
    info!(
        provider = provider.name(),
        path = %change.file_path,
        updated = existing.is_some(),
        "Wrote file"
    );

    let request = provider
        .open_change_request(
            &project,
            &branch_name,
            &change.base_branch,
            &change.title,
            &change.body,
        )
        .await?;
    info!(
        provider = provider.name(),
        id = request.id,
        url = %request.url,
        "Opened change request"
    );

    Ok(ChangeSummary {
        id: request.id,
        url: request.url,
        title: request.title,
        branch: branch_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChangeConfig;
    use crate::providers::{
        Branch, ChangeRequest, ProjectRef, RemoteFile, WebhookSubscription,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    const BASE_SHA: &str = "abc123";

    /// Records every provider call and simulates configurable outcomes.
    struct FakeProvider {
        change: ChangeConfig,
        calls: Mutex<Vec<String>>,
        file_exists: bool,
        base_branch_exists: bool,
        webhook_denied: bool,
    }

    impl FakeProvider {
        fn new() -> Self {
            Self {
                change: ChangeConfig {
                    base_branch: "master".to_string(),
                    file_path: "example.txt".to_string(),
                    file_content: "content".to_string(),
                    commit_message: "commit".to_string(),
                    title: "Automated PR: Add example file".to_string(),
                    body: "body".to_string(),
                },
                calls: Mutex::new(Vec::new()),
                file_exists: false,
                base_branch_exists: true,
                webhook_denied: false,
            }
        }

        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ScmProvider for FakeProvider {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn change(&self) -> &ChangeConfig {
            &self.change
        }

        fn branch_prefix(&self) -> &'static str {
            "feature/auto-pr-"
        }

        fn webhook_path(&self) -> &'static str {
            "/api/webhook"
        }

        async fn authenticate(&self) -> Result<(), ProviderError> {
            self.record("authenticate");
            Ok(())
        }

        async fn resolve_project(&self) -> Result<ProjectRef, ProviderError> {
            self.record("resolve_project");
            Ok(ProjectRef {
                project_id: "p".to_string(),
                repo_id: "r".to_string(),
            })
        }

        async fn ensure_webhook(
            &self,
            _project: &ProjectRef,
            url: &str,
        ) -> Result<Option<WebhookSubscription>, ProviderError> {
            self.record(format!("ensure_webhook:{url}"));
            if self.webhook_denied {
                return Ok(None);
            }
            Ok(Some(WebhookSubscription {
                id: "1".to_string(),
                url: url.to_string(),
            }))
        }

        async fn get_branch(
            &self,
            _project: &ProjectRef,
            name: &str,
        ) -> Result<Branch, ProviderError> {
            self.record(format!("get_branch:{name}"));
            if !self.base_branch_exists {
                return Err(ProviderError::NotFound(format!(
                    "base branch '{name}' not found"
                )));
            }
            Ok(Branch {
                name: name.to_string(),
                sha: BASE_SHA.to_string(),
            })
        }

        async fn create_branch(
            &self,
            _project: &ProjectRef,
            name: &str,
            sha: &str,
        ) -> Result<(), ProviderError> {
            self.record(format!("create_branch:{name}@{sha}"));
            Ok(())
        }

        async fn get_file(
            &self,
            _project: &ProjectRef,
            path: &str,
            branch: &str,
        ) -> Result<Option<RemoteFile>, ProviderError> {
            self.record(format!("get_file:{path}@{branch}"));
            if self.file_exists {
                Ok(Some(RemoteFile {
                    path: path.to_string(),
                    sha: Some("blob42".to_string()),
                }))
            } else {
                Ok(None)
            }
        }

        async fn write_file(
            &self,
            _project: &ProjectRef,
            branch: &Branch,
            change: &FileChange,
            existing: Option<&RemoteFile>,
        ) -> Result<(), ProviderError> {
            let token = existing
                .and_then(|f| f.sha.as_deref())
                .unwrap_or("none");
            self.record(format!(
                "write_file:{}@{}:token={token}",
                change.path, branch.name
            ));
            Ok(())
        }

        async fn open_change_request(
            &self,
            _project: &ProjectRef,
            source: &str,
            target: &str,
            title: &str,
            _body: &str,
        ) -> Result<ChangeRequest, ProviderError> {
            self.record(format!("open_change_request:{source}->{target}"));
            Ok(ChangeRequest {
                id: 42,
                url: "https://example.invalid/pr/42".to_string(),
                title: title.to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_workflow_sequence_and_summary() {
        let provider = FakeProvider::new();

        let summary = run_change_workflow(&provider, Some("hooks.example.com"))
            .await
            .expect("workflow succeeds");

        assert_eq!(summary.id, 42);
        assert_eq!(summary.title, "Automated PR: Add example file");
        assert!(summary.branch.starts_with("feature/auto-pr-"));
        // The suffix is the creation time in milliseconds
        let suffix = summary.branch.trim_start_matches("feature/auto-pr-");
        assert!(suffix.parse::<i64>().is_ok());

        let calls = provider.calls();
        assert_eq!(calls[0], "authenticate");
        assert_eq!(calls[1], "resolve_project");
        assert_eq!(
            calls[2],
            "ensure_webhook:https://hooks.example.com/api/webhook"
        );
        assert_eq!(calls[3], "get_branch:master");
        assert_eq!(calls[4], format!("create_branch:{}@{BASE_SHA}", summary.branch));
        assert_eq!(calls[5], format!("get_file:example.txt@{}", summary.branch));
        assert_eq!(
            calls[6],
            format!("write_file:example.txt@{}:token=none", summary.branch)
        );
        assert_eq!(calls[7], format!("open_change_request:{}->master", summary.branch));
    }

    #[tokio::test]
    async fn test_workflow_update_supplies_content_token() {
        let provider = FakeProvider {
            file_exists: true,
            ..FakeProvider::new()
        };

        let summary = run_change_workflow(&provider, Some("hooks.example.com"))
            .await
            .expect("workflow succeeds");

        let calls = provider.calls();
        assert!(calls.contains(&format!(
            "write_file:example.txt@{}:token=blob42",
            summary.branch
        )));
    }

    #[tokio::test]
    async fn test_workflow_aborts_when_base_branch_missing() {
        let provider = FakeProvider {
            base_branch_exists: false,
            ..FakeProvider::new()
        };

        let err = run_change_workflow(&provider, Some("hooks.example.com"))
            .await
            .expect_err("workflow fails");
        assert!(matches!(err, ProviderError::NotFound(_)));

        // Nothing past the branch lookup ran
        let calls = provider.calls();
        assert_eq!(calls.last().unwrap(), "get_branch:master");
    }

    #[tokio::test]
    async fn test_workflow_skips_webhook_without_base_url() {
        let provider = FakeProvider::new();

        run_change_workflow(&provider, None)
            .await
            .expect("workflow succeeds");

        assert!(
            !provider.calls().iter().any(|c| c.starts_with("ensure_webhook")),
            "webhook registration should be skipped"
        );
    }

    #[tokio::test]
    async fn test_workflow_tolerates_denied_webhook() {
        let provider = FakeProvider {
            webhook_denied: true,
            ..FakeProvider::new()
        };

        let summary = run_change_workflow(&provider, Some("hooks.example.com"))
            .await
            .expect("workflow still succeeds");
        assert_eq!(summary.id, 42);
    }
}
