//! GitHub workflow tests against a mocked API.
//!
//! Covers the full create-PR sequence (installation token, webhook ensure,
//! branch from base sha, create-vs-update file semantics, PR open) and the
//! webhook ensure-exists idempotency contract.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scm_bridge::config::{ChangeConfig, GithubConfig};
use scm_bridge::{run_change_workflow, GitHubProvider, ScmProvider};

/// RSA key in the format GitHub issues for App credentials.
const TEST_APP_KEY: &str = include_str!("fixtures/test-app-key.pem");

const BASE_SHA: &str = "deadbeef";

fn test_change() -> ChangeConfig {
    ChangeConfig {
        base_branch: "master".to_string(),
        file_path: "example.txt".to_string(),
        file_content: "This is an automatically generated file created by the GitHub PR POC."
            .to_string(),
        commit_message: "Add example file via API".to_string(),
        title: "Automated PR: Add example file".to_string(),
        body: "Automated PR body".to_string(),
    }
}

fn test_config(api_url: &str, webhook_secret: Option<&str>) -> GithubConfig {
    GithubConfig {
        app_id: "12345".to_string(),
        private_key: TEST_APP_KEY.to_string(),
        installation_id: "999".to_string(),
        owner: "dopewevmond".to_string(),
        repo: "hackable".to_string(),
        api_url: api_url.to_string(),
        webhook_secret: webhook_secret.map(String::from),
        change: test_change(),
    }
}

async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/app/installations/999/access_tokens"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "token": "ghs_test_token",
            "expires_at": "2026-01-01T00:00:00Z",
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_workflow_creates_branch_file_and_pr() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("GET"))
        .and(path("/repos/dopewevmond/hackable/hooks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/repos/dopewevmond/hackable/hooks"))
        .and(body_partial_json(json!({
            "name": "web",
            "events": ["pull_request"],
            "config": { "secret": "hook-secret" },
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 7,
            "config": {
                "url": "https://hooks.example.com/api/webhook",
                "content_type": "json",
                "insecure_ssl": "0",
            },
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/dopewevmond/hackable/git/ref/heads/master"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ref": "refs/heads/master",
            "object": { "sha": BASE_SHA, "type": "commit" },
        })))
        .mount(&server)
        .await;

    // The new branch must point at exactly the base head sha
    Mock::given(method("POST"))
        .and(path("/repos/dopewevmond/hackable/git/refs"))
        .and(body_partial_json(json!({ "sha": BASE_SHA })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "object": { "sha": BASE_SHA },
        })))
        .expect(1)
        .mount(&server)
        .await;

    // File absent on the new branch: create semantics
    Mock::given(method("GET"))
        .and(path("/repos/dopewevmond/hackable/contents/example.txt"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "Not Found",
        })))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/repos/dopewevmond/hackable/contents/example.txt"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "content": { "path": "example.txt" },
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/repos/dopewevmond/hackable/pulls"))
        .and(body_partial_json(json!({
            "base": "master",
            "title": "Automated PR: Add example file",
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "number": 42,
            "html_url": "https://github.com/dopewevmond/hackable/pull/42",
            "title": "Automated PR: Add example file",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider =
        GitHubProvider::new(test_config(&server.uri(), Some("hook-secret"))).unwrap();
    let summary = run_change_workflow(&provider, Some("hooks.example.com"))
        .await
        .expect("workflow succeeds");

    assert_eq!(summary.id, 42);
    assert_eq!(summary.url, "https://github.com/dopewevmond/hackable/pull/42");
    assert_eq!(summary.title, "Automated PR: Add example file");
    assert!(summary.branch.starts_with("feature/auto-pr-"));

    let requests = server.received_requests().await.unwrap();

    // The file write carried base64 content and no blob sha (create, not update)
    let write = requests
        .iter()
        .find(|r| r.method.as_str() == "PUT")
        .expect("file write request");
    let body: Value = serde_json::from_slice(&write.body).unwrap();
    assert!(body.get("sha").is_none(), "create must not send a blob sha");
    assert_eq!(
        body["content"].as_str().unwrap(),
        BASE64.encode("This is an automatically generated file created by the GitHub PR POC.")
    );
    assert_eq!(body["branch"].as_str().unwrap(), summary.branch);

    // The PR is opened from the generated branch
    let pr = requests
        .iter()
        .find(|r| r.method.as_str() == "POST" && r.url.path().ends_with("/pulls"))
        .expect("pull request creation");
    let body: Value = serde_json::from_slice(&pr.body).unwrap();
    assert_eq!(body["head"].as_str().unwrap(), summary.branch);
}

#[tokio::test]
async fn test_update_sends_existing_blob_sha() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("GET"))
        .and(path("/repos/dopewevmond/hackable/hooks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/dopewevmond/hackable/hooks"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 7,
            "config": { "url": "https://hooks.example.com/api/webhook", "content_type": "json" },
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/dopewevmond/hackable/git/ref/heads/master"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": { "sha": BASE_SHA },
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/dopewevmond/hackable/git/refs"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "object": { "sha": BASE_SHA },
        })))
        .mount(&server)
        .await;

    // File already present on the branch
    Mock::given(method("GET"))
        .and(path("/repos/dopewevmond/hackable/contents/example.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sha": "blob1234",
            "path": "example.txt",
        })))
        .mount(&server)
        .await;

    // Update must carry the current blob sha
    Mock::given(method("PUT"))
        .and(path("/repos/dopewevmond/hackable/contents/example.txt"))
        .and(body_partial_json(json!({ "sha": "blob1234" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": { "path": "example.txt" },
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/repos/dopewevmond/hackable/pulls"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "number": 43,
            "html_url": "https://github.com/dopewevmond/hackable/pull/43",
            "title": "Automated PR: Add example file",
        })))
        .mount(&server)
        .await;

    let provider = GitHubProvider::new(test_config(&server.uri(), None)).unwrap();
    let summary = run_change_workflow(&provider, Some("hooks.example.com"))
        .await
        .expect("workflow succeeds");
    assert_eq!(summary.id, 43);
}

#[tokio::test]
async fn test_ensure_webhook_returns_existing_subscription() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    let callback = "https://hooks.example.com/api/webhook";
    Mock::given(method("GET"))
        .and(path("/repos/dopewevmond/hackable/hooks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": 11,
                "config": { "url": "https://elsewhere.example.com/hook", "content_type": "json" },
            },
            {
                "id": 12,
                "config": { "url": callback, "content_type": "json" },
            },
        ])))
        .mount(&server)
        .await;

    // A matching subscription exists: creation must not happen
    Mock::given(method("POST"))
        .and(path("/repos/dopewevmond/hackable/hooks"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let provider = GitHubProvider::new(test_config(&server.uri(), None)).unwrap();
    let project = provider.resolve_project().await.unwrap();
    let subscription = provider
        .ensure_webhook(&project, callback)
        .await
        .expect("ensure succeeds")
        .expect("subscription returned");

    assert_eq!(subscription.id, "12");
    assert_eq!(subscription.url, callback);
}

#[tokio::test]
async fn test_workflow_fails_when_base_branch_missing() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    Mock::given(method("GET"))
        .and(path("/repos/dopewevmond/hackable/hooks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/dopewevmond/hackable/hooks"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 7,
            "config": { "url": "https://hooks.example.com/api/webhook", "content_type": "json" },
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/dopewevmond/hackable/git/ref/heads/master"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "Not Found",
        })))
        .mount(&server)
        .await;

    // Branch creation must never be attempted
    Mock::given(method("POST"))
        .and(path("/repos/dopewevmond/hackable/git/refs"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let provider = GitHubProvider::new(test_config(&server.uri(), None)).unwrap();
    let err = run_change_workflow(&provider, Some("hooks.example.com"))
        .await
        .expect_err("workflow fails");
    assert!(matches!(err, scm_bridge::ProviderError::NotFound(_)));
}
