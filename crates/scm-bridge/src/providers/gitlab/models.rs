//! GitLab REST API payloads, limited to the fields this service touches.

use serde::{Deserialize, Serialize};

/// `GET /projects/{path}` response.
#[derive(Debug, Deserialize)]
pub struct Project {
    pub id: u64,
}

/// A registered project hook.
#[derive(Debug, Deserialize)]
pub struct Hook {
    pub id: u64,
    pub url: String,
}

/// Request to create a project hook. Merge request events only; everything
/// else is explicitly disabled.
#[derive(Debug, Serialize)]
pub struct CreateHookRequest {
    pub url: String,
    pub merge_requests_events: bool,
    pub push_events: bool,
    pub issues_events: bool,
    pub wiki_page_events: bool,
    pub pipeline_events: bool,
    pub tag_push_events: bool,
    pub note_events: bool,
    pub enable_ssl_verification: bool,
}

impl CreateHookRequest {
    pub fn merge_requests_only(url: &str) -> Self {
        Self {
            url: url.to_string(),
            merge_requests_events: true,
            push_events: false,
            issues_events: false,
            wiki_page_events: false,
            pipeline_events: false,
            tag_push_events: false,
            note_events: false,
            enable_ssl_verification: true,
        }
    }
}

/// `GET /repository/branches/{name}` response.
#[derive(Debug, Deserialize)]
pub struct GitLabBranch {
    pub name: String,
    pub commit: Commit,
}

#[derive(Debug, Deserialize)]
pub struct Commit {
    pub id: String,
}

/// Request to create a branch.
#[derive(Debug, Serialize)]
pub struct CreateBranchRequest {
    pub branch: String,
    #[serde(rename = "ref")]
    pub ref_name: String,
}

/// `POST`/`PUT /repository/files/{path}` request body.
#[derive(Debug, Serialize)]
pub struct WriteFileRequest {
    pub branch: String,
    pub content: String,
    pub commit_message: String,
}

/// Request to open a merge request.
#[derive(Debug, Serialize)]
pub struct CreateMergeRequest {
    pub source_branch: String,
    pub target_branch: String,
    pub title: String,
    pub description: String,
}

/// The slice of a merge request response returned to callers.
#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    pub iid: u64,
    pub web_url: String,
    pub title: String,
}
