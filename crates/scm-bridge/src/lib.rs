//! Cross-provider pull request automation and webhook bridge.
//!
//! This crate provides:
//! - REST clients for GitHub (App auth), GitLab (PAT) and Azure DevOps (PAT)
//! - Idempotent webhook registration against each provider
//! - A single change-request workflow running over a provider trait
//! - Inbound webhook receivers with per-provider authenticity checks
//! - HTTP server exposing the trigger and callback endpoints
//! - A demonstration page that drives the GitHub workflow

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Many async API methods can fail

pub mod config;
pub mod handlers;
pub mod providers;
pub mod server;
pub mod webhooks;
pub mod workflow;

pub use config::Config;
pub use providers::{
    AzureProvider, Branch, ChangeRequest, FileChange, GitHubProvider, GitLabProvider, ProjectRef,
    ProviderError, RemoteFile, ScmProvider, WebhookSubscription,
};
pub use workflow::{run_change_workflow, ChangeSummary};
