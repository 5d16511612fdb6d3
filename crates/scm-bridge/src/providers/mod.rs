//! Provider abstractions for source-control SaaS platforms.

pub mod azure;
pub mod github;
pub mod gitlab;
mod traits;

pub use azure::AzureProvider;
pub use github::GitHubProvider;
pub use gitlab::GitLabProvider;
pub use traits::{
    Branch, ChangeRequest, FileChange, ProjectRef, ProviderError, RemoteFile, ScmProvider,
    WebhookSubscription,
};
