//! scm-bridge service binary.
//!
//! Standalone HTTP service exposing the change-workflow trigger endpoints and
//! the inbound webhook receivers.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use scm_bridge::{server, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("scm_bridge=info".parse()?))
        .init();

    info!("Starting scm-bridge service...");

    // Load configuration
    let config = Config::default();

    // Outbound channels
    if config.github.is_some() {
        info!("GitHub provider configured");
    } else {
        info!("GitHub App credentials not set - /api/create-pr will be disabled");
    }
    if config.gitlab.is_some() {
        info!("GitLab provider configured");
    } else {
        info!("GITLAB_PAT not set - /api/gitlab-create-mr will be disabled");
    }
    if config.azure.is_some() {
        info!("Azure DevOps provider configured");
    } else {
        info!("AZURE_DEVOPS_PAT not set - /api/azure-create-pr will be disabled");
    }

    // Inbound verification; missing material downgrades the channel to accept-all
    if config.github_webhook_secret.is_none() {
        warn!("GITHUB_WEBHOOK_SECRET not set - GitHub webhook signature verification disabled");
    }
    if config.gitlab_webhook_token.is_none() {
        warn!("GITLAB_WEBHOOK_TOKEN not set - GitLab webhook token verification disabled");
    }
    if config.azure_webhook_password.is_none() {
        warn!("AZURE_WEBHOOK_PASSWORD not set - Azure webhook Basic auth verification disabled");
    }

    if config.webhook_base_url.is_none() {
        warn!("WEBHOOK_BASE_URL not set - workflow runs will skip webhook registration");
    }

    let port = config.port;
    let state = server::AppState {
        config: Arc::new(config),
    };
    let app = server::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(port = port, "scm-bridge listening");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
