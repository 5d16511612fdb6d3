//! GitHub provider: App authentication and REST client.

mod app_auth;
mod client;
mod models;

pub use client::GitHubProvider;
