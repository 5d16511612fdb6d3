//! Azure DevOps provider: PAT-authenticated REST client.

mod client;
mod models;

pub use client::AzureProvider;
