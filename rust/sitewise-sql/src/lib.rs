pub mod catalog;
pub mod config;
pub mod editor;
pub mod error;
pub mod query;
pub mod server;
pub mod session;
pub mod state;
pub mod telemetry;
pub mod time;

use crate::{config::AppConfig, server::Server};

/// Bootstraps the query builder service using environment configuration.
pub async fn run() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    Server::new(config).run().await
}
