//! holonet server entry point.
//!
//! Boots the MCP server on stdio transport and the periodic statistics job.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use anyhow::{Context, Result};
use holonet_client::{Transport, TransportConfig};
use holonet_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod state;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    tracing::info!(base_url = %config.base_url, db_path = %config.db_path.display(), "starting holonet server on stdio transport");

    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening database at {}", config.db_path.display()))?;
    let transport = Transport::new(TransportConfig::from_app(&config)?)?;
    let state = state::AppState::new(&config, transport, db.clone());

    let stats_job = tokio::spawn(tools::statistics::refresh_loop(db, config.stats_interval()));

    let handler = handler::HolonetServer::new(state);
    let server = serve_server(handler, stdio()).await?;
    let outcome = server.waiting().await;

    stats_job.abort();
    tracing::info!("holonet server stopped");
    outcome?;

    Ok(())
}
