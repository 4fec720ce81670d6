//! harbor-agent server entry point.
//!
//! Boots the interception agent behind an MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use harbor_client::{Agent, FetchClient, FetchConfig, Host, Transport};
use harbor_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod host;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(origin = %config.origin, db = %config.db_path.display(), "Starting harbor-agent on stdio transport");

    let storage = Arc::new(CacheDb::open(&config.db_path).await?);
    let transport: Arc<dyn Transport> = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let notifications = Arc::new(host::HeadlessNotifications::default());
    let views = Arc::new(host::ViewRegistry::default());

    let agent = Arc::new(Agent::new(
        &config,
        Host { storage, transport: transport.clone(), notifications: notifications.clone(), views },
    )?);

    let handler = handler::HarborServer::new(agent.clone(), transport, notifications);
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;
    agent.shutdown();

    Ok(())
}
