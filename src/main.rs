use std::sync::Arc;

use codex_mcp::{ClientConfig, CodexClient, CodexServer, Dispatcher};
use rmcp::{transport::stdio, ServiceExt};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries the MCP protocol; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        "Using model {} at {} (timeout {}ms)",
        config.model,
        config.base_url,
        config.timeout.as_millis()
    );

    let client = CodexClient::new(Arc::new(config))?;
    let server = CodexServer::new(Dispatcher::new(client));

    let service = server
        .serve(stdio())
        .await
        .inspect_err(|e| error!("Failed to start MCP server: {:?}", e))?;
    info!("Codex MCP Server running on stdio");

    service.waiting().await?;
    Ok(())
}
