//! `skydesk serve`: run the MCP gateway until SIGINT/SIGTERM.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use uplink::{ApiKey, McpServer, ServerConfig};
use uplink_conf::SkydeskConfig;

use crate::client::ImageryClient;
use crate::tools;

const DEFAULT_INSTRUCTIONS: &str = "Satellite imagery gateway. Use check_feasibility or \
predict_passes before create_order, and confirm cost with the user before ordering. \
Areas of interest are WKT polygons in lon/lat order.";

/// Translate the file/env config into the core server's options.
pub fn server_config(config: &SkydeskConfig) -> ServerConfig {
    let server = &config.server;
    ServerConfig::new(server.name.clone(), env!("CARGO_PKG_VERSION"))
        .with_host(server.host.clone())
        .with_port(server.port)
        .with_sse_path(server.sse_path.clone())
        .with_message_path(server.message_path.clone())
        .with_health_path(server.health_path.clone())
        .with_upstream_api_key(ApiKey::new(config.upstream.api_key.clone()))
        .with_cors_allow_origin(server.cors_allow_origin.clone())
        .with_keep_alive(server.keep_alive())
        .with_session_idle_timeout(server.session_idle_timeout())
        .with_shutdown_grace(server.shutdown_grace())
        .with_instructions(
            server
                .instructions
                .clone()
                .unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string()),
        )
}

/// Build a server with every imagery tool registered. Does not bind.
pub fn build_server(config: &SkydeskConfig) -> Result<McpServer> {
    let server_config = server_config(config);
    let client = ImageryClient::new(
        config.upstream.base_url.clone(),
        &server_config.upstream_api_key,
        &config.upstream.api_key_header,
        config.upstream.timeout(),
    )
    .context("Failed to build upstream client")?;

    let server = McpServer::new(server_config);
    tools::register_all(server.protocol(), Arc::new(client));
    Ok(server)
}

/// Run the gateway until a shutdown signal arrives.
pub async fn run(config: SkydeskConfig) -> Result<()> {
    let server = build_server(&config)?;

    if server.config().upstream_api_key.is_empty() {
        tracing::warn!("No upstream API key configured; tool calls will fail until SKYDESK_API_KEY is set");
    }

    let addr = server
        .start()
        .await
        .with_context(|| format!("Failed to start MCP server on {}", server.config().bind_addr()))?;

    let cfg = server.config();
    info!(upstream = %config.upstream.base_url, tools = server.protocol().tools().len(), "skydesk ready");
    info!("   SSE:     GET  http://{}{}", addr, cfg.sse_path);
    info!("   Message: POST http://{}{}?sessionId=...", addr, cfg.message_path);
    info!("   Health:  GET  http://{}{}", addr, cfg.health_path);

    shutdown_signal().await;

    let report = server.stop().await;
    if report.is_clean() {
        info!(sessions_closed = report.sessions_closed, "Shutdown complete");
    } else {
        for issue in &report.issues {
            tracing::warn!(issue = %issue, "Shutdown issue");
        }
        info!(
            sessions_closed = report.sessions_closed,
            issues = report.issues.len(),
            "Shutdown complete with issues"
        );
    }
    Ok(())
}

async fn shutdown_signal() {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT, shutting down...");
        }
        _ = terminate() => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
