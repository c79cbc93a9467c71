// Standalone MCP server binary

use anyhow::{Context, Result};
use clap::Parser;
use fabric_mcp::server::McpServer;
use fabric_mcp::tools::build_registry;
use fabric_mcp_core::config::FabricMcpConfig;
use fabric_mcp_core::fetch::UrlFetcher;
use fabric_mcp_core::resolver::{Engines, HostEnv};
use fabric_mcp_core::runner::ProcessRunner;
use fabric_mcp_core::Fabric;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "fabric-mcp")]
#[command(version, about = "MCP server exposing Fabric patterns as tools", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "FABRIC_MCP_CONFIG", default_value = "fabric-mcp.toml")]
    config: PathBuf,

    /// Explicit path to the fabric executable (skips auto-detection)
    #[arg(long, env = "FABRIC_PATH")]
    fabric_path: Option<PathBuf>,

    /// Explicit path to the yt-dlp executable (skips auto-detection)
    #[arg(long, env = "YTDLP_PATH")]
    ytdlp_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    // Initialize tracing. stdout carries the protocol, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .init();

    let args = Args::parse();

    let server = match build_server(args) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Fatal error during startup: {:#}", e);
            std::process::exit(1);
        }
    };

    tokio::select! {
        result = server.start() => {
            if let Err(e) = result {
                tracing::error!("Fatal error: {:#}", e);
                std::process::exit(1);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutting down...");
        }
    }

    // The blocking stdin reader cannot be cancelled, so don't wait for runtime shutdown.
    std::process::exit(0);
}

fn build_server(args: Args) -> Result<McpServer> {
    tracing::info!("Fabric MCP Server starting...");
    tracing::info!("Using Fabric CLI directly (no REST API server needed)");

    let config = FabricMcpConfig::load(&args.config)?
        .with_engine_paths(args.fabric_path, args.ytdlp_path);

    let host = HostEnv::current();
    let engines = Arc::new(Engines::resolve(&config.engines, &host));
    tracing::debug!("Subprocess PATH: {}", engines.search_path.to_string_lossy());

    let runner = Arc::new(ProcessRunner::new(engines.search_path.clone()));
    let fabric = Arc::new(Fabric::new(runner, engines, config.timeouts.clone()));
    let fetcher = Arc::new(UrlFetcher::new(&config.fetch).context("Failed to create HTTP client")?);

    let registry = build_registry(fabric, fetcher);
    tracing::info!("Registered {} tools", registry.len());

    Ok(McpServer::new(registry))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
