//! FoxMCP bridge server entry point.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use foxmcp_bridge::{Bridge, Result, ServerConfig, mcp};

// ============================================================================
// CLI
// ============================================================================

/// Bridge server exposing browser automation as MCP tools.
#[derive(Debug, Parser)]
#[command(name = "foxmcp-bridge", version, about)]
struct Cli {
    /// Bind host. Non-loopback values are rewritten to 127.0.0.1.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// WebSocket port the extension connects to.
    #[arg(long, default_value_t = foxmcp_bridge::config::DEFAULT_WS_PORT)]
    port: u16,

    /// HTTP port for the MCP endpoint.
    #[arg(long, default_value_t = foxmcp_bridge::config::DEFAULT_MCP_PORT)]
    mcp_port: u16,

    /// Disable the MCP endpoint (when embedded by another process).
    #[arg(long)]
    no_mcp: bool,

    /// Keepalive ping interval in seconds; 0 disables keepalive.
    #[arg(long, default_value_t = 30)]
    ping_interval: u64,
}

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = ServerConfig::new()
        .with_host_str(&cli.host)
        .with_ws_port(cli.port)
        .with_mcp_port(cli.mcp_port)
        .with_mcp_enabled(!cli.no_mcp)
        .with_ping_interval(Duration::from_secs(cli.ping_interval))
        .with_scripts_dir_from_env();

    if let Some(dir) = &config.scripts_dir {
        info!(dir = %dir.display(), "Predefined scripts enabled");
    }

    let bridge = Bridge::new(config);
    let ws = bridge.start_ws().await?;
    info!(url = %ws.ws_url(), "Waiting for the extension to connect");

    if bridge.config.mcp_enabled {
        let mcp_bridge = bridge.clone();
        tokio::spawn(async move {
            if let Err(e) = mcp::serve(mcp_bridge).await {
                error!(error = %e, "MCP endpoint terminated");
            }
        });
    } else {
        info!("MCP endpoint disabled");
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    Ok(())
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("foxmcp_bridge=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
