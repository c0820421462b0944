//! Connection diagnostics.

// ============================================================================
// Imports
// ============================================================================

use std::time::{Duration, Instant};

use serde_json::json;

use crate::bridge::Bridge;
use crate::error::Result;
use crate::protocol::Action;

// ============================================================================
// Tools
// ============================================================================

/// `debug_websocket_status`: reports extension-connection diagnostics.
///
/// When connected, a `ping` action measures the extension round trip;
/// its failure is reported inside the result rather than failing the
/// tool.
pub async fn websocket_status(bridge: &Bridge) -> Result<String> {
    let connected = bridge.dispatcher.is_connected();

    let mut status = json!({
        "connected": connected,
        "ws_port": bridge.config.ws_port,
        "mcp_port": bridge.config.mcp_port,
        "pending_requests": bridge.dispatcher.pending_count(),
        "active_monitors": bridge.monitors.session_count(),
        "scripts_configured": bridge.scripts.is_configured(),
        "uptime_seconds": bridge.uptime_seconds(),
        "connected_seconds": bridge.dispatcher.connected_for().map(|d| d.as_secs()),
    });

    if connected {
        let start = Instant::now();
        match bridge
            .dispatcher
            .call(Action::Ping, json!({}), Duration::from_secs(5))
            .await
        {
            Ok(_) => {
                status["ping_ms"] = json!(start.elapsed().as_millis() as u64);
            }
            Err(e) => {
                status["ping_error"] = json!(format!("{} ({})", e, e.kind()));
            }
        }
    }

    Ok(serde_json::to_string_pretty(&status)?)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::Value;

    use crate::bridge::Bridge;
    use crate::config::ServerConfig;
    use crate::handlers::tests::{fake_bridge, reply};

    #[tokio::test]
    async fn test_status_while_idle() {
        let bridge = Bridge::new(ServerConfig::new());
        let text = websocket_status(&bridge).await.expect("status");
        let status: Value = serde_json::from_str(&text).expect("json");

        assert_eq!(status["connected"], false);
        assert_eq!(status["pending_requests"], 0);
        assert_eq!(status["connected_seconds"], Value::Null);
        assert!(status.get("ping_ms").is_none());
    }

    #[tokio::test]
    async fn test_status_pings_when_connected() {
        let (bridge, mut rx) = fake_bridge();

        let caller = {
            let bridge = bridge.clone();
            tokio::spawn(async move { websocket_status(&bridge).await })
        };

        let frame = rx.recv().await.expect("outbound frame");
        assert_eq!(frame.action, "ping");
        reply(&bridge, &frame, json!({}));

        let text = caller.await.expect("join").expect("status");
        let status: Value = serde_json::from_str(&text).expect("json");
        assert_eq!(status["connected"], true);
        assert!(status["ping_ms"].is_u64());
    }
}
