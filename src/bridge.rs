//! Shared bridge state.
//!
//! One [`Bridge`] instance holds everything a tool call touches: the
//! dispatcher (correlation + connection slot), the monitor registry, the
//! script executor, and the startup configuration. Both network
//! endpoints hang off this state.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Instant;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::monitor::MonitorRegistry;
use crate::scripts::ScriptExecutor;
use crate::transport::{BridgeListener, Dispatcher};

// ============================================================================
// Bridge
// ============================================================================

/// Shared state behind every tool call.
///
/// # Thread Safety
///
/// `Bridge` is `Send + Sync`; it is built once at startup and shared via
/// `Arc` between the WebSocket listener, the MCP endpoint, and every
/// concurrent handler.
pub struct Bridge {
    /// Startup configuration.
    pub config: ServerConfig,

    /// Correlation state and the extension connection slot.
    pub dispatcher: Arc<Dispatcher>,

    /// Live web-request monitoring sessions.
    pub monitors: Arc<MonitorRegistry>,

    /// Predefined-script executor.
    pub scripts: ScriptExecutor,

    /// Process start, for diagnostics.
    started: Instant,
}

impl Bridge {
    /// Builds the shared state from a configuration.
    #[must_use]
    pub fn new(config: ServerConfig) -> Arc<Self> {
        let scripts = ScriptExecutor::new(config.scripts_dir.clone());
        Arc::new(Self {
            config,
            dispatcher: Arc::new(Dispatcher::new()),
            monitors: Arc::new(MonitorRegistry::new()),
            scripts,
            started: Instant::now(),
        })
    }

    /// Binds the extension WebSocket listener and starts accepting.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Io`] if binding fails.
    pub async fn start_ws(self: &Arc<Self>) -> Result<Arc<BridgeListener>> {
        BridgeListener::bind(
            &self.config,
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.monitors),
        )
        .await
    }

    /// Seconds since the bridge was built.
    #[inline]
    #[must_use]
    pub fn uptime_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fresh_bridge_is_idle() {
        let bridge = Bridge::new(ServerConfig::new());
        assert!(!bridge.dispatcher.is_connected());
        assert_eq!(bridge.dispatcher.pending_count(), 0);
        assert_eq!(bridge.monitors.session_count(), 0);
        assert!(bridge.uptime_seconds() < 2);
    }

    #[tokio::test]
    async fn test_start_ws_binds_random_port() {
        let bridge = Bridge::new(ServerConfig::new().with_ws_port(0));
        let listener = bridge.start_ws().await.expect("bind");
        assert!(listener.port() > 0);
        assert!(listener.ws_url().starts_with("ws://127.0.0.1:"));
    }
}
