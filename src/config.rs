//! Bridge server configuration.
//!
//! Both listeners are loopback-only by construction: any attempt to
//! configure a non-loopback host is rewritten to `127.0.0.1` with a
//! warning. External binding is not available through any code path.
//!
//! # Example
//!
//! ```ignore
//! use foxmcp_bridge::ServerConfig;
//!
//! let config = ServerConfig::new()
//!     .with_ws_port(8765)
//!     .with_mcp_port(3000)
//!     .with_scripts_dir_from_env();
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

// ============================================================================
// Constants
// ============================================================================

/// Environment variable naming the predefined-scripts directory.
pub const SCRIPTS_DIR_ENV: &str = "FOXMCP_EXT_SCRIPTS";

/// Default WebSocket port the extension connects to.
pub const DEFAULT_WS_PORT: u16 = 8765;

/// Default HTTP port for the MCP endpoint.
pub const DEFAULT_MCP_PORT: u16 = 3000;

/// Default keepalive ping interval.
const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(30);

// ============================================================================
// ServerConfig
// ============================================================================

/// Startup configuration for the bridge server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind address for both listeners. Always a loopback address.
    pub host: IpAddr,

    /// WebSocket port the extension connects to.
    pub ws_port: u16,

    /// HTTP port for the MCP endpoint.
    pub mcp_port: u16,

    /// Whether the MCP endpoint is served at all.
    ///
    /// Disabled when the endpoint is embedded by another process.
    pub mcp_enabled: bool,

    /// Keepalive ping interval for the extension connection.
    ///
    /// `None` disables keepalive pings.
    pub ping_interval: Option<Duration>,

    /// Directory of executable predefined scripts.
    ///
    /// `None` disables `content_execute_predefined`.
    pub scripts_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ServerConfig {
    /// Creates a configuration with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            ws_port: DEFAULT_WS_PORT,
            mcp_port: DEFAULT_MCP_PORT,
            mcp_enabled: true,
            ping_interval: Some(DEFAULT_PING_INTERVAL),
            scripts_dir: None,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ServerConfig {
    /// Sets the bind host, rewriting non-loopback addresses to `127.0.0.1`.
    #[must_use]
    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = sanitize_host(host);
        self
    }

    /// Sets the bind host from a string form.
    ///
    /// Unparseable or non-loopback values are rewritten to `127.0.0.1`
    /// with a warning.
    #[must_use]
    pub fn with_host_str(mut self, host: &str) -> Self {
        self.host = match host.parse::<IpAddr>() {
            Ok(addr) => sanitize_host(addr),
            Err(_) if host == "localhost" => IpAddr::V4(Ipv4Addr::LOCALHOST),
            Err(_) => {
                warn!(host, "Unparseable host rewritten to loopback");
                IpAddr::V4(Ipv4Addr::LOCALHOST)
            }
        };
        self
    }

    /// Sets the WebSocket port.
    #[inline]
    #[must_use]
    pub fn with_ws_port(mut self, port: u16) -> Self {
        self.ws_port = port;
        self
    }

    /// Sets the MCP endpoint port.
    #[inline]
    #[must_use]
    pub fn with_mcp_port(mut self, port: u16) -> Self {
        self.mcp_port = port;
        self
    }

    /// Enables or disables the MCP endpoint.
    #[inline]
    #[must_use]
    pub fn with_mcp_enabled(mut self, enabled: bool) -> Self {
        self.mcp_enabled = enabled;
        self
    }

    /// Sets the keepalive ping interval. Zero disables keepalive.
    #[inline]
    #[must_use]
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = (!interval.is_zero()).then_some(interval);
        self
    }

    /// Sets the predefined-scripts directory.
    #[inline]
    #[must_use]
    pub fn with_scripts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scripts_dir = Some(dir.into());
        self
    }

    /// Reads the predefined-scripts directory from `FOXMCP_EXT_SCRIPTS`.
    ///
    /// Absence of the variable leaves script execution disabled.
    #[must_use]
    pub fn with_scripts_dir_from_env(mut self) -> Self {
        self.scripts_dir = std::env::var_os(SCRIPTS_DIR_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        self
    }
}

// ============================================================================
// Host Sanitization
// ============================================================================

/// Rewrites non-loopback addresses to `127.0.0.1` with a warning.
///
/// External binding is rejected by construction; the rewrite keeps the
/// server usable instead of failing startup.
#[must_use]
pub fn sanitize_host(host: IpAddr) -> IpAddr {
    if host.is_loopback() {
        host
    } else {
        warn!(%host, "Non-loopback host rewritten to 127.0.0.1");
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::new();
        assert_eq!(config.host, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.ws_port, 8765);
        assert_eq!(config.mcp_port, 3000);
        assert!(config.mcp_enabled);
        assert!(config.ping_interval.is_some());
        assert!(config.scripts_dir.is_none());
    }

    #[test]
    fn test_loopback_host_kept() {
        let config = ServerConfig::new().with_host_str("127.0.0.1");
        assert_eq!(config.host, IpAddr::V4(Ipv4Addr::LOCALHOST));

        let config = ServerConfig::new().with_host_str("::1");
        assert!(config.host.is_loopback());
    }

    #[test]
    fn test_external_host_rewritten() {
        let config = ServerConfig::new().with_host_str("0.0.0.0");
        assert_eq!(config.host, IpAddr::V4(Ipv4Addr::LOCALHOST));

        let config = ServerConfig::new().with_host_str("192.168.1.10");
        assert_eq!(config.host, IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn test_localhost_name_accepted() {
        let config = ServerConfig::new().with_host_str("localhost");
        assert_eq!(config.host, IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn test_garbage_host_rewritten() {
        let config = ServerConfig::new().with_host_str("example.com");
        assert_eq!(config.host, IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn test_zero_ping_interval_disables_keepalive() {
        let config = ServerConfig::new().with_ping_interval(Duration::ZERO);
        assert!(config.ping_interval.is_none());
    }

    #[test]
    fn test_builder_ports() {
        let config = ServerConfig::new()
            .with_ws_port(9001)
            .with_mcp_port(9002)
            .with_mcp_enabled(false);
        assert_eq!(config.ws_port, 9001);
        assert_eq!(config.mcp_port, 9002);
        assert!(!config.mcp_enabled);
    }
}
