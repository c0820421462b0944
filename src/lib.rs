//! FoxMCP bridge server.
//!
//! A long-lived loopback-only process that exposes browser-automation
//! capabilities as MCP tools. Each tool invocation becomes one JSON
//! request–response exchange over a WebSocket to a single browser
//! extension.
//!
//! # Architecture
//!
//! Two endpoints, one shared core:
//!
//! - **Extension WebSocket** (default port 8765): at most one connection;
//!   a new handshake gracefully replaces the incumbent.
//! - **MCP HTTP endpoint** (default port 3000): an rmcp tool router
//!   served over the streamable HTTP transport; many tool calls in
//!   flight at once, all multiplexed onto the single WebSocket with
//!   correlation by request id.
//!
//! ```text
//! MCP client ──HTTP──► endpoint ──► handler ──► dispatcher ──WS──► extension
//!                                       ▲            │
//!                                       └── waiter ◄─┘  (id-correlated reply)
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use foxmcp_bridge::{Bridge, ServerConfig, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ServerConfig::new().with_scripts_dir_from_env();
//!     let bridge = Bridge::new(config);
//!
//!     let _ws = bridge.start_ws().await?;
//!     foxmcp_bridge::mcp::serve(bridge).await
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bridge`] | Shared state behind every tool call |
//! | [`config`] | Startup configuration, loopback enforcement |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`handlers`] | One handler per MCP tool |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`mcp`] | MCP HTTP endpoint |
//! | [`monitor`] | Web-request monitor sessions |
//! | [`protocol`] | Wire envelope and the closed action catalog |
//! | [`scripts`] | Predefined-script executor |
//! | [`transport`] | WebSocket listener and dispatcher |

// ============================================================================
// Modules
// ============================================================================

/// Shared state behind every tool call.
pub mod bridge;

/// Startup configuration.
pub mod config;

/// Error types and result aliases.
pub mod error;

/// MCP tool handlers.
pub mod handlers;

/// Type-safe identifiers for bridge entities.
pub mod identifiers;

/// MCP HTTP endpoint.
pub mod mcp;

/// Web-request monitor sessions.
pub mod monitor;

/// WebSocket protocol message types.
pub mod protocol;

/// Predefined-script execution.
pub mod scripts;

/// WebSocket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Core types
pub use bridge::Bridge;
pub use config::ServerConfig;

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{MonitorId, RequestId};

// Protocol types
pub use protocol::{Action, Envelope, MessageType};

// Subsystems
pub use monitor::{CaptureSummary, MonitorRegistry, MonitorStats};
pub use scripts::ScriptExecutor;
pub use transport::{BridgeListener, Dispatcher};
