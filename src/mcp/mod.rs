//! MCP HTTP endpoint.
//!
//! Adapts the tool handlers to the Model Context Protocol using rmcp:
//! a `ToolRouter` of `#[tool]` methods (schemas derived from the typed
//! request structs) served over axum with the streamable HTTP transport
//! on the configured loopback port.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `requests` | Typed tool arguments with derived JSON schemas |
//! | `server` | `BridgeServer` tool router, HTTP serving |

// ============================================================================
// Submodules
// ============================================================================

/// Tool request types.
pub mod requests;

/// MCP server and HTTP endpoint.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use server::{BridgeServer, http_service, serve};
