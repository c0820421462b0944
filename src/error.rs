//! Error types for the FoxMCP bridge.
//!
//! This module defines all error types used throughout the crate. Every
//! variant maps onto one of the stable error kinds surfaced to MCP clients
//! via [`Error::kind`].
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use foxmcp_bridge::{Result, Error};
//!
//! async fn example(dispatcher: &Dispatcher) -> Result<()> {
//!     let tabs = dispatcher.call(Action::TabsList, json!({}), timeout).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Validation | [`Error::InvalidArgument`] |
//! | Connection | [`Error::Disconnected`], [`Error::Timeout`] |
//! | Extension | [`Error::Extension`] |
//! | Script executor | [`Error::NotConfigured`], [`Error::InvalidName`], [`Error::ScriptNotFound`], [`Error::NotExecutable`], [`Error::InvalidArgs`], [`Error::ExecutionFailed`] |
//! | Monitoring | [`Error::MonitorNotFound`] |
//! | Boundary | [`Error::Protocol`], [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::path::PathBuf;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging; [`Error::kind`]
/// yields the stable machine-readable kind string.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Validation Errors
    // ========================================================================
    /// Tool argument violated its schema.
    ///
    /// Returned before anything is sent to the extension.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the violation.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// No extension connection at call time, or the connection was lost
    /// while the call was outstanding.
    #[error("Extension not connected")]
    Disconnected,

    /// Deadline expired without a matching response frame.
    #[error("Request '{action}' timed out after {timeout_ms}ms")]
    Timeout {
        /// Action name of the timed-out request.
        action: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Extension Errors
    // ========================================================================
    /// Structured error frame returned by the extension.
    #[error("Extension error [{code}]: {message}")]
    Extension {
        /// Extension-assigned error code.
        code: String,
        /// Extension-assigned error message.
        message: String,
    },

    // ========================================================================
    // Script Executor Errors
    // ========================================================================
    /// Required environment is absent (e.g. no scripts directory).
    #[error("Not configured: {message}")]
    NotConfigured {
        /// Description of the missing configuration.
        message: String,
    },

    /// Script name failed charset, traversal, or containment checks.
    #[error("Invalid script name: {name}")]
    InvalidName {
        /// The rejected name.
        name: String,
    },

    /// Named script does not exist in the scripts directory.
    #[error("Script not found: {name}")]
    ScriptNotFound {
        /// The missing script name.
        name: String,
    },

    /// Resolved script is not executable by the current process.
    #[error("Script is not executable: {path}")]
    NotExecutable {
        /// The non-executable path.
        path: PathBuf,
    },

    /// Script arguments did not parse as a JSON array of strings.
    #[error("Invalid script arguments: {message}")]
    InvalidArgs {
        /// Description of the shape violation.
        message: String,
    },

    /// Script process exited nonzero, timed out, or produced invalid output.
    #[error("Script execution failed: {message}")]
    ExecutionFailed {
        /// Failure description, including captured stderr where available.
        message: String,
    },

    // ========================================================================
    // Monitoring Errors
    // ========================================================================
    /// Monitor session lookup failed.
    #[error("Monitor not found: {monitor_id}")]
    MonitorNotFound {
        /// The unknown monitor ID, as supplied by the caller.
        monitor_id: String,
    },

    // ========================================================================
    // Boundary Errors
    // ========================================================================
    /// Protocol violation on the wire (unparseable frame, unknown action).
    ///
    /// Logged on the inbound path; never surfaced to a tool caller because
    /// no caller is waiting on an unparseable frame.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// IO error (file save, bind failure).
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket transport error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a timeout error for an action request.
    #[inline]
    pub fn timeout(action: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            action: action.into(),
            timeout_ms,
        }
    }

    /// Creates an extension error from an error frame's payload.
    #[inline]
    pub fn extension(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extension {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a not-configured error.
    #[inline]
    pub fn not_configured(message: impl Into<String>) -> Self {
        Self::NotConfigured {
            message: message.into(),
        }
    }

    /// Creates an invalid script name error.
    #[inline]
    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName { name: name.into() }
    }

    /// Creates a script not found error.
    #[inline]
    pub fn script_not_found(name: impl Into<String>) -> Self {
        Self::ScriptNotFound { name: name.into() }
    }

    /// Creates a not-executable error.
    #[inline]
    pub fn not_executable(path: impl Into<PathBuf>) -> Self {
        Self::NotExecutable { path: path.into() }
    }

    /// Creates an invalid script arguments error.
    #[inline]
    pub fn invalid_args(message: impl Into<String>) -> Self {
        Self::InvalidArgs {
            message: message.into(),
        }
    }

    /// Creates an execution failed error.
    #[inline]
    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            message: message.into(),
        }
    }

    /// Creates a monitor not found error.
    #[inline]
    pub fn monitor_not_found(monitor_id: impl Into<String>) -> Self {
        Self::MonitorNotFound {
            monitor_id: monitor_id.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Kinds & Predicates
// ============================================================================

impl Error {
    /// Returns the stable kind string surfaced in tool results.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::Disconnected => "disconnected",
            Self::Timeout { .. } => "timeout",
            Self::Extension { .. } => "extension_error",
            Self::NotConfigured { .. } => "not_configured",
            Self::InvalidName { .. } => "invalid_name",
            Self::ScriptNotFound { .. } | Self::MonitorNotFound { .. } => "not_found",
            Self::NotExecutable { .. } => "not_executable",
            Self::InvalidArgs { .. } => "invalid_args",
            Self::ExecutionFailed { .. } => "execution_failed",
            Self::Io(_) => "io_error",
            Self::Protocol { .. } | Self::Json(_) | Self::WebSocket(_) => "protocol_error",
        }
    }

    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if this error means the extension is unreachable.
    #[inline]
    #[must_use]
    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// Returns `true` if this is a local validation failure.
    ///
    /// Validation failures never reach the extension.
    #[inline]
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::invalid_argument("tab_id must be an integer");
        assert_eq!(
            err.to_string(),
            "Invalid argument: tab_id must be an integer"
        );
    }

    #[test]
    fn test_timeout_display() {
        let err = Error::timeout("tabs.list", 15_000);
        assert_eq!(
            err.to_string(),
            "Request 'tabs.list' timed out after 15000ms"
        );
        assert!(err.is_timeout());
    }

    #[test]
    fn test_kind_strings() {
        assert_eq!(Error::Disconnected.kind(), "disconnected");
        assert_eq!(Error::invalid_argument("x").kind(), "invalid_argument");
        assert_eq!(
            Error::extension("tab_not_found", "no tab 9").kind(),
            "extension_error"
        );
        assert_eq!(Error::script_not_found("x.sh").kind(), "not_found");
        assert_eq!(Error::monitor_not_found("abc").kind(), "not_found");
        assert_eq!(Error::invalid_name("../x").kind(), "invalid_name");
        assert_eq!(Error::protocol("bad frame").kind(), "protocol_error");
    }

    #[test]
    fn test_predicates() {
        assert!(Error::Disconnected.is_disconnected());
        assert!(!Error::Disconnected.is_timeout());
        assert!(Error::invalid_argument("x").is_invalid_argument());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.kind(), "io_error");
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
