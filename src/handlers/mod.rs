//! MCP tool handlers.
//!
//! One async function per tool, each backing a `#[tool]` method on
//! [`crate::mcp::BridgeServer`]. Every handler follows the same shape:
//! validate arguments against a closed schema (failing locally, before
//! anything is sent), build the action payload, await the dispatcher,
//! format the result. Handlers never retry and never swallow an error;
//! every failure surfaces as a descriptive message naming its kind.
//!
//! # Modules
//!
//! | Module | Tools |
//! |--------|-------|
//! | `tabs` | `tabs_list`, `tabs_get_active`, `tabs_create`, `tabs_close`, `tabs_switch`, `tabs_update`, `tabs_capture_screenshot` |
//! | `history` | `history_query`, `history_get_recent`, `history_delete_item` |
//! | `navigation` | `navigation_back`, `navigation_forward`, `navigation_reload`, `navigation_go_to_url` |
//! | `content` | `content_get_text`, `content_get_html`, `content_execute_script`, `content_execute_predefined` |
//! | `bookmarks` | `bookmarks_list`, `bookmarks_search`, `bookmarks_create`, `bookmarks_create_folder`, `bookmarks_update`, `bookmarks_delete` |
//! | `windows` | `list_windows`, `get_window`, `get_current_window`, `get_last_focused_window`, `create_window`, `close_window`, `focus_window`, `update_window` |
//! | `requests` | `requests_start_monitoring`, `requests_stop_monitoring`, `requests_list_captured`, `requests_get_content` |
//! | `debug` | `debug_websocket_status` |

// ============================================================================
// Submodules
// ============================================================================

/// Bookmark tools.
pub mod bookmarks;

/// Page-content tools, including predefined-script composition.
pub mod content;

/// Connection diagnostics.
pub mod debug;

/// History tools.
pub mod history;

/// Tab navigation tools.
pub mod navigation;

/// Web-request monitoring tools.
pub mod requests;

/// Tab tools, including screenshot capture.
pub mod tabs;

/// Window tools.
pub mod windows;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Extended timeout for screenshot capture.
pub(crate) const SCREENSHOT_TIMEOUT: Duration = Duration::from_secs(60);

/// Extended timeout for in-page script execution.
pub(crate) const SCRIPT_EXEC_TIMEOUT: Duration = Duration::from_secs(45);

// ============================================================================
// Argument Helpers
// ============================================================================

/// Extracts a required non-empty string argument.
pub(crate) fn require_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    match args.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        Some(Value::String(_)) => Err(Error::invalid_argument(format!(
            "'{key}' must be a non-empty string"
        ))),
        Some(_) => Err(Error::invalid_argument(format!("'{key}' must be a string"))),
        None => Err(Error::invalid_argument(format!(
            "missing required argument '{key}'"
        ))),
    }
}

/// Extracts an optional string argument; explicit `null` counts as absent.
pub(crate) fn opt_str<'a>(args: &'a Value, key: &str) -> Result<Option<&'a str>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(Error::invalid_argument(format!("'{key}' must be a string"))),
    }
}

/// Extracts a required integer argument.
pub(crate) fn require_i64(args: &Value, key: &str) -> Result<i64> {
    match args.get(key) {
        Some(value) if value.is_i64() || value.is_u64() => {
            value.as_i64().ok_or_else(|| {
                Error::invalid_argument(format!("'{key}' is out of range"))
            })
        }
        Some(Value::Null) | None => Err(Error::invalid_argument(format!(
            "missing required argument '{key}'"
        ))),
        Some(_) => Err(Error::invalid_argument(format!(
            "'{key}' must be an integer"
        ))),
    }
}

/// Extracts an optional integer argument.
pub(crate) fn opt_i64(args: &Value, key: &str) -> Result<Option<i64>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) if value.is_i64() || value.is_u64() => Ok(value.as_i64()),
        Some(_) => Err(Error::invalid_argument(format!(
            "'{key}' must be an integer"
        ))),
    }
}

/// Extracts an optional boolean with a default.
pub(crate) fn opt_bool(args: &Value, key: &str, default: bool) -> Result<bool> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(Error::invalid_argument(format!(
            "'{key}' must be a boolean"
        ))),
    }
}

/// Extracts an optional non-negative integer with a default.
pub(crate) fn opt_u64(args: &Value, key: &str, default: u64) -> Result<u64> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => value.as_u64().ok_or_else(|| {
            Error::invalid_argument(format!("'{key}' must be a non-negative integer"))
        }),
    }
}

/// Validates a URL argument.
pub(crate) fn validate_url(key: &str, url: &str) -> Result<()> {
    Url::parse(url)
        .map(|_| ())
        .map_err(|e| Error::invalid_argument(format!("'{key}' is not a valid URL: {e}")))
}

// ============================================================================
// Tests
// ============================================================================
