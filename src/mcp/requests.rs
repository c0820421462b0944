//! Tool request types.
//!
//! One struct per tool argument shape, deserialized by the MCP layer via
//! `Parameters<T>` with schemas derived through `schemars`. Field names
//! are the client-facing argument names; `Option` fields are optional
//! arguments whose defaults the handlers apply. Serialization skips
//! absent options so a struct round-trips into exactly the argument
//! object the handlers validate.

// ============================================================================
// Imports
// ============================================================================

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Tabs
// ============================================================================

/// Arguments carrying only a tab ID.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct TabIdRequest {
    /// Target tab.
    pub tab_id: i64,
}

/// Arguments for `tabs_create`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct TabsCreateRequest {
    /// URL to open.
    pub url: String,
    /// Make the new tab active (default true).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// Pin the new tab (default false).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    /// Target window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_id: Option<i64>,
}

/// Arguments for `tabs_update`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct TabsUpdateRequest {
    /// Target tab.
    pub tab_id: i64,
    /// New URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub muted: Option<bool>,
}

/// Arguments for `tabs_capture_screenshot`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ScreenshotRequest {
    /// Save to this path instead of returning the data URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_id: Option<i64>,
    /// "png" (default) or "jpeg".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// 0-100, default 90.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u64>,
}

// ============================================================================
// History
// ============================================================================

/// Arguments for `history_query`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct HistoryQueryRequest {
    /// Search text.
    pub query: String,
    /// Maximum items to return (default 50).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u64>,
}

/// Arguments for `history_get_recent`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct HistoryRecentRequest {
    /// Items to return (default 10).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

/// Arguments carrying only a URL.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct UrlRequest {
    /// Target URL.
    pub url: String,
}

// ============================================================================
// Bookmarks
// ============================================================================

/// Arguments for `bookmarks_list`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct BookmarksListRequest {
    /// Restrict the tree to one folder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
}

/// Arguments carrying only a search query.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct QueryRequest {
    /// Search text.
    pub query: String,
}

/// Arguments for `bookmarks_create`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct BookmarksCreateRequest {
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

/// Arguments for `bookmarks_create_folder`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct BookmarksCreateFolderRequest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

/// Arguments for `bookmarks_update`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct BookmarksUpdateRequest {
    pub bookmark_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Arguments carrying only a bookmark ID.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct BookmarkIdRequest {
    pub bookmark_id: String,
}

// ============================================================================
// Navigation
// ============================================================================

/// Arguments for `navigation_reload`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct NavigationReloadRequest {
    /// Target tab.
    pub tab_id: i64,
    /// Skip the HTTP cache (default false).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bypass_cache: Option<bool>,
}

/// Arguments for `navigation_go_to_url`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct NavigateRequest {
    /// Target tab.
    pub tab_id: i64,
    /// URL to navigate to.
    pub url: String,
}

// ============================================================================
// Content
// ============================================================================

/// Arguments for `content_get_text`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ContentGetTextRequest {
    /// Target tab.
    pub tab_id: i64,
    /// Truncate to this many characters; 0 yields the empty string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i64>,
}

/// Arguments for `content_execute_script`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ExecuteScriptRequest {
    /// Target tab.
    pub tab_id: i64,
    /// JavaScript to run, sent verbatim.
    pub script: String,
}

/// Arguments for `content_execute_predefined`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ExecutePredefinedRequest {
    /// Target tab.
    pub tab_id: i64,
    /// Script file name inside the configured directory.
    pub script_name: String,
    /// JSON array of string arguments (default "[]").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_args: Option<String>,
}

// ============================================================================
// Windows
// ============================================================================

/// Arguments carrying only the populate flag.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct PopulateRequest {
    /// Include each window's tabs (default true).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub populate: Option<bool>,
}

/// Arguments for `get_window`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetWindowRequest {
    /// Target window.
    pub window_id: i64,
    /// Include the window's tabs (default true).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub populate: Option<bool>,
}

/// Arguments carrying only a window ID.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct WindowIdRequest {
    /// Target window.
    pub window_id: i64,
}

/// Arguments for `create_window`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateWindowRequest {
    /// URL to open in the new window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// normal (default), popup, panel, or detached_panel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_type: Option<String>,
    /// normal (default), minimized, maximized, or fullscreen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Focus the new window (default true).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focused: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<i64>,
    /// Open a private window (default false).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incognito: Option<bool>,
}

/// Arguments for `update_window`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct UpdateWindowRequest {
    /// Target window.
    pub window_id: i64,
    /// normal, minimized, maximized, or fullscreen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focused: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<i64>,
}

// ============================================================================
// Request Monitoring
// ============================================================================

/// Arguments for `requests_start_monitoring`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StartMonitoringRequest {
    /// URL patterns to observe; must be non-empty.
    pub url_patterns: Vec<String>,
    /// Capture options forwarded to the extension.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
    /// Restrict observation to one tab.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<i64>,
}

/// Arguments for `requests_stop_monitoring`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StopMonitoringRequest {
    /// Session to stop.
    pub monitor_id: String,
    /// Seconds to wait for trailing captures (default 5).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drain_timeout: Option<u64>,
}

/// Arguments carrying only a monitor ID.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MonitorIdRequest {
    /// Target session.
    pub monitor_id: String,
}

/// Arguments for `requests_get_content`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetContentRequest {
    /// Target session.
    pub monitor_id: String,
    /// Captured request to fetch.
    pub request_id: String,
    /// Return binary bodies base64-encoded (default false).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_binary: Option<bool>,
    /// Write the request body to this path instead of returning it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_request_body_to: Option<String>,
    /// Write the response body to this path instead of returning it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_response_body_to: Option<String>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_required_fields_in_schema() {
        let schema = serde_json::to_value(schemars::schema_for!(TabsCreateRequest))
            .expect("schema");
        let required = schema["required"].as_array().expect("required");
        assert!(required.iter().any(|v| v == "url"));
        assert!(!required.iter().any(|v| v == "active"));

        let schema = serde_json::to_value(schemars::schema_for!(GetContentRequest))
            .expect("schema");
        let required = schema["required"].as_array().expect("required");
        assert!(required.iter().any(|v| v == "monitor_id"));
        assert!(required.iter().any(|v| v == "request_id"));
        assert!(!required.iter().any(|v| v == "include_binary"));
    }

    #[test]
    fn test_serialization_matches_handler_argument_shape() {
        let req = TabsCreateRequest {
            url: "https://example.com".to_string(),
            active: None,
            pinned: Some(true),
            window_id: None,
        };
        let args = serde_json::to_value(&req).expect("to_value");
        // Absent options do not appear as nulls.
        assert_eq!(args, json!({"url": "https://example.com", "pinned": true}));
    }

    #[test]
    fn test_deserialization_rejects_wrong_types() {
        let err = serde_json::from_value::<TabIdRequest>(json!({"tab_id": "seven"}));
        assert!(err.is_err());

        let err = serde_json::from_value::<StartMonitoringRequest>(json!({"url_patterns": "x"}));
        assert!(err.is_err());
    }
}
