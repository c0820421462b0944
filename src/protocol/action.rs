//! Closed catalog of browser actions.
//!
//! Every outbound request frame carries one of these dotted names; there
//! is no dynamic registration. Adding an action is an enum variant plus
//! one row in the name table.
//!
//! | Namespace | Actions |
//! |-----------|---------|
//! | `history` | `query`, `recent`, `delete_item` |
//! | `tabs` | `list`, `active`, `create`, `close`, `update`, `switch`, `capture_screenshot` |
//! | `content` | `get_text`, `get_html`, `execute_script` |
//! | `navigation` | `go_to_url`, `back`, `forward`, `reload` |
//! | `bookmarks` | `list`, `search`, `create`, `create_folder`, `update`, `delete` |
//! | `windows` | `list`, `get`, `get_current`, `get_last_focused`, `create`, `close`, `focus`, `update` |
//! | `requests` | `start_monitoring`, `stop_monitoring`, `list_captured`, `get_content` |
//! | (none) | `ping` |
//!
//! The extension additionally emits the inbound-only notification
//! `requests.captured`; the core never sends it.

// ============================================================================
// Action
// ============================================================================

/// One browser operation in the closed catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    // history
    /// Search browser history.
    HistoryQuery,
    /// Fetch most recent history items.
    HistoryRecent,
    /// Delete one history item by URL.
    HistoryDeleteItem,

    // tabs
    /// List open tabs.
    TabsList,
    /// Get the active tab.
    TabsActive,
    /// Open a new tab.
    TabsCreate,
    /// Close a tab.
    TabsClose,
    /// Update tab properties.
    TabsUpdate,
    /// Switch the active tab.
    TabsSwitch,
    /// Capture a screenshot of the visible tab.
    TabsCaptureScreenshot,

    // content
    /// Extract page text.
    ContentGetText,
    /// Extract page HTML.
    ContentGetHtml,
    /// Execute JavaScript in a tab.
    ContentExecuteScript,

    // navigation
    /// Navigate a tab to a URL.
    NavigationGoToUrl,
    /// Navigate back in tab history.
    NavigationBack,
    /// Navigate forward in tab history.
    NavigationForward,
    /// Reload a tab.
    NavigationReload,

    // bookmarks
    /// List bookmarks, optionally under a folder.
    BookmarksList,
    /// Search bookmarks.
    BookmarksSearch,
    /// Create a bookmark.
    BookmarksCreate,
    /// Create a bookmark folder.
    BookmarksCreateFolder,
    /// Update a bookmark.
    BookmarksUpdate,
    /// Delete a bookmark.
    BookmarksDelete,

    // windows
    /// List browser windows.
    WindowsList,
    /// Get one window by ID.
    WindowsGet,
    /// Get the current window.
    WindowsGetCurrent,
    /// Get the last focused window.
    WindowsGetLastFocused,
    /// Create a window.
    WindowsCreate,
    /// Close a window.
    WindowsClose,
    /// Focus a window.
    WindowsFocus,
    /// Update window properties.
    WindowsUpdate,

    // requests (monitoring)
    /// Start a web-request monitoring session.
    RequestsStartMonitoring,
    /// Stop a monitoring session.
    RequestsStopMonitoring,
    /// List captured request summaries.
    RequestsListCaptured,
    /// Fetch full content for one captured request.
    RequestsGetContent,
    /// Inbound-only capture notification from the extension.
    RequestsCaptured,

    // liveness
    /// Liveness probe.
    Ping,
}

// ============================================================================
// Name Table
// ============================================================================

/// Every action the core may place in an outbound request frame.
///
/// `requests.captured` is deliberately absent: it is inbound-only.
pub const CATALOG: &[Action] = &[
    Action::HistoryQuery,
    Action::HistoryRecent,
    Action::HistoryDeleteItem,
    Action::TabsList,
    Action::TabsActive,
    Action::TabsCreate,
    Action::TabsClose,
    Action::TabsUpdate,
    Action::TabsSwitch,
    Action::TabsCaptureScreenshot,
    Action::ContentGetText,
    Action::ContentGetHtml,
    Action::ContentExecuteScript,
    Action::NavigationGoToUrl,
    Action::NavigationBack,
    Action::NavigationForward,
    Action::NavigationReload,
    Action::BookmarksList,
    Action::BookmarksSearch,
    Action::BookmarksCreate,
    Action::BookmarksCreateFolder,
    Action::BookmarksUpdate,
    Action::BookmarksDelete,
    Action::WindowsList,
    Action::WindowsGet,
    Action::WindowsGetCurrent,
    Action::WindowsGetLastFocused,
    Action::WindowsCreate,
    Action::WindowsClose,
    Action::WindowsFocus,
    Action::WindowsUpdate,
    Action::RequestsStartMonitoring,
    Action::RequestsStopMonitoring,
    Action::RequestsListCaptured,
    Action::RequestsGetContent,
    Action::Ping,
];

impl Action {
    /// Returns the exact dotted wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HistoryQuery => "history.query",
            Self::HistoryRecent => "history.recent",
            Self::HistoryDeleteItem => "history.delete_item",
            Self::TabsList => "tabs.list",
            Self::TabsActive => "tabs.active",
            Self::TabsCreate => "tabs.create",
            Self::TabsClose => "tabs.close",
            Self::TabsUpdate => "tabs.update",
            Self::TabsSwitch => "tabs.switch",
            Self::TabsCaptureScreenshot => "tabs.capture_screenshot",
            Self::ContentGetText => "content.get_text",
            Self::ContentGetHtml => "content.get_html",
            Self::ContentExecuteScript => "content.execute_script",
            Self::NavigationGoToUrl => "navigation.go_to_url",
            Self::NavigationBack => "navigation.back",
            Self::NavigationForward => "navigation.forward",
            Self::NavigationReload => "navigation.reload",
            Self::BookmarksList => "bookmarks.list",
            Self::BookmarksSearch => "bookmarks.search",
            Self::BookmarksCreate => "bookmarks.create",
            Self::BookmarksCreateFolder => "bookmarks.create_folder",
            Self::BookmarksUpdate => "bookmarks.update",
            Self::BookmarksDelete => "bookmarks.delete",
            Self::WindowsList => "windows.list",
            Self::WindowsGet => "windows.get",
            Self::WindowsGetCurrent => "windows.get_current",
            Self::WindowsGetLastFocused => "windows.get_last_focused",
            Self::WindowsCreate => "windows.create",
            Self::WindowsClose => "windows.close",
            Self::WindowsFocus => "windows.focus",
            Self::WindowsUpdate => "windows.update",
            Self::RequestsStartMonitoring => "requests.start_monitoring",
            Self::RequestsStopMonitoring => "requests.stop_monitoring",
            Self::RequestsListCaptured => "requests.list_captured",
            Self::RequestsGetContent => "requests.get_content",
            Self::RequestsCaptured => "requests.captured",
            Self::Ping => "ping",
        }
    }

    /// Parses a dotted wire name back into the catalog.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "history.query" => Some(Self::HistoryQuery),
            "history.recent" => Some(Self::HistoryRecent),
            "history.delete_item" => Some(Self::HistoryDeleteItem),
            "tabs.list" => Some(Self::TabsList),
            "tabs.active" => Some(Self::TabsActive),
            "tabs.create" => Some(Self::TabsCreate),
            "tabs.close" => Some(Self::TabsClose),
            "tabs.update" => Some(Self::TabsUpdate),
            "tabs.switch" => Some(Self::TabsSwitch),
            "tabs.capture_screenshot" => Some(Self::TabsCaptureScreenshot),
            "content.get_text" => Some(Self::ContentGetText),
            "content.get_html" => Some(Self::ContentGetHtml),
            "content.execute_script" => Some(Self::ContentExecuteScript),
            "navigation.go_to_url" => Some(Self::NavigationGoToUrl),
            "navigation.back" => Some(Self::NavigationBack),
            "navigation.forward" => Some(Self::NavigationForward),
            "navigation.reload" => Some(Self::NavigationReload),
            "bookmarks.list" => Some(Self::BookmarksList),
            "bookmarks.search" => Some(Self::BookmarksSearch),
            "bookmarks.create" => Some(Self::BookmarksCreate),
            "bookmarks.create_folder" => Some(Self::BookmarksCreateFolder),
            "bookmarks.update" => Some(Self::BookmarksUpdate),
            "bookmarks.delete" => Some(Self::BookmarksDelete),
            "windows.list" => Some(Self::WindowsList),
            "windows.get" => Some(Self::WindowsGet),
            "windows.get_current" => Some(Self::WindowsGetCurrent),
            "windows.get_last_focused" => Some(Self::WindowsGetLastFocused),
            "windows.create" => Some(Self::WindowsCreate),
            "windows.close" => Some(Self::WindowsClose),
            "windows.focus" => Some(Self::WindowsFocus),
            "windows.update" => Some(Self::WindowsUpdate),
            "requests.start_monitoring" => Some(Self::RequestsStartMonitoring),
            "requests.stop_monitoring" => Some(Self::RequestsStopMonitoring),
            "requests.list_captured" => Some(Self::RequestsListCaptured),
            "requests.get_content" => Some(Self::RequestsGetContent),
            "requests.captured" => Some(Self::RequestsCaptured),
            "ping" => Some(Self::Ping),
            _ => None,
        }
    }

    /// Returns the namespace before the dot (`"ping"` has none).
    #[inline]
    #[must_use]
    pub fn namespace(self) -> &'static str {
        self.as_str().split('.').next().unwrap_or_default()
    }

    /// Returns `true` for names the extension may send unsolicited as
    /// `type=request` notification frames.
    ///
    /// The `requests.*` namespace is authoritative for this distinction.
    #[inline]
    #[must_use]
    pub fn is_notification_namespace(name: &str) -> bool {
        name.starts_with("requests.")
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_round_trip() {
        for &action in CATALOG {
            assert_eq!(Action::parse(action.as_str()), Some(action));
        }
    }

    #[test]
    fn test_catalog_names_unique() {
        let mut names: Vec<&str> = CATALOG.iter().map(|a| a.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), CATALOG.len());
    }

    #[test]
    fn test_captured_is_inbound_only() {
        assert!(!CATALOG.contains(&Action::RequestsCaptured));
        assert_eq!(
            Action::parse("requests.captured"),
            Some(Action::RequestsCaptured)
        );
    }

    #[test]
    fn test_unknown_name_rejected() {
        assert!(Action::parse("tabs.explode").is_none());
        assert!(Action::parse("").is_none());
    }

    #[test]
    fn test_namespace() {
        assert_eq!(Action::TabsList.namespace(), "tabs");
        assert_eq!(Action::RequestsGetContent.namespace(), "requests");
        assert_eq!(Action::Ping.namespace(), "ping");
    }

    #[test]
    fn test_notification_namespace_rule() {
        assert!(Action::is_notification_namespace("requests.captured"));
        assert!(Action::is_notification_namespace("requests.start_monitoring"));
        assert!(!Action::is_notification_namespace("tabs.list"));
        assert!(!Action::is_notification_namespace("ping"));
    }

    #[test]
    fn test_spec_pinned_names() {
        // Load-bearing wire names for the external extension.
        assert_eq!(Action::HistoryQuery.as_str(), "history.query");
        assert_eq!(Action::HistoryRecent.as_str(), "history.recent");
        assert_eq!(Action::TabsCaptureScreenshot.as_str(), "tabs.capture_screenshot");
        assert_eq!(Action::ContentExecuteScript.as_str(), "content.execute_script");
    }
}
