//! MCP server and HTTP endpoint.
//!
//! One `#[tool]` method per tool handler, registered through rmcp's
//! `ToolRouter` and served over axum with the streamable HTTP transport.
//! Argument schemas are derived from the typed request structs in
//! [`super::requests`]; tool failures are MCP-level error results (the
//! endpoint keeps serving through every tool failure), with the message
//! naming the error kind.

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use rmcp::{
    ErrorData, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    tool, tool_handler, tool_router,
    transport::streamable_http_server::{
        StreamableHttpService, session::local::LocalSessionManager,
    },
};
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::info;

use crate::bridge::Bridge;
use crate::error::Result as BridgeResult;
use crate::handlers;
use crate::mcp::requests::*;

// ============================================================================
// Serving
// ============================================================================

/// Binds the MCP HTTP endpoint and serves it until the process exits.
///
/// # Errors
///
/// Returns [`crate::Error::Io`] on bind or serve failure.
pub async fn serve(bridge: Arc<Bridge>) -> BridgeResult<()> {
    let addr = SocketAddr::new(bridge.config.host, bridge.config.mcp_port);
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "MCP endpoint listening");

    let router = axum::Router::new().nest_service("/mcp", http_service(bridge));
    axum::serve(listener, router).await?;
    Ok(())
}

/// Builds the streamable HTTP service for the bridge.
///
/// Exposed separately from [`serve`] so the endpoint can be embedded by
/// another process.
#[must_use]
pub fn http_service(bridge: Arc<Bridge>) -> StreamableHttpService<BridgeServer> {
    StreamableHttpService::new(
        move || Ok(BridgeServer::new(bridge.clone())),
        LocalSessionManager::default().into(),
        Default::default(),
    )
}

// ============================================================================
// BridgeServer
// ============================================================================

/// The MCP server: every tool delegates to its handler in
/// [`crate::handlers`], sharing one [`Bridge`] across sessions.
#[derive(Clone)]
pub struct BridgeServer {
    bridge: Arc<Bridge>,
    tool_router: ToolRouter<Self>,
}

impl BridgeServer {
    /// Builds a server over the shared bridge state.
    #[must_use]
    pub fn new(bridge: Arc<Bridge>) -> Self {
        Self {
            bridge,
            tool_router: Self::tool_router(),
        }
    }
}

// ============================================================================
// Tools
// ============================================================================

#[tool_router]
impl BridgeServer {
    // ========================================================================
    // Tabs
    // ========================================================================

    #[tool(description = "List all open browser tabs")]
    async fn tabs_list(&self) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::tabs::list(&self.bridge).await)
    }

    #[tool(description = "Get the currently active tab")]
    async fn tabs_get_active(&self) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::tabs::get_active(&self.bridge).await)
    }

    #[tool(description = "Open a new tab")]
    async fn tabs_create(
        &self,
        Parameters(req): Parameters<TabsCreateRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::tabs::create(&self.bridge, &to_args(&req)?).await)
    }

    #[tool(description = "Close a tab")]
    async fn tabs_close(
        &self,
        Parameters(req): Parameters<TabIdRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::tabs::close(&self.bridge, &to_args(&req)?).await)
    }

    #[tool(description = "Make a tab active")]
    async fn tabs_switch(
        &self,
        Parameters(req): Parameters<TabIdRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::tabs::switch(&self.bridge, &to_args(&req)?).await)
    }

    #[tool(description = "Update tab properties")]
    async fn tabs_update(
        &self,
        Parameters(req): Parameters<TabsUpdateRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::tabs::update(&self.bridge, &to_args(&req)?).await)
    }

    #[tool(
        description = "Capture a screenshot of the visible tab; returns a data URL or writes a file"
    )]
    async fn tabs_capture_screenshot(
        &self,
        Parameters(req): Parameters<ScreenshotRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::tabs::capture_screenshot(&self.bridge, &to_args(&req)?).await)
    }

    // ========================================================================
    // History
    // ========================================================================

    #[tool(description = "Search browser history")]
    async fn history_query(
        &self,
        Parameters(req): Parameters<HistoryQueryRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::history::query(&self.bridge, &to_args(&req)?).await)
    }

    #[tool(description = "Get the most recent history items")]
    async fn history_get_recent(
        &self,
        Parameters(req): Parameters<HistoryRecentRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::history::get_recent(&self.bridge, &to_args(&req)?).await)
    }

    #[tool(description = "Delete one history item by URL")]
    async fn history_delete_item(
        &self,
        Parameters(req): Parameters<UrlRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::history::delete_item(&self.bridge, &to_args(&req)?).await)
    }

    // ========================================================================
    // Bookmarks
    // ========================================================================

    #[tool(description = "List bookmarks as a tree, optionally under one folder")]
    async fn bookmarks_list(
        &self,
        Parameters(req): Parameters<BookmarksListRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::bookmarks::list(&self.bridge, &to_args(&req)?).await)
    }

    #[tool(description = "Search bookmarks")]
    async fn bookmarks_search(
        &self,
        Parameters(req): Parameters<QueryRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::bookmarks::search(&self.bridge, &to_args(&req)?).await)
    }

    #[tool(description = "Create a bookmark")]
    async fn bookmarks_create(
        &self,
        Parameters(req): Parameters<BookmarksCreateRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::bookmarks::create(&self.bridge, &to_args(&req)?).await)
    }

    #[tool(description = "Create a bookmark folder")]
    async fn bookmarks_create_folder(
        &self,
        Parameters(req): Parameters<BookmarksCreateFolderRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::bookmarks::create_folder(&self.bridge, &to_args(&req)?).await)
    }

    #[tool(description = "Update a bookmark's title or URL")]
    async fn bookmarks_update(
        &self,
        Parameters(req): Parameters<BookmarksUpdateRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::bookmarks::update(&self.bridge, &to_args(&req)?).await)
    }

    #[tool(description = "Delete a bookmark")]
    async fn bookmarks_delete(
        &self,
        Parameters(req): Parameters<BookmarkIdRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::bookmarks::delete(&self.bridge, &to_args(&req)?).await)
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    #[tool(description = "Navigate back in a tab's history")]
    async fn navigation_back(
        &self,
        Parameters(req): Parameters<TabIdRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::navigation::back(&self.bridge, &to_args(&req)?).await)
    }

    #[tool(description = "Navigate forward in a tab's history")]
    async fn navigation_forward(
        &self,
        Parameters(req): Parameters<TabIdRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::navigation::forward(&self.bridge, &to_args(&req)?).await)
    }

    #[tool(description = "Reload a tab")]
    async fn navigation_reload(
        &self,
        Parameters(req): Parameters<NavigationReloadRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::navigation::reload(&self.bridge, &to_args(&req)?).await)
    }

    #[tool(description = "Navigate a tab to a URL")]
    async fn navigation_go_to_url(
        &self,
        Parameters(req): Parameters<NavigateRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::navigation::go_to_url(&self.bridge, &to_args(&req)?).await)
    }

    // ========================================================================
    // Content
    // ========================================================================

    #[tool(description = "Extract the visible text of a page")]
    async fn content_get_text(
        &self,
        Parameters(req): Parameters<ContentGetTextRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::content::get_text(&self.bridge, &to_args(&req)?).await)
    }

    #[tool(description = "Extract the HTML of a page")]
    async fn content_get_html(
        &self,
        Parameters(req): Parameters<TabIdRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::content::get_html(&self.bridge, &to_args(&req)?).await)
    }

    #[tool(description = "Execute JavaScript in a tab and return the reported value as JSON")]
    async fn content_execute_script(
        &self,
        Parameters(req): Parameters<ExecuteScriptRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::content::execute_script(&self.bridge, &to_args(&req)?).await)
    }

    #[tool(
        description = "Run a predefined script from the configured directory, then execute its output in a tab"
    )]
    async fn content_execute_predefined(
        &self,
        Parameters(req): Parameters<ExecutePredefinedRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::content::execute_predefined(&self.bridge, &to_args(&req)?).await)
    }

    // ========================================================================
    // Windows
    // ========================================================================

    #[tool(description = "List all browser windows")]
    async fn list_windows(
        &self,
        Parameters(req): Parameters<PopulateRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::windows::list(&self.bridge, &to_args(&req)?).await)
    }

    #[tool(description = "Get one window by ID")]
    async fn get_window(
        &self,
        Parameters(req): Parameters<GetWindowRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::windows::get(&self.bridge, &to_args(&req)?).await)
    }

    #[tool(description = "Get the current window")]
    async fn get_current_window(
        &self,
        Parameters(req): Parameters<PopulateRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::windows::get_current(&self.bridge, &to_args(&req)?).await)
    }

    #[tool(description = "Get the most recently focused window")]
    async fn get_last_focused_window(
        &self,
        Parameters(req): Parameters<PopulateRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::windows::get_last_focused(&self.bridge, &to_args(&req)?).await)
    }

    #[tool(description = "Open a new browser window")]
    async fn create_window(
        &self,
        Parameters(req): Parameters<CreateWindowRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::windows::create(&self.bridge, &to_args(&req)?).await)
    }

    #[tool(description = "Close a window")]
    async fn close_window(
        &self,
        Parameters(req): Parameters<WindowIdRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::windows::close(&self.bridge, &to_args(&req)?).await)
    }

    #[tool(description = "Bring a window to the front")]
    async fn focus_window(
        &self,
        Parameters(req): Parameters<WindowIdRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::windows::focus(&self.bridge, &to_args(&req)?).await)
    }

    #[tool(description = "Update window geometry or state")]
    async fn update_window(
        &self,
        Parameters(req): Parameters<UpdateWindowRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::windows::update(&self.bridge, &to_args(&req)?).await)
    }

    // ========================================================================
    // Request Monitoring
    // ========================================================================

    #[tool(description = "Start observing web requests matching URL patterns")]
    async fn requests_start_monitoring(
        &self,
        Parameters(req): Parameters<StartMonitoringRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::requests::start_monitoring(&self.bridge, &to_args(&req)?).await)
    }

    #[tool(description = "Stop a monitoring session and return its statistics")]
    async fn requests_stop_monitoring(
        &self,
        Parameters(req): Parameters<StopMonitoringRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::requests::stop_monitoring(&self.bridge, &to_args(&req)?).await)
    }

    #[tool(description = "List captured request summaries for a session")]
    async fn requests_list_captured(
        &self,
        Parameters(req): Parameters<MonitorIdRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::requests::list_captured(&self.bridge, &to_args(&req)?).await)
    }

    #[tool(description = "Get headers and bodies for one captured request")]
    async fn requests_get_content(
        &self,
        Parameters(req): Parameters<GetContentRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::requests::get_content(&self.bridge, &to_args(&req)?).await)
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    #[tool(description = "Report extension-connection diagnostics")]
    async fn debug_websocket_status(&self) -> Result<CallToolResult, ErrorData> {
        tool_result(handlers::debug::websocket_status(&self.bridge).await)
    }
}

// ============================================================================
// ServerHandler
// ============================================================================

#[tool_handler]
impl ServerHandler for BridgeServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "foxmcp-bridge".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                website_url: None,
                icons: None,
            },
            instructions: Some(
                "Browser automation tools bridged to a Firefox extension over a local \
                 WebSocket. Calls fail fast with 'disconnected' until the extension connects."
                    .to_string(),
            ),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Serializes a request struct into the argument object the handlers
/// validate. Skipped options are absent, not null.
fn to_args<T: Serialize>(req: &T) -> Result<Value, ErrorData> {
    serde_json::to_value(req).map_err(|e| ErrorData::internal_error(e.to_string(), None))
}

/// Maps a handler outcome onto the MCP result shape.
///
/// Failures become `isError` results naming the error kind; they are
/// never protocol-level errors.
fn tool_result(result: BridgeResult<String>) -> Result<CallToolResult, ErrorData> {
    match result {
        Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
        Err(e) => Ok(CallToolResult::error(vec![Content::text(format!(
            "Error ({}): {}",
            e.kind(),
            e
        ))])),
    }
}

// ============================================================================
// Tests
// ============================================================================
