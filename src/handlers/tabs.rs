//! Tab tools.
//!
//! Listing, creation, switching, property updates, and screenshot
//! capture. The list format is a wire-stable contract with MCP clients:
//!
//! ```text
//! Open tabs (2 found):
//! - ID 7: Example - https://example.com (active)
//! - ID 8: Docs - https://docs.example.com (pinned)
//! ```

// ============================================================================
// Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use serde_json::{Value, json};
use tracing::debug;

use crate::bridge::Bridge;
use crate::error::{Error, Result};
use crate::protocol::Action;
use crate::transport::DEFAULT_CALL_TIMEOUT;

use super::{SCREENSHOT_TIMEOUT, opt_bool, opt_i64, opt_str, opt_u64, require_i64, require_str, validate_url};

// ============================================================================
// Listing
// ============================================================================

/// `tabs_list`: lists every open tab.
pub async fn list(bridge: &Bridge) -> Result<String> {
    let data = bridge
        .dispatcher
        .call(Action::TabsList, json!({}), DEFAULT_CALL_TIMEOUT)
        .await?;

    let tabs = data
        .get("tabs")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut out = format!("Open tabs ({} found):", tabs.len());
    for tab in &tabs {
        out.push('\n');
        out.push_str(&format_tab_line(tab));
    }
    Ok(out)
}

/// `tabs_get_active`: describes the active tab.
pub async fn get_active(bridge: &Bridge) -> Result<String> {
    let data = bridge
        .dispatcher
        .call(Action::TabsActive, json!({}), DEFAULT_CALL_TIMEOUT)
        .await?;

    let tab = data.get("tab").unwrap_or(&data);
    Ok(format!("Active tab:\n{}", format_tab_line(tab)))
}

// ============================================================================
// Mutation
// ============================================================================

/// `tabs_create`: opens a new tab.
pub async fn create(bridge: &Bridge, args: &Value) -> Result<String> {
    let url = require_str(args, "url")?;
    validate_url("url", url)?;
    let active = opt_bool(args, "active", true)?;
    let pinned = opt_bool(args, "pinned", false)?;
    let window_id = opt_i64(args, "window_id")?;

    let mut data = json!({"url": url, "active": active, "pinned": pinned});
    if let Some(window_id) = window_id {
        data["windowId"] = json!(window_id);
    }

    let result = bridge
        .dispatcher
        .call(Action::TabsCreate, data, DEFAULT_CALL_TIMEOUT)
        .await?;

    let tab = result.get("tab").unwrap_or(&result);
    let id = tab.get("id").and_then(Value::as_i64).unwrap_or(-1);
    Ok(format!("Created tab ID {id}: {url}"))
}

/// `tabs_close`: closes a tab.
pub async fn close(bridge: &Bridge, args: &Value) -> Result<String> {
    let tab_id = require_i64(args, "tab_id")?;
    bridge
        .dispatcher
        .call(Action::TabsClose, json!({"tabId": tab_id}), DEFAULT_CALL_TIMEOUT)
        .await?;
    Ok(format!("Closed tab {tab_id}"))
}

/// `tabs_switch`: makes a tab active.
pub async fn switch(bridge: &Bridge, args: &Value) -> Result<String> {
    let tab_id = require_i64(args, "tab_id")?;
    bridge
        .dispatcher
        .call(Action::TabsSwitch, json!({"tabId": tab_id}), DEFAULT_CALL_TIMEOUT)
        .await?;
    Ok(format!("Switched to tab {tab_id}"))
}

/// `tabs_update`: updates tab properties.
pub async fn update(bridge: &Bridge, args: &Value) -> Result<String> {
    let tab_id = require_i64(args, "tab_id")?;

    let mut data = json!({"tabId": tab_id});
    if let Some(url) = opt_str(args, "url")? {
        validate_url("url", url)?;
        data["url"] = json!(url);
    }
    if let Some(Value::Bool(active)) = args.get("active") {
        data["active"] = json!(active);
    } else if matches!(args.get("active"), Some(v) if !v.is_null()) {
        return Err(Error::invalid_argument("'active' must be a boolean"));
    }
    if let Some(Value::Bool(pinned)) = args.get("pinned") {
        data["pinned"] = json!(pinned);
    } else if matches!(args.get("pinned"), Some(v) if !v.is_null()) {
        return Err(Error::invalid_argument("'pinned' must be a boolean"));
    }
    if let Some(Value::Bool(muted)) = args.get("muted") {
        data["muted"] = json!(muted);
    } else if matches!(args.get("muted"), Some(v) if !v.is_null()) {
        return Err(Error::invalid_argument("'muted' must be a boolean"));
    }

    if data.as_object().map(|o| o.len()) == Some(1) {
        return Err(Error::invalid_argument(
            "at least one of 'url', 'active', 'pinned', 'muted' is required",
        ));
    }

    bridge
        .dispatcher
        .call(Action::TabsUpdate, data, DEFAULT_CALL_TIMEOUT)
        .await?;
    Ok(format!("Updated tab {tab_id}"))
}

// ============================================================================
// Screenshots
// ============================================================================

/// `tabs_capture_screenshot`: captures the visible tab.
///
/// Without a `filename` the base64 data URL is returned directly;
/// otherwise the image bytes are decoded and written to disk, appending
/// the format-appropriate suffix when the filename lacks one.
pub async fn capture_screenshot(bridge: &Bridge, args: &Value) -> Result<String> {
    let format = match opt_str(args, "format")?.unwrap_or("png") {
        "png" => "png",
        "jpeg" | "jpg" => "jpeg",
        other => {
            return Err(Error::invalid_argument(format!(
                "'format' must be \"png\" or \"jpeg\", got \"{other}\""
            )));
        }
    };
    let quality = opt_u64(args, "quality", 90)?;
    if quality > 100 {
        return Err(Error::invalid_argument("'quality' must be between 0 and 100"));
    }
    let window_id = opt_i64(args, "window_id")?;
    let filename = opt_str(args, "filename")?;

    let mut data = json!({"format": format, "quality": quality});
    if let Some(window_id) = window_id {
        data["windowId"] = json!(window_id);
    }

    let result = bridge
        .dispatcher
        .call(Action::TabsCaptureScreenshot, data, SCREENSHOT_TIMEOUT)
        .await?;

    let data_url = result
        .get("dataUrl")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::protocol("screenshot response is missing the dataUrl field"))?;

    let Some(filename) = filename else {
        return Ok(data_url.to_string());
    };

    let path = screenshot_path(filename, format);
    let bytes = decode_data_url(data_url)?;
    tokio::fs::write(&path, &bytes).await.map_err(Error::Io)?;

    debug!(path = %path, size = bytes.len(), "Screenshot written");
    Ok(format!("Screenshot saved to {path} ({} bytes)", bytes.len()))
}

/// Appends the format-appropriate suffix unless already present.
fn screenshot_path(filename: &str, format: &str) -> String {
    let lower = filename.to_ascii_lowercase();
    let has_suffix = match format {
        "jpeg" => lower.ends_with(".jpg") || lower.ends_with(".jpeg"),
        _ => lower.ends_with(".png"),
    };

    if has_suffix {
        filename.to_string()
    } else if format == "jpeg" {
        format!("{filename}.jpg")
    } else {
        format!("{filename}.png")
    }
}

/// Decodes the base64 payload of a `data:` URL (or a bare base64 string).
fn decode_data_url(data_url: &str) -> Result<Vec<u8>> {
    let b64 = data_url
        .split_once("base64,")
        .map_or(data_url, |(_, rest)| rest);
    Base64Standard
        .decode(b64.trim())
        .map_err(|e| Error::protocol(format!("screenshot payload is not valid base64: {e}")))
}

// ============================================================================
// Formatting
// ============================================================================

/// One `- ID {id}: {title} - {url}` line with status suffixes.
fn format_tab_line(tab: &Value) -> String {
    let id = tab.get("id").and_then(Value::as_i64).unwrap_or(-1);
    let title = tab.get("title").and_then(Value::as_str).unwrap_or("(no title)");
    let url = tab.get("url").and_then(Value::as_str).unwrap_or("");

    let mut line = format!("- ID {id}: {title} - {url}");
    if tab.get("active").and_then(Value::as_bool).unwrap_or(false) {
        line.push_str(" (active)");
    }
    if tab.get("pinned").and_then(Value::as_bool).unwrap_or(false) {
        line.push_str(" (pinned)");
    }
    line
}

// ============================================================================
// Tests
// ============================================================================
