//! Window tools.

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Value, json};

use crate::bridge::Bridge;
use crate::error::{Error, Result};
use crate::protocol::Action;
use crate::transport::DEFAULT_CALL_TIMEOUT;

use super::{opt_bool, opt_i64, opt_str, require_i64, validate_url};

// ============================================================================
// Constants
// ============================================================================

const WINDOW_TYPES: &[&str] = &["normal", "popup", "panel", "detached_panel"];
const WINDOW_STATES: &[&str] = &["normal", "minimized", "maximized", "fullscreen"];

// ============================================================================
// Queries
// ============================================================================

/// `list_windows`: lists every browser window.
pub async fn list(bridge: &Bridge, args: &Value) -> Result<String> {
    let populate = opt_bool(args, "populate", true)?;
    let data = bridge
        .dispatcher
        .call(Action::WindowsList, json!({"populate": populate}), DEFAULT_CALL_TIMEOUT)
        .await?;

    let windows = data
        .get("windows")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut out = format!("Open windows ({} found):", windows.len());
    for window in &windows {
        out.push('\n');
        out.push_str(&format_window_line(window));
    }
    Ok(out)
}

/// `get_window`: describes one window by ID.
pub async fn get(bridge: &Bridge, args: &Value) -> Result<String> {
    let window_id = require_i64(args, "window_id")?;
    let populate = opt_bool(args, "populate", true)?;
    let data = bridge
        .dispatcher
        .call(
            Action::WindowsGet,
            json!({"windowId": window_id, "populate": populate}),
            DEFAULT_CALL_TIMEOUT,
        )
        .await?;
    Ok(describe_window(&data))
}

/// `get_current_window`: describes the current window.
pub async fn get_current(bridge: &Bridge, args: &Value) -> Result<String> {
    let populate = opt_bool(args, "populate", true)?;
    let data = bridge
        .dispatcher
        .call(
            Action::WindowsGetCurrent,
            json!({"populate": populate}),
            DEFAULT_CALL_TIMEOUT,
        )
        .await?;
    Ok(describe_window(&data))
}

/// `get_last_focused_window`: describes the last focused window.
pub async fn get_last_focused(bridge: &Bridge, args: &Value) -> Result<String> {
    let populate = opt_bool(args, "populate", true)?;
    let data = bridge
        .dispatcher
        .call(
            Action::WindowsGetLastFocused,
            json!({"populate": populate}),
            DEFAULT_CALL_TIMEOUT,
        )
        .await?;
    Ok(describe_window(&data))
}

// ============================================================================
// Mutation
// ============================================================================

/// `create_window`: opens a new browser window.
pub async fn create(bridge: &Bridge, args: &Value) -> Result<String> {
    let window_type = opt_str(args, "window_type")?.unwrap_or("normal");
    if !WINDOW_TYPES.contains(&window_type) {
        return Err(Error::invalid_argument(format!(
            "'window_type' must be one of {WINDOW_TYPES:?}"
        )));
    }
    let state = opt_str(args, "state")?.unwrap_or("normal");
    if !WINDOW_STATES.contains(&state) {
        return Err(Error::invalid_argument(format!(
            "'state' must be one of {WINDOW_STATES:?}"
        )));
    }

    let mut data = json!({
        "type": window_type,
        "state": state,
        "focused": opt_bool(args, "focused", true)?,
        "incognito": opt_bool(args, "incognito", false)?,
    });
    if let Some(url) = opt_str(args, "url")? {
        validate_url("url", url)?;
        data["url"] = json!(url);
    }
    for key in ["width", "height", "top", "left"] {
        if let Some(value) = opt_i64(args, key)? {
            data[key] = json!(value);
        }
    }

    let result = bridge
        .dispatcher
        .call(Action::WindowsCreate, data, DEFAULT_CALL_TIMEOUT)
        .await?;

    let window = result.get("window").unwrap_or(&result);
    let id = window.get("id").and_then(Value::as_i64).unwrap_or(-1);
    Ok(format!("Created window {id}"))
}

/// `close_window`: closes a window.
pub async fn close(bridge: &Bridge, args: &Value) -> Result<String> {
    let window_id = require_i64(args, "window_id")?;
    bridge
        .dispatcher
        .call(Action::WindowsClose, json!({"windowId": window_id}), DEFAULT_CALL_TIMEOUT)
        .await?;
    Ok(format!("Closed window {window_id}"))
}

/// `focus_window`: brings a window to the front.
pub async fn focus(bridge: &Bridge, args: &Value) -> Result<String> {
    let window_id = require_i64(args, "window_id")?;
    bridge
        .dispatcher
        .call(Action::WindowsFocus, json!({"windowId": window_id}), DEFAULT_CALL_TIMEOUT)
        .await?;
    Ok(format!("Focused window {window_id}"))
}

/// `update_window`: updates window geometry or state.
pub async fn update(bridge: &Bridge, args: &Value) -> Result<String> {
    let window_id = require_i64(args, "window_id")?;

    let mut data = json!({"windowId": window_id});
    if let Some(state) = opt_str(args, "state")? {
        if !WINDOW_STATES.contains(&state) {
            return Err(Error::invalid_argument(format!(
                "'state' must be one of {WINDOW_STATES:?}"
            )));
        }
        data["state"] = json!(state);
    }
    if let Some(Value::Bool(focused)) = args.get("focused") {
        data["focused"] = json!(focused);
    } else if matches!(args.get("focused"), Some(v) if !v.is_null()) {
        return Err(Error::invalid_argument("'focused' must be a boolean"));
    }
    for key in ["width", "height", "top", "left"] {
        if let Some(value) = opt_i64(args, key)? {
            data[key] = json!(value);
        }
    }

    if data.as_object().map(|o| o.len()) == Some(1) {
        return Err(Error::invalid_argument(
            "at least one of 'state', 'focused', 'width', 'height', 'top', 'left' is required",
        ));
    }

    bridge
        .dispatcher
        .call(Action::WindowsUpdate, data, DEFAULT_CALL_TIMEOUT)
        .await?;
    Ok(format!("Updated window {window_id}"))
}

// ============================================================================
// Formatting
// ============================================================================

fn describe_window(data: &Value) -> String {
    let window = data.get("window").unwrap_or(data);
    format!("Window details:\n{}", format_window_line(window))
}

fn format_window_line(window: &Value) -> String {
    let id = window.get("id").and_then(Value::as_i64).unwrap_or(-1);
    let wtype = window.get("type").and_then(Value::as_str).unwrap_or("normal");
    let state = window.get("state").and_then(Value::as_str).unwrap_or("normal");
    let width = window.get("width").and_then(Value::as_i64).unwrap_or(0);
    let height = window.get("height").and_then(Value::as_i64).unwrap_or(0);
    let left = window.get("left").and_then(Value::as_i64).unwrap_or(0);
    let top = window.get("top").and_then(Value::as_i64).unwrap_or(0);

    let mut line =
        format!("- Window {id}: {wtype} {state} {width}x{height} at ({left}, {top})");
    if let Some(tabs) = window.get("tabs").and_then(Value::as_array) {
        line.push_str(&format!(", {} tabs", tabs.len()));
    }
    if window.get("focused").and_then(Value::as_bool).unwrap_or(false) {
        line.push_str(" (focused)");
    }
    if window.get("incognito").and_then(Value::as_bool).unwrap_or(false) {
        line.push_str(" (incognito)");
    }
    line
}

// ============================================================================
// Tests
// ============================================================================
