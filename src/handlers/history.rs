//! History tools.
//!
//! The outbound search key is `query` (not `text`) and item times arrive
//! under `lastVisitTime` as epoch milliseconds; both are load-bearing
//! contracts with the extension.

// ============================================================================
// Imports
// ============================================================================

use chrono::DateTime;
use serde_json::{Value, json};

use crate::bridge::Bridge;
use crate::error::{Error, Result};
use crate::protocol::Action;
use crate::transport::DEFAULT_CALL_TIMEOUT;

use super::{opt_u64, require_str};

// ============================================================================
// Tools
// ============================================================================

/// `history_query`: searches browser history.
///
/// An empty query is rejected locally rather than forwarded.
pub async fn query(bridge: &Bridge, args: &Value) -> Result<String> {
    let query = require_str(args, "query")?;
    let max_results = opt_u64(args, "max_results", 50)?;
    if max_results == 0 {
        return Err(Error::invalid_argument("'max_results' must be positive"));
    }

    let data = bridge
        .dispatcher
        .call(
            Action::HistoryQuery,
            json!({"query": query, "maxResults": max_results}),
            DEFAULT_CALL_TIMEOUT,
        )
        .await?;

    let items = history_items(&data);
    let mut out = format!("History results for '{query}' ({} found):", items.len());
    for item in &items {
        out.push('\n');
        out.push_str(&format_item_line(item));
    }
    Ok(out)
}

/// `history_get_recent`: fetches the most recent history items.
pub async fn get_recent(bridge: &Bridge, args: &Value) -> Result<String> {
    let count = opt_u64(args, "count", 10)?;
    if count == 0 {
        return Err(Error::invalid_argument("'count' must be positive"));
    }

    let data = bridge
        .dispatcher
        .call(Action::HistoryRecent, json!({"count": count}), DEFAULT_CALL_TIMEOUT)
        .await?;

    let items = history_items(&data);
    let mut out = format!("Recent history ({} items):", items.len());
    for item in &items {
        out.push('\n');
        out.push_str(&format_item_line(item));
    }
    Ok(out)
}

/// `history_delete_item`: deletes one history item by URL.
pub async fn delete_item(bridge: &Bridge, args: &Value) -> Result<String> {
    let url = require_str(args, "url")?;
    bridge
        .dispatcher
        .call(Action::HistoryDeleteItem, json!({"url": url}), DEFAULT_CALL_TIMEOUT)
        .await?;
    Ok(format!("Deleted history item: {url}"))
}

// ============================================================================
// Formatting
// ============================================================================

fn history_items(data: &Value) -> Vec<Value> {
    data.get("items")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn format_item_line(item: &Value) -> String {
    let title = item.get("title").and_then(Value::as_str).unwrap_or("(no title)");
    let url = item.get("url").and_then(Value::as_str).unwrap_or("");
    format!(
        "- {title} - {url} (last visited: {})",
        render_last_visit(item)
    )
}

/// Renders the extension's `lastVisitTime` epoch-millisecond field.
fn render_last_visit(item: &Value) -> String {
    item.get("lastVisitTime")
        .and_then(Value::as_f64)
        .and_then(|ms| DateTime::from_timestamp_millis(ms as i64))
        .map_or_else(
            || "unknown".to_string(),
            |dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        )
}

// ============================================================================
// Tests
// ============================================================================
