//! Bookmark tools.
//!
//! The list view renders the bookmark tree with 📁 (folder) and 🔖
//! (bookmark) prefixes, carrying `id` and `parentId` on every node so
//! clients can address nodes in follow-up calls.

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Value, json};

use crate::bridge::Bridge;
use crate::error::{Error, Result};
use crate::protocol::Action;
use crate::transport::DEFAULT_CALL_TIMEOUT;

use super::{opt_str, require_str, validate_url};

// ============================================================================
// Tools
// ============================================================================

/// `bookmarks_list`: renders the bookmark tree.
pub async fn list(bridge: &Bridge, args: &Value) -> Result<String> {
    let folder_id = opt_str(args, "folder_id")?;

    let mut data = json!({});
    if let Some(folder_id) = folder_id {
        data["folderId"] = json!(folder_id);
    }

    let result = bridge
        .dispatcher
        .call(Action::BookmarksList, data, DEFAULT_CALL_TIMEOUT)
        .await?;

    let nodes = bookmark_nodes(&result);
    if nodes.is_empty() {
        return Ok("No bookmarks found".to_string());
    }

    let mut out = String::from("Bookmarks:");
    for node in &nodes {
        format_node(node, 0, &mut out);
    }
    Ok(out)
}

/// `bookmarks_search`: searches bookmarks by query.
pub async fn search(bridge: &Bridge, args: &Value) -> Result<String> {
    let query = require_str(args, "query")?;
    let result = bridge
        .dispatcher
        .call(Action::BookmarksSearch, json!({"query": query}), DEFAULT_CALL_TIMEOUT)
        .await?;

    let nodes = bookmark_nodes(&result);
    let mut out = format!("Bookmark results for '{query}' ({} found):", nodes.len());
    for node in &nodes {
        let title = node.get("title").and_then(Value::as_str).unwrap_or("(no title)");
        let url = node.get("url").and_then(Value::as_str).unwrap_or("");
        out.push_str(&format!("\n- 🔖 {title} - {url} [id: {}]", node_id(node)));
    }
    Ok(out)
}

/// `bookmarks_create`: creates a bookmark.
pub async fn create(bridge: &Bridge, args: &Value) -> Result<String> {
    let title = require_str(args, "title")?;
    let url = require_str(args, "url")?;
    validate_url("url", url)?;

    let mut data = json!({"title": title, "url": url});
    if let Some(parent_id) = opt_str(args, "parent_id")? {
        data["parentId"] = json!(parent_id);
    }

    let result = bridge
        .dispatcher
        .call(Action::BookmarksCreate, data, DEFAULT_CALL_TIMEOUT)
        .await?;

    let node = result.get("bookmark").unwrap_or(&result);
    Ok(format!("Created bookmark '{title}' (ID {})", node_id(node)))
}

/// `bookmarks_create_folder`: creates a bookmark folder.
pub async fn create_folder(bridge: &Bridge, args: &Value) -> Result<String> {
    let title = require_str(args, "title")?;

    let mut data = json!({"title": title});
    if let Some(parent_id) = opt_str(args, "parent_id")? {
        data["parentId"] = json!(parent_id);
    }

    let result = bridge
        .dispatcher
        .call(Action::BookmarksCreateFolder, data, DEFAULT_CALL_TIMEOUT)
        .await?;

    let node = result.get("bookmark").unwrap_or(&result);
    Ok(format!("Created folder '{title}' (ID {})", node_id(node)))
}

/// `bookmarks_update`: retitles or re-urls a bookmark.
pub async fn update(bridge: &Bridge, args: &Value) -> Result<String> {
    let bookmark_id = require_str(args, "bookmark_id")?;
    let title = opt_str(args, "title")?;
    let url = opt_str(args, "url")?;

    if title.is_none() && url.is_none() {
        return Err(Error::invalid_argument(
            "at least one of 'title', 'url' is required",
        ));
    }

    let mut data = json!({"bookmarkId": bookmark_id});
    if let Some(title) = title {
        data["title"] = json!(title);
    }
    if let Some(url) = url {
        validate_url("url", url)?;
        data["url"] = json!(url);
    }

    bridge
        .dispatcher
        .call(Action::BookmarksUpdate, data, DEFAULT_CALL_TIMEOUT)
        .await?;
    Ok(format!("Updated bookmark {bookmark_id}"))
}

/// `bookmarks_delete`: deletes a bookmark or empty folder.
pub async fn delete(bridge: &Bridge, args: &Value) -> Result<String> {
    let bookmark_id = require_str(args, "bookmark_id")?;
    bridge
        .dispatcher
        .call(
            Action::BookmarksDelete,
            json!({"bookmarkId": bookmark_id}),
            DEFAULT_CALL_TIMEOUT,
        )
        .await?;
    Ok(format!("Deleted bookmark {bookmark_id}"))
}

// ============================================================================
// Formatting
// ============================================================================

fn bookmark_nodes(result: &Value) -> Vec<Value> {
    result
        .get("bookmarks")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// Bookmark IDs are strings on the wire; tolerate numbers too.
fn node_id(node: &Value) -> String {
    match node.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "?".to_string(),
    }
}

fn node_parent_id(node: &Value) -> String {
    match node.get("parentId") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "-".to_string(),
    }
}

/// Renders one node (and its children) into the tree listing.
fn format_node(node: &Value, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let title = node.get("title").and_then(Value::as_str).unwrap_or("(no title)");
    let id = node_id(node);
    let parent = node_parent_id(node);

    let is_folder = node.get("type").and_then(Value::as_str) == Some("folder")
        || node.get("url").and_then(Value::as_str).is_none();

    if is_folder {
        out.push_str(&format!("\n{indent}📁 {title} [id: {id}, parent: {parent}]"));
    } else {
        let url = node.get("url").and_then(Value::as_str).unwrap_or("");
        out.push_str(&format!(
            "\n{indent}🔖 {title} - {url} [id: {id}, parent: {parent}]"
        ));
    }

    if let Some(children) = node.get("children").and_then(Value::as_array) {
        for child in children {
            format_node(child, depth + 1, out);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
