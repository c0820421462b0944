//! Page-content tools.
//!
//! Script execution sends the caller's code exactly as received and
//! returns whatever the extension reports; the bridge never rewrites
//! user code. `content_execute_predefined` composes the local script
//! executor with `content.execute_script`.

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Value, json};

use crate::bridge::Bridge;
use crate::error::{Error, Result};
use crate::protocol::Action;
use crate::transport::DEFAULT_CALL_TIMEOUT;

use super::{SCRIPT_EXEC_TIMEOUT, opt_str, require_i64, require_str};

// ============================================================================
// Tools
// ============================================================================

/// `content_get_text`: extracts page text, optionally truncated.
pub async fn get_text(bridge: &Bridge, args: &Value) -> Result<String> {
    let tab_id = require_i64(args, "tab_id")?;
    let max_length = match args.get("max_length") {
        None | Some(Value::Null) => None,
        Some(value) => match value.as_i64() {
            Some(n) if n >= 0 => Some(n as usize),
            Some(_) => {
                return Err(Error::invalid_argument("'max_length' must not be negative"));
            }
            None => {
                return Err(Error::invalid_argument("'max_length' must be an integer"));
            }
        },
    };

    let data = bridge
        .dispatcher
        .call(Action::ContentGetText, json!({"tabId": tab_id}), DEFAULT_CALL_TIMEOUT)
        .await?;

    let text = data.get("text").and_then(Value::as_str).unwrap_or("");
    Ok(match max_length {
        Some(limit) => text.chars().take(limit).collect(),
        None => text.to_string(),
    })
}

/// `content_get_html`: extracts page HTML.
pub async fn get_html(bridge: &Bridge, args: &Value) -> Result<String> {
    let tab_id = require_i64(args, "tab_id")?;
    let data = bridge
        .dispatcher
        .call(Action::ContentGetHtml, json!({"tabId": tab_id}), DEFAULT_CALL_TIMEOUT)
        .await?;
    Ok(data
        .get("html")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string())
}

/// `content_execute_script`: runs JavaScript in a tab.
pub async fn execute_script(bridge: &Bridge, args: &Value) -> Result<String> {
    let tab_id = require_i64(args, "tab_id")?;
    let script = require_str(args, "script")?;
    run_script(bridge, tab_id, script).await
}

/// `content_execute_predefined`: runs a named script from the
/// configured directory, then executes its stdout in the tab.
///
/// Failures of either step keep their own kind: script-executor errors
/// (`invalid_name`, `not_found`, ...) versus extension errors.
pub async fn execute_predefined(bridge: &Bridge, args: &Value) -> Result<String> {
    let tab_id = require_i64(args, "tab_id")?;
    let script_name = require_str(args, "script_name")?;
    let script_args = opt_str(args, "script_args")?.unwrap_or("");

    let code = bridge.scripts.execute(script_name, script_args).await?;
    run_script(bridge, tab_id, &code).await
}

// ============================================================================
// Helpers
// ============================================================================

/// Sends code to the extension verbatim and serializes its report.
async fn run_script(bridge: &Bridge, tab_id: i64, script: &str) -> Result<String> {
    let data = bridge
        .dispatcher
        .call(
            Action::ContentExecuteScript,
            json!({"tabId": tab_id, "script": script}),
            SCRIPT_EXEC_TIMEOUT,
        )
        .await?;

    let result = data.get("result").unwrap_or(&data);
    Ok(serde_json::to_string(result)?)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::handlers::tests::{fake_bridge, reply};

    #[tokio::test]
    async fn test_get_text_truncates_on_char_boundary() {
        let (bridge, mut rx) = fake_bridge();

        let caller = {
            let bridge = bridge.clone();
            tokio::spawn(async move {
                get_text(&bridge, &json!({"tab_id": 1, "max_length": 4})).await
            })
        };

        let frame = rx.recv().await.expect("outbound frame");
        assert_eq!(frame.action, "content.get_text");
        reply(&bridge, &frame, json!({"text": "héllo world"}));

        assert_eq!(caller.await.expect("join").expect("text"), "héll");
    }

    #[tokio::test]
    async fn test_get_text_zero_length_yields_empty() {
        let (bridge, mut rx) = fake_bridge();

        let caller = {
            let bridge = bridge.clone();
            tokio::spawn(async move {
                get_text(&bridge, &json!({"tab_id": 1, "max_length": 0})).await
            })
        };

        let frame = rx.recv().await.expect("outbound frame");
        reply(&bridge, &frame, json!({"text": "plenty of text"}));

        assert_eq!(caller.await.expect("join").expect("text"), "");
    }

    #[tokio::test]
    async fn test_get_text_negative_length_rejected() {
        let (bridge, _rx) = fake_bridge();
        let err = get_text(&bridge, &json!({"tab_id": 1, "max_length": -1}))
            .await
            .unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(bridge.dispatcher.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_execute_script_sends_code_verbatim() {
        let (bridge, mut rx) = fake_bridge();
        let code = "document.title // trailing comment";

        let caller = {
            let bridge = bridge.clone();
            let args = json!({"tab_id": 2, "script": code});
            tokio::spawn(async move { execute_script(&bridge, &args).await })
        };

        let frame = rx.recv().await.expect("outbound frame");
        assert_eq!(frame.action, "content.execute_script");
        assert_eq!(frame.data["script"], code);

        reply(&bridge, &frame, json!({"result": {"title": "Example"}}));
        let text = caller.await.expect("join").expect("execute");
        assert_eq!(text, r#"{"title":"Example"}"#);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_predefined_composes_executor_and_extension() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join("title.sh");
        std::fs::write(&path, "#!/bin/sh\necho 'document.title'\n").expect("write");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod");

        let config = crate::config::ServerConfig::new().with_scripts_dir(dir.path());
        let bridge = crate::bridge::Bridge::new(config);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        bridge.dispatcher.attach(1, tx);

        let caller = {
            let bridge = bridge.clone();
            let args = json!({"tab_id": 1, "script_name": "title.sh"});
            tokio::spawn(async move { execute_predefined(&bridge, &args).await })
        };

        let frame = rx.recv().await.expect("outbound frame");
        assert_eq!(frame.action, "content.execute_script");
        assert_eq!(frame.data["script"], "document.title\n");

        reply(&bridge, &frame, json!({"result": "Example"}));
        assert_eq!(caller.await.expect("join").expect("run"), r#""Example""#);
    }

    #[tokio::test]
    async fn test_execute_predefined_executor_failure_identifies_origin() {
        let (bridge, _rx) = fake_bridge();
        // No scripts directory configured: fails before the extension.
        let err = execute_predefined(&bridge, &json!({"tab_id": 1, "script_name": "x.sh"}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_configured");
        assert_eq!(bridge.dispatcher.pending_count(), 0);
    }
}
