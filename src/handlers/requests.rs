//! Web-request monitoring tools.
//!
//! `requests_start_monitoring` hands the extension a full session
//! configuration and registers the session locally once confirmed;
//! `requests_list_captured` serves entirely from the local buffer;
//! `requests_get_content` fetches bodies on demand, optionally spilling
//! them to disk instead of returning them inline.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use serde_json::{Value, json};
use tracing::debug;

use crate::bridge::Bridge;
use crate::error::{Error, Result};
use crate::identifiers::MonitorId;
use crate::protocol::Action;
use crate::transport::DEFAULT_CALL_TIMEOUT;

use super::{opt_bool, opt_i64, opt_str, opt_u64, require_str};

// ============================================================================
// Constants
// ============================================================================

/// Poll step while draining trailing capture frames at stop time.
const DRAIN_POLL: Duration = Duration::from_millis(500);

// ============================================================================
// Tools
// ============================================================================

/// `requests_start_monitoring`: starts a monitoring session.
pub async fn start_monitoring(bridge: &Bridge, args: &Value) -> Result<String> {
    let patterns = parse_url_patterns(args)?;
    let options = match args.get("options") {
        None | Some(Value::Null) => json!({}),
        Some(options @ Value::Object(_)) => options.clone(),
        Some(_) => return Err(Error::invalid_argument("'options' must be an object")),
    };
    let tab_id = opt_i64(args, "tab_id")?;

    let monitor_id = MonitorId::generate();
    let mut data = json!({
        "monitor_id": monitor_id.to_string(),
        "url_patterns": patterns,
        "options": options,
    });
    if let Some(tab_id) = tab_id {
        data["tab_id"] = json!(tab_id);
    }

    bridge
        .dispatcher
        .call(Action::RequestsStartMonitoring, data, DEFAULT_CALL_TIMEOUT)
        .await?;

    // Only a confirmed session is registered; a failed start leaves no
    // record behind.
    let started_at = bridge
        .monitors
        .register(monitor_id, patterns, options, tab_id);

    Ok(serde_json::to_string_pretty(&json!({
        "monitor_id": monitor_id.to_string(),
        "status": "active",
        "started_at": started_at,
    }))?)
}

/// `requests_list_captured`: lists buffered summaries for a session.
///
/// Served from the local buffer; no extension round trip.
pub async fn list_captured(bridge: &Bridge, args: &Value) -> Result<String> {
    let monitor_id = parse_monitor_id(args)?;
    let summaries = bridge.monitors.captured(monitor_id)?;

    Ok(serde_json::to_string_pretty(&json!({
        "monitor_id": monitor_id.to_string(),
        "count": summaries.len(),
        "requests": summaries,
    }))?)
}

/// `requests_get_content`: fetches headers and bodies for one captured
/// request.
///
/// Bodies are written to `save_*_to` paths when given (and omitted from
/// the returned JSON); binary bodies are otherwise omitted unless
/// `include_binary` is set.
pub async fn get_content(bridge: &Bridge, args: &Value) -> Result<String> {
    let monitor_id = parse_monitor_id(args)?;
    if !bridge.monitors.contains(monitor_id) {
        return Err(Error::monitor_not_found(monitor_id.to_string()));
    }
    let request_id = require_str(args, "request_id")?;
    let include_binary = opt_bool(args, "include_binary", false)?;
    let save_request = opt_str(args, "save_request_body_to")?.map(str::to_string);
    let save_response = opt_str(args, "save_response_body_to")?.map(str::to_string);

    // The extension must ship bodies whenever they end up on disk.
    let want_bodies = include_binary || save_request.is_some() || save_response.is_some();

    let mut output = bridge
        .dispatcher
        .call(
            Action::RequestsGetContent,
            json!({
                "monitor_id": monitor_id.to_string(),
                "request_id": request_id,
                "include_binary": want_bodies,
            }),
            DEFAULT_CALL_TIMEOUT,
        )
        .await?;

    process_body(&mut output, "request_body", save_request.as_deref(), include_binary).await;
    process_body(&mut output, "response_body", save_response.as_deref(), include_binary).await;

    Ok(serde_json::to_string_pretty(&output)?)
}

/// `requests_stop_monitoring`: stops a session and reports statistics.
pub async fn stop_monitoring(bridge: &Bridge, args: &Value) -> Result<String> {
    let monitor_id = parse_monitor_id(args)?;
    if !bridge.monitors.contains(monitor_id) {
        return Err(Error::monitor_not_found(monitor_id.to_string()));
    }
    let drain_timeout = opt_u64(args, "drain_timeout", 5)?;

    bridge
        .dispatcher
        .call(
            Action::RequestsStopMonitoring,
            json!({"monitor_id": monitor_id.to_string()}),
            DEFAULT_CALL_TIMEOUT,
        )
        .await?;

    // Drain trailing capture frames until a poll sees no growth or the
    // deadline passes.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(drain_timeout);
    let mut last = bridge.monitors.capture_count(monitor_id).unwrap_or(0);
    while tokio::time::Instant::now() < deadline {
        tokio::time::sleep(DRAIN_POLL).await;
        let current = bridge.monitors.capture_count(monitor_id).unwrap_or(last);
        if current == last {
            break;
        }
        last = current;
    }

    let stats = bridge.monitors.remove(monitor_id)?;
    debug!(%monitor_id, captured = stats.total_requests_captured, "Monitor stopped");
    Ok(serde_json::to_string_pretty(&stats)?)
}

// ============================================================================
// Argument Parsing
// ============================================================================

fn parse_monitor_id(args: &Value) -> Result<MonitorId> {
    let raw = require_str(args, "monitor_id")?;
    MonitorId::parse(raw).ok_or_else(|| Error::monitor_not_found(raw))
}

fn parse_url_patterns(args: &Value) -> Result<Vec<String>> {
    match args.get("url_patterns") {
        Some(Value::Array(items)) if !items.is_empty() => items
            .iter()
            .map(|item| match item {
                Value::String(s) if !s.is_empty() => Ok(s.clone()),
                _ => Err(Error::invalid_argument(
                    "'url_patterns' must contain non-empty strings",
                )),
            })
            .collect(),
        Some(Value::Array(_)) => Err(Error::invalid_argument("'url_patterns' must not be empty")),
        Some(_) => Err(Error::invalid_argument(
            "'url_patterns' must be an array of strings",
        )),
        None => Err(Error::invalid_argument(
            "missing required argument 'url_patterns'",
        )),
    }
}

// ============================================================================
// Body Handling
// ============================================================================

/// Saves or strips one body field in the returned structure.
///
/// Write failures surface in an `error` field alongside whatever data
/// could be assembled, rather than failing the whole call.
async fn process_body(output: &mut Value, key: &str, save_to: Option<&str>, include_binary: bool) {
    let Some(body) = output.get(key).cloned() else {
        return;
    };
    if body.is_null() {
        return;
    }

    match save_to {
        Some(path) => match body_bytes(&body) {
            Ok(bytes) => match tokio::fs::write(path, &bytes).await {
                Ok(()) => {
                    output[key] = json!({"saved_to": path, "size": bytes.len()});
                }
                Err(e) => {
                    output["error"] =
                        json!(format!("io_error: failed to write {key} to {path}: {e}"));
                }
            },
            Err(e) => {
                output["error"] = json!(format!("{}: {key}: {e}", e.kind()));
            }
        },
        None => {
            if !include_binary && is_binary_body(&body) {
                output[key] = json!({
                    "omitted": "binary body; set include_binary=true or provide a save path"
                });
            }
        }
    }
}

fn is_binary_body(body: &Value) -> bool {
    body.get("encoding").and_then(Value::as_str) == Some("base64")
}

/// Decodes a body value into raw bytes.
///
/// Bodies arrive either as plain strings or as
/// `{"encoding": "text"|"base64", "data": "..."}` objects.
fn body_bytes(body: &Value) -> Result<Vec<u8>> {
    match body {
        Value::String(s) => Ok(s.clone().into_bytes()),
        Value::Object(_) => {
            let data = body
                .get("data")
                .and_then(Value::as_str)
                .ok_or_else(|| Error::protocol("body object is missing the data field"))?;
            if is_binary_body(body) {
                Base64Standard
                    .decode(data)
                    .map_err(|e| Error::protocol(format!("body is not valid base64: {e}")))
            } else {
                Ok(data.as_bytes().to_vec())
            }
        }
        _ => Err(Error::protocol("body has an unexpected shape")),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::handlers::tests::{fake_bridge, reply};
    use crate::monitor::CaptureSummary;
    use crate::protocol::now_timestamp;

    fn capture(request_id: &str) -> CaptureSummary {
        CaptureSummary {
            request_id: request_id.to_string(),
            timestamp: now_timestamp(),
            url: "https://api.example.com/v1".to_string(),
            method: "GET".to_string(),
            status_code: 200,
            duration_ms: 10,
            request_size: 100,
            response_size: 200,
            content_type: "application/json".to_string(),
            tab_id: 1,
        }
    }

    #[tokio::test]
    async fn test_start_monitoring_round_trip() {
        let (bridge, mut rx) = fake_bridge();

        let caller = {
            let bridge = bridge.clone();
            let args = json!({"url_patterns": ["https://api.example.com/*"], "tab_id": 3});
            tokio::spawn(async move { start_monitoring(&bridge, &args).await })
        };

        let frame = rx.recv().await.expect("outbound frame");
        assert_eq!(frame.action, "requests.start_monitoring");
        assert_eq!(frame.data["url_patterns"][0], "https://api.example.com/*");
        assert_eq!(frame.data["tab_id"], 3);
        let monitor_id = frame.data["monitor_id"].as_str().expect("id").to_string();

        reply(&bridge, &frame, json!({}));

        let text = caller.await.expect("join").expect("start");
        let result: Value = serde_json::from_str(&text).expect("json");
        assert_eq!(result["monitor_id"], monitor_id.as_str());
        assert_eq!(result["status"], "active");
        assert!(result["started_at"].as_str().is_some());

        let id = MonitorId::parse(&monitor_id).expect("parse");
        assert!(bridge.monitors.contains(id));
    }

    #[tokio::test]
    async fn test_start_monitoring_validates_patterns_locally() {
        let (bridge, _rx) = fake_bridge();
        for args in [
            json!({}),
            json!({"url_patterns": []}),
            json!({"url_patterns": "https://x/*"}),
            json!({"url_patterns": ["ok", ""]}),
            json!({"url_patterns": ["ok"], "options": 7}),
        ] {
            let err = start_monitoring(&bridge, &args).await.unwrap_err();
            assert!(err.is_invalid_argument(), "args: {args}");
        }
        assert_eq!(bridge.dispatcher.pending_count(), 0);
        assert_eq!(bridge.monitors.session_count(), 0);
    }

    #[tokio::test]
    async fn test_list_captured_preserves_order() {
        let (bridge, _rx) = fake_bridge();
        let id = MonitorId::generate();
        bridge.monitors.register(id, vec!["*".into()], json!({}), None);
        for name in ["r1", "r2", "r3"] {
            bridge.monitors.record(id, capture(name));
        }

        let text = list_captured(&bridge, &json!({"monitor_id": id.to_string()}))
            .await
            .expect("list");
        let result: Value = serde_json::from_str(&text).expect("json");
        assert_eq!(result["count"], 3);
        assert_eq!(result["requests"][0]["request_id"], "r1");
        assert_eq!(result["requests"][2]["request_id"], "r3");
    }

    #[tokio::test]
    async fn test_list_captured_unknown_monitor() {
        let (bridge, _rx) = fake_bridge();
        let err = list_captured(&bridge, &json!({"monitor_id": MonitorId::generate().to_string()}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");

        // Garbage ids are indistinguishable from unknown ones.
        let err = list_captured(&bridge, &json!({"monitor_id": "not-a-uuid"}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_monitoring_stats_and_not_found_after() {
        let (bridge, mut rx) = fake_bridge();
        let id = MonitorId::generate();
        bridge.monitors.register(id, vec!["*".into()], json!({}), None);
        for name in ["r1", "r2", "r3"] {
            bridge.monitors.record(id, capture(name));
        }

        let caller = {
            let bridge = bridge.clone();
            let args = json!({"monitor_id": id.to_string(), "drain_timeout": 1});
            tokio::spawn(async move { stop_monitoring(&bridge, &args).await })
        };

        let frame = rx.recv().await.expect("outbound frame");
        assert_eq!(frame.action, "requests.stop_monitoring");
        reply(&bridge, &frame, json!({}));

        let text = caller.await.expect("join").expect("stop");
        let stats: Value = serde_json::from_str(&text).expect("json");
        assert_eq!(stats["total_requests_captured"], 3);
        assert_eq!(stats["total_data_size"], 3 * 300);

        let err = list_captured(&bridge, &json!({"monitor_id": id.to_string()}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn test_get_content_saves_response_body() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let save_path = dir.path().join("body.bin").display().to_string();

        let (bridge, mut rx) = fake_bridge();
        let id = MonitorId::generate();
        bridge.monitors.register(id, vec!["*".into()], json!({}), None);

        let caller = {
            let bridge = bridge.clone();
            let args = json!({
                "monitor_id": id.to_string(),
                "request_id": "r1",
                "save_response_body_to": save_path,
            });
            tokio::spawn(async move { get_content(&bridge, &args).await })
        };

        let frame = rx.recv().await.expect("outbound frame");
        assert_eq!(frame.action, "requests.get_content");
        // Bodies must be shipped when they are to land on disk.
        assert_eq!(frame.data["include_binary"], true);

        reply(
            &bridge,
            &frame,
            json!({
                "request_headers": {"accept": "*/*"},
                "response_headers": {"content-type": "application/octet-stream"},
                "response_body": {"encoding": "base64", "data": "aGVsbG8="},
            }),
        );

        let text = caller.await.expect("join").expect("get_content");
        let result: Value = serde_json::from_str(&text).expect("json");
        assert_eq!(result["response_body"]["saved_to"], dir.path().join("body.bin").display().to_string());
        assert_eq!(result["response_body"]["size"], 5);
        assert!(result.get("error").is_none());

        let written = std::fs::read(dir.path().join("body.bin")).expect("read");
        assert_eq!(written, b"hello");
    }

    #[tokio::test]
    async fn test_get_content_omits_binary_without_opt_in() {
        let (bridge, mut rx) = fake_bridge();
        let id = MonitorId::generate();
        bridge.monitors.register(id, vec!["*".into()], json!({}), None);

        let caller = {
            let bridge = bridge.clone();
            let args = json!({"monitor_id": id.to_string(), "request_id": "r1"});
            tokio::spawn(async move { get_content(&bridge, &args).await })
        };

        let frame = rx.recv().await.expect("outbound frame");
        assert_eq!(frame.data["include_binary"], false);
        reply(
            &bridge,
            &frame,
            json!({
                "response_headers": {},
                "response_body": {"encoding": "base64", "data": "aGVsbG8="},
            }),
        );

        let text = caller.await.expect("join").expect("get_content");
        let result: Value = serde_json::from_str(&text).expect("json");
        assert!(result["response_body"]["omitted"].as_str().is_some());
    }

    #[test]
    fn test_body_bytes_shapes() {
        assert_eq!(body_bytes(&json!("plain")).expect("string"), b"plain");
        assert_eq!(
            body_bytes(&json!({"encoding": "text", "data": "abc"})).expect("text"),
            b"abc"
        );
        assert_eq!(
            body_bytes(&json!({"encoding": "base64", "data": "aGVsbG8="})).expect("b64"),
            b"hello"
        );
        assert!(body_bytes(&json!({"encoding": "base64"})).is_err());
        assert!(body_bytes(&json!(42)).is_err());
    }
}
