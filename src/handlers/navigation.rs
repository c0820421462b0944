//! Tab navigation tools.

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Value, json};

use crate::bridge::Bridge;
use crate::error::Result;
use crate::protocol::Action;
use crate::transport::DEFAULT_CALL_TIMEOUT;

use super::{opt_bool, require_i64, require_str, validate_url};

// ============================================================================
// Tools
// ============================================================================

/// `navigation_back`: navigates back in a tab's history.
pub async fn back(bridge: &Bridge, args: &Value) -> Result<String> {
    let tab_id = require_i64(args, "tab_id")?;
    bridge
        .dispatcher
        .call(Action::NavigationBack, json!({"tabId": tab_id}), DEFAULT_CALL_TIMEOUT)
        .await?;
    Ok(format!("Navigated back in tab {tab_id}"))
}

/// `navigation_forward`: navigates forward in a tab's history.
pub async fn forward(bridge: &Bridge, args: &Value) -> Result<String> {
    let tab_id = require_i64(args, "tab_id")?;
    bridge
        .dispatcher
        .call(
            Action::NavigationForward,
            json!({"tabId": tab_id}),
            DEFAULT_CALL_TIMEOUT,
        )
        .await?;
    Ok(format!("Navigated forward in tab {tab_id}"))
}

/// `navigation_reload`: reloads a tab, optionally bypassing the cache.
pub async fn reload(bridge: &Bridge, args: &Value) -> Result<String> {
    let tab_id = require_i64(args, "tab_id")?;
    let bypass_cache = opt_bool(args, "bypass_cache", false)?;
    bridge
        .dispatcher
        .call(
            Action::NavigationReload,
            json!({"tabId": tab_id, "bypassCache": bypass_cache}),
            DEFAULT_CALL_TIMEOUT,
        )
        .await?;
    Ok(format!("Reloaded tab {tab_id}"))
}

/// `navigation_go_to_url`: navigates a tab to a URL.
pub async fn go_to_url(bridge: &Bridge, args: &Value) -> Result<String> {
    let tab_id = require_i64(args, "tab_id")?;
    let url = require_str(args, "url")?;
    validate_url("url", url)?;

    bridge
        .dispatcher
        .call(
            Action::NavigationGoToUrl,
            json!({"tabId": tab_id, "url": url}),
            DEFAULT_CALL_TIMEOUT,
        )
        .await?;
    Ok(format!("Navigated tab {tab_id} to {url}"))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::handlers::tests::{fake_bridge, reply};

    #[tokio::test]
    async fn test_reload_defaults_bypass_cache_false() {
        let (bridge, mut rx) = fake_bridge();

        let caller = {
            let bridge = bridge.clone();
            tokio::spawn(async move { reload(&bridge, &json!({"tab_id": 4})).await })
        };

        let frame = rx.recv().await.expect("outbound frame");
        assert_eq!(frame.action, "navigation.reload");
        assert_eq!(frame.data, json!({"tabId": 4, "bypassCache": false}));

        reply(&bridge, &frame, json!({}));
        assert_eq!(caller.await.expect("join").expect("reload"), "Reloaded tab 4");
    }

    #[tokio::test]
    async fn test_go_to_url_validates_locally() {
        let (bridge, _rx) = fake_bridge();
        let err = go_to_url(&bridge, &json!({"tab_id": 1, "url": "no spaces allowed"}))
            .await
            .unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(bridge.dispatcher.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_tab_id_rejected() {
        let (bridge, _rx) = fake_bridge();
        let err = back(&bridge, &json!({})).await.unwrap_err();
        assert!(err.is_invalid_argument());
        let err = forward(&bridge, &json!({})).await.unwrap_err();
        assert!(err.is_invalid_argument());
    }
}
