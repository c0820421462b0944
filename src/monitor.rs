//! Web-request monitor sessions.
//!
//! The extension observes browser network activity and reports it with
//! unsolicited `requests.captured` notification frames. This registry
//! tracks the live observation sessions, buffering capture summaries in
//! arrival order until the session is stopped or the extension
//! disconnects.
//!
//! Captured data is intentionally in-memory only; callers needing
//! long-term capture save bodies to disk through the `save_*_to` paths of
//! `requests_get_content`.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::time::Instant;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::identifiers::MonitorId;
use crate::protocol::now_timestamp;

// ============================================================================
// Constants
// ============================================================================

/// Per-session capture buffer bound; oldest summaries are evicted first.
pub const CAPTURE_BUFFER_CAP: usize = 1000;

// ============================================================================
// CaptureSummary
// ============================================================================

/// Metadata for one captured web request, as reported by the extension.
///
/// Field names are the wire contract with the extension; all fields
/// tolerate absence so a sparse capture still records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureSummary {
    /// Extension-assigned request identifier.
    pub request_id: String,

    /// When the request was observed.
    #[serde(default)]
    pub timestamp: String,

    /// Request URL.
    #[serde(default)]
    pub url: String,

    /// HTTP method.
    #[serde(default)]
    pub method: String,

    /// HTTP status code of the response.
    #[serde(default)]
    pub status_code: u16,

    /// Wall-clock duration of the exchange.
    #[serde(default)]
    pub duration_ms: u64,

    /// Request body size in bytes.
    #[serde(default)]
    pub request_size: u64,

    /// Response body size in bytes.
    #[serde(default)]
    pub response_size: u64,

    /// Response content type.
    #[serde(default)]
    pub content_type: String,

    /// Tab the request originated from.
    #[serde(default)]
    pub tab_id: i64,
}

// ============================================================================
// MonitorStats
// ============================================================================

/// Final statistics returned when a session stops.
///
/// Totals count everything captured over the session's lifetime, not
/// just what is still buffered after eviction.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorStats {
    /// The stopped session's ID.
    pub monitor_id: String,
    /// Session duration in seconds.
    pub duration_seconds: f64,
    /// Total requests captured over the session's lifetime.
    pub total_requests_captured: u64,
    /// Total request + response bytes observed.
    pub total_data_size: u64,
}

// ============================================================================
// MonitorSession
// ============================================================================

/// One live observation session.
struct MonitorSession {
    /// URL patterns the extension matches requests against.
    url_patterns: Vec<String>,
    /// Capture options forwarded to the extension.
    #[allow(dead_code)]
    options: Value,
    /// Optional tab filter.
    #[allow(dead_code)]
    tab_id: Option<i64>,
    /// Wall-clock start, as returned to the caller.
    started_at: String,
    /// Monotonic start, for duration statistics.
    started: Instant,
    /// Bounded capture buffer in arrival order.
    captures: VecDeque<CaptureSummary>,
    /// Lifetime capture count (eviction does not decrement).
    total_captured: u64,
    /// Lifetime request + response bytes.
    total_bytes: u64,
}

// ============================================================================
// MonitorRegistry
// ============================================================================

/// Tracks live request-monitoring sessions keyed by [`MonitorId`].
///
/// # Thread Safety
///
/// The session table is one `parking_lot` critical section shared by the
/// listener's notification path and every concurrent tool call.
pub struct MonitorRegistry {
    sessions: Mutex<FxHashMap<MonitorId, MonitorSession>>,
}

impl Default for MonitorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(FxHashMap::default()),
        }
    }

    // ========================================================================
    // Session Lifecycle
    // ========================================================================

    /// Records a session the extension has confirmed started.
    ///
    /// Returns the wall-clock `started_at` string handed back to the
    /// caller.
    pub fn register(
        &self,
        monitor_id: MonitorId,
        url_patterns: Vec<String>,
        options: Value,
        tab_id: Option<i64>,
    ) -> String {
        let started_at = now_timestamp();
        let session = MonitorSession {
            url_patterns,
            options,
            tab_id,
            started_at: started_at.clone(),
            started: Instant::now(),
            captures: VecDeque::new(),
            total_captured: 0,
            total_bytes: 0,
        };

        self.sessions.lock().insert(monitor_id, session);
        debug!(%monitor_id, "Monitor session registered");
        started_at
    }

    /// Removes a session and returns its final statistics.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MonitorNotFound`] for unknown IDs; a stopped
    /// session cannot be stopped twice.
    pub fn remove(&self, monitor_id: MonitorId) -> Result<MonitorStats> {
        let session = self
            .sessions
            .lock()
            .remove(&monitor_id)
            .ok_or_else(|| Error::monitor_not_found(monitor_id.to_string()))?;

        Ok(MonitorStats {
            monitor_id: monitor_id.to_string(),
            duration_seconds: session.started.elapsed().as_secs_f64(),
            total_requests_captured: session.total_captured,
            total_data_size: session.total_bytes,
        })
    }

    /// Drops every session. Called on extension disconnect or replacement.
    pub fn invalidate_all(&self) -> usize {
        let mut sessions = self.sessions.lock();
        let count = sessions.len();
        sessions.clear();
        if count > 0 {
            warn!(count, "Monitor sessions invalidated on disconnect");
        }
        count
    }

    // ========================================================================
    // Capture Notifications
    // ========================================================================

    /// Routes an unsolicited `requests.*` notification frame.
    ///
    /// Only `requests.captured` carries data the registry stores; other
    /// names in the namespace are logged and dropped.
    pub fn handle_notification(&self, action: &str, data: &Value) {
        if action != "requests.captured" {
            warn!(action, "Unhandled notification from extension; dropping");
            return;
        }

        let Some(monitor_id) = data
            .get("monitor_id")
            .and_then(Value::as_str)
            .and_then(MonitorId::parse)
        else {
            warn!("Capture notification without a monitor_id; dropping");
            return;
        };

        let summary = match data.get("request") {
            Some(request) => match serde_json::from_value::<CaptureSummary>(request.clone()) {
                Ok(summary) => summary,
                Err(e) => {
                    warn!(%monitor_id, error = %e, "Malformed capture summary; dropping");
                    return;
                }
            },
            None => {
                warn!(%monitor_id, "Capture notification without a request; dropping");
                return;
            }
        };

        self.record(monitor_id, summary);
    }

    /// Appends a capture summary to its session's bounded buffer.
    ///
    /// Summaries for unknown sessions (already stopped, or from a stale
    /// connection) are dropped.
    pub fn record(&self, monitor_id: MonitorId, summary: CaptureSummary) {
        let mut sessions = self.sessions.lock();
        let Some(session) = sessions.get_mut(&monitor_id) else {
            debug!(%monitor_id, "Capture for unknown monitor; dropping");
            return;
        };

        session.total_captured += 1;
        session.total_bytes += summary.request_size + summary.response_size;

        if session.captures.len() >= CAPTURE_BUFFER_CAP {
            session.captures.pop_front();
        }
        session.captures.push_back(summary);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Returns all buffered summaries for a session, in arrival order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MonitorNotFound`] for unknown IDs.
    pub fn captured(&self, monitor_id: MonitorId) -> Result<Vec<CaptureSummary>> {
        let sessions = self.sessions.lock();
        let session = sessions
            .get(&monitor_id)
            .ok_or_else(|| Error::monitor_not_found(monitor_id.to_string()))?;
        Ok(session.captures.iter().cloned().collect())
    }

    /// Returns a session's lifetime capture count.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MonitorNotFound`] for unknown IDs.
    pub fn capture_count(&self, monitor_id: MonitorId) -> Result<u64> {
        let sessions = self.sessions.lock();
        let session = sessions
            .get(&monitor_id)
            .ok_or_else(|| Error::monitor_not_found(monitor_id.to_string()))?;
        Ok(session.total_captured)
    }

    /// Returns a session's URL patterns and start time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MonitorNotFound`] for unknown IDs.
    pub fn describe(&self, monitor_id: MonitorId) -> Result<(Vec<String>, String)> {
        let sessions = self.sessions.lock();
        let session = sessions
            .get(&monitor_id)
            .ok_or_else(|| Error::monitor_not_found(monitor_id.to_string()))?;
        Ok((session.url_patterns.clone(), session.started_at.clone()))
    }

    /// Returns `true` if the session exists.
    #[inline]
    #[must_use]
    pub fn contains(&self, monitor_id: MonitorId) -> bool {
        self.sessions.lock().contains_key(&monitor_id)
    }

    /// Returns the number of live sessions.
    #[inline]
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }
}

// ============================================================================
// Tests
// ============================================================================
