//! Request dispatch and response correlation.
//!
//! The dispatcher owns the two pieces of shared mutable state at the core
//! of the bridge: the pending-call table and the extension connection
//! slot. Every concurrent tool call funnels through [`Dispatcher::call`],
//! which multiplexes onto whichever single connection is active.
//!
//! # Contract
//!
//! ```text
//! call(action, data, timeout) -> success payload | error
//! ```
//!
//! Calls are independent; responses may arrive in any order. The request
//! `id` is the sole correlation key. Every dispatched call resolves with
//! exactly one of: response payload, extension error, timeout, or
//! disconnected.

// ============================================================================
// Imports
// ============================================================================

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::{Action, Envelope, MessageType};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout applied when a handler does not specify one.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(15);

/// Maximum pending requests before rejecting new ones.
const MAX_PENDING_REQUESTS: usize = 256;

// ============================================================================
// Types
// ============================================================================

/// One-shot completion handle parked on a request id.
struct Waiter {
    /// Action recorded at dispatch time; mismatching replies log a warning.
    expected: Action,
    /// Completion channel. Sending consumes the waiter.
    tx: oneshot::Sender<Result<Value>>,
}

/// The single active extension connection, if any.
struct ConnectionSlot {
    /// Monotonic connection identity, used so a stale connection's
    /// teardown cannot detach its replacement.
    conn_id: u64,
    /// Outbound frame queue drained by the connection's writer.
    outbound: mpsc::UnboundedSender<Envelope>,
    /// When this connection was promoted.
    since: Instant,
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Correlates outbound requests with inbound responses over the single
/// extension connection.
///
/// # Thread Safety
///
/// `Dispatcher` is `Send + Sync`; all state sits behind short
/// `parking_lot` critical sections shared by every concurrent caller.
pub struct Dispatcher {
    /// Pending-call table: at most one waiter per id at any instant.
    pending: Mutex<FxHashMap<RequestId, Waiter>>,

    /// Connection slot: `None` is `Idle`, `Some` is `Active`.
    connection: Mutex<Option<ConnectionSlot>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Creates a dispatcher with no connection (`Idle`).
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(FxHashMap::default()),
            connection: Mutex::new(None),
        }
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Sends an action request and awaits its reply.
    ///
    /// # Errors
    ///
    /// - [`Error::Disconnected`] if no extension is connected at call time
    ///   or the connection is lost mid-call. Nothing is sent in the former
    ///   case.
    /// - [`Error::Timeout`] if the deadline expires; the waiter is removed
    ///   and a late reply for this id is discarded.
    /// - [`Error::Extension`] if the extension returns an error frame.
    /// - [`Error::Protocol`] if the pending table is full.
    pub async fn call(&self, action: Action, data: Value, call_timeout: Duration) -> Result<Value> {
        let outbound = self
            .connection
            .lock()
            .as_ref()
            .map(|slot| slot.outbound.clone())
            .ok_or(Error::Disconnected)?;

        let id = RequestId::generate();
        let (tx, rx) = oneshot::channel();

        {
            let mut pending = self.pending.lock();
            if pending.len() >= MAX_PENDING_REQUESTS {
                warn!(
                    pending = pending.len(),
                    max = MAX_PENDING_REQUESTS,
                    "Too many pending requests"
                );
                return Err(Error::protocol(format!(
                    "too many pending requests: {}/{}",
                    pending.len(),
                    MAX_PENDING_REQUESTS
                )));
            }
            pending.insert(id, Waiter {
                expected: action,
                tx,
            });
        }

        let frame = Envelope::request(id, action, data);
        if outbound.send(frame).is_err() {
            // Writer already gone; the connection died under us.
            self.pending.lock().remove(&id);
            return Err(Error::Disconnected);
        }

        debug!(%id, %action, "Request dispatched");

        match timeout(call_timeout, rx).await {
            Ok(Ok(result)) => result,
            // Waiter dropped without completion: connection swept mid-call.
            Ok(Err(_)) => Err(Error::Disconnected),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(Error::timeout(
                    action.as_str(),
                    call_timeout.as_millis() as u64,
                ))
            }
        }
    }

    // ========================================================================
    // Inbound Completion
    // ========================================================================

    /// Completes the waiter matching a reply frame.
    ///
    /// Replies with no matching waiter (late after timeout, duplicate, or
    /// uncorrelatable id) are discarded.
    pub fn complete(&self, frame: &Envelope) {
        let Some(id) = RequestId::parse(&frame.id) else {
            warn!(id = %frame.id, "Reply id is not a request id; discarding");
            return;
        };

        let Some(waiter) = self.pending.lock().remove(&id) else {
            debug!(%id, "Reply for unknown or already-completed request; discarding");
            return;
        };

        // The id is the sole correlation key; an action mismatch still
        // completes the waiter.
        if frame.message_type == MessageType::Response
            && frame.action != waiter.expected.as_str()
        {
            warn!(
                %id,
                expected = waiter.expected.as_str(),
                received = %frame.action,
                "Response action differs from request action"
            );
        }

        let outcome = match frame.message_type {
            MessageType::Error => {
                let (code, message) = frame.error_payload();
                Err(Error::extension(code, message))
            }
            _ => Ok(frame.data.clone()),
        };

        // Receiver may be gone if the call timed out in the same instant.
        let _ = waiter.tx.send(outcome);
    }

    // ========================================================================
    // Connection Slot
    // ========================================================================

    /// Promotes a new connection into the slot.
    ///
    /// Any incumbent is replaced: its outbound queue is dropped (ending
    /// its writer) and every outstanding waiter fails with `disconnected`
    /// before the new connection can serve a call. Returns `true` if a
    /// previous connection was replaced.
    pub fn attach(&self, conn_id: u64, outbound: mpsc::UnboundedSender<Envelope>) -> bool {
        let replaced = {
            let mut slot = self.connection.lock();
            slot.replace(ConnectionSlot {
                conn_id,
                outbound,
                since: Instant::now(),
            })
            .is_some()
        };

        if replaced {
            self.fail_all_pending();
        }

        replaced
    }

    /// Clears the slot when the identified connection ends.
    ///
    /// A stale connection (already replaced) is a no-op, so teardown of a
    /// superseded connection cannot detach its replacement. Returns `true`
    /// if the slot was cleared.
    pub fn detach(&self, conn_id: u64) -> bool {
        let cleared = {
            let mut slot = self.connection.lock();
            match slot.as_ref() {
                Some(current) if current.conn_id == conn_id => {
                    *slot = None;
                    true
                }
                _ => false,
            }
        };

        if cleared {
            self.fail_all_pending();
        }

        cleared
    }

    /// Fails every outstanding waiter with `disconnected`.
    fn fail_all_pending(&self) {
        let drained: Vec<Waiter> = {
            let mut pending = self.pending.lock();
            pending.drain().map(|(_, waiter)| waiter).collect()
        };

        let count = drained.len();
        for waiter in drained {
            let _ = waiter.tx.send(Err(Error::Disconnected));
        }

        if count > 0 {
            debug!(count, "Failed outstanding waiters on disconnect");
        }
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Returns `true` while an extension connection is active.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.lock().is_some()
    }

    /// Returns the number of outstanding waiters.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Returns how long the current connection has been active.
    #[inline]
    #[must_use]
    pub fn connected_for(&self) -> Option<Duration> {
        self.connection.lock().as_ref().map(|slot| slot.since.elapsed())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::protocol::now_timestamp;

    fn response_for(frame: &Envelope, data: Value) -> Envelope {
        Envelope {
            id: frame.id.clone(),
            message_type: MessageType::Response,
            action: frame.action.clone(),
            data,
            timestamp: now_timestamp(),
        }
    }

    fn error_for(frame: &Envelope, code: &str, message: &str) -> Envelope {
        Envelope {
            id: frame.id.clone(),
            message_type: MessageType::Error,
            action: String::new(),
            data: json!({"code": code, "message": message, "details": null}),
            timestamp: now_timestamp(),
        }
    }

    #[tokio::test]
    async fn test_call_while_idle_fails_fast() {
        let dispatcher = Dispatcher::new();
        let err = dispatcher
            .call(Action::HistoryRecent, json!({"count": 5}), DEFAULT_CALL_TIMEOUT)
            .await
            .unwrap_err();
        assert!(err.is_disconnected());
        assert_eq!(dispatcher.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_call_round_trip() {
        let dispatcher = std::sync::Arc::new(Dispatcher::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        dispatcher.attach(1, tx);

        let caller = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                dispatcher
                    .call(Action::TabsList, json!({}), DEFAULT_CALL_TIMEOUT)
                    .await
            })
        };

        let frame = rx.recv().await.expect("outbound frame");
        assert_eq!(frame.action, "tabs.list");
        assert_eq!(frame.message_type, MessageType::Request);

        dispatcher.complete(&response_for(&frame, json!({"tabs": [{"id": 7}]})));

        let result = caller.await.expect("join").expect("call");
        assert_eq!(result["tabs"][0]["id"], 7);
        assert_eq!(dispatcher.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_extension_error_frame() {
        let dispatcher = std::sync::Arc::new(Dispatcher::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        dispatcher.attach(1, tx);

        let caller = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                dispatcher
                    .call(Action::TabsClose, json!({"tabId": 42}), DEFAULT_CALL_TIMEOUT)
                    .await
            })
        };

        let frame = rx.recv().await.expect("outbound frame");
        dispatcher.complete(&error_for(&frame, "tab_not_found", "No tab 42"));

        let err = caller.await.expect("join").unwrap_err();
        assert_eq!(err.kind(), "extension_error");
        assert!(err.to_string().contains("tab_not_found"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_removes_waiter_and_late_reply_is_discarded() {
        let dispatcher = std::sync::Arc::new(Dispatcher::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        dispatcher.attach(1, tx);

        let caller = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                dispatcher
                    .call(
                        Action::ContentGetText,
                        json!({"tabId": 1}),
                        Duration::from_secs(2),
                    )
                    .await
            })
        };

        let frame = rx.recv().await.expect("outbound frame");

        let err = caller.await.expect("join").unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(dispatcher.pending_count(), 0);

        // Late reply after the deadline: discarded without effect.
        dispatcher.complete(&response_for(&frame, json!({"text": "late"})));
        assert_eq!(dispatcher.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_response_discarded() {
        let dispatcher = std::sync::Arc::new(Dispatcher::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        dispatcher.attach(1, tx);

        let caller = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                dispatcher
                    .call(Action::Ping, json!({}), DEFAULT_CALL_TIMEOUT)
                    .await
            })
        };

        let frame = rx.recv().await.expect("outbound frame");
        dispatcher.complete(&response_for(&frame, json!({"pong": true})));
        dispatcher.complete(&response_for(&frame, json!({"pong": "again"})));

        let result = caller.await.expect("join").expect("call");
        assert_eq!(result["pong"], true);
    }

    #[tokio::test]
    async fn test_action_mismatch_still_completes() {
        let dispatcher = std::sync::Arc::new(Dispatcher::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        dispatcher.attach(1, tx);

        let caller = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                dispatcher
                    .call(Action::TabsList, json!({}), DEFAULT_CALL_TIMEOUT)
                    .await
            })
        };

        let frame = rx.recv().await.expect("outbound frame");
        let mut reply = response_for(&frame, json!({"tabs": []}));
        reply.action = "tabs.active".to_string();
        dispatcher.complete(&reply);

        // The id correlates; the mismatch is only warned about.
        assert!(caller.await.expect("join").is_ok());
    }

    #[tokio::test]
    async fn test_detach_fails_outstanding_waiters() {
        let dispatcher = std::sync::Arc::new(Dispatcher::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        dispatcher.attach(7, tx);

        let caller = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                dispatcher
                    .call(Action::TabsList, json!({}), DEFAULT_CALL_TIMEOUT)
                    .await
            })
        };

        let _frame = rx.recv().await.expect("outbound frame");
        assert!(dispatcher.detach(7));

        let err = caller.await.expect("join").unwrap_err();
        assert!(err.is_disconnected());
        assert!(!dispatcher.is_connected());
    }

    #[tokio::test]
    async fn test_stale_detach_is_a_no_op() {
        let dispatcher = Dispatcher::new();
        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        let (tx_b, _rx_b) = mpsc::unbounded_channel();

        dispatcher.attach(1, tx_a);
        assert!(dispatcher.attach(2, tx_b));

        // Old connection's teardown must not detach the replacement.
        assert!(!dispatcher.detach(1));
        assert!(dispatcher.is_connected());

        assert!(dispatcher.detach(2));
        assert!(!dispatcher.is_connected());
    }

    #[tokio::test]
    async fn test_replacement_fails_all_waiters_before_new_use() {
        let dispatcher = std::sync::Arc::new(Dispatcher::new());
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        dispatcher.attach(1, tx_a);

        let mut callers = Vec::new();
        for _ in 0..2 {
            let dispatcher = dispatcher.clone();
            callers.push(tokio::spawn(async move {
                dispatcher
                    .call(Action::TabsList, json!({}), DEFAULT_CALL_TIMEOUT)
                    .await
            }));
        }
        for _ in 0..2 {
            let _ = rx_a.recv().await.expect("outbound frame");
        }

        // Extension B completes its handshake.
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        assert!(dispatcher.attach(2, tx_b));

        for caller in callers {
            let err = caller.await.expect("join").unwrap_err();
            assert!(err.is_disconnected());
        }

        // Subsequent calls go out via extension B.
        let caller = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                dispatcher
                    .call(Action::Ping, json!({}), DEFAULT_CALL_TIMEOUT)
                    .await
            })
        };
        let frame = rx_b.recv().await.expect("outbound frame");
        dispatcher.complete(&response_for(&frame, json!({})));
        assert!(caller.await.expect("join").is_ok());
    }

    #[tokio::test]
    async fn test_uncorrelatable_reply_id_discarded() {
        let dispatcher = Dispatcher::new();
        let frame = Envelope {
            id: "evt-17".to_string(),
            message_type: MessageType::Response,
            action: "tabs.list".to_string(),
            data: json!({}),
            timestamp: now_timestamp(),
        };
        // Must not panic or disturb state.
        dispatcher.complete(&frame);
        assert_eq!(dispatcher.pending_count(), 0);
    }
}
