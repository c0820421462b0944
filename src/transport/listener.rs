//! WebSocket listener for the extension connection.
//!
//! Accepts at most one extension connection at a time on a loopback port.
//! A new handshake while a connection is active gracefully replaces the
//! incumbent: the old connection may be a stale half-open socket, so new
//! connections are never rejected on the grounds that one already exists.
//!
//! # Connection Flow
//!
//! 1. Bridge binds the WebSocket server on `127.0.0.1:{port}`
//! 2. Extension connects and is promoted into the dispatcher's slot
//! 3. Reader task routes inbound frames; writer drains the outbound queue
//! 4. On close or replacement: waiters fail `disconnected`, monitor
//!    sessions are invalidated, and the bridge waits for the next
//!    connection

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{Interval, timeout};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::Result;
use crate::monitor::MonitorRegistry;
use crate::protocol::{Action, Envelope, MessageType};
use crate::transport::Dispatcher;

// ============================================================================
// Constants
// ============================================================================

/// A write that stalls longer than this marks the connection broken.
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// BridgeListener
// ============================================================================

/// The extension-facing WebSocket endpoint.
///
/// Owns the accept loop and the per-connection reader/writer task. The
/// single-connection invariant lives in the dispatcher's slot; the
/// listener enforces the replacement policy around it.
pub struct BridgeListener {
    /// Port the listener is bound to.
    port: u16,

    /// Shared correlation state.
    dispatcher: Arc<Dispatcher>,

    /// Shared monitor sessions, invalidated on connection churn.
    monitors: Arc<MonitorRegistry>,

    /// Keepalive ping interval; `None` disables keepalive.
    ping_interval: Option<Duration>,

    /// Monotonic connection identity source.
    next_conn_id: AtomicU64,
}

impl BridgeListener {
    /// Binds the listener and starts the accept loop.
    ///
    /// Use port 0 to let the OS assign a random available port.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Io`] if binding fails.
    pub async fn bind(
        config: &ServerConfig,
        dispatcher: Arc<Dispatcher>,
        monitors: Arc<MonitorRegistry>,
    ) -> Result<Arc<Self>> {
        let addr = SocketAddr::new(config.host, config.ws_port);
        let tcp = TcpListener::bind(addr).await?;
        let port = tcp.local_addr()?.port();

        let listener = Arc::new(Self {
            port,
            dispatcher,
            monitors,
            ping_interval: config.ping_interval,
            next_conn_id: AtomicU64::new(1),
        });

        tokio::spawn(Arc::clone(&listener).accept_loop(tcp));

        info!(port, "Extension WebSocket listener started");
        Ok(listener)
    }

    /// Returns the port the listener is bound to.
    #[inline]
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the WebSocket URL the extension connects to.
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }

    // ========================================================================
    // Accept Loop
    // ========================================================================

    /// Accepts connections forever, promoting each completed handshake.
    async fn accept_loop(self: Arc<Self>, tcp: TcpListener) {
        loop {
            let (stream, addr) = match tcp.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "TCP accept failed");
                    continue;
                }
            };

            match tokio_tungstenite::accept_async(stream).await {
                Ok(ws) => self.promote(ws, addr),
                Err(e) => warn!(?addr, error = %e, "WebSocket handshake failed"),
            }
        }
    }

    /// Promotes a freshly-handshaken connection into the active slot.
    ///
    /// The incumbent, if any, is replaced first: its waiters fail with
    /// `disconnected` and its monitor sessions are dropped before the new
    /// connection can serve a call.
    fn promote(self: &Arc<Self>, ws: WebSocketStream<TcpStream>, addr: SocketAddr) {
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        let replaced = self.dispatcher.attach(conn_id, out_tx);
        // No session can validly span two connections.
        self.monitors.invalidate_all();

        if replaced {
            info!(conn_id, ?addr, "Extension connection replaced");
        } else {
            info!(conn_id, ?addr, "Extension connected");
        }

        tokio::spawn(Arc::clone(self).connection_task(conn_id, ws, out_rx));
    }

    // ========================================================================
    // Connection Task
    // ========================================================================

    /// Runs one connection's combined read/write loop.
    ///
    /// A single task owns the write half, so outbound frames never
    /// interleave.
    async fn connection_task(
        self: Arc<Self>,
        conn_id: u64,
        ws: WebSocketStream<TcpStream>,
        mut out_rx: mpsc::UnboundedReceiver<Envelope>,
    ) {
        let (mut ws_write, mut ws_read) = ws.split();
        let mut keepalive = self.ping_interval.map(tokio::time::interval);

        loop {
            tokio::select! {
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => self.route_frame(&text),

                        Some(Ok(Message::Close(_))) => {
                            debug!(conn_id, "WebSocket closed by extension");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(conn_id, error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!(conn_id, "WebSocket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                frame = out_rx.recv() => {
                    match frame {
                        Some(frame) => {
                            let json = match frame.encode() {
                                Ok(json) => json,
                                Err(e) => {
                                    error!(conn_id, error = %e, "Failed to encode outbound frame");
                                    continue;
                                }
                            };
                            if !send_with_timeout(&mut ws_write, Message::Text(json.into())).await {
                                break;
                            }
                        }

                        // Queue dropped: this connection was replaced.
                        None => {
                            debug!(conn_id, "Outbound queue closed; closing connection");
                            let _ = ws_write.close().await;
                            break;
                        }
                    }
                }

                _ = maybe_tick(&mut keepalive) => {
                    if !send_with_timeout(&mut ws_write, Message::Ping(Vec::new().into())).await {
                        break;
                    }
                }
            }
        }

        if self.dispatcher.detach(conn_id) {
            self.monitors.invalidate_all();
            info!(conn_id, "Extension disconnected");
        } else {
            debug!(conn_id, "Superseded connection closed");
        }
    }

    /// Decodes and routes one inbound text frame.
    fn route_frame(&self, text: &str) {
        let frame = match Envelope::decode(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Dropping undecodable frame");
                return;
            }
        };

        match frame.message_type {
            MessageType::Response | MessageType::Error => self.dispatcher.complete(&frame),

            MessageType::Request => {
                if Action::is_notification_namespace(&frame.action) {
                    self.monitors.handle_notification(&frame.action, &frame.data);
                } else {
                    warn!(
                        action = %frame.action,
                        "Unexpected request frame from extension; dropping"
                    );
                }
            }
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Sends one message, treating a stalled write as a broken connection.
async fn send_with_timeout(
    ws_write: &mut SplitSink<WebSocketStream<TcpStream>, Message>,
    message: Message,
) -> bool {
    match timeout(WRITE_TIMEOUT, ws_write.send(message)).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!(error = %e, "WebSocket write failed");
            false
        }
        Err(_) => {
            warn!(
                timeout_ms = WRITE_TIMEOUT.as_millis() as u64,
                "WebSocket write stalled; treating connection as broken"
            );
            false
        }
    }
}

/// Awaits the next keepalive tick, or forever when keepalive is disabled.
async fn maybe_tick(keepalive: &mut Option<Interval>) {
    match keepalive {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;

    use crate::identifiers::MonitorId;
    use crate::protocol::now_timestamp;

    struct TestBridge {
        listener: Arc<BridgeListener>,
        dispatcher: Arc<Dispatcher>,
        monitors: Arc<MonitorRegistry>,
    }

    async fn start_bridge() -> TestBridge {
        let config = ServerConfig::new()
            .with_ws_port(0)
            .with_ping_interval(Duration::ZERO);
        let dispatcher = Arc::new(Dispatcher::new());
        let monitors = Arc::new(MonitorRegistry::new());
        let listener = BridgeListener::bind(&config, dispatcher.clone(), monitors.clone())
            .await
            .expect("bind");
        TestBridge {
            listener,
            dispatcher,
            monitors,
        }
    }

    async fn connect_extension(
        bridge: &TestBridge,
    ) -> WebSocketStream<tokio_tungstenite::MaybeTlsStream<TcpStream>> {
        let (ws, _) = connect_async(bridge.listener.ws_url()).await.expect("connect");
        // Promotion happens on the accept side; wait for it to land.
        for _ in 0..100 {
            if bridge.dispatcher.is_connected() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(bridge.dispatcher.is_connected());
        ws
    }

    fn reply_text(frame: &Envelope, data: serde_json::Value) -> String {
        serde_json::to_string(&Envelope {
            id: frame.id.clone(),
            message_type: MessageType::Response,
            action: frame.action.clone(),
            data,
            timestamp: now_timestamp(),
        })
        .expect("serialize reply")
    }

    async fn read_request(
        ws: &mut WebSocketStream<tokio_tungstenite::MaybeTlsStream<TcpStream>>,
    ) -> Envelope {
        loop {
            let message = timeout(Duration::from_secs(5), ws.next())
                .await
                .expect("frame before timeout")
                .expect("stream open")
                .expect("read ok");
            if let WsMessage::Text(text) = message {
                return Envelope::decode(&text).expect("decode request");
            }
        }
    }

    #[tokio::test]
    async fn test_call_round_trip_over_socket() {
        let bridge = start_bridge().await;
        let mut ws = connect_extension(&bridge).await;

        let caller = {
            let dispatcher = bridge.dispatcher.clone();
            tokio::spawn(async move {
                dispatcher
                    .call(Action::TabsList, json!({}), Duration::from_secs(5))
                    .await
            })
        };

        let frame = read_request(&mut ws).await;
        assert_eq!(frame.action, "tabs.list");
        assert_eq!(frame.message_type, MessageType::Request);

        let reply = reply_text(&frame, json!({"tabs": [{"id": 7, "active": true}]}));
        ws.send(WsMessage::Text(reply.into())).await.expect("send reply");

        let result = caller.await.expect("join").expect("call");
        assert_eq!(result["tabs"][0]["id"], 7);
    }

    #[tokio::test]
    async fn test_garbage_frames_are_dropped_not_fatal() {
        let bridge = start_bridge().await;
        let mut ws = connect_extension(&bridge).await;

        ws.send(WsMessage::Text("not json".into())).await.expect("send");
        ws.send(WsMessage::Text(r#"{"type": "response"}"#.into()))
            .await
            .expect("send");

        // The connection survives and still serves calls.
        let caller = {
            let dispatcher = bridge.dispatcher.clone();
            tokio::spawn(async move {
                dispatcher
                    .call(Action::Ping, json!({}), Duration::from_secs(5))
                    .await
            })
        };

        let frame = read_request(&mut ws).await;
        let reply = reply_text(&frame, json!({}));
        ws.send(WsMessage::Text(reply.into())).await.expect("send reply");

        assert!(caller.await.expect("join").is_ok());
    }

    #[tokio::test]
    async fn test_notification_routed_to_monitor_registry() {
        let bridge = start_bridge().await;
        let mut ws = connect_extension(&bridge).await;

        let monitor_id = MonitorId::generate();
        bridge
            .monitors
            .register(monitor_id, vec!["*".into()], json!({}), None);

        let notification = serde_json::to_string(&Envelope {
            id: "capture-1".to_string(),
            message_type: MessageType::Request,
            action: "requests.captured".to_string(),
            data: json!({
                "monitor_id": monitor_id.to_string(),
                "request": {"request_id": "req-1", "url": "https://api.example.com/"}
            }),
            timestamp: now_timestamp(),
        })
        .expect("serialize");
        ws.send(WsMessage::Text(notification.into())).await.expect("send");

        for _ in 0..100 {
            if bridge.monitors.capture_count(monitor_id).unwrap_or(0) > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let captured = bridge.monitors.captured(monitor_id).expect("captured");
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].request_id, "req-1");
    }

    #[tokio::test]
    async fn test_disconnect_fails_waiters_and_invalidates_monitors() {
        let bridge = start_bridge().await;
        let mut ws = connect_extension(&bridge).await;

        let monitor_id = MonitorId::generate();
        bridge
            .monitors
            .register(monitor_id, vec!["*".into()], json!({}), None);

        let caller = {
            let dispatcher = bridge.dispatcher.clone();
            tokio::spawn(async move {
                dispatcher
                    .call(Action::ContentGetText, json!({"tabId": 1}), Duration::from_secs(10))
                    .await
            })
        };
        let _frame = read_request(&mut ws).await;

        ws.close(None).await.expect("close");

        let err = caller.await.expect("join").unwrap_err();
        assert!(err.is_disconnected());

        for _ in 0..100 {
            if !bridge.dispatcher.is_connected() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!bridge.dispatcher.is_connected());
        assert!(!bridge.monitors.contains(monitor_id));
    }

    #[tokio::test]
    async fn test_new_connection_replaces_incumbent() {
        let bridge = start_bridge().await;
        let mut ws_a = connect_extension(&bridge).await;

        // Two waiters outstanding on extension A.
        let mut callers = Vec::new();
        for _ in 0..2 {
            let dispatcher = bridge.dispatcher.clone();
            callers.push(tokio::spawn(async move {
                dispatcher
                    .call(Action::TabsList, json!({}), Duration::from_secs(10))
                    .await
            }));
        }
        for _ in 0..2 {
            let _ = read_request(&mut ws_a).await;
        }

        // Extension B completes its handshake.
        let mut ws_b = connect_extension(&bridge).await;

        for caller in callers {
            let err = caller.await.expect("join").unwrap_err();
            assert!(err.is_disconnected());
        }

        // Subsequent calls succeed via extension B.
        let caller = {
            let dispatcher = bridge.dispatcher.clone();
            tokio::spawn(async move {
                dispatcher
                    .call(Action::Ping, json!({}), Duration::from_secs(5))
                    .await
            })
        };
        let frame = read_request(&mut ws_b).await;
        let reply = reply_text(&frame, json!({}));
        ws_b.send(WsMessage::Text(reply.into())).await.expect("send reply");
        assert!(caller.await.expect("join").is_ok());
    }
}
