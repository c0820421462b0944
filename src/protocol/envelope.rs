//! Wire envelope for every WebSocket frame.
//!
//! Every frame in both directions is one JSON object:
//!
//! ```json
//! {
//!   "id": "uuid",
//!   "type": "request",
//!   "action": "tabs.list",
//!   "data": {},
//!   "timestamp": "2024-05-01T12:00:00.000Z"
//! }
//! ```
//!
//! A response or error frame's `id` echoes the corresponding request.
//! `type=request` frames flow server → extension, except for unsolicited
//! monitor notifications in the `requests.*` namespace.

// ============================================================================
// Imports
// ============================================================================

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::Action;

// ============================================================================
// MessageType
// ============================================================================

/// Frame type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// Command request (server → extension, plus monitor notifications).
    Request,
    /// Successful response (extension → server).
    Response,
    /// Structured error (extension → server).
    Error,
}

// ============================================================================
// Envelope
// ============================================================================

/// One on-wire frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Unique identifier for request/response correlation. Non-empty.
    pub id: String,

    /// Frame type.
    #[serde(rename = "type")]
    pub message_type: MessageType,

    /// Dotted action name. Empty string allowed on `error` frames.
    #[serde(default)]
    pub action: String,

    /// Action-specific payload; for `error` frames carries
    /// `{code, message, details}`.
    #[serde(default)]
    pub data: Value,

    /// ISO-8601 timestamp. Informational, so absence is tolerated.
    #[serde(default)]
    pub timestamp: String,
}

impl Envelope {
    /// Builds an outbound request frame for a catalog action.
    ///
    /// The action string always comes from the closed catalog; handlers
    /// cannot inject dynamic names.
    #[must_use]
    pub fn request(id: RequestId, action: Action, data: Value) -> Self {
        Self {
            id: id.to_string(),
            message_type: MessageType::Request,
            action: action.as_str().to_string(),
            data,
            timestamp: now_timestamp(),
        }
    }

    /// Decodes a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] for frames that are not JSON, lack a
    /// non-empty `id`, or carry an unknown `type`. Such frames cannot
    /// correlate to a waiter and are dropped by the listener.
    pub fn decode(text: &str) -> Result<Self> {
        let envelope: Self = serde_json::from_str(text)
            .map_err(|e| Error::protocol(format!("unparseable frame: {e}")))?;

        if envelope.id.is_empty() {
            return Err(Error::protocol("frame is missing a non-empty id"));
        }

        Ok(envelope)
    }

    /// Serializes the frame to its wire form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Returns `true` if this is a response or error frame.
    #[inline]
    #[must_use]
    pub fn is_reply(&self) -> bool {
        matches!(self.message_type, MessageType::Response | MessageType::Error)
    }

    /// Parses the error payload of an `error` frame.
    ///
    /// Missing fields fall back to placeholders so a malformed error frame
    /// still fails the waiting call with something descriptive.
    #[must_use]
    pub fn error_payload(&self) -> (String, String) {
        let code = self
            .data
            .get("code")
            .and_then(Value::as_str)
            .unwrap_or("unknown_error")
            .to_string();
        let message = self
            .data
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("extension reported an error without a message")
            .to_string();
        (code, message)
    }
}

// ============================================================================
// Timestamps
// ============================================================================

/// Current wall-clock time in the envelope's ISO-8601 form.
#[must_use]
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_request_frame_shape() {
        let id = RequestId::generate();
        let frame = Envelope::request(id, Action::TabsList, json!({}));

        assert_eq!(frame.id, id.to_string());
        assert_eq!(frame.message_type, MessageType::Request);
        assert_eq!(frame.action, "tabs.list");
        assert!(frame.data.is_object());

        let json = frame.encode().expect("encode");
        assert!(json.contains("\"type\":\"request\""));
        assert!(json.contains("\"action\":\"tabs.list\""));
    }

    #[test]
    fn test_round_trip() {
        let frame = Envelope::request(
            RequestId::generate(),
            Action::HistoryQuery,
            json!({"query": "rust", "maxResults": 50}),
        );
        let encoded = frame.encode().expect("encode");
        let decoded = Envelope::decode(&encoded).expect("decode");
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_decode_response() {
        let text = r#"{
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "type": "response",
            "action": "tabs.list",
            "data": {"tabs": []},
            "timestamp": "2024-05-01T12:00:00.000Z"
        }"#;
        let frame = Envelope::decode(text).expect("decode");
        assert_eq!(frame.message_type, MessageType::Response);
        assert!(frame.is_reply());
    }

    #[test]
    fn test_decode_error_frame() {
        let text = r#"{
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "type": "error",
            "action": "",
            "data": {"code": "tab_not_found", "message": "No tab 42", "details": null},
            "timestamp": "2024-05-01T12:00:00.000Z"
        }"#;
        let frame = Envelope::decode(text).expect("decode");
        assert!(frame.is_reply());

        let (code, message) = frame.error_payload();
        assert_eq!(code, "tab_not_found");
        assert_eq!(message, "No tab 42");
    }

    #[test]
    fn test_decode_rejects_missing_id() {
        let text = r#"{"id": "", "type": "response", "action": "ping", "data": {}, "timestamp": "t"}"#;
        let err = Envelope::decode(text).unwrap_err();
        assert_eq!(err.kind(), "protocol_error");
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        let text = r#"{"id": "x", "type": "notify", "action": "ping", "data": {}, "timestamp": "t"}"#;
        assert!(Envelope::decode(text).is_err());
    }

    #[test]
    fn test_decode_rejects_non_json() {
        assert!(Envelope::decode("not json at all").is_err());
    }

    #[test]
    fn test_missing_data_defaults_to_null() {
        let text = r#"{"id": "x1", "type": "response", "action": "ping", "timestamp": "t"}"#;
        let frame = Envelope::decode(text).expect("decode");
        assert!(frame.data.is_null());
    }

    #[test]
    fn test_error_payload_fallbacks() {
        let text = r#"{"id": "x1", "type": "error", "action": "", "data": {}, "timestamp": "t"}"#;
        let frame = Envelope::decode(text).expect("decode");
        let (code, message) = frame.error_payload();
        assert_eq!(code, "unknown_error");
        assert!(!message.is_empty());
    }
}
