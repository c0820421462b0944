//! Type-safe identifiers for bridge entities.
//!
//! Newtype wrappers prevent mixing incompatible IDs at compile time.
//! Both identifier kinds are UUID v4 values that cross the wire as their
//! hyphenated string form.
//!
//! | Type | Minted by | Used for |
//! |------|-----------|----------|
//! | [`RequestId`] | Dispatcher | Request/response correlation on the WebSocket |
//! | [`MonitorId`] | Monitor registry | Web-request monitoring sessions |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// RequestId
// ============================================================================

/// Unique identifier correlating a request frame with its response.
///
/// Minted once per dispatched call; the extension echoes it back in the
/// matching response or error frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generates a fresh random request ID.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a request ID from its wire string form.
    ///
    /// Returns `None` for strings that are not UUIDs; inbound frames with
    /// such IDs cannot correlate to a waiter.
    #[inline]
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// MonitorId
// ============================================================================

/// Opaque identifier for a web-request monitoring session.
///
/// Minted by the core when a session starts and handed to MCP clients,
/// which pass it back to list, fetch, and stop the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonitorId(Uuid);

impl MonitorId {
    /// Generates a fresh random monitor ID.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a monitor ID from its string form.
    #[inline]
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl fmt::Display for MonitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// Tests
// ============================================================================
