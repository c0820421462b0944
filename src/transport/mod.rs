//! WebSocket transport layer.
//!
//! Hosts the extension-facing endpoint and the correlation machinery that
//! multiplexes many concurrent tool calls onto the single connection.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     BridgeListener                       │
//! │                    (single loopback port)                │
//! │   accept → promote → reader/writer task                  │
//! │                         │                                │
//! │                   ┌─────┴──────┐                         │
//! │                   │ Dispatcher │  id → waiter             │
//! │                   └────────────┘                         │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `BridgeListener::bind` - bind loopback port, start accept loop
//! 2. Extension connects; incumbent (if any) is replaced gracefully
//! 3. `Dispatcher::call` - send request frames, await correlated replies
//! 4. On close or replacement: all waiters fail `disconnected`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `dispatcher` | Pending-call table and request/response correlation |
//! | `listener` | Accept loop, replacement policy, frame routing |

// ============================================================================
// Submodules
// ============================================================================

/// Request dispatch and response correlation.
pub mod dispatcher;

/// WebSocket listener for the extension connection.
pub mod listener;

// ============================================================================
// Re-exports
// ============================================================================

pub use dispatcher::{DEFAULT_CALL_TIMEOUT, Dispatcher};
pub use listener::BridgeListener;
