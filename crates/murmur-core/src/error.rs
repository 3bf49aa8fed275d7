//! Error types for the murmur core.
//!
//! Two layers: [`ConnectionError`] describes why the transport is not usable
//! and is only ever observed through connection state, never returned to the
//! presentation layer. [`ClientError`] is what user intents can fail with.
//!
//! Blank names and blank messages are not errors at all. They are dropped
//! before reaching the transport.

use thiserror::Error;

use crate::connection::ConnectionState;

/// Why the transport session is not connected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Handshake or network failure while connecting
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// Established connection dropped unexpectedly
    #[error("connection lost: {0}")]
    Lost(String),

    /// Reconnect budget consumed, no further automatic attempts
    #[error("gave up after {attempts} reconnect attempts")]
    Exhausted {
        /// Number of reconnect attempts made
        attempts: u32,
    },
}

/// Errors returned for user intents.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Transport is not connected
    #[error("not connected (state: {state})")]
    NotConnected {
        /// Connection state at the time of the call
        state: ConnectionState,
    },

    /// Chat requires a registered display name
    #[error("no display name registered for this session")]
    NotJoined,

    /// Client has been shut down
    #[error("client is shut down")]
    Closed,
}
