//! Driver trait for abstracting transport I/O.
//!
//! The [`Driver`] trait decouples the runtime from a specific transport.
//! [`crate::WsDriver`] talks to a real server over WebSocket; tests plug in
//! an in-memory implementation and script the server side.

use std::future::Future;

use murmur_proto::{ClientMessage, ServerMessage};

/// Something the open transport delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A decoded server frame.
    Message(ServerMessage),
    /// The transport closed.
    Closed {
        /// Close reason, for logs and status text.
        reason: String,
    },
}

/// Abstracts the transport for the client runtime.
///
/// The runtime calls these methods from a single task and never
/// concurrently. At most one transport is open at a time.
pub trait Driver: Send + 'static {
    /// Transport-specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Open a transport to `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    fn connect(&mut self, url: &str) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Send one frame on the open transport.
    ///
    /// # Errors
    ///
    /// Returns an error if no transport is open or the write fails.
    fn send(
        &mut self,
        message: ClientMessage,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Wait for the next event on the open transport.
    ///
    /// Returns `None` when no transport is open. Must be cancel safe: the
    /// runtime polls it inside `tokio::select!`.
    fn recv(&mut self) -> impl Future<Output = Option<TransportEvent>> + Send;

    /// Close the open transport, if any.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}
