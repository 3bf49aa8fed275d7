//! Wire protocol for murmur.
//!
//! Every application event travels as one text frame holding a two-element
//! JSON array: the event name followed by its payload.
//!
//! ```text
//! ["set username", "Alice"]
//! ["chat message", {"id": "m1", "username": "Alice", "message": "hi", "time": "..."}]
//! ```
//!
//! [`ClientMessage`] covers what the client sends, [`ServerMessage`] what the
//! server broadcasts. The `connect` handshake that opens each connection is
//! part of [`ServerMessage`] so a transport can hand every frame to the same
//! decoder.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
pub mod events;
mod message;
mod time;

pub use errors::{ProtocolError, Result};
pub use message::{ChatPayload, ClientMessage, HandshakePayload, PresencePayload, ServerMessage};
