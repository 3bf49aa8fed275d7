//! Core
//!
//! Sans-IO state machines for the murmur chat client: connection lifecycle
//! with bounded reconnection, display-name registration, outbound message
//! validation, and the merged event timeline.
//!
//! # Architecture
//!
//! Every component is a pure state machine. [`ChatClient`] receives events
//! ([`ClientEvent`]) from the caller, routes them through the components, and
//! returns actions ([`ClientAction`]) for the caller to execute: open or close
//! the transport, send a frame, arm a reconnect timer, notify subscribers.
//! Time and randomness come from an [`env::Environment`], so the same code
//! runs under a real clock and in deterministic tests.
//!
//! # Components
//!
//! - [`Connection`]: transport session lifecycle and reconnect budget
//! - [`Registrar`]: gates the joined experience behind a display name
//! - [`Dispatcher`]: validates and forwards outbound chat messages
//! - [`Timeline`]: append-only, arrival-ordered log of chat and presence
//! - [`Session`]: server-assigned identity of the current connection

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
pub mod connection;
mod dispatcher;
pub mod env;
pub mod error;
mod event;
mod registrar;
mod session;
pub mod timeline;

pub use client::{ChatClient, ChatClientConfig};
pub use connection::{Connection, ConnectionAction, ConnectionConfig, ConnectionState};
pub use dispatcher::Dispatcher;
pub use error::{ClientError, ConnectionError};
pub use event::{ClientAction, ClientEvent};
pub use registrar::{Registrar, RegistrarConfig, RegistrationState};
pub use session::Session;
pub use timeline::{
    ChatMessage, PresenceKind, PresenceNotification, Timeline, TimelineConfig, TimelineEntry,
};
