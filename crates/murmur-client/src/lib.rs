//! Client
//!
//! Async shell around the Sans-IO [`murmur_core::ChatClient`]: a WebSocket
//! transport, a background runtime task that owns all I/O, and a
//! [`ClientHandle`] for the presentation layer.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐ intents  ┌─────────┐ frames  ┌────────┐
//! │ ClientHandle │ ───────> │ Runtime │ <─────> │ Driver │
//! └──────────────┘          └─────────┘         └────────┘
//!        │ reads                 │ writes
//!        └──────> ChatClient <───┘
//! ```
//!
//! The runtime is the single writer. The handle reads the shared state
//! without waiting on I/O, checks intents against it, and queues them.
//! Subscribers registered through the handle are called on the runtime task
//! in delivery order and removed when their [`Subscription`] is dropped.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod driver;
mod handle;
mod runtime;
pub mod subscription;
mod system_env;
pub mod transport;

pub use config::ClientConfig;
pub use driver::{Driver, TransportEvent};
pub use handle::ClientHandle;
pub use murmur_core::{
    ChatMessage, ClientError, ConnectionState, PresenceKind, PresenceNotification,
    RegistrationState, Session, TimelineEntry,
};
pub use runtime::{RuntimeError, StateChange};
pub use subscription::Subscription;
pub use system_env::SystemEnv;
pub use transport::{TransportError, WsDriver};
