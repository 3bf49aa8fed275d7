//! Logical event names used on the wire.

/// Transport handshake sent by the server when a connection opens.
pub const CONNECT: &str = "connect";

/// Client registers its display name.
pub const SET_USERNAME: &str = "set username";

/// Chat message, in both directions.
pub const CHAT_MESSAGE: &str = "chat message";

/// Presence: a participant registered a name.
pub const USER_JOINED: &str = "user joined";

/// Presence: a participant disconnected.
pub const USER_LEFT: &str = "user left";
