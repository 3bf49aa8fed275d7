//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding or decoding frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame text is not valid JSON
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// Frame is JSON but not an `[event, payload]` pair
    #[error("frame is not an [event, payload] pair")]
    FrameShape,

    /// Payload does not match the shape expected for its event
    #[error("invalid payload for {event:?}: {reason}")]
    InvalidPayload {
        /// Event name the payload arrived under
        event: String,
        /// Decoder diagnostic
        reason: String,
    },

    /// Event name is not one this side of the protocol accepts
    #[error("unexpected event {0:?}")]
    UnexpectedEvent(String),

    /// Serialization failed
    #[error("encode failed: {0}")]
    Encode(String),
}
