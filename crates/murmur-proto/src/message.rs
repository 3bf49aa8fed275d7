//! Event framing and payload types.
//!
//! Decoding is split in two steps: the frame is parsed into an event name and
//! a raw JSON payload, then the payload is decoded according to the name.
//! Unknown server events are surfaced as [`ServerMessage::Unknown`] instead of
//! an error, so a newer server cannot break an older client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    errors::{ProtocolError, Result},
    events,
};

/// Payload of the server's `connect` handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakePayload {
    /// Opaque client identifier assigned to this connection.
    pub id: String,
}

/// Payload of a server-broadcast `chat message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    /// Message ID, unique per server.
    pub id: String,
    /// Display name of the author.
    pub username: String,
    /// Message body.
    pub message: String,
    /// Server timestamp. Advisory only.
    #[serde(with = "crate::time")]
    pub time: DateTime<Utc>,
}

/// Payload of `user joined` and `user left`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresencePayload {
    /// Display name of the participant.
    pub username: String,
    /// Client identifier of the participant.
    pub id: String,
    /// Server timestamp. Advisory only.
    #[serde(with = "crate::time")]
    pub time: DateTime<Utc>,
}

/// Events sent from client to server. Both are fire-and-forget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Register a display name for this connection.
    SetUsername(String),
    /// Post a chat message.
    ChatMessage(String),
}

impl ClientMessage {
    /// Wire event name.
    pub fn event(&self) -> &'static str {
        match self {
            Self::SetUsername(_) => events::SET_USERNAME,
            Self::ChatMessage(_) => events::CHAT_MESSAGE,
        }
    }

    /// Encode as a text frame.
    pub fn encode(&self) -> Result<String> {
        let body = match self {
            Self::SetUsername(text) | Self::ChatMessage(text) => text,
        };
        encode_frame(self.event(), body)
    }

    /// Decode a text frame sent by a client.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnexpectedEvent` for anything but the two client
    ///   events
    /// - `ProtocolError::InvalidPayload` if the payload is not a string
    pub fn decode(text: &str) -> Result<Self> {
        let (event, payload) = split_frame(text)?;
        match event.as_str() {
            events::SET_USERNAME => decode_payload(&event, payload).map(Self::SetUsername),
            events::CHAT_MESSAGE => decode_payload(&event, payload).map(Self::ChatMessage),
            _ => Err(ProtocolError::UnexpectedEvent(event)),
        }
    }
}

/// Events sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Connection handshake carrying the assigned client identifier.
    Connect(HandshakePayload),
    /// Chat message rebroadcast to every client, sender included.
    ChatMessage(ChatPayload),
    /// A participant registered a display name.
    UserJoined(PresencePayload),
    /// A participant disconnected.
    UserLeft(PresencePayload),
    /// Event this client does not understand.
    Unknown {
        /// Wire event name.
        event: String,
    },
}

impl ServerMessage {
    /// Wire event name.
    pub fn event(&self) -> &str {
        match self {
            Self::Connect(_) => events::CONNECT,
            Self::ChatMessage(_) => events::CHAT_MESSAGE,
            Self::UserJoined(_) => events::USER_JOINED,
            Self::UserLeft(_) => events::USER_LEFT,
            Self::Unknown { event } => event,
        }
    }

    /// Encode as a text frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnexpectedEvent` for [`ServerMessage::Unknown`],
    ///   which has no payload to send
    pub fn encode(&self) -> Result<String> {
        match self {
            Self::Connect(p) => encode_frame(events::CONNECT, p),
            Self::ChatMessage(p) => encode_frame(events::CHAT_MESSAGE, p),
            Self::UserJoined(p) => encode_frame(events::USER_JOINED, p),
            Self::UserLeft(p) => encode_frame(events::USER_LEFT, p),
            Self::Unknown { event } => Err(ProtocolError::UnexpectedEvent(event.clone())),
        }
    }

    /// Decode a text frame sent by the server.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Malformed` if the text is not JSON
    /// - `ProtocolError::FrameShape` if it is not an `[event, payload]` pair
    /// - `ProtocolError::InvalidPayload` if a known event carries a payload of
    ///   the wrong shape
    pub fn decode(text: &str) -> Result<Self> {
        let (event, payload) = split_frame(text)?;
        match event.as_str() {
            events::CONNECT => decode_payload(&event, payload).map(Self::Connect),
            events::CHAT_MESSAGE => decode_payload(&event, payload).map(Self::ChatMessage),
            events::USER_JOINED => decode_payload(&event, payload).map(Self::UserJoined),
            events::USER_LEFT => decode_payload(&event, payload).map(Self::UserLeft),
            _ => Ok(Self::Unknown { event }),
        }
    }
}

fn encode_frame<T: Serialize + ?Sized>(event: &str, payload: &T) -> Result<String> {
    serde_json::to_string(&(event, payload)).map_err(|e| ProtocolError::Encode(e.to_string()))
}

fn split_frame(text: &str) -> Result<(String, Value)> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

    let Value::Array(mut items) = value else {
        return Err(ProtocolError::FrameShape);
    };
    if items.len() != 2 {
        return Err(ProtocolError::FrameShape);
    }

    let payload = items.pop().unwrap_or(Value::Null);
    match items.pop() {
        Some(Value::String(event)) => Ok((event, payload)),
        _ => Err(ProtocolError::FrameShape),
    }
}

fn decode_payload<T: DeserializeOwned>(event: &str, payload: Value) -> Result<T> {
    serde_json::from_value(payload).map_err(|e| ProtocolError::InvalidPayload {
        event: event.to_string(),
        reason: e.to_string(),
    })
}
