//! Event timeline.
//!
//! A single append-only log of chat messages and presence notifications,
//! ordered strictly by arrival. Entries carry the server's timestamp, but that
//! timestamp is advisory: it is displayed, never used to sort.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use murmur_proto::{ChatPayload, PresencePayload, ServerMessage};

/// A chat message broadcast by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Sender's connection identifier
    pub id: String,
    /// Sender's display name
    pub author: String,
    /// Message text, as sent
    pub body: String,
    /// Server-supplied timestamp
    pub timestamp: DateTime<Utc>,
}

impl From<ChatPayload> for ChatMessage {
    fn from(payload: ChatPayload) -> Self {
        Self {
            id: payload.id,
            author: payload.username,
            body: payload.message,
            timestamp: payload.time,
        }
    }
}

/// Join or leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresenceKind {
    /// A user registered a display name.
    Join,
    /// A user disconnected.
    Leave,
}

/// A user joined or left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceNotification {
    /// Join or leave
    pub kind: PresenceKind,
    /// Display name of the user
    pub subject: String,
    /// Server-supplied timestamp
    pub timestamp: DateTime<Utc>,
}

impl PresenceNotification {
    fn new(kind: PresenceKind, payload: PresencePayload) -> Self {
        Self { kind, subject: payload.username, timestamp: payload.time }
    }
}

/// One timeline entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineEntry {
    /// Chat message
    Chat(ChatMessage),
    /// Presence notification
    Presence(PresenceNotification),
}

impl TimelineEntry {
    /// Build an entry from a server frame.
    ///
    /// Returns `None` for frames that do not belong on the timeline
    /// (handshake, unknown events).
    pub fn from_server(message: ServerMessage) -> Option<Self> {
        match message {
            ServerMessage::ChatMessage(payload) => Some(Self::Chat(payload.into())),
            ServerMessage::UserJoined(payload) => {
                Some(Self::Presence(PresenceNotification::new(PresenceKind::Join, payload)))
            },
            ServerMessage::UserLeft(payload) => {
                Some(Self::Presence(PresenceNotification::new(PresenceKind::Leave, payload)))
            },
            ServerMessage::Connect(_) | ServerMessage::Unknown { .. } => None,
        }
    }

    /// Server-supplied timestamp.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Chat(msg) => msg.timestamp,
            Self::Presence(note) => note.timestamp,
        }
    }
}

/// Timeline configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimelineConfig {
    /// Keep at most this many entries, dropping the oldest first.
    /// `None` keeps everything for the lifetime of the client, and `Some(0)`
    /// behaves like `Some(1)`.
    pub capacity: Option<usize>,
}

/// Append-only, arrival-ordered log.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    entries: VecDeque<TimelineEntry>,
    config: TimelineConfig,
    appended: u64,
}

impl Timeline {
    /// Create an empty timeline.
    pub fn new(config: TimelineConfig) -> Self {
        Self { entries: VecDeque::new(), config, appended: 0 }
    }

    /// Append the entry for `message`, if it has one.
    ///
    /// Returns the appended entry.
    pub fn on_inbound_event(&mut self, message: ServerMessage) -> Option<TimelineEntry> {
        let entry = TimelineEntry::from_server(message)?;
        self.append(entry.clone());
        Some(entry)
    }

    /// Append `entry` after every existing entry.
    pub fn append(&mut self, entry: TimelineEntry) {
        if let Some(capacity) = self.config.capacity {
            while self.entries.len() >= capacity.max(1) {
                self.entries.pop_front();
            }
        }
        self.entries.push_back(entry);
        self.appended += 1;
    }

    /// Copy of the current entries in arrival order.
    pub fn snapshot(&self) -> Vec<TimelineEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Entries in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &TimelineEntry> {
        self.entries.iter()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries appended over the lifetime of the timeline, evicted included.
    pub fn total_appended(&self) -> u64 {
        self.appended
    }
}
