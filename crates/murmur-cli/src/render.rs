//! Text rendering for the terminal.

use chrono::{DateTime, Utc};
use murmur_client::{ConnectionState, PresenceKind, RegistrationState, TimelineEntry};

fn clock(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%H:%M:%S").to_string()
}

/// One timeline entry. `own` marks messages sent under our display name.
pub fn entry(entry: &TimelineEntry, own: bool) -> String {
    match entry {
        TimelineEntry::Chat(msg) => {
            let marker = if own { " (you)" } else { "" };
            format!("[{}] {}{marker}: {}", clock(&msg.timestamp), msg.author, msg.body)
        },
        TimelineEntry::Presence(note) => {
            let verb = match note.kind {
                PresenceKind::Join => "joined",
                PresenceKind::Leave => "left",
            };
            format!("[{}] * {} {verb}", clock(&note.timestamp), note.subject)
        },
    }
}

/// Connection state change, with the status text when not connected.
pub fn connection(state: ConnectionState, status: Option<&str>) -> String {
    match (state, status) {
        (ConnectionState::Connected, _) => "-- connected".to_string(),
        (_, Some(status)) => format!("-- {status}"),
        (state, None) => format!("-- {state}"),
    }
}

/// Line shown when registration changes. `None` for transient states.
pub fn registration(state: RegistrationState, name: Option<&str>) -> Option<String> {
    match state {
        RegistrationState::AwaitingName => Some("Enter a display name to join.".to_string()),
        RegistrationState::Registering => None,
        RegistrationState::Joined => Some(format!("-- joined as {}", name.unwrap_or("?"))),
    }
}

/// A refused intent or other local problem.
pub fn error(message: &impl std::fmt::Display) -> String {
    format!("! {message}")
}
