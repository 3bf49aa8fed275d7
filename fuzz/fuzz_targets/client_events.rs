//! Fuzz target for the `ChatClient` state machine
//!
//! Drives the client with arbitrary sequences of transport lifecycle
//! events, server frames, and user intents.
//!
//! # Invariants
//!
//! - `handle` never panics
//! - At most `max_reconnect_attempts` reconnects are scheduled in a row
//! - Reconnect delays never exceed the configured maximum
//! - Chat is only sent while Connected and Joined
//! - After `Shutdown`, no further actions are produced

#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use chrono::{TimeZone, Utc};
use libfuzzer_sys::fuzz_target;
use murmur_core::{
    ChatClient, ChatClientConfig, ClientAction, ClientEvent, ConnectionState, RegistrationState,
    env::Environment,
};
use murmur_proto::{ChatPayload, ClientMessage, HandshakePayload, PresencePayload, ServerMessage};

#[derive(Clone)]
struct FuzzEnv {
    seed: u64,
}

impl Environment for FuzzEnv {
    fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send + 'static {
        std::future::ready(())
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = self.seed.rotate_left(i as u32 * 8) as u8;
        }
    }
}

#[derive(Debug, Arbitrary)]
enum Op {
    Connect,
    Opened,
    Closed,
    Failed,
    ReconnectDue,
    Handshake,
    Chat { author: String, body: String, millis: i32 },
    Join { name: String, millis: i32 },
    Leave { name: String, millis: i32 },
    Unknown { event: String },
    SubmitName(String),
    SendMessage(String),
    Shutdown,
}

#[derive(Debug, Arbitrary)]
struct Input {
    seed: u64,
    ops: Vec<Op>,
}

fn event(op: Op) -> ClientEvent {
    let at = |millis: i32| Utc.timestamp_millis_opt(i64::from(millis)).single().unwrap_or_default();
    match op {
        Op::Connect => ClientEvent::Connect,
        Op::Opened => ClientEvent::TransportOpened { client_id: "fuzz".into() },
        Op::Closed => ClientEvent::TransportClosed { reason: "closed".into() },
        Op::Failed => ClientEvent::TransportFailed { cause: "refused".into() },
        Op::ReconnectDue => ClientEvent::ReconnectDue,
        Op::Handshake => {
            ClientEvent::Inbound(ServerMessage::Connect(HandshakePayload { id: "fuzz".into() }))
        },
        Op::Chat { author, body, millis } => ClientEvent::Inbound(ServerMessage::ChatMessage(
            ChatPayload { id: "x".into(), username: author, message: body, time: at(millis) },
        )),
        Op::Join { name, millis } => ClientEvent::Inbound(ServerMessage::UserJoined(
            PresencePayload { username: name, id: "x".into(), time: at(millis) },
        )),
        Op::Leave { name, millis } => ClientEvent::Inbound(ServerMessage::UserLeft(
            PresencePayload { username: name, id: "x".into(), time: at(millis) },
        )),
        Op::Unknown { event } => ClientEvent::Inbound(ServerMessage::Unknown { event }),
        Op::SubmitName(name) => ClientEvent::SubmitName(name),
        Op::SendMessage(text) => ClientEvent::SendMessage(text),
        Op::Shutdown => ClientEvent::Shutdown,
    }
}

fuzz_target!(|input: Input| {
    let config = ChatClientConfig::default();
    let budget = config.connection.max_reconnect_attempts;
    let max_delay = config.connection.reconnect_delay_max;
    let mut client = ChatClient::new(FuzzEnv { seed: input.seed }, config);
    let mut shut_down = false;

    for op in input.ops {
        let state = client.connection_state();
        let registration = client.registration();
        let Ok(actions) = client.handle(event(op)) else {
            continue;
        };

        if shut_down {
            assert!(actions.is_empty(), "actions after shutdown: {actions:?}");
        }

        for action in &actions {
            match action {
                ClientAction::ScheduleReconnect { attempt, delay } => {
                    assert!(*attempt <= budget, "attempt {attempt} over budget {budget}");
                    assert!(*delay <= max_delay, "delay {delay:?} over {max_delay:?}");
                },
                ClientAction::Send(ClientMessage::ChatMessage(_)) => {
                    assert_eq!(state, ConnectionState::Connected);
                    assert_eq!(registration, RegistrationState::Joined);
                },
                _ => {},
            }
        }

        if client.is_shut_down() {
            shut_down = true;
        }
    }
});
