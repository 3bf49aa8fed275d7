//! Property-based tests for `ChatClient`.
//!
//! Random event sequences are pushed through the state machine and the
//! observable behaviour is checked against the client's contract: arrival
//! ordering, local validation, the reconnect budget, and per-session identity.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use murmur_core::{
    ChatClient, ChatClientConfig, ClientAction, ClientEvent, ConnectionState, PresenceKind,
    RegistrationState, TimelineEntry, env::Environment,
};
use murmur_proto::{ChatPayload, ClientMessage, PresencePayload, ServerMessage};
use proptest::prelude::*;

#[derive(Clone)]
struct TestEnv {
    seed: u64,
}

impl Environment for TestEnv {
    fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send + 'static {
        std::future::ready(())
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = self.seed.rotate_left(i as u32 * 8) as u8;
        }
    }
}

fn joined_client(seed: u64) -> ChatClient<TestEnv> {
    let mut client = ChatClient::new(TestEnv { seed }, ChatClientConfig::default());
    client.handle(ClientEvent::Connect).unwrap();
    client.handle(ClientEvent::TransportOpened { client_id: "c1".into() }).unwrap();
    client.handle(ClientEvent::SubmitName("Alice".into())).unwrap();
    client
}

fn at(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).single().unwrap()
}

/// One inbound frame that belongs on the timeline.
#[derive(Debug, Clone)]
enum Inbound {
    Chat { author: String, body: String, millis: i64 },
    Join { name: String, millis: i64 },
    Leave { name: String, millis: i64 },
}

impl Inbound {
    fn into_message(self) -> ServerMessage {
        match self {
            Self::Chat { author, body, millis } => ServerMessage::ChatMessage(ChatPayload {
                id: format!("{author}-id"),
                username: author,
                message: body,
                time: at(millis),
            }),
            Self::Join { name, millis } => ServerMessage::UserJoined(PresencePayload {
                id: format!("{name}-id"),
                username: name,
                time: at(millis),
            }),
            Self::Leave { name, millis } => ServerMessage::UserLeft(PresencePayload {
                id: format!("{name}-id"),
                username: name,
                time: at(millis),
            }),
        }
    }

    fn matches(&self, entry: &TimelineEntry) -> bool {
        match (self, entry) {
            (Self::Chat { author, body, millis }, TimelineEntry::Chat(msg)) => {
                &msg.author == author && &msg.body == body && msg.timestamp == at(*millis)
            },
            (Self::Join { name, millis }, TimelineEntry::Presence(note)) => {
                note.kind == PresenceKind::Join
                    && &note.subject == name
                    && note.timestamp == at(*millis)
            },
            (Self::Leave { name, millis }, TimelineEntry::Presence(note)) => {
                note.kind == PresenceKind::Leave
                    && &note.subject == name
                    && note.timestamp == at(*millis)
            },
            _ => false,
        }
    }
}

fn inbound_strategy() -> impl Strategy<Value = Inbound> {
    let name = "[A-Za-z]{1,8}";
    let millis = 0i64..4_102_444_800_000;
    prop_oneof![
        (name, ".{0,32}", millis.clone())
            .prop_map(|(author, body, millis)| Inbound::Chat { author, body, millis }),
        (name, millis.clone()).prop_map(|(name, millis)| Inbound::Join { name, millis }),
        (name, millis).prop_map(|(name, millis)| Inbound::Leave { name, millis }),
    ]
}

fn blank_strategy() -> impl Strategy<Value = String> {
    "[ \t\r\n]{0,8}"
}

fn sends(actions: &[ClientAction]) -> usize {
    actions.iter().filter(|a| matches!(a, ClientAction::Send(_))).count()
}

/// Property: the timeline is exactly the delivered frames, in delivery order,
/// regardless of their timestamps.
#[test]
fn prop_timeline_preserves_arrival_order() {
    proptest!(|(frames in prop::collection::vec(inbound_strategy(), 0..64), seed in any::<u64>())| {
        let mut client = joined_client(seed);

        for frame in frames.clone() {
            let actions = client.handle(ClientEvent::Inbound(frame.into_message())).unwrap();
            prop_assert_eq!(actions.len(), 1);
        }

        let snapshot = client.snapshot();
        prop_assert_eq!(snapshot.len(), frames.len());
        for (frame, entry) in frames.iter().zip(&snapshot) {
            prop_assert!(frame.matches(entry), "{:?} != {:?}", frame, entry);
        }
    });
}

/// Property: blank names and messages never reach the transport and never
/// change any state, in any connection state.
#[test]
fn prop_blank_input_is_inert() {
    proptest!(|(name in blank_strategy(), text in blank_strategy(), connect in any::<bool>())| {
        let mut client = ChatClient::new(TestEnv { seed: 0 }, ChatClientConfig::default());
        if connect {
            client.handle(ClientEvent::Connect).unwrap();
            client.handle(ClientEvent::TransportOpened { client_id: "c1".into() }).unwrap();
        }
        let state = client.connection_state();
        let session = client.session().clone();

        prop_assert_eq!(client.handle(ClientEvent::SubmitName(name)), Ok(vec![]));
        prop_assert_eq!(client.handle(ClientEvent::SendMessage(text)), Ok(vec![]));

        prop_assert_eq!(client.connection_state(), state);
        prop_assert_eq!(client.session(), &session);
        prop_assert_eq!(client.registration(), RegistrationState::AwaitingName);
        prop_assert!(client.timeline().is_empty());
    });
}

/// Property: sending never appends to the timeline by itself.
#[test]
fn prop_no_local_echo() {
    proptest!(|(texts in prop::collection::vec("[a-z]{1,16}", 1..16))| {
        let mut client = joined_client(0);

        for text in texts {
            let actions = client.handle(ClientEvent::SendMessage(text.clone())).unwrap();
            prop_assert_eq!(actions, vec![ClientAction::Send(ClientMessage::ChatMessage(text))]);
        }

        prop_assert!(client.timeline().is_empty());
    });
}

/// Property: between two successful connects at most five reconnects are
/// scheduled, and exhaustion leaves the client disconnected for good.
#[test]
fn prop_reconnect_budget_is_bounded() {
    proptest!(|(failures in 1usize..32, seed in any::<u64>(), drop_first in any::<bool>())| {
        let mut client = ChatClient::new(TestEnv { seed }, ChatClientConfig::default());
        client.handle(ClientEvent::Connect).unwrap();
        if drop_first {
            client.handle(ClientEvent::TransportOpened { client_id: "c1".into() }).unwrap();
            client.handle(ClientEvent::TransportClosed { reason: "reset".into() }).unwrap();
            client.handle(ClientEvent::ReconnectDue).unwrap();
        }

        let mut scheduled = u32::from(drop_first);
        for _ in 0..failures {
            let mut actions =
                client.handle(ClientEvent::TransportFailed { cause: "refused".into() }).unwrap();
            actions.extend(client.handle(ClientEvent::ReconnectDue).unwrap());
            for action in &actions {
                if let ClientAction::ScheduleReconnect { attempt, delay } = action {
                    scheduled += 1;
                    prop_assert_eq!(*attempt, scheduled);
                    prop_assert!(*delay <= Duration::from_secs(5));
                }
            }
        }

        prop_assert!(scheduled <= 5);
        if failures + usize::from(drop_first) > 5 {
            prop_assert_eq!(client.connection_state(), ConnectionState::Disconnected);
            prop_assert!(client.connection().is_exhausted());
            prop_assert_eq!(client.handle(ClientEvent::ReconnectDue), Ok(vec![]));
        }
    });
}

/// Property: every new session starts unregistered, however often the
/// transport drops.
#[test]
fn prop_identity_resets_per_session() {
    proptest!(|(sessions in 1usize..8, seed in any::<u64>())| {
        let mut client = joined_client(seed);

        for n in 0..sessions {
            prop_assert_eq!(client.registration(), RegistrationState::Joined);

            client.handle(ClientEvent::TransportClosed { reason: "reset".into() }).unwrap();
            prop_assert_eq!(client.registration(), RegistrationState::AwaitingName);
            prop_assert_eq!(client.session().display_name(), None);

            client.handle(ClientEvent::ReconnectDue).unwrap();
            let id = format!("c{}", n + 2);
            client.handle(ClientEvent::TransportOpened { client_id: id.clone() }).unwrap();
            prop_assert_eq!(client.session().client_id(), Some(id.as_str()));
            prop_assert_eq!(client.registration(), RegistrationState::AwaitingName);

            let actions = client.handle(ClientEvent::SubmitName("Alice".into())).unwrap();
            prop_assert_eq!(sends(&actions), 1);
        }
    });
}

#[derive(Debug, Clone)]
enum Op {
    Connect,
    Opened,
    Closed,
    Failed,
    ReconnectDue,
    SubmitName(String),
    SendMessage(String),
    Inbound(Inbound),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Connect),
        Just(Op::Opened),
        Just(Op::Closed),
        Just(Op::Failed),
        Just(Op::ReconnectDue),
        "[ a-z]{0,6}".prop_map(Op::SubmitName),
        "[ a-z]{0,6}".prop_map(Op::SendMessage),
        inbound_strategy().prop_map(Op::Inbound),
    ]
}

/// Property: for arbitrary interleavings, chat frames only leave while
/// connected and joined, a name is registered at most once per session, and
/// nothing happens after shutdown.
#[test]
fn prop_random_sequences_respect_gates() {
    proptest!(|(ops in prop::collection::vec(op_strategy(), 0..96), seed in any::<u64>())| {
        let mut client = ChatClient::new(TestEnv { seed }, ChatClientConfig::default());
        let mut registrations_this_session = 0;
        let mut next_id = 0;

        for op in ops {
            let connection = client.connection_state();
            let registration = client.registration();
            let event = match op {
                Op::Connect => ClientEvent::Connect,
                Op::Opened => {
                    next_id += 1;
                    ClientEvent::TransportOpened { client_id: format!("c{next_id}") }
                },
                Op::Closed => ClientEvent::TransportClosed { reason: "reset".into() },
                Op::Failed => ClientEvent::TransportFailed { cause: "refused".into() },
                Op::ReconnectDue => ClientEvent::ReconnectDue,
                Op::SubmitName(name) => ClientEvent::SubmitName(name),
                Op::SendMessage(text) => ClientEvent::SendMessage(text),
                Op::Inbound(frame) => ClientEvent::Inbound(frame.into_message()),
            };

            let Ok(actions) = client.handle(event) else { continue };
            for action in &actions {
                match action {
                    ClientAction::Send(ClientMessage::ChatMessage(_)) => {
                        prop_assert_eq!(connection, ConnectionState::Connected);
                        prop_assert_eq!(registration, RegistrationState::Joined);
                    },
                    ClientAction::Send(ClientMessage::SetUsername(_)) => {
                        registrations_this_session += 1;
                        prop_assert_eq!(registrations_this_session, 1);
                    },
                    ClientAction::StateChanged { from, to } => prop_assert_ne!(from, to),
                    ClientAction::RegistrationChanged(RegistrationState::AwaitingName) => {
                        registrations_this_session = 0;
                    },
                    _ => {},
                }
            }
        }

        client.handle(ClientEvent::Shutdown).unwrap();
        prop_assert_eq!(client.connection_state(), ConnectionState::Disconnected);
        prop_assert_eq!(client.handle(ClientEvent::Connect), Ok(vec![]));
        prop_assert_eq!(client.handle(ClientEvent::ReconnectDue), Ok(vec![]));
        prop_assert_eq!(
            client.handle(ClientEvent::TransportOpened { client_id: "late".into() }),
            Ok(vec![])
        );
    });
}
