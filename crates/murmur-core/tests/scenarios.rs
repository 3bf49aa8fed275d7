//! End-to-end scenarios for the chat client state machine.
//!
//! Each test plays a short conversation between the client and a scripted
//! server, feeding frames exactly as a transport would.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use murmur_core::{
    ChatClient, ChatClientConfig, ChatMessage, ClientAction, ClientError, ClientEvent,
    ConnectionState, PresenceKind, PresenceNotification, RegistrationState, TimelineConfig,
    TimelineEntry, env::Environment,
};
use murmur_proto::{ChatPayload, ClientMessage, HandshakePayload, PresencePayload, ServerMessage};

#[derive(Clone)]
struct TestEnv;

impl Environment for TestEnv {
    fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send + 'static {
        std::future::ready(())
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        buffer.fill(0);
    }
}

fn t(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).single().unwrap()
}

fn handshake(id: &str) -> ClientEvent {
    ClientEvent::Inbound(ServerMessage::Connect(HandshakePayload { id: id.into() }))
}

fn user_joined(name: &str, time: DateTime<Utc>) -> ClientEvent {
    ClientEvent::Inbound(ServerMessage::UserJoined(PresencePayload {
        username: name.into(),
        id: format!("{name}-id"),
        time,
    }))
}

fn user_left(name: &str, time: DateTime<Utc>) -> ClientEvent {
    ClientEvent::Inbound(ServerMessage::UserLeft(PresencePayload {
        username: name.into(),
        id: format!("{name}-id"),
        time,
    }))
}

fn chat_message(name: &str, body: &str, time: DateTime<Utc>) -> ClientEvent {
    ClientEvent::Inbound(ServerMessage::ChatMessage(ChatPayload {
        id: format!("{name}-id"),
        username: name.into(),
        message: body.into(),
        time,
    }))
}

fn connected_client(config: ChatClientConfig) -> ChatClient<TestEnv> {
    let mut client = ChatClient::new(TestEnv, config);
    let actions = client.handle(ClientEvent::Connect).unwrap();
    assert!(actions.contains(&ClientAction::OpenTransport));
    client.handle(handshake("c1")).unwrap();
    client
}

#[test]
fn join_then_chat_builds_merged_timeline() {
    let mut client = connected_client(ChatClientConfig::default());

    let actions = client.handle(ClientEvent::SubmitName("Alice".into())).unwrap();
    assert!(actions.contains(&ClientAction::Send(ClientMessage::SetUsername("Alice".into()))));
    client.handle(user_joined("Alice", t(1))).unwrap();

    assert_eq!(client.snapshot(), vec![TimelineEntry::Presence(PresenceNotification {
        kind: PresenceKind::Join,
        subject: "Alice".into(),
        timestamp: t(1),
    })]);

    let actions = client.handle(ClientEvent::SendMessage("hello".into())).unwrap();
    assert_eq!(actions, vec![ClientAction::Send(ClientMessage::ChatMessage("hello".into()))]);
    assert_eq!(client.snapshot().len(), 1);

    client.handle(chat_message("Alice", "hello", t(2))).unwrap();

    assert_eq!(client.snapshot(), vec![
        TimelineEntry::Presence(PresenceNotification {
            kind: PresenceKind::Join,
            subject: "Alice".into(),
            timestamp: t(1),
        }),
        TimelineEntry::Chat(ChatMessage {
            id: "Alice-id".into(),
            author: "Alice".into(),
            body: "hello".into(),
            timestamp: t(2),
        }),
    ]);
    assert!(client.session().identity_confirmed());
}

#[test]
fn disconnect_while_joined_keeps_history() {
    let mut client = connected_client(ChatClientConfig::default());
    client.handle(ClientEvent::SubmitName("Alice".into())).unwrap();
    client.handle(user_joined("Alice", t(1))).unwrap();
    client.handle(chat_message("Bob", "hi Alice", t(2))).unwrap();
    let before = client.snapshot();

    let actions =
        client.handle(ClientEvent::TransportClosed { reason: "transport close".into() }).unwrap();

    assert!(actions.contains(&ClientAction::StateChanged {
        from: ConnectionState::Connected,
        to: ConnectionState::Disconnected,
    }));
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);
    assert_eq!(client.registration(), RegistrationState::AwaitingName);
    assert_eq!(client.snapshot(), before);
    assert_eq!(client.status_line().as_deref(), Some("Disconnected. Reconnecting..."));

    client.handle(ClientEvent::ReconnectDue).unwrap();
    assert_eq!(client.status_line().as_deref(), Some("Reconnecting (attempt 1 of 5)..."));
    client.handle(handshake("c2")).unwrap();

    assert_eq!(client.session().client_id(), Some("c2"));
    assert_eq!(client.snapshot(), before);
    assert_eq!(
        client.handle(ClientEvent::SendMessage("still there?".into())),
        Err(ClientError::NotJoined)
    );
}

#[test]
fn presence_of_others_is_interleaved_with_chat() {
    let mut client = connected_client(ChatClientConfig::default());
    client.handle(ClientEvent::SubmitName("Alice".into())).unwrap();

    client.handle(user_joined("Bob", t(5))).unwrap();
    client.handle(chat_message("Bob", "hey", t(3))).unwrap();
    client.handle(user_left("Bob", t(4))).unwrap();

    let kinds: Vec<&str> = client
        .timeline()
        .iter()
        .map(|entry| match entry {
            TimelineEntry::Chat(_) => "chat",
            TimelineEntry::Presence(note) if note.kind == PresenceKind::Join => "join",
            TimelineEntry::Presence(_) => "leave",
        })
        .collect();
    assert_eq!(kinds, vec!["join", "chat", "leave"]);
    assert!(!client.session().identity_confirmed());
}

#[test]
fn chat_before_name_is_refused() {
    let mut client = connected_client(ChatClientConfig::default());

    assert_eq!(client.handle(ClientEvent::SendMessage("hi".into())), Err(ClientError::NotJoined));
    assert_eq!(client.dispatcher().sent(), 0);
}

#[test]
fn name_while_connecting_is_refused() {
    let mut client = ChatClient::new(TestEnv, ChatClientConfig::default());
    client.handle(ClientEvent::Connect).unwrap();

    assert_eq!(
        client.handle(ClientEvent::SubmitName("Alice".into())),
        Err(ClientError::NotConnected { state: ConnectionState::Connecting })
    );
    assert_eq!(client.status_line().as_deref(), Some("Connecting..."));
}

#[test]
fn five_failed_reconnects_then_manual_retry() {
    let mut client = connected_client(ChatClientConfig::default());
    client.handle(ClientEvent::TransportClosed { reason: "ping timeout".into() }).unwrap();

    let mut opens = 0;
    loop {
        let actions = client.handle(ClientEvent::ReconnectDue).unwrap();
        if actions.is_empty() {
            break;
        }
        opens += actions.iter().filter(|a| **a == ClientAction::OpenTransport).count();
        client.handle(ClientEvent::TransportFailed { cause: "refused".into() }).unwrap();
    }

    assert_eq!(opens, 5);
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);
    assert_eq!(client.connection().attempts(), 5);

    let actions = client.handle(ClientEvent::Connect).unwrap();
    assert!(actions.contains(&ClientAction::OpenTransport));
    assert_eq!(client.connection().attempts(), 0);
    client.handle(handshake("c3")).unwrap();
    assert_eq!(client.connection_state(), ConnectionState::Connected);
}

#[test]
fn capped_timeline_drops_oldest() {
    let config = ChatClientConfig {
        timeline: TimelineConfig { capacity: Some(3) },
        ..ChatClientConfig::default()
    };
    let mut client = connected_client(config);

    for i in 0..5 {
        client.handle(chat_message("Bob", &format!("m{i}"), t(i))).unwrap();
    }

    let bodies: Vec<String> = client
        .snapshot()
        .into_iter()
        .filter_map(|entry| match entry {
            TimelineEntry::Chat(msg) => Some(msg.body),
            TimelineEntry::Presence(_) => None,
        })
        .collect();
    assert_eq!(bodies, vec!["m2", "m3", "m4"]);
    assert_eq!(client.timeline().total_appended(), 5);
}
