//! Shell tests against an echoing in-memory server.

use std::{io, time::Duration};

use murmur_client::{ClientConfig, ClientHandle, Driver, SystemEnv, TransportEvent};
use murmur_cli::Shell;
use murmur_proto::{ChatPayload, ClientMessage, HandshakePayload, PresencePayload, ServerMessage};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines},
    sync::mpsc,
};

/// Server that broadcasts everything straight back to its only client.
#[derive(Default)]
struct EchoDriver {
    to_client: Option<mpsc::UnboundedSender<TransportEvent>>,
    inbound: Option<mpsc::UnboundedReceiver<TransportEvent>>,
    name: String,
}

impl EchoDriver {
    fn push(&self, message: ServerMessage) {
        if let Some(tx) = &self.to_client {
            let _ = tx.send(TransportEvent::Message(message));
        }
    }
}

impl Driver for EchoDriver {
    type Error = io::Error;

    async fn connect(&mut self, _url: &str) -> Result<(), io::Error> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.to_client = Some(tx);
        self.inbound = Some(rx);
        self.push(ServerMessage::Connect(HandshakePayload { id: "c1".into() }));
        Ok(())
    }

    async fn send(&mut self, message: ClientMessage) -> Result<(), io::Error> {
        let time = chrono::Utc::now();
        match message {
            ClientMessage::SetUsername(name) => {
                self.name = name.clone();
                self.push(ServerMessage::UserJoined(PresencePayload {
                    username: name,
                    id: "c1".into(),
                    time,
                }));
            },
            ClientMessage::ChatMessage(message) => {
                self.push(ServerMessage::ChatMessage(ChatPayload {
                    id: "c1".into(),
                    username: self.name.clone(),
                    message,
                    time,
                }));
            },
        }
        Ok(())
    }

    async fn recv(&mut self) -> Option<TransportEvent> {
        self.inbound.as_mut()?.recv().await
    }

    async fn close(&mut self) {
        self.to_client = None;
        self.inbound = None;
    }
}

type Output = Lines<BufReader<DuplexStream>>;

async fn expect_line(lines: &mut Output, needle: &str) -> Vec<String> {
    let mut seen = Vec::new();
    let found = tokio::time::timeout(Duration::from_secs(30), async {
        while let Some(line) = lines.next_line().await.unwrap() {
            let hit = line.contains(needle);
            seen.push(line);
            if hit {
                return true;
            }
        }
        false
    })
    .await;
    assert_eq!(found, Ok(true), "never saw {needle:?}, got {seen:?}");
    seen
}

fn start_shell(name: Option<&str>) -> (DuplexStream, Output, tokio::task::JoinHandle<()>) {
    let config = ClientConfig::new("ws://echo").with_auto_connect(false);
    let handle = ClientHandle::start(EchoDriver::default(), SystemEnv::new(), config);

    let (input, shell_input) = tokio::io::duplex(1024);
    let (shell_output, output) = tokio::io::duplex(16 * 1024);
    let shell = Shell::new(handle, name.map(str::to_string));
    let task = tokio::spawn(async move {
        shell.run(BufReader::new(shell_input), shell_output).await.unwrap();
    });

    (input, BufReader::new(output).lines(), task)
}

#[tokio::test(start_paused = true)]
async fn named_session_joins_and_chats() {
    let (mut input, mut output, task) = start_shell(Some("Alice"));

    let seen = expect_line(&mut output, "joined as Alice").await;
    assert!(seen.iter().any(|line| line == "-- connected"), "{seen:?}");

    input.write_all(b"hello there\n").await.unwrap();
    expect_line(&mut output, "Alice (you): hello there").await;

    input.write_all(b"/quit\n").await.unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn first_line_is_the_display_name() {
    let (mut input, mut output, task) = start_shell(None);

    expect_line(&mut output, "Enter a display name").await;
    input.write_all(b"Bob\n").await.unwrap();
    expect_line(&mut output, "* Bob joined").await;

    input.write_all(b"/name Carol\n/dance\n").await.unwrap();
    expect_line(&mut output, "unknown command /dance").await;

    drop(input);
    task.await.unwrap();
}
