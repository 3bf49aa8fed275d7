//! Interactive loop.
//!
//! Reads input lines and client updates concurrently. Client updates arrive
//! through subscriptions, which forward them to this task so that all
//! terminal output is written from one place.

use std::io;

use murmur_client::{
    ClientHandle, ConnectionState, RegistrationState, RuntimeError, StateChange, Subscription,
    TimelineEntry,
};
use thiserror::Error;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
    sync::mpsc,
};

use crate::{
    commands::{Command, HELP},
    render,
};

/// Terminal client errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Reading input or writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The client runtime did not shut down cleanly.
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

enum Update {
    Entry(TimelineEntry),
    State(StateChange),
    Registration(RegistrationState),
    Notice(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Line-oriented chat session.
pub struct Shell {
    handle: ClientHandle,
    name: Option<String>,
}

impl Shell {
    /// Wrap `handle`. With `name`, the shell registers it on every new
    /// session instead of prompting.
    pub fn new(handle: ClientHandle, name: Option<String>) -> Self {
        let name = name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        Self { handle, name }
    }

    /// Run until `/quit` or end of input, then shut the client down.
    ///
    /// Connects after subscribing, so no state change is missed.
    pub async fn run<R, W>(self, input: R, mut output: W) -> Result<(), CliError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let (tx, mut updates) = mpsc::unbounded_channel();
        let subscriptions = self.subscribe(&tx);
        drop(tx);

        if let Err(e) = self.handle.connect() {
            write_line(&mut output, &render::error(&e)).await?;
        }

        let mut lines = input.lines();
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    if self.on_line(&line, &mut output).await? == Flow::Quit {
                        break;
                    }
                }
                Some(update) = updates.recv() => self.on_update(update, &mut output).await?,
            }
        }

        drop(subscriptions);
        self.handle.shutdown().await?;
        Ok(())
    }

    fn subscribe(&self, tx: &mpsc::UnboundedSender<Update>) -> Vec<Subscription> {
        let entries = tx.clone();
        let states = tx.clone();
        let registrations = tx.clone();
        let notices = tx.clone();
        vec![
            self.handle.on_timeline_entry(move |entry| {
                let _ = entries.send(Update::Entry(entry.clone()));
            }),
            self.handle.on_state_change(move |change| {
                let _ = states.send(Update::State(change.clone()));
            }),
            self.handle.on_registration_change(move |state| {
                let _ = registrations.send(Update::Registration(*state));
            }),
            self.handle.on_notice(move |notice| {
                let _ = notices.send(Update::Notice(notice.clone()));
            }),
        ]
    }

    async fn on_line<W: AsyncWrite + Unpin>(
        &self,
        line: &str,
        output: &mut W,
    ) -> Result<Flow, CliError> {
        let result = match Command::parse(line) {
            Command::Quit => return Ok(Flow::Quit),
            Command::Help => {
                write_line(output, HELP).await?;
                Ok(())
            },
            Command::Status => {
                let status = self.handle.status_line();
                let line = render::connection(self.handle.current_state(), status.as_deref());
                write_line(output, &line).await?;
                Ok(())
            },
            Command::Connect => self.handle.connect(),
            Command::Name(name) => self.handle.submit_name(&name),
            Command::Say(text) => match self.handle.registration() {
                RegistrationState::AwaitingName => self.handle.submit_name(&text),
                RegistrationState::Registering | RegistrationState::Joined => {
                    self.handle.send_message(&text)
                },
            },
            Command::Unknown(command) => {
                let message = format!("unknown command /{command}, try /help");
                write_line(output, &render::error(&message)).await?;
                Ok(())
            },
        };

        if let Err(e) = result {
            write_line(output, &render::error(&e)).await?;
        }
        Ok(Flow::Continue)
    }

    async fn on_update<W: AsyncWrite + Unpin>(
        &self,
        update: Update,
        output: &mut W,
    ) -> Result<(), CliError> {
        match update {
            Update::Entry(entry) => {
                let own = matches!(&entry, TimelineEntry::Chat(msg) if self.handle.is_own(msg));
                write_line(output, &render::entry(&entry, own)).await?;
            },
            Update::State(change) => {
                let line = render::connection(change.to, change.status.as_deref());
                write_line(output, &line).await?;
                if change.to == ConnectionState::Connected {
                    self.on_session_started(output).await?;
                }
            },
            Update::Registration(RegistrationState::Joined) => {
                let session = self.handle.session();
                if let Some(line) =
                    render::registration(RegistrationState::Joined, session.display_name())
                {
                    write_line(output, &line).await?;
                }
            },
            Update::Registration(_) => {},
            Update::Notice(notice) => {
                write_line(output, &render::error(&notice)).await?;
                write_line(output, "Type /connect to try again.").await?;
            },
        }
        Ok(())
    }

    async fn on_session_started<W: AsyncWrite + Unpin>(
        &self,
        output: &mut W,
    ) -> Result<(), CliError> {
        if self.handle.registration() != RegistrationState::AwaitingName {
            return Ok(());
        }

        match &self.name {
            Some(name) => {
                if let Err(e) = self.handle.submit_name(name) {
                    write_line(output, &render::error(&e)).await?;
                }
            },
            None => {
                if let Some(prompt) = render::registration(RegistrationState::AwaitingName, None) {
                    write_line(output, &prompt).await?;
                }
            },
        }
        Ok(())
    }
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, line: &str) -> io::Result<()> {
    output.write_all(line.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await
}
