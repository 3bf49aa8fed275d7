//! Background runtime.
//!
//! The runtime task is the only place that performs I/O or mutates the
//! shared [`ChatClient`]. It waits on four sources with `tokio::select!`:
//! the shutdown signal, queued intents, the open transport, and the two
//! timers the client may arm (reconnect and handshake deadline). Every
//! input becomes a [`ClientEvent`]; the resulting actions are executed in
//! order, and actions those produce are appended to the same queue.

use std::{collections::VecDeque, future::Future, pin::Pin, sync::Arc, time::Duration};

use murmur_core::{
    ChatClient, ClientAction, ClientEvent, ConnectionState, RegistrationState, TimelineEntry,
    env::Environment,
};
use murmur_proto::ClientMessage;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::{
    driver::{Driver, TransportEvent},
    subscription::Subscribers,
};

type Timer = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Runtime errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The runtime did not stop in time and was aborted.
    #[error("runtime did not stop within {0:?}")]
    ShutdownTimeout(Duration),

    /// The runtime task panicked or was cancelled.
    #[error("runtime task failed: {0}")]
    Task(String),
}

/// A connection state transition as delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    /// Previous state.
    pub from: ConnectionState,
    /// New state.
    pub to: ConnectionState,
    /// User-visible status right after the transition. `None` while connected.
    pub status: Option<String>,
}

/// Handlers for everything the client reports.
pub(crate) struct Notifiers {
    pub(crate) state: Arc<Subscribers<StateChange>>,
    pub(crate) registration: Arc<Subscribers<RegistrationState>>,
    pub(crate) timeline: Arc<Subscribers<TimelineEntry>>,
    pub(crate) notice: Arc<Subscribers<String>>,
}

impl Notifiers {
    pub(crate) fn new() -> Self {
        Self {
            state: Subscribers::new(),
            registration: Subscribers::new(),
            timeline: Subscribers::new(),
            notice: Subscribers::new(),
        }
    }

    pub(crate) fn clear(&self) {
        self.state.clear();
        self.registration.clear();
        self.timeline.clear();
        self.notice.clear();
    }
}

/// Runtime that drives a [`ChatClient`] over a [`Driver`].
pub(crate) struct Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    driver: D,
    env: E,
    server_url: String,
    connect_timeout: Duration,
    client: Arc<Mutex<ChatClient<E>>>,
    notifiers: Arc<Notifiers>,
    intents: mpsc::UnboundedReceiver<ClientEvent>,
    shutdown: oneshot::Receiver<()>,
    stopping: bool,
    transport_open: bool,
    reconnect: Option<Timer>,
    handshake_deadline: Option<Timer>,
}

impl<D, E> Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    pub(crate) fn new(
        driver: D,
        env: E,
        server_url: String,
        client: Arc<Mutex<ChatClient<E>>>,
        notifiers: Arc<Notifiers>,
        intents: mpsc::UnboundedReceiver<ClientEvent>,
        shutdown: oneshot::Receiver<()>,
    ) -> Self {
        let connect_timeout = client.lock().connection().config().connect_timeout;
        Self {
            driver,
            env,
            server_url,
            connect_timeout,
            client,
            notifiers,
            intents,
            shutdown,
            stopping: false,
            transport_open: false,
            reconnect: None,
            handshake_deadline: None,
        }
    }

    /// Run until shutdown is signalled or the handle is dropped.
    pub(crate) async fn run(mut self) {
        while !self.stopping {
            tokio::select! {
                biased;

                _ = &mut self.shutdown => self.stopping = true,

                intent = self.intents.recv() => match intent {
                    Some(event) => self.feed(event).await,
                    None => break,
                },

                event = self.driver.recv(), if self.transport_open => {
                    self.on_transport_event(event).await;
                }

                () = fire(&mut self.reconnect) => {
                    self.reconnect = None;
                    self.feed(ClientEvent::ReconnectDue).await;
                }

                () = fire(&mut self.handshake_deadline) => {
                    self.handshake_deadline = None;
                    tracing::warn!(timeout = ?self.connect_timeout, "no handshake from server");
                    self.close_transport().await;
                    self.feed(ClientEvent::TransportFailed {
                        cause: "handshake timed out".to_string(),
                    })
                    .await;
                }
            }
        }

        self.feed(ClientEvent::Shutdown).await;
        self.close_transport().await;
        tracing::debug!("runtime stopped");
    }

    async fn on_transport_event(&mut self, event: Option<TransportEvent>) {
        match event {
            Some(TransportEvent::Message(message)) => {
                self.feed(ClientEvent::Inbound(message)).await;
            },
            Some(TransportEvent::Closed { reason }) => {
                self.transport_open = false;
                self.feed(ClientEvent::TransportClosed { reason }).await;
            },
            None => {
                self.transport_open = false;
                self.feed(ClientEvent::TransportClosed { reason: "transport gone".to_string() })
                    .await;
            },
        }
    }

    /// Apply `event` and execute everything it leads to.
    async fn feed(&mut self, event: ClientEvent) {
        let mut pending: VecDeque<ClientAction> = self.apply(event).into();

        while let Some(action) = pending.pop_front() {
            match action {
                ClientAction::OpenTransport => match self.open_transport().await {
                    Some(event) => pending.extend(self.apply(event)),
                    None if self.stopping => return,
                    None => {},
                },
                ClientAction::CloseTransport => self.close_transport().await,
                ClientAction::Send(message) => self.send(message).await,
                ClientAction::ScheduleReconnect { attempt, delay } => {
                    tracing::info!(attempt, ?delay, "reconnect scheduled");
                    self.reconnect = Some(Box::pin(self.env.sleep(delay)));
                },
                ClientAction::CancelReconnect => self.reconnect = None,
                ClientAction::StateChanged { from, to } => {
                    tracing::debug!(%from, %to, "connection state changed");
                    self.handshake_deadline = None;
                    let status = self.client.lock().status_line();
                    self.notifiers.state.notify(&StateChange { from, to, status });
                },
                ClientAction::RegistrationChanged(state) => {
                    self.notifiers.registration.notify(&state);
                },
                ClientAction::TimelineAppended(entry) => self.notifiers.timeline.notify(&entry),
                ClientAction::Notice(text) => {
                    tracing::warn!(%text, "notice");
                    self.notifiers.notice.notify(&text);
                },
            }
        }
    }

    fn apply(&self, event: ClientEvent) -> Vec<ClientAction> {
        match self.client.lock().handle(event) {
            Ok(actions) => actions,
            Err(e) => {
                tracing::debug!(error = %e, "intent rejected after state change");
                Vec::new()
            },
        }
    }

    /// Open the transport. Returns the failure to report, if any.
    ///
    /// A shutdown signal abandons the attempt and sets `stopping`.
    async fn open_transport(&mut self) -> Option<ClientEvent> {
        self.close_transport().await;
        if self.stopping {
            return None;
        }

        let connect =
            tokio::time::timeout(self.connect_timeout, self.driver.connect(&self.server_url));
        let attempt = tokio::select! {
            biased;

            _ = &mut self.shutdown => {
                tracing::debug!("shutdown during connect, abandoning attempt");
                self.stopping = true;
                return None;
            }

            attempt = connect => attempt,
        };

        match attempt {
            Ok(Ok(())) => {
                tracing::debug!(url = %self.server_url, "transport open, awaiting handshake");
                self.transport_open = true;
                self.handshake_deadline = Some(Box::pin(self.env.sleep(self.connect_timeout)));
                None
            },
            Ok(Err(e)) => Some(ClientEvent::TransportFailed { cause: e.to_string() }),
            Err(_) => Some(ClientEvent::TransportFailed {
                cause: format!("connect timed out after {:?}", self.connect_timeout),
            }),
        }
    }

    async fn close_transport(&mut self) {
        if self.transport_open {
            self.transport_open = false;
            self.driver.close().await;
        }
    }

    async fn send(&mut self, message: ClientMessage) {
        let event = message.event();
        if let Err(e) = self.driver.send(message).await {
            tracing::warn!(event, error = %e, "failed to send frame");
        }
    }
}

/// Resolve when `timer` fires; never while it is unset.
async fn fire(timer: &mut Option<Timer>) {
    match timer {
        Some(timer) => timer.await,
        None => std::future::pending().await,
    }
}
