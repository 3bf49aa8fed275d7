//! Client state machine.
//!
//! [`ChatClient`] is the top-level state machine. It owns the transport
//! session, the current server session, the identity registrar, the outbound
//! dispatcher, and the timeline, and routes every event through them in one
//! place so that reconnects and teardown reset everything consistently.

use murmur_proto::ServerMessage;

use crate::{
    connection::{Connection, ConnectionAction, ConnectionConfig, ConnectionState, EXHAUSTED_NOTICE},
    dispatcher::Dispatcher,
    env::Environment,
    error::ClientError,
    event::{ClientAction, ClientEvent},
    registrar::{Registrar, RegistrarConfig, RegistrationState},
    session::Session,
    timeline::{ChatMessage, Timeline, TimelineConfig, TimelineEntry},
};

/// Configuration for every component of the client.
#[derive(Debug, Clone, Default)]
pub struct ChatClientConfig {
    /// Transport session and reconnect policy
    pub connection: ConnectionConfig,
    /// Identity registration
    pub registrar: RegistrarConfig,
    /// Timeline retention
    pub timeline: TimelineConfig,
}

/// Chat client state machine
///
/// Pure state machine: feed [`ClientEvent`]s to [`ChatClient::handle`] and
/// execute the returned [`ClientAction`]s in order.
#[derive(Debug)]
pub struct ChatClient<E: Environment> {
    env: E,
    connection: Connection,
    session: Session,
    registrar: Registrar,
    dispatcher: Dispatcher,
    timeline: Timeline,
}

impl<E: Environment> ChatClient<E> {
    /// Create a disconnected client.
    pub fn new(env: E, config: ChatClientConfig) -> Self {
        Self {
            env,
            connection: Connection::new(config.connection),
            session: Session::default(),
            registrar: Registrar::new(config.registrar),
            dispatcher: Dispatcher::new(),
            timeline: Timeline::new(config.timeline),
        }
    }

    /// Process an event.
    ///
    /// # Errors
    ///
    /// Only user intents fail:
    /// - `ClientError::Closed` after shutdown
    /// - `ClientError::NotConnected` if the transport is not connected
    /// - `ClientError::NotJoined` when sending chat without a display name
    ///
    /// Transport problems are reported through state changes and notices.
    pub fn handle(&mut self, event: ClientEvent) -> Result<Vec<ClientAction>, ClientError> {
        match event {
            ClientEvent::Connect => {
                let actions = self.connection.connect();
                Ok(self.apply(actions))
            },
            ClientEvent::TransportOpened { client_id } => {
                let actions = self.connection.handle_opened(client_id);
                Ok(self.apply(actions))
            },
            ClientEvent::TransportClosed { reason } => {
                let actions = self.connection.handle_closed(reason, &self.env);
                Ok(self.apply(actions))
            },
            ClientEvent::TransportFailed { cause } => {
                let actions = self.connection.handle_failed(cause, &self.env);
                Ok(self.apply(actions))
            },
            ClientEvent::ReconnectDue => {
                let actions = self.connection.handle_reconnect_due();
                Ok(self.apply(actions))
            },
            ClientEvent::Inbound(message) => Ok(self.handle_inbound(message)),
            ClientEvent::SubmitName(name) => self.handle_submit_name(&name),
            ClientEvent::SendMessage(text) => self.handle_send_message(&text),
            ClientEvent::Shutdown => {
                let actions = self.connection.shutdown();
                Ok(self.apply(actions))
            },
        }
    }

    /// Check a user intent against the current state without applying it.
    ///
    /// Returns `Ok(false)` when the intent would be dropped silently (blank
    /// input, or nothing to do). Non-intent events always pass unless the
    /// client is shut down.
    ///
    /// # Errors
    ///
    /// The errors [`ChatClient::handle`] would return for the same event.
    pub fn check_intent(&self, event: &ClientEvent) -> Result<bool, ClientError> {
        let shut_down = self.connection.is_shut_down();
        match event {
            ClientEvent::SubmitName(_) | ClientEvent::SendMessage(_) if shut_down => {
                Err(ClientError::Closed)
            },
            ClientEvent::SubmitName(name) => {
                Ok(self.registrar.validate(name, self.connection.state())?.is_some())
            },
            ClientEvent::SendMessage(text) => {
                self.dispatcher.validate(text, self.connection.state(), self.registrar.state())
            },
            _ => Ok(!shut_down),
        }
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Transport session state machine.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Current server session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Current registration state.
    pub fn registration(&self) -> RegistrationState {
        self.registrar.state()
    }

    /// Identity registrar.
    pub fn registrar(&self) -> &Registrar {
        &self.registrar
    }

    /// Outbound dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Event timeline.
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Copy of the timeline in arrival order.
    pub fn snapshot(&self) -> Vec<TimelineEntry> {
        self.timeline.snapshot()
    }

    /// Short user-visible connection status. `None` while connected.
    pub fn status_line(&self) -> Option<String> {
        self.connection.status_line()
    }

    /// True if `message` was sent under this session's display name.
    pub fn is_own(&self, message: &ChatMessage) -> bool {
        self.session.is_own(&message.author)
    }

    /// Client has been shut down.
    pub fn is_shut_down(&self) -> bool {
        self.connection.is_shut_down()
    }

    fn handle_inbound(&mut self, message: ServerMessage) -> Vec<ClientAction> {
        if self.connection.is_shut_down() {
            return Vec::new();
        }

        match message {
            ServerMessage::Connect(handshake) => {
                let actions = self.connection.handle_opened(handshake.id);
                self.apply(actions)
            },
            ServerMessage::Unknown { event } => {
                tracing::debug!(%event, "ignoring unknown server event");
                Vec::new()
            },
            message => {
                if self.connection.state() != ConnectionState::Connected {
                    tracing::debug!(
                        event = message.event(),
                        state = %self.connection.state(),
                        "dropping frame received outside a session"
                    );
                    return Vec::new();
                }
                if let ServerMessage::UserJoined(payload) = &message {
                    self.session.observe_join(&payload.username);
                }
                self.timeline
                    .on_inbound_event(message)
                    .map(|entry| vec![ClientAction::TimelineAppended(entry)])
                    .unwrap_or_default()
            },
        }
    }

    fn handle_submit_name(&mut self, name: &str) -> Result<Vec<ClientAction>, ClientError> {
        if self.connection.is_shut_down() {
            return Err(ClientError::Closed);
        }

        let actions = self.registrar.submit(name, self.connection.state())?;
        self.sync_display_name();
        Ok(actions)
    }

    fn handle_send_message(&mut self, text: &str) -> Result<Vec<ClientAction>, ClientError> {
        if self.connection.is_shut_down() {
            return Err(ClientError::Closed);
        }

        self.dispatcher.send_message(text, self.connection.state(), self.registrar.state())
    }

    /// Translate connection actions, resetting per-session state as sessions
    /// start and end.
    fn apply(&mut self, connection_actions: Vec<ConnectionAction>) -> Vec<ClientAction> {
        let mut actions = Vec::with_capacity(connection_actions.len());

        for action in connection_actions {
            match action {
                ConnectionAction::Open => actions.push(ClientAction::OpenTransport),
                ConnectionAction::Close => actions.push(ClientAction::CloseTransport),
                ConnectionAction::ScheduleReconnect { attempt, delay } => {
                    actions.push(ClientAction::ScheduleReconnect { attempt, delay });
                },
                ConnectionAction::CancelReconnect => actions.push(ClientAction::CancelReconnect),
                ConnectionAction::StateChanged { from, to } => {
                    actions.push(ClientAction::StateChanged { from, to });
                },
                ConnectionAction::SessionStarted { client_id } => {
                    tracing::info!(%client_id, "session started");
                    self.session = Session::start(client_id);
                    actions.extend(self.registrar.session_started());
                    self.sync_display_name();
                },
                ConnectionAction::SessionEnded => {
                    self.session = Session::default();
                    actions.extend(self.registrar.session_ended());
                },
                ConnectionAction::Exhausted { .. } => {
                    actions.push(ClientAction::Notice(EXHAUSTED_NOTICE.to_string()));
                },
            }
        }

        actions
    }

    fn sync_display_name(&mut self) {
        if let Some(name) = self.registrar.joined_name() {
            self.session.set_display_name(name);
        }
    }
}
