//! Identity registration.
//!
//! Gates the joined experience behind a display name and ties that name to a
//! single server session. Registration is fire-and-forget: the protocol has
//! no acknowledgment, so `Registering` is left for `Joined` in the same step
//! that emits the `set username` frame.

use murmur_proto::ClientMessage;

use crate::{connection::ConnectionState, error::ClientError, event::ClientAction};

/// Registration state for the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrationState {
    /// No name registered for this session.
    AwaitingName,
    /// `set username` is being sent.
    Registering,
    /// Name sent; the client is considered joined.
    Joined,
}

/// Registrar configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrarConfig {
    /// Re-send the last submitted name when a new session starts, instead of
    /// waiting for the user to submit it again.
    pub auto_rejoin: bool,
}

/// Identity registrar state machine.
#[derive(Debug, Clone)]
pub struct Registrar {
    state: RegistrationState,
    config: RegistrarConfig,
    /// Last name submitted, kept across sessions for `auto_rejoin`.
    name: Option<String>,
}

impl Registrar {
    /// Create a registrar in [`RegistrationState::AwaitingName`].
    pub fn new(config: RegistrarConfig) -> Self {
        Self { state: RegistrationState::AwaitingName, config, name: None }
    }

    /// Current registration state.
    pub fn state(&self) -> RegistrationState {
        self.state
    }

    /// Name registered for the current session. `None` unless joined.
    pub fn joined_name(&self) -> Option<&str> {
        match self.state {
            RegistrationState::Joined => self.name.as_deref(),
            RegistrationState::AwaitingName | RegistrationState::Registering => None,
        }
    }

    /// Last name the user submitted, in this or an earlier session.
    pub fn last_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Check a submission without applying it.
    ///
    /// Returns the trimmed name to register, or `None` when the submission
    /// would be dropped: blank, or a name is already registered for this
    /// session.
    ///
    /// # Errors
    ///
    /// - `ClientError::NotConnected` if `connection` is not Connected
    pub fn validate<'a>(
        &self,
        name: &'a str,
        connection: ConnectionState,
    ) -> Result<Option<&'a str>, ClientError> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }
        if connection != ConnectionState::Connected {
            return Err(ClientError::NotConnected { state: connection });
        }
        if self.state == RegistrationState::Joined {
            return Ok(None);
        }
        Ok(Some(name))
    }

    /// Submit a display name.
    ///
    /// Blank names are dropped without a transport call or state change.
    /// Submitting again in the same session is a no-op.
    ///
    /// # Errors
    ///
    /// - `ClientError::NotConnected` if `connection` is not Connected
    pub fn submit(
        &mut self,
        name: &str,
        connection: ConnectionState,
    ) -> Result<Vec<ClientAction>, ClientError> {
        match self.validate(name, connection)? {
            Some(name) => Ok(self.register(name.to_string())),
            None => {
                tracing::debug!(state = ?self.state, "display name submission dropped");
                Ok(Vec::new())
            },
        }
    }

    /// A new server session started. Any previous registration is void.
    pub fn session_started(&mut self) -> Vec<ClientAction> {
        let mut actions = Vec::new();
        self.transition(RegistrationState::AwaitingName, &mut actions);

        if self.config.auto_rejoin
            && let Some(name) = self.name.clone()
        {
            tracing::info!(%name, "re-registering display name for new session");
            actions.extend(self.register(name));
        }

        actions
    }

    /// The server session ended.
    pub fn session_ended(&mut self) -> Vec<ClientAction> {
        let mut actions = Vec::new();
        self.transition(RegistrationState::AwaitingName, &mut actions);
        actions
    }

    fn register(&mut self, name: String) -> Vec<ClientAction> {
        let mut actions = Vec::new();
        self.transition(RegistrationState::Registering, &mut actions);
        actions.push(ClientAction::Send(ClientMessage::SetUsername(name.clone())));
        self.name = Some(name);
        self.transition(RegistrationState::Joined, &mut actions);
        actions
    }

    fn transition(&mut self, to: RegistrationState, actions: &mut Vec<ClientAction>) {
        if self.state != to {
            self.state = to;
            actions.push(ClientAction::RegistrationChanged(to));
        }
    }
}
