//! Outbound chat messages.
//!
//! There is no local echo: a sent message reaches the timeline only when the
//! server rebroadcasts it.

use murmur_proto::ClientMessage;

use crate::{
    connection::ConnectionState, error::ClientError, event::ClientAction,
    registrar::RegistrationState,
};

/// Validates user-authored text and turns it into one outbound frame.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    sent: u64,
}

impl Dispatcher {
    /// Create a dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages forwarded to the transport so far.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Check `text` without sending it. `Ok(false)` means it would be
    /// dropped silently.
    ///
    /// # Errors
    ///
    /// - `ClientError::NotConnected` if `connection` is not Connected
    /// - `ClientError::NotJoined` if no display name is registered
    pub fn validate(
        &self,
        text: &str,
        connection: ConnectionState,
        registration: RegistrationState,
    ) -> Result<bool, ClientError> {
        if text.trim().is_empty() {
            return Ok(false);
        }
        if connection != ConnectionState::Connected {
            return Err(ClientError::NotConnected { state: connection });
        }
        if registration != RegistrationState::Joined {
            return Err(ClientError::NotJoined);
        }
        Ok(true)
    }

    /// Forward `text` as a `chat message`.
    ///
    /// Blank text is dropped without a transport call. Text is otherwise sent
    /// as typed, surrounding whitespace included.
    ///
    /// # Errors
    ///
    /// Same as [`Dispatcher::validate`].
    pub fn send_message(
        &mut self,
        text: &str,
        connection: ConnectionState,
        registration: RegistrationState,
    ) -> Result<Vec<ClientAction>, ClientError> {
        if !self.validate(text, connection, registration)? {
            tracing::debug!("ignoring blank message");
            return Ok(Vec::new());
        }

        self.sent += 1;
        Ok(vec![ClientAction::Send(ClientMessage::ChatMessage(text.to_string()))])
    }
}
