//! Server session identity.

/// Identity of the current server session.
///
/// Replaced wholesale on every new connection: a reconnect yields a new
/// `client_id` and starts with no display name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    client_id: Option<String>,
    display_name: Option<String>,
    identity_confirmed: bool,
}

impl Session {
    /// Session for a freshly assigned client identifier.
    pub fn start(client_id: impl Into<String>) -> Self {
        Self { client_id: Some(client_id.into()), ..Self::default() }
    }

    /// Identifier assigned by the server. `None` if not connected.
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    /// Registered display name. `None` until registration.
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Server broadcast a `user joined` for our display name.
    ///
    /// Informational only. Registration is fire-and-forget, so a rejected
    /// name is indistinguishable from a slow server.
    pub fn identity_confirmed(&self) -> bool {
        self.identity_confirmed
    }

    /// True if `author` is this session's display name.
    pub fn is_own(&self, author: &str) -> bool {
        self.display_name.as_deref() == Some(author)
    }

    pub(crate) fn set_display_name(&mut self, name: &str) {
        if self.display_name.as_deref() != Some(name) {
            self.display_name = Some(name.to_string());
            self.identity_confirmed = false;
        }
    }

    pub(crate) fn observe_join(&mut self, subject: &str) {
        if self.is_own(subject) {
            self.identity_confirmed = true;
        }
    }
}
