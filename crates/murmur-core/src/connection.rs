//! Transport session state machine.
//!
//! Owns the lifecycle of the single logical connection to the server and the
//! bounded reconnect policy. Uses the action pattern: methods take transport
//! lifecycle notifications as input and return actions for the driver to
//! execute (open the transport, arm a timer, notify subscribers).
//!
//! # State Machine
//!
//! ```text
//!                 connect()                 handshake
//! ┌──────────────┐ ──────> ┌────────────┐ ──────────> ┌───────────┐
//! │ Disconnected │         │ Connecting │             │ Connected │
//! └──────────────┘ <────── └────────────┘ <────┐      └───────────┘
//!        ↑        budget      │ failure        │ timer      │ drop
//!        │        exhausted   ↓                │            ↓
//!        │               ┌─────────┐ ──────────┘     ┌──────────────┐
//!        └────────────── │ Errored │                 │ Disconnected │──> timer
//!         budget         └─────────┘                 └──────────────┘
//!         exhausted
//! ```
//!
//! # Invariants
//!
//! - At most `max_reconnect_attempts` reconnects are scheduled between two
//!   successful connects. The initial connect is not a reconnect.
//! - Every state change produces exactly one `StateChanged` action.
//! - After [`Connection::shutdown`] no method produces any action.

use std::{fmt, time::Duration};

use crate::{env::Environment, error::ConnectionError};

/// Reconnect attempts allowed between two successful connects.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Delay before the first reconnect attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Upper bound on the delay between reconnect attempts.
pub const DEFAULT_RECONNECT_DELAY_MAX: Duration = Duration::from_secs(5);

/// Fraction of the delay used as random deviation.
pub const DEFAULT_RECONNECT_JITTER: f64 = 0.5;

/// Time allowed for the transport to open.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Status shown once the reconnect budget is consumed.
pub const EXHAUSTED_NOTICE: &str = "Connection lost. Please reload or retry.";

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Transport attempt in flight
    Connecting,
    /// Handshake complete, session established
    Connected,
    /// No transport; a reconnect may be scheduled
    Disconnected,
    /// Last attempt failed; a reconnect may be scheduled
    Errored,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// Actions returned by the connection state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Open the underlying transport
    Open,

    /// Close the underlying transport
    Close,

    /// Arm a timer; deliver `ReconnectDue` when it fires
    ScheduleReconnect {
        /// 1-based reconnect attempt number
        attempt: u32,
        /// Delay before the attempt
        delay: Duration,
    },

    /// Disarm a pending reconnect timer
    CancelReconnect,

    /// Connection state changed
    StateChanged {
        /// Previous state
        from: ConnectionState,
        /// New state
        to: ConnectionState,
    },

    /// A new server session began (new client identifier)
    SessionStarted {
        /// Identifier assigned by the server
        client_id: String,
    },

    /// The current server session is gone
    SessionEnded,

    /// Reconnect budget consumed
    Exhausted {
        /// Number of reconnect attempts made
        attempts: u32,
    },
}

/// Connection configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    /// Reconnect attempts allowed before giving up
    pub max_reconnect_attempts: u32,
    /// Delay before the first reconnect; doubles per attempt
    pub reconnect_delay: Duration,
    /// Upper bound on the reconnect delay
    pub reconnect_delay_max: Duration,
    /// Random deviation as a fraction of the delay, in `[0, 1]`
    pub jitter: f64,
    /// Time allowed for the transport to open
    pub connect_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            reconnect_delay_max: DEFAULT_RECONNECT_DELAY_MAX,
            jitter: DEFAULT_RECONNECT_JITTER,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl ConnectionConfig {
    /// Delay before reconnect `attempt` (1-based), before jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.reconnect_delay.saturating_mul(factor).min(self.reconnect_delay_max)
    }

    /// Delay before reconnect `attempt` with jitter drawn from `env`.
    pub fn delay<E: Environment>(&self, attempt: u32, env: &E) -> Duration {
        let base = self.base_delay(attempt);
        let jitter = self.jitter.clamp(0.0, 1.0);
        if jitter == 0.0 {
            return base;
        }

        let deviation = base.mul_f64(env.random_unit() * jitter);
        if env.random_u64() % 2 == 0 {
            base.saturating_sub(deviation)
        } else {
            (base + deviation).min(self.reconnect_delay_max)
        }
    }
}

/// Connection state machine
///
/// Pure state machine - no I/O, no timers. The driver reports transport
/// lifecycle through `handle_*` methods and executes the returned actions.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Current state
    state: ConnectionState,
    /// Configuration
    config: ConnectionConfig,
    /// Reconnects scheduled since the last successful connect
    attempts: u32,
    /// A reconnect timer is armed
    reconnect_pending: bool,
    /// Identifier of the current server session
    client_id: Option<String>,
    /// Why the connection is not usable. `None` while healthy.
    last_error: Option<ConnectionError>,
    /// Connected at least once
    ever_connected: bool,
    /// Torn down; all further input is ignored
    shut_down: bool,
}

impl Connection {
    /// Create a new connection in [`ConnectionState::Disconnected`] state
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            config,
            attempts: 0,
            reconnect_pending: false,
            client_id: None,
            last_error: None,
            ever_connected: false,
            shut_down: false,
        }
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Configuration
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Identifier of the current server session. `None` if not connected.
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    /// Reconnects scheduled since the last successful connect.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Why the connection is not usable. `None` while healthy.
    pub fn last_error(&self) -> Option<&ConnectionError> {
        self.last_error.as_ref()
    }

    /// Reconnect budget is consumed and no attempt is scheduled.
    pub fn is_exhausted(&self) -> bool {
        matches!(self.last_error, Some(ConnectionError::Exhausted { .. }))
    }

    /// A reconnect timer is armed.
    pub fn is_reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    /// Connection has been torn down.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Start (or resume) connecting.
    ///
    /// Idempotent: does nothing while connecting, connected, or waiting for a
    /// scheduled reconnect. After the budget was exhausted, an explicit call
    /// starts over with a fresh budget.
    pub fn connect(&mut self) -> Vec<ConnectionAction> {
        let mut actions = Vec::new();
        if self.shut_down || self.reconnect_pending {
            return actions;
        }

        match self.state {
            ConnectionState::Connecting | ConnectionState::Connected => {},
            ConnectionState::Disconnected | ConnectionState::Errored => {
                self.attempts = 0;
                self.last_error = None;
                self.transition(ConnectionState::Connecting, &mut actions);
                actions.push(ConnectionAction::Open);
            },
        }

        actions
    }

    /// Transport opened and the server assigned `client_id`.
    ///
    /// Only valid while connecting; anything else is a stale notification.
    pub fn handle_opened(&mut self, client_id: String) -> Vec<ConnectionAction> {
        let mut actions = Vec::new();
        if self.shut_down {
            return actions;
        }
        if self.state != ConnectionState::Connecting {
            tracing::debug!(state = %self.state, "ignoring handshake outside connecting state");
            return actions;
        }

        self.attempts = 0;
        self.last_error = None;
        self.ever_connected = true;
        self.client_id = Some(client_id.clone());
        self.transition(ConnectionState::Connected, &mut actions);
        actions.push(ConnectionAction::SessionStarted { client_id });

        actions
    }

    /// Transport closed.
    ///
    /// From Connected this is an unexpected disconnect: the session ends and
    /// a reconnect is scheduled. From Connecting it counts as a failed
    /// attempt.
    pub fn handle_closed<E: Environment>(
        &mut self,
        reason: String,
        env: &E,
    ) -> Vec<ConnectionAction> {
        let mut actions = Vec::new();
        if self.shut_down {
            return actions;
        }

        match self.state {
            ConnectionState::Connected => {
                tracing::info!(%reason, "connection lost");
                self.client_id = None;
                self.last_error = Some(ConnectionError::Lost(reason));
                actions.push(ConnectionAction::SessionEnded);
                self.transition(ConnectionState::Disconnected, &mut actions);
                self.schedule_reconnect(env, &mut actions);
            },
            ConnectionState::Connecting => return self.handle_failed(reason, env),
            ConnectionState::Disconnected | ConnectionState::Errored => {},
        }

        actions
    }

    /// Transport could not be opened (handshake or network failure).
    pub fn handle_failed<E: Environment>(
        &mut self,
        cause: String,
        env: &E,
    ) -> Vec<ConnectionAction> {
        let mut actions = Vec::new();
        if self.shut_down {
            return actions;
        }

        match self.state {
            ConnectionState::Connecting => {
                tracing::warn!(%cause, attempt = self.attempts, "connect failed");
                self.last_error = Some(ConnectionError::ConnectFailed(cause));
                self.transition(ConnectionState::Errored, &mut actions);
                self.schedule_reconnect(env, &mut actions);
            },
            ConnectionState::Connected => return self.handle_closed(cause, env),
            ConnectionState::Disconnected | ConnectionState::Errored => {},
        }

        actions
    }

    /// A scheduled reconnect timer fired.
    pub fn handle_reconnect_due(&mut self) -> Vec<ConnectionAction> {
        let mut actions = Vec::new();
        if self.shut_down || !self.reconnect_pending {
            return actions;
        }

        self.reconnect_pending = false;
        tracing::info!(attempt = self.attempts, "reconnecting");
        self.transition(ConnectionState::Connecting, &mut actions);
        actions.push(ConnectionAction::Open);

        actions
    }

    /// Tear down: cancel any pending reconnect and close the transport.
    ///
    /// Terminal. Every later call returns no actions.
    pub fn shutdown(&mut self) -> Vec<ConnectionAction> {
        let mut actions = Vec::new();
        if self.shut_down {
            return actions;
        }

        if self.reconnect_pending {
            self.reconnect_pending = false;
            actions.push(ConnectionAction::CancelReconnect);
        }
        if matches!(self.state, ConnectionState::Connecting | ConnectionState::Connected) {
            actions.push(ConnectionAction::Close);
        }
        if self.client_id.take().is_some() {
            actions.push(ConnectionAction::SessionEnded);
        }
        self.transition(ConnectionState::Disconnected, &mut actions);
        self.shut_down = true;

        actions
    }

    /// Short user-visible status. `None` while connected.
    pub fn status_line(&self) -> Option<String> {
        match self.state {
            ConnectionState::Connected => None,
            ConnectionState::Connecting if self.attempts > 0 => Some(format!(
                "Reconnecting (attempt {} of {})...",
                self.attempts, self.config.max_reconnect_attempts
            )),
            ConnectionState::Connecting => Some("Connecting...".to_string()),
            ConnectionState::Errored => match &self.last_error {
                Some(err) => Some(format!("Connection error: {err}")),
                None => Some("Connection error".to_string()),
            },
            ConnectionState::Disconnected if self.is_exhausted() => {
                Some(EXHAUSTED_NOTICE.to_string())
            },
            ConnectionState::Disconnected if self.reconnect_pending => {
                Some("Disconnected. Reconnecting...".to_string())
            },
            ConnectionState::Disconnected if self.ever_connected || self.shut_down => {
                Some("Disconnected.".to_string())
            },
            ConnectionState::Disconnected => Some("Not connected.".to_string()),
        }
    }

    fn schedule_reconnect<E: Environment>(&mut self, env: &E, actions: &mut Vec<ConnectionAction>) {
        if self.attempts >= self.config.max_reconnect_attempts {
            let attempts = self.attempts;
            tracing::warn!(attempts, "reconnect budget exhausted");
            self.last_error = Some(ConnectionError::Exhausted { attempts });
            self.transition(ConnectionState::Disconnected, actions);
            actions.push(ConnectionAction::Exhausted { attempts });
            return;
        }

        self.attempts += 1;
        self.reconnect_pending = true;
        let delay = self.config.delay(self.attempts, env);
        actions.push(ConnectionAction::ScheduleReconnect { attempt: self.attempts, delay });
    }

    fn transition(&mut self, to: ConnectionState, actions: &mut Vec<ConnectionAction>) {
        let from = self.state;
        if from != to {
            self.state = to;
            actions.push(ConnectionAction::StateChanged { from, to });
        }
    }
}
