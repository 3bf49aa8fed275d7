//! Client configuration.

use std::time::Duration;

use murmur_core::{ChatClientConfig, ConnectionConfig, RegistrarConfig, TimelineConfig};

/// Default server URL.
pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:3000";

/// Default time allowed for the runtime to stop on shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Configuration for [`crate::ClientHandle`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket URL of the chat server.
    pub server_url: String,
    /// Connection lifecycle and reconnect policy.
    pub connection: ConnectionConfig,
    /// Identity registration.
    pub registrar: RegistrarConfig,
    /// Timeline retention.
    pub timeline: TimelineConfig,
    /// Connect as soon as the runtime starts.
    pub auto_connect: bool,
    /// How long `shutdown` waits for the runtime before aborting it.
    pub shutdown_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            connection: ConnectionConfig::default(),
            registrar: RegistrarConfig::default(),
            timeline: TimelineConfig::default(),
            auto_connect: true,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Configuration for `server_url` with defaults elsewhere.
    pub fn new(server_url: impl Into<String>) -> Self {
        Self { server_url: server_url.into(), ..Self::default() }
    }

    /// Set the reconnect budget.
    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.connection.max_reconnect_attempts = attempts;
        self
    }

    /// Set the first reconnect delay and its cap.
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration, max: Duration) -> Self {
        self.connection.reconnect_delay = delay;
        self.connection.reconnect_delay_max = max;
        self
    }

    /// Set the reconnect jitter fraction.
    #[must_use]
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.connection.jitter = jitter;
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connection.connect_timeout = timeout;
        self
    }

    /// Re-send the last name automatically on every new session.
    #[must_use]
    pub fn with_auto_rejoin(mut self, auto_rejoin: bool) -> Self {
        self.registrar.auto_rejoin = auto_rejoin;
        self
    }

    /// Keep at most `capacity` timeline entries. A capacity of 0 keeps one.
    #[must_use]
    pub fn with_timeline_capacity(mut self, capacity: Option<usize>) -> Self {
        self.timeline.capacity = capacity;
        self
    }

    /// Connect on start, or wait for an explicit `connect`.
    #[must_use]
    pub fn with_auto_connect(mut self, auto_connect: bool) -> Self {
        self.auto_connect = auto_connect;
        self
    }

    /// Set the shutdown timeout.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Core state machine configuration.
    pub fn core(&self) -> ChatClientConfig {
        ChatClientConfig {
            connection: self.connection.clone(),
            registrar: self.registrar.clone(),
            timeline: self.timeline.clone(),
        }
    }
}
