//! Client handle.

use std::sync::Arc;

use murmur_core::{
    ChatClient, ChatMessage, ClientError, ClientEvent, ConnectionState, RegistrationState,
    Session, TimelineEntry, env::Environment,
};
use parking_lot::Mutex;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::{
    config::ClientConfig,
    driver::Driver,
    runtime::{Notifiers, Runtime, RuntimeError, StateChange},
    subscription::Subscription,
    system_env::SystemEnv,
    transport::WsDriver,
};

/// Handle to a running chat client.
///
/// Owns the background runtime task. Reads never wait on I/O. Intents are
/// checked against the current state, so refusals are reported immediately,
/// then queued for the runtime. Dropping the handle aborts the runtime; call
/// [`ClientHandle::shutdown`] to close the transport cleanly first.
pub struct ClientHandle<E: Environment = SystemEnv> {
    client: Arc<Mutex<ChatClient<E>>>,
    notifiers: Arc<Notifiers>,
    intents: mpsc::UnboundedSender<ClientEvent>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    config: ClientConfig,
}

impl ClientHandle<SystemEnv> {
    /// Start a client that talks WebSocket to `config.server_url`.
    ///
    /// Must be called within a tokio runtime.
    pub fn connect_ws(config: ClientConfig) -> Self {
        Self::start(WsDriver::new(), SystemEnv::new(), config)
    }
}

impl<E: Environment> ClientHandle<E> {
    /// Start a client over `driver`.
    ///
    /// Spawns the runtime task, so it must be called within a tokio runtime.
    /// Connects immediately when `config.auto_connect` is set.
    pub fn start<D: Driver>(driver: D, env: E, config: ClientConfig) -> Self {
        let client = Arc::new(Mutex::new(ChatClient::new(env.clone(), config.core())));
        let notifiers = Arc::new(Notifiers::new());
        let (intents_tx, intents_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let runtime = Runtime::new(
            driver,
            env,
            config.server_url.clone(),
            Arc::clone(&client),
            Arc::clone(&notifiers),
            intents_rx,
            shutdown_rx,
        );
        let task = tokio::spawn(runtime.run());
        tracing::info!(url = %config.server_url, "client started");

        let handle = Self {
            client,
            notifiers,
            intents: intents_tx,
            shutdown: Some(shutdown_tx),
            task: Some(task),
            config,
        };
        if handle.config.auto_connect
            && let Err(e) = handle.connect()
        {
            tracing::warn!(error = %e, "initial connect not queued");
        }
        handle
    }

    /// Start connecting.
    ///
    /// No-op while connecting, connected, or waiting for a reconnect. After
    /// the reconnect budget is exhausted this starts over with a fresh one.
    pub fn connect(&self) -> Result<(), ClientError> {
        self.dispatch(ClientEvent::Connect)
    }

    /// Register a display name for the current session.
    ///
    /// Blank names are ignored.
    ///
    /// # Errors
    ///
    /// - `ClientError::NotConnected` if not connected
    /// - `ClientError::Closed` if the runtime has stopped
    pub fn submit_name(&self, name: &str) -> Result<(), ClientError> {
        self.dispatch(ClientEvent::SubmitName(name.to_string()))
    }

    /// Send a chat message.
    ///
    /// Blank text is ignored. The message shows up in the timeline once the
    /// server broadcasts it back.
    ///
    /// # Errors
    ///
    /// - `ClientError::NotConnected` if not connected
    /// - `ClientError::NotJoined` if no display name is registered
    /// - `ClientError::Closed` if the runtime has stopped
    pub fn send_message(&self, text: &str) -> Result<(), ClientError> {
        self.dispatch(ClientEvent::SendMessage(text.to_string()))
    }

    /// Current connection state.
    pub fn current_state(&self) -> ConnectionState {
        self.client.lock().connection_state()
    }

    /// Current registration state.
    pub fn registration(&self) -> RegistrationState {
        self.client.lock().registration()
    }

    /// Current server session.
    pub fn session(&self) -> Session {
        self.client.lock().session().clone()
    }

    /// User-visible connection status. `None` while connected.
    pub fn status_line(&self) -> Option<String> {
        self.client.lock().status_line()
    }

    /// Copy of the timeline in arrival order.
    pub fn snapshot(&self) -> Vec<TimelineEntry> {
        self.client.lock().snapshot()
    }

    /// True if `message` was sent under this session's display name.
    pub fn is_own(&self, message: &ChatMessage) -> bool {
        self.client.lock().is_own(message)
    }

    /// Call `handler` on every connection state change.
    ///
    /// The change carries the status line as it was when the transition was
    /// applied, so handlers that render it later stay consistent.
    pub fn on_state_change(
        &self,
        handler: impl Fn(&StateChange) + Send + Sync + 'static,
    ) -> Subscription {
        self.notifiers.state.subscribe(handler)
    }

    /// Call `handler` on every registration state change.
    pub fn on_registration_change(
        &self,
        handler: impl Fn(&RegistrationState) + Send + Sync + 'static,
    ) -> Subscription {
        self.notifiers.registration.subscribe(handler)
    }

    /// Call `handler` for every entry appended to the timeline.
    pub fn on_timeline_entry(
        &self,
        handler: impl Fn(&TimelineEntry) + Send + Sync + 'static,
    ) -> Subscription {
        self.notifiers.timeline.subscribe(handler)
    }

    /// Call `handler` for every user-visible notice.
    pub fn on_notice(&self, handler: impl Fn(&String) + Send + Sync + 'static) -> Subscription {
        self.notifiers.notice.subscribe(handler)
    }

    /// Stop the runtime.
    ///
    /// Handlers are removed first, so none fires during or after teardown.
    /// Pending reconnects are abandoned and the transport is closed. If the
    /// runtime does not stop within the configured timeout it is aborted.
    pub async fn shutdown(mut self) -> Result<(), RuntimeError> {
        self.notifiers.clear();
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }

        let Some(mut task) = self.task.take() else {
            return Ok(());
        };
        let timeout = self.config.shutdown_timeout;
        match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(())) => {
                tracing::info!("client stopped");
                Ok(())
            },
            Ok(Err(e)) => Err(RuntimeError::Task(e.to_string())),
            Err(_) => {
                task.abort();
                Err(RuntimeError::ShutdownTimeout(timeout))
            },
        }
    }

    fn dispatch(&self, event: ClientEvent) -> Result<(), ClientError> {
        if !self.client.lock().check_intent(&event)? {
            return Ok(());
        }
        self.intents.send(event).map_err(|_| ClientError::Closed)
    }
}

impl<E: Environment> std::fmt::Debug for ClientHandle<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientHandle")
            .field("server_url", &self.config.server_url)
            .field("state", &self.current_state())
            .finish_non_exhaustive()
    }
}

impl<E: Environment> Drop for ClientHandle<E> {
    fn drop(&mut self) {
        self.notifiers.clear();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
