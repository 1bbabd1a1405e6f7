//! Connection manager: one socket, typed events, bounded reconnection.
//!
//! [`ConnectionManager`] owns at most one transport at a time. Each
//! transport gets a driver task that turns its lifecycle events into
//! [`ClientEvent`]s. When a connection closes without being asked to, the
//! manager reconnects after a fixed delay until the attempt budget runs
//! out, then publishes [`ClientEvent::ReconnectFailed`].
//!
//! Internal locks are never held while listeners run, so a listener may
//! call back into the manager (for example to `send` or `connect`).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::messages::{InboundMessage, decode_inbound, encode_outbound, encode_placement};
use super::reconnect::{ReconnectBudget, ReconnectPolicy};
use super::transport::{
    Connector, TransportCommand, TransportEvent, TransportHandle, TungsteniteConnector,
};
use crate::config::ClientConfig;
use crate::domain::listener_registry::deliver;
use crate::domain::{
    ClientEvent, CloseEvent, ErrorEvent, EventKind, Listener, ListenerRegistry, OpenEvent,
    PixelPlacement,
};
use crate::error::ClientError;

/// Handle to a pixel-canvas WebSocket session.
///
/// Cheap to clone; clones share the same connection and listeners. All
/// methods that start a connection must be called inside a tokio runtime.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    listeners: Mutex<ListenerRegistry>,
    state: Mutex<ConnectionState>,
}

#[derive(Debug)]
struct ConnectionState {
    /// Bumped on every open; events from older generations are stale.
    generation: u64,
    active: Option<ActiveConnection>,
    budget: ReconnectBudget,
    /// Last issued retry token.
    retry_seq: u64,
    pending_retry: Option<PendingRetry>,
}

/// A scheduled reconnect. Only the timer holding the current token may
/// open a connection; an aborted timer can still be past its sleep.
#[derive(Debug)]
struct PendingRetry {
    token: u64,
    handle: JoinHandle<()>,
}

#[derive(Debug)]
struct ActiveConnection {
    generation: u64,
    connection_id: uuid::Uuid,
    url: String,
    commands: mpsc::UnboundedSender<TransportCommand>,
    open: bool,
    close_requested: bool,
    driver: JoinHandle<()>,
}

impl ConnectionState {
    fn cancel_retry(&mut self) {
        if let Some(retry) = self.pending_retry.take() {
            retry.handle.abort();
            tracing::debug!("cancelled pending reconnect");
        }
    }

    /// Stops observing the active transport and asks it to close.
    fn detach(&mut self) {
        if let Some(active) = self.active.take() {
            active.driver.abort();
            let _ = active.commands.send(TransportCommand::Close);
            tracing::debug!(
                connection_id = %active.connection_id,
                url = %active.url,
                "detached previous connection"
            );
        }
    }

    fn current_mut(&mut self, generation: u64) -> Option<&mut ActiveConnection> {
        self.active
            .as_mut()
            .filter(|active| active.generation == generation)
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        state.cancel_retry();
        state.detach();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ConnectionManager {
    /// Creates a manager that connects with `tokio-tungstenite`.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self::with_connector(config, Arc::new(TungsteniteConnector::new()))
    }

    /// Creates a manager with a custom transport.
    #[must_use]
    pub fn with_connector(config: ClientConfig, connector: Arc<dyn Connector>) -> Self {
        let budget = ReconnectBudget::new(ReconnectPolicy::from(&config));
        Self {
            inner: Arc::new(Inner {
                config,
                connector,
                listeners: Mutex::new(ListenerRegistry::new()),
                state: Mutex::new(ConnectionState {
                    generation: 0,
                    active: None,
                    budget,
                    retry_seq: 0,
                    pending_retry: None,
                }),
            }),
        }
    }

    /// Returns the configuration this manager was built with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Connects to the configured URL.
    pub fn connect_default(&self) {
        self.connect(self.inner.config.url.clone());
    }

    /// Opens a connection to `url`.
    ///
    /// Any existing connection is detached first (its events are no longer
    /// published) and any scheduled reconnect is cancelled. The attempt
    /// counter is left alone; only a successful open resets it.
    pub fn connect(&self, url: impl Into<String>) {
        let url = url.into();
        let mut state = lock(&self.inner.state);
        state.cancel_retry();
        state.detach();
        self.open_locked(&mut state, url);
    }

    fn open_locked(&self, state: &mut ConnectionState, url: String) {
        state.generation += 1;
        let generation = state.generation;
        let connection_id = uuid::Uuid::new_v4();

        let TransportHandle { commands, events } = self.inner.connector.open(&url);
        let driver = tokio::spawn(drive(Arc::downgrade(&self.inner), generation, events));

        tracing::info!(%url, %connection_id, "connecting");
        state.active = Some(ActiveConnection {
            generation,
            connection_id,
            url,
            commands,
            open: false,
            close_requested: false,
            driver,
        });
    }

    /// Sends a message to the server.
    ///
    /// A `"pixel_place"` action is translated into a `pixel_update` frame
    /// carrying `x`, `y` and `color`; any other type is sent as
    /// `{"type": msg_type, "data": data}`. Nothing is queued: if the
    /// connection is not open the message is dropped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] if no open connection exists,
    /// [`ClientError::Transport`] if the socket task has already exited, or
    /// [`ClientError::Json`] if the frame cannot be serialized.
    pub fn send(&self, msg_type: &str, data: Value) -> Result<(), ClientError> {
        let frame = encode_outbound(msg_type, data)?;
        self.send_frame(msg_type, frame)
    }

    /// Places a pixel; shorthand for `send("pixel_place", ...)`.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send).
    pub fn place_pixel(&self, placement: &PixelPlacement) -> Result<(), ClientError> {
        let frame = encode_placement(placement)?;
        self.send_frame(super::messages::PIXEL_PLACE, frame)
    }

    fn send_frame(&self, msg_type: &str, frame: String) -> Result<(), ClientError> {
        let state = lock(&self.inner.state);
        let Some(active) = state
            .active
            .as_ref()
            .filter(|active| active.open && !active.close_requested)
        else {
            tracing::warn!(msg_type, "websocket not connected; dropping message");
            return Err(ClientError::NotConnected);
        };

        active
            .commands
            .send(TransportCommand::Send(frame))
            .map_err(|_| {
                tracing::warn!(msg_type, "transport gone; dropping message");
                ClientError::Transport("transport task ended".to_string())
            })
    }

    /// Registers `listener` for events of `kind`.
    ///
    /// Listeners run in registration order. Registering the same listener
    /// twice makes it run twice.
    pub fn on(&self, kind: EventKind, listener: Listener) {
        lock(&self.inner.listeners).on(kind, listener);
    }

    /// Removes every registration of `listener` for `kind`.
    ///
    /// Listeners are compared by `Arc` identity. Unknown listeners are
    /// ignored.
    pub fn off(&self, kind: EventKind, listener: &Listener) {
        let removed = lock(&self.inner.listeners).off(kind, listener);
        tracing::trace!(event = %kind, removed, "listener removed");
    }

    /// Number of listeners registered for `kind`.
    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        lock(&self.inner.listeners).count(kind)
    }

    /// Closes the current connection and cancels any scheduled reconnect.
    ///
    /// The `Close` event is published once the transport reports the close;
    /// no reconnect follows it.
    pub fn close(&self) {
        let mut state = lock(&self.inner.state);
        state.cancel_retry();
        match state.active.as_mut() {
            Some(active) => {
                active.close_requested = true;
                let _ = active.commands.send(TransportCommand::Close);
                tracing::info!(connection_id = %active.connection_id, "closing connection");
            }
            None => tracing::debug!("close requested with no active connection"),
        }
    }

    /// Returns `true` while a connection is open and not closing.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        lock(&self.inner.state)
            .active
            .as_ref()
            .is_some_and(|active| active.open && !active.close_requested)
    }

    /// Reconnect attempts made since the last successful open.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        lock(&self.inner.state).budget.attempts()
    }

    fn emit(&self, event: &ClientEvent) {
        let listeners = lock(&self.inner.listeners).snapshot(event.kind());
        deliver(&listeners, event);
    }

    fn handle_transport_event(&self, generation: u64, event: TransportEvent) {
        match event {
            TransportEvent::Open => self.on_open(generation),
            TransportEvent::Message(text) => {
                if self.is_current(generation) {
                    self.on_message(&text);
                }
            }
            TransportEvent::Error(message) => {
                if self.is_current(generation) {
                    tracing::warn!(error = %message, "websocket error");
                    self.emit(&ClientEvent::Error(ErrorEvent { message }));
                }
            }
            TransportEvent::Close(close) => self.on_close(generation, close),
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        lock(&self.inner.state).current_mut(generation).is_some()
    }

    fn on_open(&self, generation: u64) {
        let opened = {
            let mut state = lock(&self.inner.state);
            let opened = state.current_mut(generation).map(|active| {
                active.open = true;
                OpenEvent {
                    url: active.url.clone(),
                    connection_id: active.connection_id,
                }
            });
            if opened.is_some() {
                state.budget.reset();
            }
            opened
        };

        if let Some(open) = opened {
            tracing::info!(url = %open.url, connection_id = %open.connection_id, "websocket connected");
            self.emit(&ClientEvent::Open(open));
        }
    }

    fn on_message(&self, text: &str) {
        match decode_inbound(text) {
            Ok(InboundMessage::InitialCanvas(snapshot)) => {
                self.emit(&ClientEvent::InitialCanvas(snapshot));
            }
            Ok(InboundMessage::PixelUpdate(update)) => {
                self.emit(&ClientEvent::PixelUpdate(update));
            }
            Ok(InboundMessage::Ignored { msg_type }) => {
                tracing::debug!(%msg_type, "ignoring unrecognised message type");
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse websocket message");
            }
        }
    }

    fn on_close(&self, generation: u64, close: CloseEvent) {
        let closed = {
            let mut state = lock(&self.inner.state);
            state
                .active
                .take_if(|active| active.generation == generation)
        };
        let Some(closed) = closed else {
            return;
        };

        tracing::info!(
            connection_id = %closed.connection_id,
            code = close.code,
            reason = %close.reason,
            "websocket closed"
        );
        self.emit(&ClientEvent::Close(close));

        if closed.close_requested {
            tracing::debug!("closed on request; not reconnecting");
            return;
        }
        self.schedule_retry(generation, closed.url);
    }

    fn schedule_retry(&self, generation: u64, url: String) {
        let mut state = lock(&self.inner.state);
        // A listener may have reconnected while the close was published.
        if state.generation != generation {
            return;
        }

        let Some(attempt) = state.budget.try_consume() else {
            let attempts = state.budget.attempts();
            drop(state);
            tracing::warn!(attempts, %url, "reconnect attempts exhausted; giving up");
            self.emit(&ClientEvent::ReconnectFailed { attempts });
            return;
        };

        let delay = state.budget.interval();
        tracing::info!(
            attempt,
            max_attempts = state.budget.policy().max_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "scheduling reconnect"
        );

        state.retry_seq += 1;
        let token = state.retry_seq;
        let inner = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = inner.upgrade() {
                ConnectionManager { inner }.retry(url, token);
            }
        });
        state.pending_retry = Some(PendingRetry { token, handle });
    }

    fn retry(&self, url: String, token: u64) {
        let mut state = lock(&self.inner.state);
        // `close` or `connect` may have run while this timer waited for the lock.
        if state.pending_retry.as_ref().is_none_or(|p| p.token != token) {
            tracing::debug!(token, "reconnect timer superseded; skipping");
            return;
        }
        // This task's own handle; dropping it does not cancel anything.
        state.pending_retry = None;
        state.detach();
        self.open_locked(&mut state, url);
    }
}

/// Forwards one transport's events to the manager until it closes.
async fn drive(
    inner: Weak<Inner>,
    generation: u64,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(inner) = inner.upgrade() else {
            return;
        };
        ConnectionManager { inner }.handle_transport_event(generation, event);
    }
}
