//! Transport seam between the connection manager and a real socket.
//!
//! A [`Connector`] behaves like a browser `WebSocket` constructor: calling
//! [`Connector::open`] returns immediately with a [`TransportHandle`], and
//! lifecycle events arrive later on the handle's event channel. Dropping
//! the handle detaches from the socket, which is then shut down quietly.

use std::fmt;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::domain::CloseEvent;
use crate::error::ClientError;

/// Close code used when the peer closed without a status.
const NO_STATUS_RECEIVED: u16 = 1005;

/// Lifecycle event reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake completed; the socket accepts writes.
    Open,
    /// A text frame arrived.
    Message(String),
    /// The socket is closed. Always the last event.
    Close(CloseEvent),
    /// A connect, read or write failed. Usually followed by `Close`.
    Error(String),
}

/// Instruction sent from the manager to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCommand {
    /// Write one text frame.
    Send(String),
    /// Start the closing handshake.
    Close,
}

/// Manager side of a transport.
#[derive(Debug)]
pub struct TransportHandle {
    /// Commands flowing to the socket.
    pub commands: mpsc::UnboundedSender<TransportCommand>,
    /// Events flowing from the socket.
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Socket side of a transport.
#[derive(Debug)]
pub struct TransportPeer {
    /// Events flowing to the manager.
    pub events: mpsc::UnboundedSender<TransportEvent>,
    /// Commands flowing from the manager.
    pub commands: mpsc::UnboundedReceiver<TransportCommand>,
}

/// Creates a connected handle/peer pair.
#[must_use]
pub fn transport_channel() -> (TransportHandle, TransportPeer) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (evt_tx, evt_rx) = mpsc::unbounded_channel();
    (
        TransportHandle {
            commands: cmd_tx,
            events: evt_rx,
        },
        TransportPeer {
            events: evt_tx,
            commands: cmd_rx,
        },
    )
}

/// Opens transports to a URL.
pub trait Connector: fmt::Debug + Send + Sync + 'static {
    /// Starts connecting to `url` and returns immediately.
    ///
    /// Failures are reported as [`TransportEvent::Error`] followed by
    /// [`TransportEvent::Close`], never as a return value.
    fn open(&self, url: &str) -> TransportHandle;
}

/// [`Connector`] backed by `tokio-tungstenite`.
///
/// Must be used from within a tokio runtime; each `open` spawns one task
/// that owns the socket.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

impl TungsteniteConnector {
    /// Creates the connector.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Connector for TungsteniteConnector {
    fn open(&self, url: &str) -> TransportHandle {
        let (handle, peer) = transport_channel();
        tokio::spawn(run_socket(url.to_string(), peer));
        handle
    }
}

fn emit(events: &mpsc::UnboundedSender<TransportEvent>, event: TransportEvent) {
    // The manager may already have detached; nothing to do then.
    let _ = events.send(event);
}

/// Reports a failure that ends the socket: an error, then an abnormal close.
fn fail(events: &mpsc::UnboundedSender<TransportEvent>, err: impl Into<ClientError>) {
    let message = err.into().to_string();
    emit(events, TransportEvent::Error(message.clone()));
    emit(events, TransportEvent::Close(CloseEvent::abnormal(message)));
}

/// Owns one socket from handshake to close.
async fn run_socket(url: String, peer: TransportPeer) {
    let TransportPeer {
        events,
        mut commands,
    } = peer;

    let ws = tokio::select! {
        result = connect_async(url.as_str()) => match result {
            Ok((ws, _response)) => ws,
            Err(e) => {
                tracing::debug!(%url, error = %e, "websocket connect failed");
                fail(&events, e);
                return;
            }
        },
        _ = commands.recv() => {
            emit(
                &events,
                TransportEvent::Close(CloseEvent::abnormal("closed before the connection opened")),
            );
            return;
        }
    };

    emit(&events, TransportEvent::Open);
    let (mut sink, mut stream) = ws.split();
    let mut closing = false;

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    emit(&events, TransportEvent::Message(text.as_str().to_owned()));
                }
                Some(Ok(Message::Binary(bytes))) => {
                    tracing::debug!(len = bytes.len(), "ignoring binary frame");
                }
                Some(Ok(Message::Close(frame))) => {
                    let close = frame.map_or(
                        CloseEvent {
                            code: NO_STATUS_RECEIVED,
                            reason: String::new(),
                            was_clean: true,
                        },
                        |f| CloseEvent {
                            code: u16::from(f.code),
                            reason: f.reason.as_str().to_owned(),
                            was_clean: true,
                        },
                    );
                    // Flushes the close reply; errors just mean it is already gone.
                    let _ = sink.close().await;
                    emit(&events, TransportEvent::Close(close));
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    fail(&events, e);
                    return;
                }
                None => {
                    emit(
                        &events,
                        TransportEvent::Close(CloseEvent::abnormal("connection dropped")),
                    );
                    return;
                }
            },
            command = commands.recv(), if !closing => match command {
                Some(TransportCommand::Send(text)) => {
                    if let Err(e) = sink.send(Message::text(text)).await {
                        emit(&events, TransportEvent::Error(ClientError::from(e).to_string()));
                    }
                }
                Some(TransportCommand::Close) => {
                    closing = true;
                    if let Err(e) = sink.send(Message::Close(None)).await {
                        fail(&events, e);
                        return;
                    }
                }
                None => {
                    tracing::debug!(%url, "transport detached");
                    let _ = sink.close().await;
                    return;
                }
            },
        }
    }
}
