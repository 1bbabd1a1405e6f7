//! Local events published by the connection manager.
//!
//! Every transport lifecycle change and every recognised inbound message
//! becomes a [`ClientEvent`]. Listeners subscribe per [`EventKind`].

use std::fmt;

use serde::Serialize;

use super::PixelUpdate;

/// Close code reported when the connection dropped without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Details of a successfully opened connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenEvent {
    /// URL the connection was opened to.
    pub url: String,
    /// Identifier of this connection, unique per `connect` call.
    pub connection_id: uuid::Uuid,
}

/// Details of a closed connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloseEvent {
    /// WebSocket close code (1000 = normal, 1006 = abnormal).
    pub code: u16,
    /// Close reason sent by the peer, possibly empty.
    pub reason: String,
    /// Whether the closing handshake completed.
    pub was_clean: bool,
}

impl CloseEvent {
    /// A close with no handshake, e.g. connection refused or reset.
    #[must_use]
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self {
            code: ABNORMAL_CLOSURE,
            reason: reason.into(),
            was_clean: false,
        }
    }
}

/// A transport error surfaced to listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEvent {
    /// Human-readable description.
    pub message: String,
}

/// Event published to listeners.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// The transport opened.
    Open(OpenEvent),
    /// The transport closed.
    Close(CloseEvent),
    /// The transport reported an error.
    Error(ErrorEvent),
    /// Full canvas snapshot sent by the server on join.
    InitialCanvas(serde_json::Value),
    /// A single pixel changed.
    PixelUpdate(PixelUpdate),
    /// The reconnect budget ran out; no further automatic attempts.
    ReconnectFailed {
        /// Attempts made since the last successful open.
        attempts: u32,
    },
}

impl ClientEvent {
    /// Returns the kind listeners subscribe to for this event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Open(_) => EventKind::Open,
            Self::Close(_) => EventKind::Close,
            Self::Error(_) => EventKind::Error,
            Self::InitialCanvas(_) => EventKind::InitialCanvas,
            Self::PixelUpdate(_) => EventKind::PixelUpdate,
            Self::ReconnectFailed { .. } => EventKind::ReconnectFailed,
        }
    }
}

/// Discriminator used to subscribe to a class of [`ClientEvent`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// See [`ClientEvent::Open`].
    Open,
    /// See [`ClientEvent::Close`].
    Close,
    /// See [`ClientEvent::Error`].
    Error,
    /// See [`ClientEvent::InitialCanvas`].
    InitialCanvas,
    /// See [`ClientEvent::PixelUpdate`].
    PixelUpdate,
    /// See [`ClientEvent::ReconnectFailed`].
    ReconnectFailed,
}

impl EventKind {
    /// Returns the wire-style snake_case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
            Self::Error => "error",
            Self::InitialCanvas => "initial_canvas",
            Self::PixelUpdate => "pixel_update",
            Self::ReconnectFailed => "reconnect_failed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
