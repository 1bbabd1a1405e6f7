//! Client error types.
//!
//! [`ClientError`] is the central error type for the crate. None of its
//! variants is fatal: every failure path inside the connection manager
//! degrades to a log line plus dropped work, and the error is only
//! returned so callers can observe what happened.

/// Error enum for connection, codec and configuration failures.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A message was sent while no open transport was available.
    #[error("websocket is not connected; message dropped")]
    NotConnected,

    /// Configuration value is missing or invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A frame could not be decoded or encoded as a JSON envelope.
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport-level failure (connect, read or write).
    #[error("transport error: {0}")]
    Transport(String),
}

impl ClientError {
    /// Returns `true` if retrying later may succeed.
    ///
    /// Transport failures and sends while disconnected are transient;
    /// malformed payloads and bad configuration are not.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::NotConnected | Self::Transport(_) => true,
            Self::InvalidConfig(_) | Self::Json(_) => false,
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
