//! WebSocket message types: the `{type, data}` envelope and its codec.
//!
//! Inbound frames are JSON text of the form `{"type": ..., "data": ...}`.
//! Only `initial_canvas` and `pixel_update` carry meaning for the client;
//! any other type is dropped without error.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{PixelPlacement, PixelUpdate};
use crate::error::ClientError;

/// Inbound type carrying the full canvas snapshot.
pub const INITIAL_CANVAS: &str = "initial_canvas";

/// Inbound and outbound type carrying one pixel.
pub const PIXEL_UPDATE: &str = "pixel_update";

/// Local action type translated into a [`PIXEL_UPDATE`] frame on send.
pub const PIXEL_PLACE: &str = "pixel_place";

/// Fields copied from a `pixel_place` payload into the outbound frame.
const PIXEL_FIELDS: [&str; 3] = ["x", "y", "color"];

/// Top-level WebSocket message envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Type-specific payload.
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    /// Creates an envelope.
    #[must_use]
    pub fn new(msg_type: impl Into<String>, data: Value) -> Self {
        Self {
            msg_type: msg_type.into(),
            data,
        }
    }
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Full canvas snapshot; the shape is owned by the renderer.
    InitialCanvas(Value),
    /// One pixel changed.
    PixelUpdate(PixelUpdate),
    /// A well-formed frame whose type the client does not handle.
    Ignored {
        /// The unrecognised `type` value, or empty if none was present.
        msg_type: String,
    },
}

/// Decodes an inbound text frame.
///
/// Frames that are valid JSON but lack a string `type`, or carry an
/// unknown one, decode to [`InboundMessage::Ignored`].
///
/// # Errors
///
/// Returns [`ClientError::Json`] if the text is not JSON, or if a
/// `pixel_update` payload is missing `x`, `y` or `color`. Any JSON value
/// is accepted as a color, and unreadable `user_id` or `timestamp`
/// values are dropped rather than rejected.
pub fn decode_inbound(text: &str) -> Result<InboundMessage, ClientError> {
    let value: Value = serde_json::from_str(text)?;
    let msg_type = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default();

    match msg_type {
        INITIAL_CANVAS => {
            let data = value.get("data").cloned().unwrap_or(Value::Null);
            Ok(InboundMessage::InitialCanvas(data))
        }
        PIXEL_UPDATE => {
            let data = value.get("data").cloned().unwrap_or(Value::Null);
            let update: PixelUpdate = serde_json::from_value(data)?;
            Ok(InboundMessage::PixelUpdate(update))
        }
        other => Ok(InboundMessage::Ignored {
            msg_type: other.to_string(),
        }),
    }
}

/// Builds the outbound envelope for a `send(type, data)` call.
///
/// A `pixel_place` action becomes a `pixel_update` frame holding only the
/// `x`, `y` and `color` fields of `data` (absent fields are left out).
/// Every other type is wrapped verbatim.
#[must_use]
pub fn outbound_envelope(msg_type: &str, data: Value) -> Envelope {
    if msg_type != PIXEL_PLACE {
        return Envelope::new(msg_type, data);
    }

    let mut projected = Map::new();
    for field in PIXEL_FIELDS {
        if let Some(v) = data.get(field) {
            projected.insert(field.to_string(), v.clone());
        }
    }
    Envelope::new(PIXEL_UPDATE, Value::Object(projected))
}

/// Serializes the outbound frame for a `send(type, data)` call.
///
/// # Errors
///
/// Returns [`ClientError::Json`] if serialization fails.
pub fn encode_outbound(msg_type: &str, data: Value) -> Result<String, ClientError> {
    Ok(serde_json::to_string(&outbound_envelope(msg_type, data))?)
}

/// Serializes a typed pixel placement as a `pixel_update` frame.
///
/// # Errors
///
/// Returns [`ClientError::Json`] if serialization fails.
pub fn encode_placement(placement: &PixelPlacement) -> Result<String, ClientError> {
    encode_outbound(PIXEL_PLACE, serde_json::to_value(placement)?)
}
