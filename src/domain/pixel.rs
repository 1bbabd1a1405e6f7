//! Pixel payloads exchanged with the canvas server.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A pixel change broadcast by the canvas server.
///
/// The server echoes every accepted placement to all clients. `color` is
/// kept as raw JSON because the renderer owns its format (usually a CSS
/// string such as `"#fff"`, sometimes a packed integer). The server may
/// also attach the placing user and a timestamp; both are optional, and a
/// value that cannot be read is dropped instead of failing the update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelUpdate {
    /// Column on the canvas.
    pub x: i64,
    /// Row on the canvas.
    pub y: i64,
    /// Color value as sent by the server.
    pub color: Value,
    /// User who placed the pixel, if the server reports it.
    #[serde(
        default,
        deserialize_with = "lenient_user_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_id: Option<String>,
    /// Server-side placement time, if the server reports it.
    ///
    /// Timestamps without an offset are taken as UTC.
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A local request to paint one pixel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelPlacement {
    /// Column on the canvas.
    pub x: i64,
    /// Row on the canvas.
    pub y: i64,
    /// Color value.
    pub color: String,
}

impl PixelPlacement {
    /// Creates a placement.
    #[must_use]
    pub fn new(x: i64, y: i64, color: impl Into<String>) -> Self {
        Self {
            x,
            y,
            color: color.into(),
        }
    }
}

impl From<PixelPlacement> for PixelUpdate {
    fn from(p: PixelPlacement) -> Self {
        Self {
            x: p.x,
            y: p.y,
            color: Value::String(p.color),
            user_id: None,
            timestamp: None,
        }
    }
}

/// Accepts string or numeric user ids; anything else becomes `None`.
fn lenient_user_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Accepts RFC 3339 or offset-less ISO 8601 timestamps; anything else
/// becomes `None`.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::String(raw) = Value::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }
    Ok(raw
        .parse::<NaiveDateTime>()
        .ok()
        .map(|naive| naive.and_utc()))
}
