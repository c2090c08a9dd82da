//! JSON frame codec for the controller event channel.
//!
//! Every WebSocket text message is exactly one [`Frame`].  Frames are JSON
//! objects whose `"type"` field selects the variant:
//!
//! ```text
//! {"type":"event","event":"playScene","args":["A"]}
//! {"type":"event","event":"listScenes","args":[],"ack_id":7}
//! {"type":"ack","ack_id":7,"args":[null,[{"_id":"A"}]]}
//! ```
//!
//! An `event` frame with an `ack_id` is a request: the receiver must answer
//! with an `ack` frame carrying the same id.  Ack arguments follow the
//! node-style callback convention `[error, data]`, where a `null` error means
//! success.  [`decode_ack`] turns that pair into a `Result`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::protocol::events::EventName;

/// Errors raised while encoding or decoding frames and ack payloads.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProtocolError {
    /// The text is not valid JSON or not a recognised frame.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// A successful ack did not include its data argument.
    #[error("acknowledgment carries no data")]
    MissingAckData,

    /// The ack data did not have the expected shape.
    #[error("unexpected acknowledgment data: {0}")]
    UnexpectedAckData(String),
}

/// Failure reported through an acknowledgment.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AckError {
    /// The controller answered with a non-null error argument.
    #[error("controller reported: {0}")]
    Remote(String),

    /// The ack itself could not be interpreted.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// One message on the event channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// A named event, optionally asking for an acknowledgment.
    Event {
        event: String,
        #[serde(default)]
        args: Vec<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ack_id: Option<u64>,
    },

    /// The reply to an earlier `Event` that carried `ack_id`.
    Ack {
        ack_id: u64,
        #[serde(default)]
        args: Vec<Value>,
    },
}

impl Frame {
    /// A fire-and-forget event.
    pub fn event(event: EventName, args: Vec<Value>) -> Self {
        Frame::Event {
            event: event.as_str().to_string(),
            args,
            ack_id: None,
        }
    }

    /// An event that expects an `Ack` frame carrying `ack_id`.
    pub fn request(event: EventName, args: Vec<Value>, ack_id: u64) -> Self {
        Frame::Event {
            event: event.as_str().to_string(),
            args,
            ack_id: Some(ack_id),
        }
    }

    /// The acknowledgment for request `ack_id`.
    pub fn ack(ack_id: u64, args: Vec<Value>) -> Self {
        Frame::Ack { ack_id, args }
    }
}

/// Encodes a frame as a JSON text message.
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedFrame`] if serialization fails, which
/// only happens for argument values serde_json cannot represent.
pub fn encode_frame(frame: &Frame) -> Result<String, ProtocolError> {
    serde_json::to_string(frame).map_err(|e| ProtocolError::MalformedFrame(e.to_string()))
}

/// Decodes one JSON text message into a frame.
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedFrame`] for invalid JSON, a missing or
/// unknown `"type"`, or missing required fields.
///
/// ```rust
/// use show_core::protocol::{decode_frame, Frame};
///
/// let frame = decode_frame(r#"{"type":"ack","ack_id":3,"args":[null,"ok"]}"#).unwrap();
/// assert!(matches!(frame, Frame::Ack { ack_id: 3, .. }));
/// ```
pub fn decode_frame(text: &str) -> Result<Frame, ProtocolError> {
    serde_json::from_str(text).map_err(|e| ProtocolError::MalformedFrame(e.to_string()))
}

/// Interprets node-style ack arguments `[error, data]`.
///
/// - `[null, data]` → `Ok(data)` decoded as `T`
/// - `[error, ...]` → [`AckError::Remote`] with a printable rendering of `error`
///
/// # Errors
///
/// Besides remote errors, returns [`ProtocolError::MissingAckData`] when the
/// data argument is absent and [`ProtocolError::UnexpectedAckData`] when it
/// cannot be decoded as `T`.
pub fn decode_ack<T: DeserializeOwned>(args: Vec<Value>) -> Result<T, AckError> {
    let mut args = args.into_iter();

    match args.next() {
        None | Some(Value::Null) => {}
        Some(error) => return Err(AckError::Remote(render_remote_error(&error))),
    }

    let data = args.next().ok_or(ProtocolError::MissingAckData)?;
    serde_json::from_value(data)
        .map_err(|e| AckError::Protocol(ProtocolError::UnexpectedAckData(e.to_string())))
}

/// Strings are used as-is, `{message: "..."}` objects yield their message,
/// anything else is printed as JSON.
fn render_remote_error(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        Value::Object(map) => match map.get("message") {
            Some(Value::String(message)) => message.clone(),
            _ => error.to_string(),
        },
        other => other.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
