//! Media objects and the `showMedia` event.
//!
//! A [`MediaObject`] is one presentable unit of content.  Its content is
//! *either* a resource locator *or* literal text, never both and never
//! neither.  That rule is encoded in the type system with the
//! [`MediaPayload`] sum type: once a `MediaObject` exists, it is valid.
//!
//! # Decoding
//!
//! The controller sends media objects as loose JSON documents:
//!
//! ```json
//! {"_id":"m1","type":"video","url":"http://media.local/intro.mp4"}
//! {"_id":"m2","type":"text","text":"Welcome!"}
//! ```
//!
//! Decoding goes through a private raw form that records which keys were
//! present, then [`TryFrom`] decides which payload variant applies.  Anything
//! that does not fit exactly one variant is a [`MediaError`], reported by the
//! caller as a malformed payload.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Opaque media object identifier, unique within a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaObjectId(String);

impl MediaObjectId {
    /// Wraps a controller-assigned identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MediaObjectId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Reasons a `showMedia` payload cannot be turned into a [`ShowEvent`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MediaError {
    /// The event carried no `mediaObject` field (or no argument at all).
    #[error("showMedia event carries no `mediaObject`")]
    MissingMediaObject,

    /// The media object has no id, or an empty one.
    #[error("media object has no `_id`")]
    MissingId,

    /// Neither `url` nor `text` is present.
    #[error("media object {0} has neither `url` nor `text`")]
    MissingPayload(MediaObjectId),

    /// Both `url` and `text` are present, so the payload kind is ambiguous.
    #[error("media object {0} has both `url` and `text`")]
    AmbiguousPayload(MediaObjectId),

    /// The payload field is present but empty.
    #[error("media object {id} has an empty `{field}`")]
    EmptyPayload {
        id: MediaObjectId,
        field: &'static str,
    },

    /// The JSON did not have the expected shape (wrong types, not an object…).
    #[error("undecodable showMedia payload: {0}")]
    Undecodable(String),
}

/// The content of a media object: exactly one of a locator or literal text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaPayload {
    /// A playable resource locator (audio, video, image…).
    Url(String),
    /// Literal content to display.
    Text(String),
}

impl MediaPayload {
    /// The wire key this payload is carried under.
    pub fn field_name(&self) -> &'static str {
        match self {
            MediaPayload::Url(_) => "url",
            MediaPayload::Text(_) => "text",
        }
    }

    /// The locator or the literal text.
    pub fn as_str(&self) -> &str {
        match self {
            MediaPayload::Url(s) | MediaPayload::Text(s) => s,
        }
    }
}

/// A single presentable unit of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMediaObject", into = "RawMediaObject")]
pub struct MediaObject {
    pub id: MediaObjectId,
    pub payload: MediaPayload,
    /// Controller-side media type tag (`video`, `audio`, `text`, `image`…).
    pub kind: Option<String>,
}

impl MediaObject {
    /// Creates a media object that points at a resource locator.
    pub fn url(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: MediaObjectId::new(id),
            payload: MediaPayload::Url(url.into()),
            kind: None,
        }
    }

    /// Creates a media object that carries literal text.
    pub fn text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: MediaObjectId::new(id),
            payload: MediaPayload::Text(text.into()),
            kind: None,
        }
    }
}

/// Wire shape of a media object before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawMediaObject {
    #[serde(rename = "_id", alias = "id", default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
}

impl TryFrom<RawMediaObject> for MediaObject {
    type Error = MediaError;

    fn try_from(raw: RawMediaObject) -> Result<Self, Self::Error> {
        let id = match raw.id {
            Some(id) if !id.is_empty() => MediaObjectId::new(id),
            _ => return Err(MediaError::MissingId),
        };

        let payload = match (raw.url, raw.text) {
            (Some(url), None) => MediaPayload::Url(url),
            (None, Some(text)) => MediaPayload::Text(text),
            (Some(_), Some(_)) => return Err(MediaError::AmbiguousPayload(id)),
            (None, None) => return Err(MediaError::MissingPayload(id)),
        };

        if payload.as_str().is_empty() {
            return Err(MediaError::EmptyPayload {
                id,
                field: payload.field_name(),
            });
        }

        Ok(Self {
            id,
            payload,
            kind: raw.kind,
        })
    }
}

impl From<MediaObject> for RawMediaObject {
    fn from(mo: MediaObject) -> Self {
        let (url, text) = match mo.payload {
            MediaPayload::Url(url) => (Some(url), None),
            MediaPayload::Text(text) => (None, Some(text)),
        };
        Self {
            id: Some(mo.id.0),
            url,
            text,
            kind: mo.kind,
        }
    }
}

/// Wire shape of a `showMedia` argument before validation.
#[derive(Debug, Deserialize)]
struct RawShowEvent {
    #[serde(rename = "mediaObject", default)]
    media_object: Option<RawMediaObject>,
    #[serde(flatten)]
    metadata: Map<String, Value>,
}

/// An inbound `showMedia` push: one media object plus presentation metadata.
///
/// Transient: built from the event arguments, handed to the responder, and
/// dropped once the acknowledgment sequence is done.
#[derive(Debug, Clone, PartialEq)]
pub struct ShowEvent {
    pub media_object: MediaObject,
    /// How long the controller would like the media shown, when it says so.
    pub display_duration: Option<Duration>,
    /// Any other fields the controller attached.
    pub metadata: Map<String, Value>,
}

impl ShowEvent {
    /// Wraps a media object with no metadata.
    pub fn new(media_object: MediaObject) -> Self {
        Self {
            media_object,
            display_duration: None,
            metadata: Map::new(),
        }
    }

    /// Decodes the argument list of a `showMedia` event.
    ///
    /// Only the first argument is inspected.  `displayDuration` is read as
    /// milliseconds.  It is advisory: a value that is not a positive number
    /// representable as a `Duration` is dropped, never rejected.
    ///
    /// # Errors
    ///
    /// Returns a [`MediaError`] when the argument is missing, is not shaped
    /// like a show event, or wraps an invalid media object.
    pub fn from_args(args: &[Value]) -> Result<Self, MediaError> {
        let first = args.first().ok_or(MediaError::MissingMediaObject)?;
        let raw: RawShowEvent = serde_json::from_value(first.clone())
            .map_err(|e| MediaError::Undecodable(e.to_string()))?;

        let media_object = MediaObject::try_from(
            raw.media_object.ok_or(MediaError::MissingMediaObject)?,
        )?;

        let mut metadata = raw.metadata;
        let display_duration = metadata
            .remove("displayDuration")
            .as_ref()
            .and_then(display_duration_from_millis);

        Ok(Self {
            media_object,
            display_duration,
            metadata,
        })
    }
}

fn display_duration_from_millis(value: &Value) -> Option<Duration> {
    let millis = value.as_f64().filter(|ms| *ms > 0.0)?;
    Duration::try_from_secs_f64(millis / 1000.0).ok()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
