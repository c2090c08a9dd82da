//! The event-channel seam between the use cases and the transport.
//!
//! The controller speaks in named events.  Outbound events are either
//! fire-and-forget ([`EventChannel::emit`]) or requests whose reply comes
//! back as an acknowledgment ([`EventChannel::request`]).  Inbound traffic
//! is not pulled through the trait: the transport pushes [`ChannelEvent`]s
//! onto an `mpsc` queue that the session drains.
//!
//! Implementations must serialise their own outbound writes so that two
//! emissions from the same task reach the controller in call order.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use show_core::{EventName, ProtocolError};
use thiserror::Error;

/// Transport-level failures.  All of them are fatal to the session.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The initial connection could not be established.
    #[error("failed to connect to controller at {url}: {reason}")]
    ConnectFailed { url: String, reason: String },

    /// The connection is gone; nothing more can be sent or received.
    #[error("connection to controller closed")]
    Closed,

    /// A request was not acknowledged in time.
    #[error("no acknowledgment for `{event}` within {timeout:?}")]
    Timeout { event: EventName, timeout: Duration },

    /// The underlying socket reported an error.
    #[error("transport error: {0}")]
    Transport(String),

    /// An outbound frame could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// What the transport reports to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// The connection is live.
    Connected,
    /// The controller pushed a named event.
    Inbound { event: EventName, args: Vec<Value> },
    /// The connection ended; `reason` is `None` for a clean close.
    Disconnected { reason: Option<String> },
}

/// Outbound half of the bidirectional named-event transport.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventChannel: Send + Sync {
    /// Sends an event without waiting for any reply.
    async fn emit(&self, event: EventName, args: Vec<Value>) -> Result<(), ChannelError>;

    /// Sends an event and waits for its acknowledgment arguments.
    async fn request(&self, event: EventName, args: Vec<Value>)
        -> Result<Vec<Value>, ChannelError>;
}
