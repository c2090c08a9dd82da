//! Recording event channel for unit and integration tests.
//!
//! `RecordingChannel` never touches a socket.  Every outbound call is pushed
//! into a `Mutex<Vec<...>>` together with the (Tokio) instant it happened, so
//! tests can assert on the exact order of emissions and on the gaps between
//! them.  Under `#[tokio::test(start_paused = true)]` those instants come from
//! the paused clock and are fully deterministic.
//!
//! Requests are answered from a per-event script:
//!
//! ```ignore
//! let channel = Arc::new(RecordingChannel::new());
//! channel.script(EventName::ListScenes, ScriptedAck::reply(json!([{"_id": "A"}])));
//! channel.script(EventName::LoadScene, ScriptedAck::reply(json!({"_id": "A"})));
//! ```
//!
//! A request with nothing scripted fails with [`ChannelError::Closed`].

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use show_core::EventName;
use tokio::time::Instant;

use crate::application::channel::{ChannelError, EventChannel};

/// How an outbound call was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmissionKind {
    Emit,
    Request,
}

/// One recorded outbound call.
#[derive(Debug, Clone)]
pub struct Emission {
    pub event: EventName,
    pub args: Vec<Value>,
    pub kind: EmissionKind,
    pub at: Instant,
}

impl Emission {
    /// The first argument as a string, which is how ids travel.
    pub fn first_arg(&self) -> Option<&str> {
        self.args.first().and_then(Value::as_str)
    }
}

/// Scripted answer to one request.
#[derive(Debug, Clone)]
pub enum ScriptedAck {
    /// Acknowledge with these arguments.
    Args(Vec<Value>),
    /// Fail as if the connection dropped.
    Closed,
    /// Fail as if the acknowledgment never arrived in time.
    Timeout,
    /// Never answer.
    Hang,
}

impl ScriptedAck {
    /// A successful `[null, data]` acknowledgment.
    pub fn reply(data: Value) -> Self {
        ScriptedAck::Args(vec![Value::Null, data])
    }

    /// An error-first `[error]` acknowledgment.
    pub fn error(message: &str) -> Self {
        ScriptedAck::Args(vec![Value::String(message.to_string())])
    }
}

/// An [`EventChannel`] that records instead of sending.
#[derive(Debug, Default)]
pub struct RecordingChannel {
    emissions: Mutex<Vec<Emission>>,
    scripts: Mutex<HashMap<EventName, VecDeque<ScriptedAck>>>,
    /// When set, every call fails with `ChannelError::Closed`.
    closed: AtomicBool,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the answer for the next `event` request.
    pub fn script(&self, event: EventName, ack: ScriptedAck) {
        self.scripts
            .lock()
            .unwrap()
            .entry(event)
            .or_default()
            .push_back(ack);
    }

    /// Makes every subsequent call fail as if the socket closed.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Everything recorded so far, in call order.
    pub fn emissions(&self) -> Vec<Emission> {
        self.emissions.lock().unwrap().clone()
    }

    /// Recorded calls for one event name, in call order.
    pub fn emissions_of(&self, event: EventName) -> Vec<Emission> {
        self.emissions
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.event == event)
            .cloned()
            .collect()
    }

    /// Event names in call order.
    pub fn event_names(&self) -> Vec<EventName> {
        self.emissions.lock().unwrap().iter().map(|e| e.event).collect()
    }

    /// The `(event, id)` pairs emitted for one media id, in call order.
    pub fn timeline_for(&self, id: &str) -> Vec<(EventName, Instant)> {
        self.emissions
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.first_arg() == Some(id))
            .map(|e| (e.event, e.at))
            .collect()
    }

    fn record(&self, event: EventName, args: Vec<Value>, kind: EmissionKind) {
        self.emissions.lock().unwrap().push(Emission {
            event,
            args,
            kind,
            at: Instant::now(),
        });
    }
}

#[async_trait]
impl EventChannel for RecordingChannel {
    async fn emit(&self, event: EventName, args: Vec<Value>) -> Result<(), ChannelError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ChannelError::Closed);
        }
        self.record(event, args, EmissionKind::Emit);
        Ok(())
    }

    async fn request(
        &self,
        event: EventName,
        args: Vec<Value>,
    ) -> Result<Vec<Value>, ChannelError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ChannelError::Closed);
        }
        self.record(event, args, EmissionKind::Request);

        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&event)
            .and_then(VecDeque::pop_front);
        match scripted {
            Some(ScriptedAck::Args(args)) => Ok(args),
            Some(ScriptedAck::Timeout) => Err(ChannelError::Timeout {
                event,
                timeout: Duration::from_secs(10),
            }),
            Some(ScriptedAck::Hang) => std::future::pending().await,
            Some(ScriptedAck::Closed) | None => Err(ChannelError::Closed),
        }
    }
}
