//! WebSocket implementation of [`EventChannel`].
//!
//! # Connection lifecycle
//!
//! ```text
//! connect_async(url)
//!      │
//!      ├── writer task:  mpsc<String> ──▶ WebSocket sink      (single ordered writer)
//!      │
//!      └── reader task:  WebSocket stream ──▶ Ack frames   → pending request
//!                                         └─▶ Event frames → ChannelEvent queue
//! ```
//!
//! Every outbound frame goes through one queue and one writer, so two emits
//! from the same task reach the controller in call order.  Requests register
//! a `oneshot` under a fresh ack id before the frame is queued; the reader
//! completes it when the matching `Ack` frame arrives.
//!
//! When the socket ends the reader marks the channel closed, drops every
//! pending request (their callers see [`ChannelError::Closed`]) and pushes a
//! final [`ChannelEvent::Disconnected`].  There is no reconnection.

pub mod mock;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde_json::Value;
use show_core::protocol::Direction;
use show_core::{decode_frame, encode_frame, EventName, Frame};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, info, warn};

use crate::application::channel::{ChannelError, ChannelEvent, EventChannel};

/// Outstanding requests keyed by ack id.
type PendingAcks = Arc<Mutex<HashMap<u64, oneshot::Sender<Vec<Value>>>>>;

const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Connection parameters for [`WsEventChannel::connect`].
#[derive(Debug, Clone)]
pub struct WsChannelConfig {
    /// `ws://` URL of the controller.
    pub url: String,
    /// How long a request may wait for its `Ack` frame.
    pub request_timeout: Duration,
    /// Capacity of the outbound and inbound queues.
    pub queue_capacity: usize,
}

impl WsChannelConfig {
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            request_timeout,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Named-event channel over a single WebSocket connection.
pub struct WsEventChannel {
    outbound: mpsc::Sender<String>,
    pending: PendingAcks,
    closed: Arc<AtomicBool>,
    /// Only unique among the requests in flight on this connection.
    next_ack_id: AtomicU64,
    request_timeout: Duration,
}

impl WsEventChannel {
    /// Opens the WebSocket and starts the reader and writer tasks.
    ///
    /// The returned queue already holds [`ChannelEvent::Connected`].
    ///
    /// # Errors
    ///
    /// [`ChannelError::ConnectFailed`] if the URL is invalid or the handshake
    /// fails.
    pub async fn connect(
        config: WsChannelConfig,
    ) -> Result<(Self, mpsc::Receiver<ChannelEvent>), ChannelError> {
        let (ws_stream, _response) =
            connect_async(config.url.as_str())
                .await
                .map_err(|e| ChannelError::ConnectFailed {
                    url: config.url.clone(),
                    reason: e.to_string(),
                })?;
        info!("connected to controller at {}", config.url);

        let capacity = config.queue_capacity.max(1);
        let (ws_tx, ws_rx) = ws_stream.split();
        let (frame_tx, frame_rx) = mpsc::channel::<String>(capacity);
        let (event_tx, event_rx) = mpsc::channel::<ChannelEvent>(capacity);
        let pending: PendingAcks = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));

        event_tx
            .send(ChannelEvent::Connected)
            .await
            .map_err(|_| ChannelError::Closed)?;

        tokio::spawn(write_frames(ws_tx, frame_rx));
        tokio::spawn(read_frames(
            ws_rx,
            Arc::clone(&pending),
            Arc::clone(&closed),
            event_tx,
        ));

        let channel = Self {
            outbound: frame_tx,
            pending,
            closed,
            next_ack_id: AtomicU64::new(0),
            request_timeout: config.request_timeout,
        };
        Ok((channel, event_rx))
    }

    async fn send_frame(&self, frame: &Frame) -> Result<(), ChannelError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ChannelError::Closed);
        }
        let text = encode_frame(frame)?;
        self.outbound
            .send(text)
            .await
            .map_err(|_| ChannelError::Closed)
    }
}

#[async_trait]
impl EventChannel for WsEventChannel {
    async fn emit(&self, event: EventName, args: Vec<Value>) -> Result<(), ChannelError> {
        debug!("emit `{event}` {args:?}");
        self.send_frame(&Frame::event(event, args)).await
    }

    async fn request(
        &self,
        event: EventName,
        args: Vec<Value>,
    ) -> Result<Vec<Value>, ChannelError> {
        let ack_id = self.next_ack_id.fetch_add(1, Ordering::Relaxed);
        let (ack_tx, ack_rx) = oneshot::channel();
        {
            // Checked under the lock so a concurrent close cannot strand us.
            let mut pending = self.pending.lock().await;
            if self.closed.load(Ordering::SeqCst) {
                return Err(ChannelError::Closed);
            }
            pending.insert(ack_id, ack_tx);
        }

        debug!("request `{event}` (ack {ack_id}) {args:?}");
        if let Err(e) = self.send_frame(&Frame::request(event, args, ack_id)).await {
            self.pending.lock().await.remove(&ack_id);
            return Err(e);
        }

        match tokio::time::timeout(self.request_timeout, ack_rx).await {
            Ok(Ok(args)) => Ok(args),
            Ok(Err(_)) => Err(ChannelError::Closed),
            Err(_) => {
                self.pending.lock().await.remove(&ack_id);
                warn!("`{event}` (ack {ack_id}) unanswered after {:?}", self.request_timeout);
                Err(ChannelError::Timeout {
                    event,
                    timeout: self.request_timeout,
                })
            }
        }
    }
}

// ── Socket tasks ──────────────────────────────────────────────────────────────

/// Drains the outbound queue into the socket until either side closes.
async fn write_frames<S>(mut sink: S, mut frames: mpsc::Receiver<String>)
where
    S: Sink<WsMessage, Error = WsError> + Unpin,
{
    while let Some(text) = frames.recv().await {
        if let Err(e) = sink.send(WsMessage::Text(text)).await {
            warn!("controller write failed: {e}");
            break;
        }
    }
    let _ = sink.close().await;
    debug!("writer task finished");
}

/// Reads frames until the socket ends, then reports the disconnect.
async fn read_frames<S>(
    mut stream: S,
    pending: PendingAcks,
    closed: Arc<AtomicBool>,
    events: mpsc::Sender<ChannelEvent>,
) where
    S: Stream<Item = Result<WsMessage, WsError>> + Unpin,
{
    let reason = loop {
        match stream.next().await {
            Some(Ok(WsMessage::Text(text))) => {
                if !dispatch_frame(&text, &pending, &events).await {
                    // Nobody is listening any more.
                    break None;
                }
            }
            Some(Ok(WsMessage::Close(frame))) => {
                break frame
                    .map(|f| f.reason.to_string())
                    .filter(|reason| !reason.is_empty());
            }
            Some(Ok(WsMessage::Binary(_))) => debug!("ignoring binary frame"),
            Some(Ok(_)) => {}
            Some(Err(e)) => break Some(e.to_string()),
            None => break None,
        }
    };

    {
        let mut pending = pending.lock().await;
        closed.store(true, Ordering::SeqCst);
        pending.clear();
    }
    info!("controller connection closed");
    let _ = events.send(ChannelEvent::Disconnected { reason }).await;
}

/// Routes one text frame.  Returns `false` once the event queue is gone.
async fn dispatch_frame(
    text: &str,
    pending: &PendingAcks,
    events: &mpsc::Sender<ChannelEvent>,
) -> bool {
    match decode_frame(text) {
        Ok(Frame::Ack { ack_id, args }) => {
            match pending.lock().await.remove(&ack_id) {
                Some(waiter) => {
                    let _ = waiter.send(args);
                }
                None => warn!("ack {ack_id} matches no pending request"),
            }
            true
        }
        Ok(Frame::Event { event, args, ack_id }) => {
            if ack_id.is_some() {
                warn!("controller asked for an ack on `{event}`; ignoring event");
                return true;
            }
            match EventName::parse(&event) {
                Some(name) if name.direction() == Direction::Inbound => events
                    .send(ChannelEvent::Inbound { event: name, args })
                    .await
                    .is_ok(),
                Some(name) => {
                    warn!("controller sent client-only event `{name}`; ignoring");
                    true
                }
                None => {
                    debug!("ignoring unknown event `{event}`");
                    true
                }
            }
        }
        Err(e) => {
            warn!("ignoring undecodable frame: {e}");
            true
        }
    }
}
