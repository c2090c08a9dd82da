//! MediaResponder: the acknowledgment protocol for `showMedia` pushes.
//!
//! For every valid push the controller must see, for that media id:
//!
//! ```text
//! mediaTransitioning(id) ── presentation interval ──▶ mediaDone(id)
//! ```
//!
//! A push whose media object has no usable payload is reported and skipped;
//! nothing is emitted for it.  The responder holds no per-event state: each
//! push runs in its own task, so waits for different ids overlap freely.
//!
//! Counters in [`MediaStats`] survive the tasks.  A task that is aborted (or
//! whose transport fails) between the two emissions is counted as abandoned.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use show_core::{EventName, MediaError, MediaObjectId, ShowEvent};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::channel::{ChannelError, EventChannel};

/// Why a `showMedia` push was not fully acknowledged.
#[derive(Debug, Error)]
pub enum MediaResponseError {
    /// The payload could not be decoded; nothing was emitted.
    #[error("malformed showMedia payload: {0}")]
    Malformed(#[from] MediaError),

    /// An emission failed.  The session treats this as fatal.
    #[error(transparent)]
    Transport(#[from] ChannelError),
}

/// How long media stays on screen before `mediaDone`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentationPolicy {
    /// Always non-zero.
    pub interval: Duration,
    /// Use the push's own `displayDuration` when it carries one.
    pub honor_display_duration: bool,
}

impl PresentationPolicy {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            honor_display_duration: false,
        }
    }

    /// The wait between `mediaTransitioning` and `mediaDone` for one push.
    pub fn interval_for(&self, event: &ShowEvent) -> Duration {
        match event.display_duration {
            Some(requested) if self.honor_display_duration => requested,
            _ => self.interval,
        }
    }
}

impl Default for PresentationPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

/// Shared counters, updated from every responder task.
#[derive(Debug, Default)]
pub struct MediaStats {
    received: AtomicU64,
    acknowledged: AtomicU64,
    malformed: AtomicU64,
    abandoned: AtomicU64,
    in_flight: AtomicU64,
}

/// A point-in-time copy of [`MediaStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediaStatsSnapshot {
    pub received: u64,
    pub acknowledged: u64,
    pub malformed: u64,
    pub abandoned: u64,
    pub in_flight: u64,
}

impl MediaStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MediaStatsSnapshot {
        MediaStatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            acknowledged: self.acknowledged.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
        }
    }
}

/// Marks one acknowledgment as pending until [`InFlight::complete`].
///
/// Dropped without completing means the acknowledgment was abandoned.
struct InFlight<'a> {
    stats: &'a MediaStats,
    id: MediaObjectId,
    completed: bool,
}

impl<'a> InFlight<'a> {
    fn enter(stats: &'a MediaStats, id: MediaObjectId) -> Self {
        stats.in_flight.fetch_add(1, Ordering::Relaxed);
        Self {
            stats,
            id,
            completed: false,
        }
    }

    fn complete(mut self) {
        self.completed = true;
        self.stats.acknowledged.fetch_add(1, Ordering::Relaxed);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.stats.in_flight.fetch_sub(1, Ordering::Relaxed);
        if !self.completed {
            self.stats.abandoned.fetch_add(1, Ordering::Relaxed);
            warn!("acknowledgment for media {} abandoned before mediaDone", self.id);
        }
    }
}

/// Answers `showMedia` pushes.  Cheap to clone; clones share the channel and
/// the counters.
pub struct MediaResponder<C: ?Sized> {
    channel: Arc<C>,
    policy: PresentationPolicy,
    stats: Arc<MediaStats>,
}

impl<C: ?Sized> Clone for MediaResponder<C> {
    fn clone(&self) -> Self {
        Self {
            channel: Arc::clone(&self.channel),
            policy: self.policy,
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<C: EventChannel + ?Sized> MediaResponder<C> {
    pub fn new(channel: Arc<C>, policy: PresentationPolicy) -> Self {
        Self {
            channel,
            policy,
            stats: Arc::new(MediaStats::new()),
        }
    }

    pub fn policy(&self) -> PresentationPolicy {
        self.policy
    }

    pub fn stats(&self) -> &Arc<MediaStats> {
        &self.stats
    }

    /// Handles the raw arguments of one `showMedia` push.
    ///
    /// Returns the acknowledged media id once `mediaDone` has been sent.
    ///
    /// # Errors
    ///
    /// [`MediaResponseError::Malformed`] when the payload is unusable (no
    /// emissions happen), [`MediaResponseError::Transport`] when the channel
    /// fails mid-sequence.
    pub async fn on_show_media(&self, args: Vec<Value>) -> Result<MediaObjectId, MediaResponseError> {
        self.stats.received.fetch_add(1, Ordering::Relaxed);
        let event = match ShowEvent::from_args(&args) {
            Ok(event) => event,
            Err(e) => {
                self.stats.malformed.fetch_add(1, Ordering::Relaxed);
                warn!("skipping showMedia: {e}");
                return Err(e.into());
            }
        };
        self.present(event).await
    }

    /// Runs the transitioning → wait → done sequence for a decoded push.
    pub async fn present(&self, event: ShowEvent) -> Result<MediaObjectId, MediaResponseError> {
        let id = event.media_object.id.clone();
        let interval = self.policy.interval_for(&event);
        let guard = InFlight::enter(&self.stats, id.clone());

        debug!(
            "presenting media {id} ({}) for {interval:?}",
            event.media_object.payload.field_name()
        );
        self.channel
            .emit(EventName::MediaTransitioning, vec![id_arg(&id)])
            .await?;

        tokio::time::sleep(interval).await;

        self.channel
            .emit(EventName::MediaDone, vec![id_arg(&id)])
            .await?;
        guard.complete();
        info!("media {id} done");
        Ok(id)
    }
}

fn id_arg(id: &MediaObjectId) -> Value {
    Value::String(id.as_str().to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
