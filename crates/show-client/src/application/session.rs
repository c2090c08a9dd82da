//! ClientSession: one connection, from connect to teardown.
//!
//! The session owns the channel handle and the inbound event queue.  It
//!
//! - starts the [`SceneNegotiator`] on the first `Connected` event,
//! - hands every `showMedia` push to its own [`MediaResponder`] task,
//! - ends when the maximum wait elapses or shutdown is requested, whichever
//!   comes first,
//! - fails on any transport error (disconnect, request timeout, send failure).
//!
//! Teardown never waits for pending acknowledgments: in-flight responder
//! tasks are aborted and show up as `abandoned` in the outcome.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use show_core::{EventName, MediaObjectId, SceneId};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, error, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use crate::application::channel::{ChannelError, ChannelEvent, EventChannel};
use crate::application::negotiate_scene::{NegotiationError, NegotiationState, SceneNegotiator};
use crate::application::present_media::{
    MediaResponder, MediaResponseError, MediaStatsSnapshot, PresentationPolicy,
};

/// Errors that end a session early.  All of them are transport failures.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The controller closed the connection, or the transport went away.
    #[error("controller disconnected: {0}")]
    Disconnected(String),

    #[error(transparent)]
    Transport(#[from] ChannelError),
}

/// Lifetime and presentation settings for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// The session ends after this long regardless of in-flight work.
    pub max_wait: Duration,
    pub policy: PresentationPolicy,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_wait: Duration::from_secs(20),
            policy: PresentationPolicy::default(),
        }
    }
}

/// Why a session that did not fail came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    MaxWaitElapsed,
    ShutdownRequested,
}

/// Summary of a session that ended normally.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    pub session_id: Uuid,
    pub ended_by: SessionEnd,
    pub negotiation: NegotiationState,
    pub media: MediaStatsSnapshot,
}

type NegotiationTask = JoinHandle<(SceneNegotiator, Result<SceneId, NegotiationError>)>;

/// A single controller connection and everything running on it.
pub struct ClientSession<C: ?Sized> {
    id: Uuid,
    channel: Arc<C>,
    events: mpsc::Receiver<ChannelEvent>,
    settings: SessionSettings,
}

impl<C> ClientSession<C>
where
    C: EventChannel + ?Sized + 'static,
{
    pub fn new(
        channel: Arc<C>,
        events: mpsc::Receiver<ChannelEvent>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel,
            events,
            settings,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Runs the session until it ends or fails.
    ///
    /// `shutdown` resolving is treated like the maximum wait elapsing.
    ///
    /// # Errors
    ///
    /// [`SessionError`] on any transport failure.  Negotiation failures and
    /// malformed pushes do not end the session.
    pub async fn run<F>(self, shutdown: F) -> Result<SessionOutcome, SessionError>
    where
        F: Future<Output = ()>,
    {
        let span = info_span!("session", id = %self.id);
        self.run_inner(shutdown).instrument(span).await
    }

    async fn run_inner<F>(mut self, shutdown: F) -> Result<SessionOutcome, SessionError>
    where
        F: Future<Output = ()>,
    {
        info!("session started (max wait {:?})", self.settings.max_wait);

        let deadline = tokio::time::sleep(self.settings.max_wait);
        tokio::pin!(deadline);
        tokio::pin!(shutdown);

        let responder = MediaResponder::new(Arc::clone(&self.channel), self.settings.policy);
        let mut negotiation: Option<NegotiationTask> = None;
        let mut negotiation_state = NegotiationState::Idle;
        let mut media: JoinSet<Result<MediaObjectId, MediaResponseError>> = JoinSet::new();

        let ended = loop {
            tokio::select! {
                _ = &mut deadline => {
                    info!("maximum wait elapsed");
                    break Ok(SessionEnd::MaxWaitElapsed);
                }
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break Ok(SessionEnd::ShutdownRequested);
                }
                joined = join_negotiation(&mut negotiation) => {
                    negotiation = None;
                    match joined {
                        Ok((negotiator, result)) => {
                            negotiation_state = negotiator.into_state();
                            match result {
                                Ok(scene_id) => info!("negotiation complete, scene {scene_id} playing"),
                                Err(NegotiationError::Transport(e)) => break Err(e.into()),
                                Err(e) => warn!("scene negotiation failed: {e}"),
                            }
                        }
                        Err(e) => {
                            error!("negotiation task failed: {e}");
                            negotiation_state = NegotiationState::Failed { reason: e.to_string() };
                        }
                    }
                }
                Some(joined) = media.join_next() => {
                    if let Some(err) = settle_media(joined) {
                        break Err(err.into());
                    }
                }
                event = self.events.recv() => match event {
                    Some(ChannelEvent::Connected) => {
                        if negotiation.is_some() || negotiation_state != NegotiationState::Idle {
                            debug!("already connected; negotiation not restarted");
                            continue;
                        }
                        info!("connected to controller");
                        negotiation_state = NegotiationState::AwaitingSceneList;
                        negotiation = Some(spawn_negotiation(Arc::clone(&self.channel)));
                    }
                    Some(ChannelEvent::Inbound { event: EventName::ShowMedia, args }) => {
                        let responder = responder.clone();
                        media.spawn(
                            async move { responder.on_show_media(args).await }
                                .instrument(Span::current()),
                        );
                    }
                    Some(ChannelEvent::Inbound { event, .. }) => {
                        debug!("ignoring inbound `{event}`");
                    }
                    Some(ChannelEvent::Disconnected { reason }) => {
                        let reason = reason.unwrap_or_else(|| "connection closed".to_string());
                        error!("controller disconnected: {reason}");
                        break Err(SessionError::Disconnected(reason));
                    }
                    None => {
                        break Err(SessionError::Disconnected("event queue closed".to_string()));
                    }
                },
            }
        };

        // Teardown: nothing pending is waited for.
        if let Some(task) = negotiation.take() {
            task.abort();
            negotiation_state = NegotiationState::Failed {
                reason: "session ended before negotiation completed".to_string(),
            };
        }
        media.abort_all();
        while media.join_next().await.is_some() {}

        let stats = responder.stats().snapshot();
        let ended_by = ended?;
        info!(
            "session ended ({ended_by:?}): {} acknowledged, {} malformed, {} abandoned",
            stats.acknowledged, stats.malformed, stats.abandoned
        );
        Ok(SessionOutcome {
            session_id: self.id,
            ended_by,
            negotiation: negotiation_state,
            media: stats,
        })
    }
}

fn spawn_negotiation<C>(channel: Arc<C>) -> NegotiationTask
where
    C: EventChannel + ?Sized + 'static,
{
    tokio::spawn(
        async move {
            let mut negotiator = SceneNegotiator::new();
            let result = negotiator.on_connected(channel.as_ref()).await;
            (negotiator, result)
        }
        .instrument(Span::current()),
    )
}

/// Resolves with the negotiation result, or never when none is running.
async fn join_negotiation<T>(task: &mut Option<JoinHandle<T>>) -> Result<T, JoinError> {
    match task {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

/// Returns the transport error that must end the session, if any.
fn settle_media(
    joined: Result<Result<MediaObjectId, MediaResponseError>, JoinError>,
) -> Option<ChannelError> {
    match joined {
        Ok(Ok(_)) | Ok(Err(MediaResponseError::Malformed(_))) => None,
        Ok(Err(MediaResponseError::Transport(e))) => Some(e),
        Err(e) => {
            if e.is_panic() {
                error!("media task panicked: {e}");
            }
            None
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
