//! SceneNegotiator: the one-time startup handshake.
//!
//! Right after the connection comes up the client must activate exactly one
//! scene:
//!
//! ```text
//! Idle ──listScenes──▶ AwaitingSceneList ──loadScene(first)──▶ AwaitingSceneLoad
//!                             │                                      │
//!                             ▼ error / empty                        ▼ ack ok
//!                           Failed ◀──────────── error ──────── Negotiated (playScene sent)
//! ```
//!
//! Both terminal states are final.  A negotiator runs at most once; asking it
//! to run again yields [`NegotiationError::AlreadyRan`] without sending
//! anything.  There are no retries: the protocol defines none for these
//! requests.

use serde_json::Value;
use show_core::{decode_ack, AckError, EventName, ProtocolError, Scene, SceneId};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::channel::{ChannelError, EventChannel};

/// Why negotiation stopped short of `Negotiated`.
#[derive(Debug, Error)]
pub enum NegotiationError {
    /// The controller answered `listScenes` with an error.
    #[error("listScenes failed: {0}")]
    ListFailed(String),

    /// The controller knows no scenes.
    #[error("no scenes available")]
    NoScenes,

    /// The controller answered `loadScene` with an error.
    #[error("loadScene({scene_id}) failed: {reason}")]
    LoadFailed { scene_id: SceneId, reason: String },

    /// An ack arrived but its data could not be interpreted.
    #[error("invalid `{event}` response: {source}")]
    InvalidResponse {
        event: EventName,
        #[source]
        source: ProtocolError,
    },

    /// Negotiation already ran on this connection.
    #[error("negotiation already ran for this session")]
    AlreadyRan,

    /// The transport failed underneath the handshake.
    #[error(transparent)]
    Transport(#[from] ChannelError),
}

impl NegotiationError {
    /// Transport failures end the session; everything else only ends the
    /// negotiation.
    pub fn is_fatal(&self) -> bool {
        matches!(self, NegotiationError::Transport(_))
    }
}

/// Where the handshake currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationState {
    Idle,
    AwaitingSceneList,
    AwaitingSceneLoad { scene_id: SceneId },
    Negotiated { scene_id: SceneId },
    Failed { reason: String },
}

impl NegotiationState {
    /// `true` once the handshake has succeeded or failed for good.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NegotiationState::Negotiated { .. } | NegotiationState::Failed { .. }
        )
    }
}

/// Drives `listScenes` → `loadScene` → `playScene` once per connection.
#[derive(Debug)]
pub struct SceneNegotiator {
    state: NegotiationState,
}

impl SceneNegotiator {
    pub fn new() -> Self {
        Self {
            state: NegotiationState::Idle,
        }
    }

    pub fn state(&self) -> &NegotiationState {
        &self.state
    }

    pub fn into_state(self) -> NegotiationState {
        self.state
    }

    /// Runs the handshake.  Call when the channel reports it is connected.
    ///
    /// Returns the id of the scene that was told to play.
    ///
    /// # Errors
    ///
    /// Any [`NegotiationError`]; the negotiator is then in
    /// [`NegotiationState::Failed`] (or unchanged, for `AlreadyRan`).
    pub async fn on_connected<C>(&mut self, channel: &C) -> Result<SceneId, NegotiationError>
    where
        C: EventChannel + ?Sized,
    {
        if self.state != NegotiationState::Idle {
            warn!("negotiation requested again in state {:?}; ignoring", self.state);
            return Err(NegotiationError::AlreadyRan);
        }

        let result = self.negotiate(channel).await;
        self.state = match &result {
            Ok(scene_id) => NegotiationState::Negotiated {
                scene_id: scene_id.clone(),
            },
            Err(e) => NegotiationState::Failed {
                reason: e.to_string(),
            },
        };
        result
    }

    async fn negotiate<C>(&mut self, channel: &C) -> Result<SceneId, NegotiationError>
    where
        C: EventChannel + ?Sized,
    {
        self.state = NegotiationState::AwaitingSceneList;
        debug!("requesting scene list");
        let ack = channel.request(EventName::ListScenes, Vec::new()).await?;
        let selected = Self::on_scenes_listed(decode_ack::<Vec<Scene>>(ack))?;

        info!("selected scene {} ({})", selected.id, selected.label());
        self.state = NegotiationState::AwaitingSceneLoad {
            scene_id: selected.id.clone(),
        };
        let ack = channel
            .request(EventName::LoadScene, vec![scene_id_arg(&selected.id)])
            .await?;
        let loaded = Self::on_scene_loaded(&selected.id, decode_ack::<Scene>(ack))?;

        // Fire-and-forget: the controller is trusted to start playback.
        channel
            .emit(EventName::PlayScene, vec![scene_id_arg(&loaded.id)])
            .await?;
        info!("scene {} loaded; playScene sent", loaded.id);
        Ok(loaded.id)
    }

    /// Handles the `listScenes` ack.  The first scene is always selected.
    fn on_scenes_listed(listed: Result<Vec<Scene>, AckError>) -> Result<Scene, NegotiationError> {
        let scenes = match listed {
            Ok(scenes) => scenes,
            Err(AckError::Remote(reason)) => return Err(NegotiationError::ListFailed(reason)),
            Err(AckError::Protocol(source)) => {
                return Err(NegotiationError::InvalidResponse {
                    event: EventName::ListScenes,
                    source,
                })
            }
        };
        debug!("controller listed {} scene(s)", scenes.len());
        scenes.into_iter().next().ok_or(NegotiationError::NoScenes)
    }

    /// Handles the `loadScene` ack.
    fn on_scene_loaded(
        requested: &SceneId,
        loaded: Result<Scene, AckError>,
    ) -> Result<Scene, NegotiationError> {
        match loaded {
            Ok(scene) => {
                if &scene.id != requested {
                    warn!("asked to load scene {requested} but controller loaded {}", scene.id);
                }
                Ok(scene)
            }
            Err(AckError::Remote(reason)) => Err(NegotiationError::LoadFailed {
                scene_id: requested.clone(),
                reason,
            }),
            Err(AckError::Protocol(source)) => Err(NegotiationError::InvalidResponse {
                event: EventName::LoadScene,
                source,
            }),
        }
    }
}

impl Default for SceneNegotiator {
    fn default() -> Self {
        Self::new()
    }
}

fn scene_id_arg(id: &SceneId) -> Value {
    Value::String(id.as_str().to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::channel::MockEventChannel;
    use mockall::{predicate::eq, Sequence};
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    /// Expects `listScenes` once and answers with `ack`.
    fn expect_list(mock: &mut MockEventChannel, seq: &mut Sequence, ack: Vec<Value>) {
        mock.expect_request()
            .withf(|event, args| *event == EventName::ListScenes && args.is_empty())
            .times(1)
            .in_sequence(seq)
            .return_once(move |_, _| Ok(ack));
    }

    #[tokio::test]
    async fn test_first_scene_is_loaded_then_played() {
        // Arrange
        let mut mock = MockEventChannel::new();
        let mut seq = Sequence::new();
        expect_list(
            &mut mock,
            &mut seq,
            vec![Value::Null, json!([{"_id": "A"}, {"_id": "B"}])],
        );
        mock.expect_request()
            .with(eq(EventName::LoadScene), eq(vec![json!("A")]))
            .times(1)
            .in_sequence(&mut seq)
            .return_once(|_, _| Ok(vec![Value::Null, json!({"_id": "A"})]));
        mock.expect_emit()
            .with(eq(EventName::PlayScene), eq(vec![json!("A")]))
            .times(1)
            .in_sequence(&mut seq)
            .return_once(|_, _| Ok(()));
        let mut negotiator = SceneNegotiator::new();

        // Act
        let result = negotiator.on_connected(&mock).await;

        // Assert
        let scene_id = assert_ok!(result);
        assert_eq!(scene_id, SceneId::new("A"));
        assert_eq!(
            negotiator.state(),
            &NegotiationState::Negotiated {
                scene_id: "A".into()
            }
        );
    }

    #[tokio::test]
    async fn test_single_scene_list_selects_that_scene() {
        let mut mock = MockEventChannel::new();
        let mut seq = Sequence::new();
        expect_list(&mut mock, &mut seq, vec![Value::Null, json!([{"id": "only"}])]);
        mock.expect_request()
            .with(eq(EventName::LoadScene), eq(vec![json!("only")]))
            .times(1)
            .return_once(|_, _| Ok(vec![Value::Null, json!({"_id": "only"})]));
        mock.expect_emit().times(1).return_once(|_, _| Ok(()));

        let result = SceneNegotiator::new().on_connected(&mock).await;

        assert_eq!(result.unwrap().as_str(), "only");
    }

    #[tokio::test]
    async fn test_empty_scene_list_fails_without_loading() {
        // Arrange
        let mut mock = MockEventChannel::new();
        let mut seq = Sequence::new();
        expect_list(&mut mock, &mut seq, vec![Value::Null, json!([])]);
        mock.expect_request()
            .with(eq(EventName::LoadScene), mockall::predicate::always())
            .never();
        mock.expect_emit().never();
        let mut negotiator = SceneNegotiator::new();

        // Act
        let result = negotiator.on_connected(&mock).await;

        // Assert
        assert!(matches!(result, Err(NegotiationError::NoScenes)));
        assert_eq!(
            negotiator.state(),
            &NegotiationState::Failed {
                reason: "no scenes available".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_list_error_halts_negotiation() {
        let mut mock = MockEventChannel::new();
        let mut seq = Sequence::new();
        expect_list(&mut mock, &mut seq, vec![json!("hub unreachable")]);
        mock.expect_emit().never();

        let mut negotiator = SceneNegotiator::new();
        let result = negotiator.on_connected(&mock).await;

        match result {
            Err(NegotiationError::ListFailed(reason)) => assert_eq!(reason, "hub unreachable"),
            other => panic!("expected ListFailed, got {other:?}"),
        }
        assert!(negotiator.state().is_terminal());
    }

    #[tokio::test]
    async fn test_malformed_scene_list_is_invalid_response() {
        let mut mock = MockEventChannel::new();
        let mut seq = Sequence::new();
        expect_list(&mut mock, &mut seq, vec![Value::Null, json!({"not": "a list"})]);

        let result = SceneNegotiator::new().on_connected(&mock).await;

        assert!(matches!(
            result,
            Err(NegotiationError::InvalidResponse {
                event: EventName::ListScenes,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_load_error_halts_without_play() {
        // Arrange
        let mut mock = MockEventChannel::new();
        let mut seq = Sequence::new();
        expect_list(&mut mock, &mut seq, vec![Value::Null, json!([{"_id": "A"}])]);
        mock.expect_request()
            .with(eq(EventName::LoadScene), eq(vec![json!("A")]))
            .times(1)
            .return_once(|_, _| Ok(vec![json!({"message": "scene locked"})]));
        mock.expect_emit().never();
        let mut negotiator = SceneNegotiator::new();

        // Act
        let result = negotiator.on_connected(&mock).await;

        // Assert
        match result {
            Err(NegotiationError::LoadFailed { scene_id, reason }) => {
                assert_eq!(scene_id.as_str(), "A");
                assert_eq!(reason, "scene locked");
            }
            other => panic!("expected LoadFailed, got {other:?}"),
        }
        assert!(matches!(negotiator.state(), NegotiationState::Failed { .. }));
    }

    #[tokio::test]
    async fn test_play_uses_id_from_load_ack() {
        let mut mock = MockEventChannel::new();
        let mut seq = Sequence::new();
        expect_list(&mut mock, &mut seq, vec![Value::Null, json!([{"_id": "A"}])]);
        mock.expect_request()
            .with(eq(EventName::LoadScene), eq(vec![json!("A")]))
            .return_once(|_, _| Ok(vec![Value::Null, json!({"_id": "A-loaded"})]));
        mock.expect_emit()
            .with(eq(EventName::PlayScene), eq(vec![json!("A-loaded")]))
            .times(1)
            .return_once(|_, _| Ok(()));

        let result = SceneNegotiator::new().on_connected(&mock).await;

        assert_eq!(result.unwrap().as_str(), "A-loaded");
    }

    #[tokio::test]
    async fn test_transport_failure_is_fatal() {
        let mut mock = MockEventChannel::new();
        mock.expect_request()
            .return_once(|_, _| Err(ChannelError::Closed));

        let result = SceneNegotiator::new().on_connected(&mock).await;

        let err = assert_err!(result);
        assert!(err.is_fatal());
        assert!(!NegotiationError::NoScenes.is_fatal());
    }

    #[tokio::test]
    async fn test_second_run_is_rejected_without_emitting() {
        // Arrange: a first, successful run
        let mut mock = MockEventChannel::new();
        let mut seq = Sequence::new();
        expect_list(&mut mock, &mut seq, vec![Value::Null, json!([{"_id": "A"}])]);
        mock.expect_request()
            .with(eq(EventName::LoadScene), eq(vec![json!("A")]))
            .times(1)
            .return_once(|_, _| Ok(vec![Value::Null, json!({"_id": "A"})]));
        mock.expect_emit().times(1).return_once(|_, _| Ok(()));
        let mut negotiator = SceneNegotiator::new();
        negotiator.on_connected(&mock).await.unwrap();

        // Act: the `times(1)` expectations above fail the test if anything is sent again
        let second = negotiator.on_connected(&mock).await;

        // Assert
        assert!(matches!(second, Err(NegotiationError::AlreadyRan)));
        assert_eq!(
            negotiator.into_state(),
            NegotiationState::Negotiated {
                scene_id: "A".into()
            }
        );
    }
}
