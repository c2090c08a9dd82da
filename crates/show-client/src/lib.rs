//! show-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/` and
//! the binary entry point in `main.rs` share the same module tree.
//!
//! # What does show-client do?
//!
//! A show controller sequences media across several playback nodes.  This
//! crate is the node side of that conversation:
//!
//! 1. Connects to the controller over a bidirectional named-event channel.
//! 2. Runs the one-time scene negotiation: `listScenes`, pick the first
//!    scene, `loadScene`, then `playScene`.
//! 3. Answers every `showMedia` push with `mediaTransitioning`, a
//!    presentation interval, and `mediaDone`, for the rest of the session.
//! 4. Ends the session when the maximum wait elapses, on Ctrl+C, or when the
//!    controller connection fails.
//!
//! # Layers
//!
//! ```text
//! application/     SceneNegotiator, MediaResponder, ClientSession,
//!                  and the EventChannel trait they talk through
//! infrastructure/  WebSocket event channel, recording channel for tests,
//!                  configuration loading
//! ```

/// Application layer: negotiation, media acknowledgment, session lifetime.
pub mod application;

/// Infrastructure layer: transport adapter and configuration.
pub mod infrastructure;
