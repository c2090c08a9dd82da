//! Application layer for the playback client.
//!
//! # Use cases
//!
//! - **`negotiate_scene`** – The one-time startup handshake that discovers
//!   and activates a scene.
//!
//! - **`present_media`** – The acknowledgment protocol run for every
//!   `showMedia` push.
//!
//! - **`session`** – Composes the two over a single connection and bounds
//!   its lifetime.
//!
//! All three talk to the controller exclusively through the
//! [`channel::EventChannel`] trait, which the infrastructure layer implements
//! over a WebSocket.  Nothing in this layer opens a socket.

pub mod channel;
pub mod negotiate_scene;
pub mod present_media;
pub mod session;

pub use channel::{ChannelError, ChannelEvent, EventChannel};
pub use negotiate_scene::{NegotiationError, NegotiationState, SceneNegotiator};
pub use present_media::{
    MediaResponder, MediaResponseError, MediaStats, MediaStatsSnapshot, PresentationPolicy,
};
pub use session::{ClientSession, SessionEnd, SessionError, SessionOutcome, SessionSettings};
