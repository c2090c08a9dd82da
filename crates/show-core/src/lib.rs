//! # show-core
//!
//! Shared library for the show-control playback client containing the
//! domain entities (scenes, media objects, show events) and the JSON event
//! frame codec spoken with the controller.
//!
//! It has zero dependencies on sockets, async runtimes, or timers, so every
//! type here can be unit-tested without a network.
//!
//! # Architecture overview
//!
//! A *controller* sequences a show across several *playback nodes*.  Each
//! node connects to the controller, picks a scene to activate, and from then
//! on receives `showMedia` pushes that it must acknowledge with a
//! `mediaTransitioning` / `mediaDone` pair.
//!
//! - **`domain`** – What the controller talks about: [`Scene`],
//!   [`MediaObject`] with its [`MediaPayload`] sum type, and [`ShowEvent`].
//!
//! - **`protocol`** – How those things travel: named events ([`EventName`]),
//!   the tagged JSON [`Frame`] envelope, acknowledgment decoding, and the
//!   acknowledgment id counter.

pub mod domain;
pub mod protocol;

pub use domain::media::{MediaError, MediaObject, MediaObjectId, MediaPayload, ShowEvent};
pub use domain::scene::{Scene, SceneId};
pub use protocol::codec::{decode_ack, decode_frame, encode_frame, AckError, Frame, ProtocolError};
pub use protocol::events::EventName;
