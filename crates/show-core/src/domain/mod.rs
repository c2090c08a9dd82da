//! Domain entities for the show-control client.
//!
//! Everything in this module is plain data plus validation.  There is no I/O
//! and nothing here knows that a WebSocket exists.  The controller owns all
//! of these entities; the client only ever references them by id and never
//! mutates them.
//!
//! # Identifier keys on the wire
//!
//! The controller stores scenes and media objects in a document database and
//! serialises their ids under the key `_id`.  Every id field in this module
//! is written as `_id` and accepted as either `_id` or `id`.

/// Scenes: named configurations of media, referenced by id.
pub mod scene;

/// Media objects, their payload sum type, and the `showMedia` event wrapper.
pub mod media;
