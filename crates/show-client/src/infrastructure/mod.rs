//! Infrastructure layer for the playback client.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `show_core`, but MUST NOT be imported by the `application` layer outside
//! of tests.
//!
//! # Sub-modules
//!
//! - **`network`** – `WsEventChannel`, the WebSocket implementation of
//!   `EventChannel`, plus `RecordingChannel` for tests.
//!
//! - **`config`** – `ClientConfig` defaults, TOML loading and validation.

pub mod config;
pub mod network;
