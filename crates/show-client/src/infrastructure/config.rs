//! Client configuration: defaults, optional TOML file, validation.
//!
//! Every field has a default, so a missing file or a partial one both work:
//!
//! ```toml
//! log_level = "debug"
//!
//! [controller]
//! host = "10.0.0.5"
//! port = 7000
//! path = "/"
//! request_timeout_secs = 10
//!
//! [session]
//! max_wait_secs = 20
//! presentation_interval_ms = 1000
//! honor_display_duration = false
//! ```
//!
//! Command-line flags are layered on top of this by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::{PresentationPolicy, SessionSettings};

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Where the controller listens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControllerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// WebSocket path, e.g. `/` or `/show`.
    #[serde(default = "default_path")]
    pub path: String,
    /// How long a `listScenes`/`loadScene` request may go unanswered.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Session lifetime and media presentation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
    #[serde(default = "default_presentation_interval_ms")]
    pub presentation_interval_ms: u64,
    /// Let a push's `displayDuration` replace the presentation interval.
    #[serde(default)]
    pub honor_display_duration: bool,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    7000
}
fn default_path() -> String {
    "/".to_string()
}
fn default_request_timeout_secs() -> u64 {
    10
}
fn default_max_wait_secs() -> u64 {
    20
}
fn default_presentation_interval_ms() -> u64 {
    1000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            controller: ControllerConfig::default(),
            session: SessionConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            path: default_path(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_wait_secs: default_max_wait_secs(),
            presentation_interval_ms: default_presentation_interval_ms(),
            honor_display_duration: false,
        }
    }
}

// ── Loading and derived values ────────────────────────────────────────────────

impl ClientConfig {
    /// Reads a TOML config file without validating it.
    ///
    /// Values are checked only once overrides have been layered on top, so
    /// call [`validate`](Self::validate) on the final config.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, [`ConfigError::Parse`]
    /// for malformed TOML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Parses and validates TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the session cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.presentation_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "presentation interval must be greater than zero".to_string(),
            ));
        }
        if self.session.max_wait_secs == 0 {
            return Err(ConfigError::Invalid(
                "maximum wait must be greater than zero".to_string(),
            ));
        }
        if self.controller.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        if self.controller.host.trim().is_empty() {
            return Err(ConfigError::Invalid("controller host is empty".to_string()));
        }
        Ok(())
    }

    /// `ws://host:port/path`.
    pub fn controller_url(&self) -> String {
        let path = &self.controller.path;
        let slash = if path.starts_with('/') { "" } else { "/" };
        format!(
            "ws://{}:{}{slash}{path}",
            self.controller.host, self.controller.port
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.controller.request_timeout_secs)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.session.max_wait_secs)
    }

    pub fn presentation_interval(&self) -> Duration {
        Duration::from_millis(self.session.presentation_interval_ms)
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            max_wait: self.max_wait(),
            policy: PresentationPolicy {
                interval: self.presentation_interval(),
                honor_display_duration: self.session.honor_display_duration,
            },
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
