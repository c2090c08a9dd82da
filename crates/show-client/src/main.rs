//! Show-control playback client: entry point.
//!
//! Connects to a show controller, negotiates the scene to play, and then
//! acknowledges every `showMedia` push until the maximum wait elapses or
//! Ctrl+C is pressed.
//!
//! # Usage
//!
//! ```text
//! show-client [OPTIONS]
//!
//! Options:
//!   --config <PATH>                 TOML config file
//!   --host <HOST>                   Controller host [default: 127.0.0.1]
//!   --port <PORT>                   Controller port [default: 7000]
//!   --path <PATH>                   WebSocket path [default: /]
//!   --max-wait <SECS>               Session lifetime [default: 20]
//!   --presentation-interval <MS>    Gap between mediaTransitioning and mediaDone [default: 1000]
//!   --request-timeout <SECS>        listScenes/loadScene ack timeout [default: 10]
//!   --honor-display-duration        Use a push's displayDuration when present
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                             | Flag                        |
//! |--------------------------------------|-----------------------------|
//! | `SHOW_CLIENT_CONFIG`                 | `--config`                  |
//! | `SHOW_CLIENT_HOST`                   | `--host`                    |
//! | `SHOW_CLIENT_PORT`                   | `--port`                    |
//! | `SHOW_CLIENT_PATH`                   | `--path`                    |
//! | `SHOW_CLIENT_MAX_WAIT`               | `--max-wait`                |
//! | `SHOW_CLIENT_PRESENTATION_INTERVAL`  | `--presentation-interval`   |
//! | `SHOW_CLIENT_REQUEST_TIMEOUT`        | `--request-timeout`         |
//!
//! Flags win over the config file; the config file wins over built-in
//! defaults.  Logging follows `RUST_LOG`, falling back to `log_level` from
//! the config.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use show_client::application::{ClientSession, SessionOutcome};
use show_client::infrastructure::config::ClientConfig;
use show_client::infrastructure::network::{WsChannelConfig, WsEventChannel};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Show-control playback client.
#[derive(Debug, Parser)]
#[command(
    name = "show-client",
    about = "Playback client for a show controller: scene negotiation and media acknowledgment",
    version
)]
struct Cli {
    /// TOML configuration file.  Missing fields fall back to defaults.
    #[arg(long, env = "SHOW_CLIENT_CONFIG")]
    config: Option<PathBuf>,

    /// Controller hostname or IP address.
    #[arg(long, env = "SHOW_CLIENT_HOST")]
    host: Option<String>,

    /// Controller port.
    #[arg(long, env = "SHOW_CLIENT_PORT")]
    port: Option<u16>,

    /// WebSocket path on the controller.
    #[arg(long, env = "SHOW_CLIENT_PATH")]
    path: Option<String>,

    /// Maximum session lifetime in seconds.
    #[arg(long, env = "SHOW_CLIENT_MAX_WAIT")]
    max_wait: Option<u64>,

    /// Presentation interval in milliseconds.
    #[arg(long, env = "SHOW_CLIENT_PRESENTATION_INTERVAL")]
    presentation_interval: Option<u64>,

    /// Request acknowledgment timeout in seconds.
    #[arg(long, env = "SHOW_CLIENT_REQUEST_TIMEOUT")]
    request_timeout: Option<u64>,

    /// Let `displayDuration` on a push replace the presentation interval.
    #[arg(long)]
    honor_display_duration: bool,
}

impl Cli {
    /// Layers the flags over the config file (or defaults) and validates.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded or the final
    /// values are out of range.
    fn into_client_config(self) -> anyhow::Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::load(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => ClientConfig::default(),
        };

        if let Some(host) = self.host {
            config.controller.host = host;
        }
        if let Some(port) = self.port {
            config.controller.port = port;
        }
        if let Some(path) = self.path {
            config.controller.path = path;
        }
        if let Some(secs) = self.request_timeout {
            config.controller.request_timeout_secs = secs;
        }
        if let Some(secs) = self.max_wait {
            config.session.max_wait_secs = secs;
        }
        if let Some(ms) = self.presentation_interval {
            config.session.presentation_interval_ms = ms;
        }
        if self.honor_display_duration {
            config.session.honor_display_duration = true;
        }

        config.validate().context("invalid client configuration")?;
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_client_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let url = config.controller_url();
    info!("show client starting: controller={url}, max wait={:?}", config.max_wait());

    let (channel, events) =
        WsEventChannel::connect(WsChannelConfig::new(url.clone(), config.request_timeout()))
            .await
            .with_context(|| format!("failed to connect to controller at {url}"))?;

    let session = ClientSession::new(Arc::new(channel), events, config.session_settings());
    let outcome = session
        .run(shutdown_signal())
        .await
        .context("session ended with a transport failure");

    match &outcome {
        Ok(outcome) => log_outcome(outcome),
        Err(e) => error!("{e:#}"),
    }
    outcome.map(|_| ())
}

/// Resolves on Ctrl+C.  Never resolves if the handler cannot be installed.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl+C; ending session"),
        Err(e) => {
            warn!("failed to listen for Ctrl+C signal: {e}");
            std::future::pending::<()>().await;
        }
    }
}

fn log_outcome(outcome: &SessionOutcome) {
    info!(
        "session {} finished ({:?}); negotiation: {:?}; media: {} acknowledged, {} malformed, {} abandoned",
        outcome.session_id,
        outcome.ended_by,
        outcome.negotiation,
        outcome.media.acknowledged,
        outcome.media.malformed,
        outcome.media.abandoned,
    );
}

// ── Tests ─────────────────────────────────────────────────────────────────────
