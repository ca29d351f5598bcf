//! linecast server entry point.
//!
//! Accepts TCP connections and relays every line a client sends to every other
//! connected client.  Clients that stay silent for the idle window are
//! disconnected.
//!
//! # Usage
//!
//! ```text
//! linecast-server [OPTIONS]
//!
//! Options:
//!   --config           <PATH>   TOML config file
//!   --bind             <IP>     Listener address          [default: 0.0.0.0]
//!   --port             <PORT>   Listener port             [default: 2020]
//!   --idle-timeout     <SECS>   Inactivity window         [default: 300]
//!   --mailbox-capacity <N>      Per-session mailbox bound [default: 8]
//!   --backpressure     <POLICY> block | drop | disconnect [default: block]
//! ```
//!
//! Flags override the config file, which overrides the built-in defaults.
//! Every flag can also be given as an environment variable:
//!
//! | Variable                    | Flag                 |
//! |-----------------------------|----------------------|
//! | `LINECAST_CONFIG`           | `--config`           |
//! | `LINECAST_BIND`             | `--bind`             |
//! | `LINECAST_PORT`             | `--port`             |
//! | `LINECAST_IDLE_TIMEOUT`     | `--idle-timeout`     |
//! | `LINECAST_MAILBOX_CAPACITY` | `--mailbox-capacity` |
//! | `LINECAST_BACKPRESSURE`     | `--backpressure`     |
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use linecast_core::{BackpressurePolicy, ConfigFile, RelayConfig};
use linecast_server::infrastructure::run_server;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// TCP line broadcast server.
#[derive(Debug, Parser)]
#[command(
    name = "linecast-server",
    about = "Relays each client's lines to every other connected client",
    version
)]
struct Cli {
    /// Path to a TOML config file.  Values given as flags take precedence.
    #[arg(long, env = "LINECAST_CONFIG")]
    config: Option<PathBuf>,

    /// IP address to bind the listener to.
    #[arg(long, env = "LINECAST_BIND")]
    bind: Option<String>,

    /// TCP port to listen on.
    #[arg(long, env = "LINECAST_PORT")]
    port: Option<u16>,

    /// Seconds of silence after which a client is disconnected.
    #[arg(long, env = "LINECAST_IDLE_TIMEOUT")]
    idle_timeout: Option<u64>,

    /// Messages each client's mailbox can hold before the backpressure policy
    /// applies.
    #[arg(long, env = "LINECAST_MAILBOX_CAPACITY")]
    mailbox_capacity: Option<usize>,

    /// What to do when a client's mailbox is full: block, drop or disconnect.
    #[arg(long, env = "LINECAST_BACKPRESSURE")]
    backpressure: Option<BackpressurePolicy>,
}

impl Cli {
    /// Layers the CLI over the config file (if any) and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, or if the
    /// merged settings are invalid.
    fn into_relay_config(self) -> anyhow::Result<RelayConfig> {
        let mut file = match &self.config {
            Some(path) => ConfigFile::load(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => ConfigFile::default(),
        };

        let server = &mut file.server;
        if let Some(bind) = self.bind {
            server.bind_address = bind;
        }
        if let Some(port) = self.port {
            server.port = port;
        }
        if let Some(secs) = self.idle_timeout {
            server.idle_timeout_secs = secs;
        }
        if let Some(capacity) = self.mailbox_capacity {
            server.mailbox_capacity = capacity;
        }
        if let Some(policy) = self.backpressure {
            server.backpressure = policy;
        }

        file.into_relay_config().context("invalid configuration")
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_relay_config()?;

    info!(
        "linecast starting: bind={}, backpressure={}",
        config.bind_addr, config.backpressure
    );

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_server(config, running).await?;

    info!("linecast stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
