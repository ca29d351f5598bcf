//! Runtime configuration and its TOML file schema.
//!
//! [`RelayConfig`] is the single source of truth the server runs with.  It is
//! assembled from three layers, highest precedence first:
//!
//! 1. CLI flags / environment variables (handled by the binary).
//! 2. An optional TOML file ([`ConfigFile`]).
//! 3. Built-in defaults.
//!
//! Example file:
//!
//! ```toml
//! [server]
//! bind_address = "127.0.0.1"
//! port = 2020
//! idle_timeout_secs = 300
//! mailbox_capacity = 8
//! backpressure = "block"
//! ```
//!
//! Missing fields fall back to their defaults via `#[serde(default = "...")]`,
//! so an empty file is a valid file.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for loading and validating configuration.
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

    /// `bind_address` is not an IP address.
    #[error("invalid bind address '{value}'")]
    InvalidBindAddress { value: String },

    /// A field holds a value the server cannot run with.
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

/// What `Publish` does when a recipient's mailbox is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackpressurePolicy {
    /// Wait for space.  Stalls fan-out to every session while one recipient is
    /// slow, but never loses a message.
    #[default]
    Block,
    /// Skip the full recipient for this message only.
    Drop,
    /// Evict the full recipient: remove it from the registry and close its
    /// mailbox, which ends its connection.
    Disconnect,
}

impl fmt::Display for BackpressurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Block => "block",
            Self::Drop => "drop",
            Self::Disconnect => "disconnect",
        };
        f.write_str(name)
    }
}

impl FromStr for BackpressurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "block" => Ok(Self::Block),
            "drop" => Ok(Self::Drop),
            "disconnect" => Ok(Self::Disconnect),
            other => Err(ConfigError::Invalid {
                field: "backpressure",
                reason: format!("expected block, drop or disconnect, got '{other}'"),
            }),
        }
    }
}

/// All runtime settings for the broadcast server.
///
/// Build once at startup and share behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    /// Address the TCP listener binds to.
    pub bind_addr: SocketAddr,
    /// Inactivity window after which a silent session is disconnected.
    pub idle_timeout: Duration,
    /// Bound of each session's mailbox.
    pub mailbox_capacity: usize,
    /// Bound of the broadcaster's Admit/Depart/Publish queue.
    pub event_queue_capacity: usize,
    /// Behaviour of `Publish` when a mailbox is full.
    pub backpressure: BackpressurePolicy,
    /// Longest accepted inbound line, excluding the terminator.
    pub max_line_bytes: usize,
    /// How long a departing session's writer may keep flushing its mailbox.
    pub drain_timeout: Duration,
}

impl Default for RelayConfig {
    /// | Field                | Default        |
    /// |----------------------|----------------|
    /// | bind_addr            | `0.0.0.0:2020` |
    /// | idle_timeout         | 5 minutes      |
    /// | mailbox_capacity     | 8              |
    /// | event_queue_capacity | 64             |
    /// | backpressure         | `block`        |
    /// | max_line_bytes       | 64 KiB         |
    /// | drain_timeout        | 5 seconds      |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(
                IpAddr::from([0, 0, 0, 0]),
                default_port(),
            ),
            idle_timeout: Duration::from_secs(default_idle_timeout_secs()),
            mailbox_capacity: default_mailbox_capacity(),
            event_queue_capacity: default_event_queue_capacity(),
            backpressure: BackpressurePolicy::default(),
            max_line_bytes: default_max_line_bytes(),
            drain_timeout: Duration::from_secs(default_drain_timeout_secs()),
        }
    }
}

impl RelayConfig {
    /// Rejects settings the server cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(field: &'static str, value: usize) -> Result<(), ConfigError> {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
            Ok(())
        }

        positive("mailbox_capacity", self.mailbox_capacity)?;
        positive("event_queue_capacity", self.event_queue_capacity)?;
        positive("max_line_bytes", self.max_line_bytes)?;
        if self.idle_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                field: "idle_timeout",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

// ── File schema ───────────────────────────────────────────────────────────────

/// Top-level layout of the TOML config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,
}

/// The `[server]` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    /// IP address to bind to.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,
    #[serde(default)]
    pub backpressure: BackpressurePolicy,
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    2020
}
fn default_idle_timeout_secs() -> u64 {
    300
}
fn default_mailbox_capacity() -> usize {
    8
}
fn default_event_queue_capacity() -> usize {
    64
}
fn default_max_line_bytes() -> usize {
    64 * 1024
}
fn default_drain_timeout_secs() -> u64 {
    5
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            idle_timeout_secs: default_idle_timeout_secs(),
            mailbox_capacity: default_mailbox_capacity(),
            event_queue_capacity: default_event_queue_capacity(),
            backpressure: BackpressurePolicy::default(),
            max_line_bytes: default_max_line_bytes(),
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }
}

impl ConfigFile {
    /// Parses a config file from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the TOML is malformed or a field has
    /// the wrong type.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Reads and parses the file at `path`.
    ///
    /// The path was named explicitly by the operator, so a missing file is an
    /// error rather than a silent fallback to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not valid TOML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Converts the file schema into a validated [`RelayConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBindAddress`] for an unparseable bind
    /// address, or whatever [`RelayConfig::validate`] rejects.
    pub fn into_relay_config(self) -> Result<RelayConfig, ConfigError> {
        let server = self.server;
        let ip: IpAddr = server
            .bind_address
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddress {
                value: server.bind_address.clone(),
            })?;

        let config = RelayConfig {
            bind_addr: SocketAddr::new(ip, server.port),
            idle_timeout: Duration::from_secs(server.idle_timeout_secs),
            mailbox_capacity: server.mailbox_capacity,
            event_queue_capacity: server.event_queue_capacity,
            backpressure: server.backpressure,
            max_line_bytes: server.max_line_bytes,
            drain_timeout: Duration::from_secs(server.drain_timeout_secs),
        };
        config.validate()?;
        Ok(config)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
