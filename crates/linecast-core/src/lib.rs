//! # linecast-core
//!
//! Shared domain types for the linecast line broadcast server.
//!
//! This crate has no I/O and no async runtime dependency.  It defines:
//!
//! - **`domain`** – Session identities and the immutable [`Message`] value that
//!   the broadcaster copies into every recipient mailbox, together with the
//!   exact wire text of chat lines and join/leave notices.
//!
//! - **`config`** – The typed runtime configuration ([`RelayConfig`]), the
//!   full-mailbox [`BackpressurePolicy`], and the on-disk TOML schema that
//!   feeds them.

pub mod config;
pub mod domain;

pub use config::{BackpressurePolicy, ConfigError, ConfigFile, RelayConfig};
pub use domain::message::Message;
pub use domain::session_id::{SessionId, SessionIdParseError};
