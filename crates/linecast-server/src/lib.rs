//! linecast-server library crate.
//!
//! A TCP line broadcast server: every line a client sends is relayed to every
//! other connected client, and silent clients are disconnected after an idle
//! window.
//!
//! # Architecture
//!
//! ```text
//! TCP clients (newline-delimited text)
//!         ↕
//! [linecast-server]
//!   ├── application/      Session, Registry + Broadcaster loop, IdleMonitor
//!   └── infrastructure/
//!         ├── server/     TCP accept loop
//!         ├── connection/ Per-connection lifecycle (reader, writer, teardown)
//!         └── line_reader/ Bounded newline splitting
//! ```
//!
//! # Layer rules
//!
//! - `application` uses `tokio::sync` and `tokio::time` only; it never touches
//!   a socket, so fan-out and timeout behaviour are testable in isolation.
//! - `infrastructure` owns all stream I/O and task spawning per connection.

/// Application layer: membership, fan-out and idle detection.
pub mod application;

/// Infrastructure layer: TCP listener and per-connection handling.
pub mod infrastructure;
