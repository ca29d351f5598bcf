//! Infrastructure layer for linecast-server.
//!
//! # Responsibilities
//!
//! - Binding the TCP listener and accepting connections
//! - Splitting inbound bytes into bounded lines
//! - Running each connection's lifecycle: outbound writer task, read loop,
//!   idle monitoring and teardown
//! - Honouring the shutdown flag
//!
//! # What does NOT belong here?
//!
//! - Membership and fan-out rules (application layer)
//! - Message wire text (linecast-core)

pub mod connection;
pub mod line_reader;
pub mod server;

pub use connection::{handle_connection, ConnectionError};
pub use server::{run_server, serve};
