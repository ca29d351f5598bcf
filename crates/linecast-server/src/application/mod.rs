//! Application layer for linecast-server.
//!
//! # Responsibilities
//!
//! - [`Session`]: per-connection identity plus the sending side of its mailbox.
//! - [`Registry`]: the membership set, mutated only by the broadcaster loop.
//! - [`Broadcaster`] / [`RegistryHandle`]: the single serialized control loop
//!   and the cloneable handle connections use to submit Admit, Depart and
//!   Publish events.
//! - [`IdleMonitor`]: per-session inactivity watchdog.
//!
//! # What does NOT belong here?
//!
//! - Reading or writing sockets (infrastructure)
//! - Splitting bytes into lines (infrastructure)

pub mod broadcaster;
pub mod idle_monitor;
pub mod registry;
pub mod session;

pub use broadcaster::{Broadcaster, RegistryHandle};
pub use idle_monitor::{ActivityHandle, IdleExpiry, IdleMonitor};
pub use registry::{Registry, RegistryError};
pub use session::{Mailbox, Session};
