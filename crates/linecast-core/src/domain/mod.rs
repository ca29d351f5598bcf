//! Domain entities shared by every linecast component.
//!
//! Nothing in here performs I/O or touches the async runtime, so the types can
//! be exercised in plain `#[test]` functions.

pub mod message;
pub mod session_id;

pub use message::Message;
pub use session_id::{SessionId, SessionIdParseError};
