//! Per-connection session state.
//!
//! A [`Session`] is created by the connection handler and moved into the
//! registry on Admit.  The registry's copy of the mailbox sender is the only
//! one left after that, so removing the session from the registry is what
//! closes the mailbox and lets the outbound writer finish.

use std::time::SystemTime;

use linecast_core::{Message, SessionId};
use tokio::sync::mpsc;

/// Receiving side of a session's mailbox, drained by its outbound writer.
pub type Mailbox = mpsc::Receiver<Message>;

/// Server-side state for one connected client.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    peer_addr: String,
    created_at: SystemTime,
    mailbox: mpsc::Sender<Message>,
}

impl Session {
    /// Opens a session with a freshly generated id.
    ///
    /// Returns the session and the receiving end of its bounded mailbox.
    pub fn open(peer_addr: impl Into<String>, mailbox_capacity: usize) -> (Self, Mailbox) {
        Self::open_with_id(SessionId::generate(), peer_addr, mailbox_capacity)
    }

    /// Opens a session under an id supplied by the caller.
    pub fn open_with_id(
        id: SessionId,
        peer_addr: impl Into<String>,
        mailbox_capacity: usize,
    ) -> (Self, Mailbox) {
        let (tx, rx) = mpsc::channel(mailbox_capacity);
        let session = Self {
            id,
            peer_addr: peer_addr.into(),
            created_at: SystemTime::now(),
            mailbox: tx,
        };
        (session, rx)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Remote address, for logging and the welcome line only.
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Sending side of the mailbox.
    pub fn mailbox(&self) -> &mpsc::Sender<Message> {
        &self.mailbox
    }

    /// Places `message` directly in this session's own mailbox.
    ///
    /// Used for the welcome line, which is never broadcast.
    ///
    /// # Errors
    ///
    /// Returns the message back if the mailbox receiver is gone.
    pub async fn deliver(&self, message: Message) -> Result<(), mpsc::error::SendError<Message>> {
        self.mailbox.send(message).await
    }
}
