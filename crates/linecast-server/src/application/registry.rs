//! The membership set of live sessions.
//!
//! `Registry` is deliberately a plain synchronous struct.  It is owned by the
//! [`Broadcaster`](crate::application::Broadcaster) loop and never shared, so
//! it needs no lock; everything else reaches it through events.
//!
//! # Membership invariant
//!
//! ```text
//!   admit(id) ──► present ──► depart(id) / evict ──► absent (mailbox closed)
//! ```
//!
//! A second admit of a present id and a depart of an absent id are both
//! rejected with a [`RegistryError`] rather than silently applied.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use linecast_core::SessionId;
use thiserror::Error;

use crate::application::session::Session;

/// Errors reported by the registry and its handle.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The broadcaster loop has stopped, so no event can be delivered.
    #[error("broadcaster is no longer running")]
    Closed,
    #[error("session {0} is already admitted")]
    AlreadyAdmitted(SessionId),
    #[error("session {0} is not admitted")]
    NotAdmitted(SessionId),
}

/// Live sessions keyed by id.
#[derive(Debug, Default)]
pub struct Registry {
    members: HashMap<SessionId, Session>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `session` to the set.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AlreadyAdmitted`] if a session with the same id
    /// is present; the rejected session is dropped.
    pub fn admit(&mut self, session: Session) -> Result<(), RegistryError> {
        match self.members.entry(session.id()) {
            Entry::Occupied(entry) => Err(RegistryError::AlreadyAdmitted(*entry.key())),
            Entry::Vacant(entry) => {
                entry.insert(session);
                Ok(())
            }
        }
    }

    /// Removes the session with `id` and hands it back.
    ///
    /// Dropping the returned session drops the last mailbox sender, which
    /// closes the mailbox.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotAdmitted`] if `id` is not present.
    pub fn depart(&mut self, id: SessionId) -> Result<Session, RegistryError> {
        self.members
            .remove(&id)
            .ok_or(RegistryError::NotAdmitted(id))
    }

    /// Every member except `author`.
    pub fn recipients(&self, author: SessionId) -> impl Iterator<Item = &Session> + '_ {
        self.members
            .values()
            .filter(move |session| session.id() != author)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::open("127.0.0.1:1", 8).0
    }

    #[test]
    fn test_new_registry_is_empty() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_admit_makes_session_present() {
        // Arrange
        let mut registry = Registry::new();
        let s = session();
        let id = s.id();

        // Act
        registry.admit(s).unwrap();

        // Assert
        let members: Vec<SessionId> = registry
            .recipients(SessionId::generate())
            .map(Session::id)
            .collect();
        assert_eq!(members, vec![id]);
    }

    #[test]
    fn test_second_admit_of_same_id_is_rejected() {
        let mut registry = Registry::new();
        let id = SessionId::generate();
        let (first, _rx1) = Session::open_with_id(id, "a", 1);
        let (second, _rx2) = Session::open_with_id(id, "b", 1);

        registry.admit(first).unwrap();
        let result = registry.admit(second);

        assert_eq!(result.unwrap_err(), RegistryError::AlreadyAdmitted(id));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_rejected_admit_keeps_original_member() {
        let mut registry = Registry::new();
        let id = SessionId::generate();
        let (first, _rx1) = Session::open_with_id(id, "original", 1);
        let (second, _rx2) = Session::open_with_id(id, "impostor", 1);

        registry.admit(first).unwrap();
        let _ = registry.admit(second);

        let kept = registry.depart(id).unwrap();
        assert_eq!(kept.peer_addr(), "original");
    }

    #[test]
    fn test_depart_removes_and_returns_session() {
        let mut registry = Registry::new();
        let s = session();
        let id = s.id();
        registry.admit(s).unwrap();

        let removed = registry.depart(id).unwrap();

        assert_eq!(removed.id(), id);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_depart_unknown_id_is_rejected() {
        let mut registry = Registry::new();
        let id = SessionId::generate();
        assert_eq!(registry.depart(id).unwrap_err(), RegistryError::NotAdmitted(id));
    }

    #[test]
    fn test_second_depart_is_rejected() {
        let mut registry = Registry::new();
        let s = session();
        let id = s.id();
        registry.admit(s).unwrap();

        registry.depart(id).unwrap();
        let result = registry.depart(id);

        assert_eq!(result.unwrap_err(), RegistryError::NotAdmitted(id));
    }

    #[test]
    fn test_recipients_exclude_author() {
        // Arrange: three members
        let mut registry = Registry::new();
        let sessions: Vec<Session> = (0..3).map(|_| session()).collect();
        let ids: Vec<SessionId> = sessions.iter().map(Session::id).collect();
        for s in sessions {
            registry.admit(s).unwrap();
        }

        // Act
        let mut recipients: Vec<SessionId> =
            registry.recipients(ids[0]).map(Session::id).collect();
        recipients.sort();

        // Assert
        let mut expected = vec![ids[1], ids[2]];
        expected.sort();
        assert_eq!(recipients, expected);
    }

    #[test]
    fn test_recipients_of_non_member_author_is_everyone() {
        let mut registry = Registry::new();
        registry.admit(session()).unwrap();
        registry.admit(session()).unwrap();

        let count = registry.recipients(SessionId::generate()).count();

        assert_eq!(count, 2);
    }
}
