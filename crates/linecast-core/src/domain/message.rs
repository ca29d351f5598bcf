//! The immutable message value routed between sessions.
//!
//! A [`Message`] is exactly what ends up on a client's socket: the outbound
//! writer sends `content` followed by a newline and nothing else.  The author
//! id travels alongside so the broadcaster can skip the sender during fan-out.
//!
//! # Wire text
//!
//! | Constructor           | Content                                   |
//! |-----------------------|-------------------------------------------|
//! | [`Message::chat`]     | `<author>:<text>`                         |
//! | [`Message::joined`]   | ``user:`<author>` has joined``            |
//! | [`Message::left`]     | ``user:`<author>` has left``              |
//! | [`Message::welcome`]  | ``Welcome, user `<author>` (<peer addr>)`` |

use crate::domain::session_id::SessionId;

/// One line of text attributed to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    author: SessionId,
    content: String,
}

impl Message {
    /// Builds a message with arbitrary content.
    pub fn new(author: SessionId, content: impl Into<String>) -> Self {
        Self {
            author,
            content: content.into(),
        }
    }

    /// A line typed by `author`, prefixed with the author's id.
    pub fn chat(author: SessionId, text: &str) -> Self {
        Self::new(author, format!("{author}:{text}"))
    }

    /// Notice published to everyone else when `author` connects.
    pub fn joined(author: SessionId) -> Self {
        Self::new(author, format!("user:`{author}` has joined"))
    }

    /// Notice published to everyone else when `author` goes away.
    pub fn left(author: SessionId) -> Self {
        Self::new(author, format!("user:`{author}` has left"))
    }

    /// Greeting placed directly into a new session's own mailbox.
    pub fn welcome(author: SessionId, peer_addr: &str) -> Self {
        Self::new(author, format!("Welcome, user `{author}` ({peer_addr})"))
    }

    pub fn author(&self) -> SessionId {
        self.author
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_content_is_author_colon_text() {
        // Arrange
        let id = SessionId::generate();

        // Act
        let msg = Message::chat(id, "hello");

        // Assert
        assert_eq!(msg.content(), format!("{id}:hello"));
        assert_eq!(msg.author(), id);
    }

    #[test]
    fn test_chat_keeps_text_verbatim() {
        let id = SessionId::generate();
        let msg = Message::chat(id, "  a:b  ");
        assert_eq!(msg.content(), format!("{id}:  a:b  "));
    }

    #[test]
    fn test_joined_notice_names_author() {
        let id = SessionId::generate();
        let msg = Message::joined(id);
        assert_eq!(msg.content(), format!("user:`{id}` has joined"));
    }

    #[test]
    fn test_left_notice_names_author() {
        let id = SessionId::generate();
        let msg = Message::left(id);
        assert_eq!(msg.content(), format!("user:`{id}` has left"));
    }

    #[test]
    fn test_welcome_mentions_identity_and_peer() {
        let id = SessionId::generate();
        let msg = Message::welcome(id, "10.0.0.7:51000");
        assert!(msg.content().contains(&id.to_string()));
        assert!(msg.content().contains("10.0.0.7:51000"));
    }

    #[test]
    fn test_clone_is_equal() {
        // The broadcaster hands each recipient its own copy.
        let msg = Message::chat(SessionId::generate(), "x");
        assert_eq!(msg.clone(), msg);
    }
}
