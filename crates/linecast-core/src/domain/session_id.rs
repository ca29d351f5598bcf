//! Opaque session identity.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use uuid::Uuid;

/// Error returned when a string is not a valid session identity.
#[derive(Debug, Error)]
#[error("invalid session id '{input}': {source}")]
pub struct SessionIdParseError {
    input: String,
    #[source]
    source: uuid::Error,
}

/// Globally unique identity of one connected client.
///
/// Backed by a random (v4) UUID, so two sessions never share an id even across
/// restarts.  The canonical string form is the lowercase hyphenated UUID and is
/// what appears on the wire in chat lines and notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a fresh, random session id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl From<Uuid> for SessionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for SessionId {
    type Err = SessionIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|source| SessionIdParseError {
                input: s.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_distinct() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_display_is_lowercase_hyphenated_uuid() {
        // Arrange
        let uuid = Uuid::parse_str("6F9619FF-8B86-D011-B42D-00C04FC964FF").unwrap();

        // Act
        let rendered = SessionId::from(uuid).to_string();

        // Assert
        assert_eq!(rendered, "6f9619ff-8b86-d011-b42d-00c04fc964ff");
    }

    #[test]
    fn test_display_output_parses_back_to_same_id() {
        let id = SessionId::generate();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let result = "not-a-session".parse::<SessionId>();
        let err = result.unwrap_err();
        assert!(err.to_string().contains("not-a-session"));
    }
}
