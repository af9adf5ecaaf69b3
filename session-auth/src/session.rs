use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, Result};

/// An opaque session identifier, as carried by the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Validates a raw identifier received from a client.
    ///
    /// Empty and blank values are rejected.
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(Error::InvalidInput("session id must not be blank"));
        }
        Ok(Self(raw))
    }

    // Values produced by a generator or read back from a record store.
    pub(crate) fn from_trusted(raw: String) -> Self {
        Self(raw)
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A reference to a user held by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Validates a raw user identifier.
    ///
    /// Empty and blank values are rejected.
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(Error::InvalidInput("user id must not be blank"));
        }
        Ok(Self(raw))
    }

    pub(crate) fn from_trusted(raw: String) -> Self {
        Self(raw)
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The association between a session identifier and a user.
///
/// All fields are fixed at creation. `created_at` is optional because rows
/// coming back from a record store may lack it; such records never resolve
/// while expiration is enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// The session identifier.
    pub session_id: SessionId,

    /// The user this session belongs to.
    pub user_id: UserId,

    /// When the session was issued.
    pub created_at: Option<OffsetDateTime>,
}

impl SessionRecord {
    /// Creates a record stamped with the given creation time.
    pub fn new(session_id: SessionId, user_id: UserId, created_at: OffsetDateTime) -> Self {
        Self {
            session_id,
            user_id,
            created_at: Some(created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_ids_are_rejected() {
        assert!(matches!(UserId::parse(""), Err(Error::InvalidInput(_))));
        assert!(matches!(UserId::parse("  \t"), Err(Error::InvalidInput(_))));
        assert!(matches!(SessionId::parse(""), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn ids_keep_their_raw_value() {
        let user_id = UserId::parse("42").unwrap();
        assert_eq!(user_id.as_str(), "42");
        assert_eq!(user_id.to_string(), "42");

        let session_id = SessionId::parse("abc-def").unwrap();
        assert_eq!(session_id.as_ref(), "abc-def");
    }
}
