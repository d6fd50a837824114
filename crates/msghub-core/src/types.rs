//! Shared identifier types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The pair uniquely identifying a connected session.
///
/// `id` is the client title; `sub_id` distinguishes multiple connections
/// carrying the same title. An empty pair addresses every connected session
/// (fan-out send).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    /// Client identifier.
    pub id: String,
    /// Per-connection sub identifier.
    pub sub_id: String,
}

impl SessionKey {
    /// Create a new session key.
    pub fn new(id: impl Into<String>, sub_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sub_id: sub_id.into(),
        }
    }

    /// The empty key used to address all connected sessions.
    pub fn broadcast() -> Self {
        Self {
            id: String::new(),
            sub_id: String::new(),
        }
    }

    /// Whether this key addresses all sessions rather than a single one.
    pub fn is_broadcast(&self) -> bool {
        self.id.is_empty() && self.sub_id.is_empty()
    }

    /// The key/value store key for this session's status record.
    pub fn status_key(&self) -> String {
        format!("{}::{}", self.id, self.sub_id)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.id, self.sub_id)
    }
}
