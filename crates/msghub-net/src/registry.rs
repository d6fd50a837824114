//! Session registry: the set of connected `(id, sub_id)` pairs.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;

use msghub_core::error::AppError;
use msghub_core::result::AppResult;
use msghub_core::types::SessionKey;

/// Status attached to a connected session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionRecord {
    /// Free-form status string, updated by status commands.
    pub status: String,
    /// Last status payload received from the session.
    pub last_payload: String,
}

/// Process-wide registry of connected sessions.
///
/// One mutex guards the whole map; `snapshot` copies out under the lock so
/// callers never iterate while holding it. The registry is owned by the
/// process role and passed explicitly to everything that needs it.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionKey, SessionRecord>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session. Fails when the key is already present.
    pub fn add(&self, key: SessionKey) -> AppResult<()> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| AppError::session("session registry mutex poisoned"))?;

        if sessions.contains_key(&key) {
            return Err(AppError::session("Client already exists"));
        }

        sessions.insert(key, SessionRecord::default());
        Ok(())
    }

    /// Deregister a session. Fails when the key is absent.
    pub fn remove(&self, key: &SessionKey) -> AppResult<()> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| AppError::session("session registry mutex poisoned"))?;

        if sessions.remove(key).is_none() {
            return Err(AppError::session("Client not exist"));
        }
        Ok(())
    }

    /// Update a session's status record. Missing sessions are ignored.
    pub fn set_status(&self, key: &SessionKey, status: &str, payload: &str) {
        if let Ok(mut sessions) = self.sessions.lock() {
            if let Some(record) = sessions.get_mut(key) {
                record.status = status.to_string();
                record.last_payload = payload.to_string();
            }
        }
    }

    /// Immutable copy of the whole mapping, taken under the lock.
    pub fn snapshot(&self) -> HashMap<SessionKey, SessionRecord> {
        self.sessions
            .lock()
            .map(|sessions| sessions.clone())
            .unwrap_or_default()
    }

    /// Number of connected sessions.
    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Whether no session is connected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
