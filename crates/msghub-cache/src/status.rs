//! Per-session status keys and the connected-clients snapshot.

use std::sync::Arc;
use std::time::Duration;

use msghub_core::kv::KvStore;
use msghub_core::result::AppResult;
use msghub_core::types::SessionKey;

/// Key holding the latest session-registry snapshot.
pub const CONNECTED_CLIENTS_KEY: &str = "connected_clients";

/// Store for session status records.
///
/// Each connected session's latest status payload lives under
/// `<id>::<sub_id>` with a TTL, so stale entries age out on their own.
#[derive(Debug, Clone)]
pub struct SessionStatusStore {
    store: Arc<dyn KvStore>,
    ttl: Duration,
}

impl SessionStatusStore {
    /// Create a status store with the configured TTL.
    pub fn new(store: Arc<dyn KvStore>, ttl_sec: u64) -> Self {
        Self {
            store,
            ttl: Duration::from_secs(ttl_sec),
        }
    }

    /// Write a session's status payload, refreshing its TTL.
    pub async fn set_status(&self, key: &SessionKey, payload: &str) -> AppResult<()> {
        self.store
            .set_ex(&key.status_key(), payload, self.ttl)
            .await
    }

    /// Read a session's status payload.
    pub async fn get_status(&self, key: &SessionKey) -> AppResult<Option<String>> {
        self.store.get(&key.status_key()).await
    }

    /// Store the serialized registry snapshot for external consumers.
    pub async fn store_snapshot(&self, snapshot_json: &str) -> AppResult<()> {
        self.store.set(CONNECTED_CLIENTS_KEY, snapshot_json).await
    }
}
