//! The single-slot broadcast rendezvous.
//!
//! One well-known key holds either a serialized broadcast message or the
//! empty string. The consumer overwrites it on every delivery; the gateway's
//! polling job reads it, fans out, and clears it. Intermediate messages
//! written between polls are overwritten and dropped by design — the durable
//! copy lives in the work queue, not here.

use std::sync::Arc;

use msghub_core::kv::KvStore;
use msghub_core::result::AppResult;

/// Handle to the broadcast slot key.
#[derive(Debug, Clone)]
pub struct BroadcastSlot {
    store: Arc<dyn KvStore>,
    key: String,
}

impl BroadcastSlot {
    /// Create a slot handle for `key`.
    pub fn new(store: Arc<dyn KvStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// The slot's key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the slot. Returns `None` when the slot is empty or absent.
    pub async fn read(&self) -> AppResult<Option<String>> {
        match self.store.get(&self.key).await? {
            Some(value) if !value.is_empty() => Ok(Some(value)),
            _ => Ok(None),
        }
    }

    /// Overwrite the slot with a serialized message.
    pub async fn seed(&self, message: &str) -> AppResult<()> {
        self.store.set(&self.key, message).await
    }

    /// Reset the slot to the empty string.
    pub async fn clear(&self) -> AppResult<()> {
        self.store.set(&self.key, "").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryKvStore;

    #[tokio::test]
    async fn test_empty_slot_reads_as_none() {
        let slot = BroadcastSlot::new(Arc::new(MemoryKvStore::new()), "global_message");
        assert_eq!(slot.read().await.unwrap(), None);

        slot.clear().await.unwrap();
        assert_eq!(slot.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_seed_then_read_then_clear() {
        let store = Arc::new(MemoryKvStore::new());
        let slot = BroadcastSlot::new(store.clone(), "global_message");

        slot.seed(r#"{"id":"A"}"#).await.unwrap();
        assert_eq!(slot.read().await.unwrap().as_deref(), Some(r#"{"id":"A"}"#));

        slot.clear().await.unwrap();
        assert_eq!(slot.read().await.unwrap(), None);
        // The key itself stays present, holding the empty string.
        assert_eq!(store.get("global_message").await.unwrap().as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_second_seed_overwrites_first() {
        let slot = BroadcastSlot::new(Arc::new(MemoryKvStore::new()), "global_message");

        slot.seed("m1").await.unwrap();
        slot.seed("m2").await.unwrap();
        assert_eq!(slot.read().await.unwrap().as_deref(), Some("m2"));
    }
}
