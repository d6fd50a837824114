//! Connection pool indexed by session key.

use std::sync::Arc;

use dashmap::DashMap;

use msghub_core::types::SessionKey;

use crate::handle::ConnectionHandle;

/// Thread-safe pool of all live gateway connections.
#[derive(Debug, Default)]
pub struct ConnectionPool {
    connections: DashMap<SessionKey, Arc<ConnectionHandle>>,
}

impl ConnectionPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection.
    pub fn add(&self, handle: Arc<ConnectionHandle>) {
        self.connections.insert(handle.key.clone(), handle);
    }

    /// Remove a connection, returning its handle when present.
    pub fn remove(&self, key: &SessionKey) -> Option<Arc<ConnectionHandle>> {
        self.connections.remove(key).map(|(_, handle)| handle)
    }

    /// Look up a connection.
    pub fn get(&self, key: &SessionKey) -> Option<Arc<ConnectionHandle>> {
        self.connections.get(key).map(|entry| entry.value().clone())
    }

    /// All live connections.
    pub fn all(&self) -> Vec<Arc<ConnectionHandle>> {
        self.connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
