//! Key/value store configuration.

use serde::{Deserialize, Serialize};

/// Redis connection and key settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether the process connects to the key/value store.
    #[serde(default)]
    pub use_redis: bool,
    /// Redis connection URL.
    #[serde(default = "default_url")]
    pub redis_url: String,
    /// TTL for per-session status keys, in seconds.
    #[serde(default = "default_ttl")]
    pub redis_ttl_sec: u64,
    /// Key holding the single-slot broadcast rendezvous.
    #[serde(default = "default_global_message_key")]
    pub global_message_key: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            use_redis: false,
            redis_url: default_url(),
            redis_ttl_sec: default_ttl(),
            global_message_key: default_global_message_key(),
        }
    }
}

fn default_url() -> String {
    "redis://127.0.0.1:6379/0".to_string()
}

fn default_ttl() -> u64 {
    3600
}

fn default_global_message_key() -> String {
    "global_message".to_string()
}
