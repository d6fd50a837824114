//! Work-queue configuration.

use serde::{Deserialize, Serialize};

/// Durable work-queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Queue backend connection URL.
    #[serde(default = "default_url")]
    pub queue_url: String,
    /// Name of the queue drained by the consumer and fed by the gateway.
    #[serde(default = "default_queue_name")]
    pub consume_queue_name: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            queue_url: default_url(),
            consume_queue_name: default_queue_name(),
        }
    }
}

fn default_url() -> String {
    "redis://127.0.0.1:6379/1".to_string()
}

fn default_queue_name() -> String {
    "main_server_queue".to_string()
}
