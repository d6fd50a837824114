//! Redis-list work queue.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::{debug, info};

use msghub_core::config::QueueConfig;
use msghub_core::error::{AppError, ErrorKind};
use msghub_core::result::AppResult;

use crate::{QueueConsumer, QueueEmitter};

/// Work queue backed by a Redis list.
///
/// `publish` appends with RPUSH; `next` takes from the head with a 1-second
/// BLPOP so consumer shutdown is never blocked for long. Retention is the
/// list itself: entries survive until a consumer takes them.
#[derive(Clone)]
pub struct RedisWorkQueue {
    conn: ConnectionManager,
}

impl std::fmt::Debug for RedisWorkQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisWorkQueue").finish_non_exhaustive()
    }
}

const POLL_TIMEOUT_SECS: f64 = 1.0;

impl RedisWorkQueue {
    /// Connect the queue backend from configuration.
    pub async fn connect(config: &QueueConfig) -> AppResult<Self> {
        info!(queue = %config.consume_queue_name, "Connecting work queue");

        let client = Client::open(config.queue_url.as_str()).map_err(|e| {
            AppError::with_source(ErrorKind::Queue, "Failed to create work-queue client", e)
        })?;

        let conn = ConnectionManager::new(client).await.map_err(|e| {
            AppError::with_source(ErrorKind::Queue, "Failed to connect work queue", e)
        })?;

        info!("Work queue connected");
        Ok(Self { conn })
    }

    fn map_err(e: redis::RedisError) -> AppError {
        AppError::with_source(ErrorKind::Queue, format!("Work-queue error: {e}"), e)
    }
}

#[async_trait]
impl QueueEmitter for RedisWorkQueue {
    async fn publish(&self, queue: &str, payload: &str) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let length: i64 = conn.rpush(queue, payload).await.map_err(Self::map_err)?;
        debug!(queue, length, "Published message to work queue");
        Ok(())
    }
}

#[async_trait]
impl QueueConsumer for RedisWorkQueue {
    async fn next(&self, queue: &str) -> AppResult<Option<String>> {
        let mut conn = self.conn.clone();
        let entry: Option<(String, String)> = conn
            .blpop(queue, POLL_TIMEOUT_SECS)
            .await
            .map_err(Self::map_err)?;
        Ok(entry.map(|(_, payload)| payload))
    }
}
