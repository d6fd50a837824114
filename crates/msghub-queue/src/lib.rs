//! Durable work-queue boundary.
//!
//! The gateway publishes enriched client messages here; the consumer process
//! drains them. Only the operations the fabric invokes are modeled:
//! `publish` and a blocking-with-timeout `next`. The production backend is a
//! Redis list (RPUSH / BLPOP); an in-memory backend serves tests.

pub mod memory;
pub mod redis_queue;

use async_trait::async_trait;

use msghub_core::result::AppResult;

pub use memory::MemoryWorkQueue;
pub use redis_queue::RedisWorkQueue;

/// Producer side of the work queue.
#[async_trait]
pub trait QueueEmitter: Send + Sync + std::fmt::Debug + 'static {
    /// Append a payload to the named queue.
    async fn publish(&self, queue: &str, payload: &str) -> AppResult<()>;
}

/// Consumer side of the work queue.
#[async_trait]
pub trait QueueConsumer: Send + Sync + std::fmt::Debug + 'static {
    /// Take the next payload from the named queue, waiting up to the
    /// backend's poll timeout. `None` means the wait elapsed with nothing
    /// delivered; callers loop.
    async fn next(&self, queue: &str) -> AppResult<Option<String>>;
}
