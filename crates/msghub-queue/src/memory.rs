//! In-memory work queue used by tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use msghub_core::error::AppError;
use msghub_core::result::AppResult;

use crate::{QueueConsumer, QueueEmitter};

/// Process-local work queue with the same blocking-pop shape as the Redis
/// backend.
#[derive(Debug, Default)]
pub struct MemoryWorkQueue {
    queues: Mutex<HashMap<String, VecDeque<String>>>,
    notify: Notify,
}

const POLL_TIMEOUT: Duration = Duration::from_millis(100);

impl MemoryWorkQueue {
    /// Create an empty queue set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries waiting in a queue.
    pub fn len(&self, queue: &str) -> usize {
        self.queues
            .lock()
            .map(|queues| queues.get(queue).map_or(0, VecDeque::len))
            .unwrap_or(0)
    }

    /// Whether a queue is empty.
    pub fn is_empty(&self, queue: &str) -> bool {
        self.len(queue) == 0
    }

    fn try_pop(&self, queue: &str) -> AppResult<Option<String>> {
        let mut queues = self
            .queues
            .lock()
            .map_err(|_| AppError::queue("work queue mutex poisoned"))?;
        Ok(queues.get_mut(queue).and_then(VecDeque::pop_front))
    }
}

#[async_trait]
impl QueueEmitter for MemoryWorkQueue {
    async fn publish(&self, queue: &str, payload: &str) -> AppResult<()> {
        {
            let mut queues = self
                .queues
                .lock()
                .map_err(|_| AppError::queue("work queue mutex poisoned"))?;
            queues
                .entry(queue.to_string())
                .or_default()
                .push_back(payload.to_string());
        }
        self.notify.notify_waiters();
        Ok(())
    }
}

#[async_trait]
impl QueueConsumer for MemoryWorkQueue {
    async fn next(&self, queue: &str) -> AppResult<Option<String>> {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if let Some(payload) = self.try_pop(queue)? {
            return Ok(Some(payload));
        }

        if tokio::time::timeout(POLL_TIMEOUT, notified).await.is_err() {
            return Ok(None);
        }

        self.try_pop(queue)
    }
}
