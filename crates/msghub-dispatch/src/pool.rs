//! The shared multi-priority job store inside a dispatcher.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Notify;

use msghub_core::error::AppError;
use msghub_core::result::AppResult;

use crate::job::Job;
use crate::priority::JobPriority;

/// One FIFO per priority, shared by all workers of a dispatcher.
///
/// Handles to the pool are handed into running jobs so periodic work can
/// re-enqueue itself; [`JobPool::lock`] is the advisory liveness check such
/// jobs perform before reposting.
#[derive(Debug)]
pub struct JobPool {
    state: Mutex<PoolState>,
    notify: Notify,
}

#[derive(Debug)]
struct PoolState {
    queues: [VecDeque<Job>; 4],
    sealed: bool,
}

impl JobPool {
    /// Create an empty, accepting pool.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PoolState {
                queues: std::array::from_fn(|_| VecDeque::new()),
                sealed: false,
            }),
            notify: Notify::new(),
        }
    }

    /// Append a job to the FIFO of its priority and wake waiting workers.
    pub fn push(&self, job: Job) -> AppResult<()> {
        {
            let mut state = self
                .state
                .lock()
                .map_err(|_| AppError::resource("job pool mutex poisoned"))?;

            if state.sealed {
                return Err(AppError::resource("job pool is locked"));
            }

            let index = job.priority().index();
            state.queues[index].push_back(job);
        }

        // Wake every waiter: only workers accepting this priority will take
        // the job, the rest re-check and go back to sleep.
        self.notify.notify_waiters();
        Ok(())
    }

    /// Advisory check: `true` when the pool currently rejects new pushes.
    pub fn lock(&self) -> bool {
        match self.state.lock() {
            Ok(state) => state.sealed,
            Err(_) => true,
        }
    }

    /// Number of queued jobs across all priorities.
    pub fn pending(&self) -> usize {
        match self.state.lock() {
            Ok(state) => state.queues.iter().map(VecDeque::len).sum(),
            Err(_) => 0,
        }
    }

    /// Stop accepting pushes. With `discard`, queued jobs are dropped so
    /// workers exit after their current job; without it, workers drain what
    /// is already queued.
    pub fn seal(&self, discard: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.sealed = true;
            if discard {
                for queue in state.queues.iter_mut() {
                    queue.clear();
                }
            }
        }
        self.notify.notify_waiters();
    }

    /// Take the highest-priority queued job among `accepts`, waiting until
    /// one arrives. Returns `None` once the pool is sealed and has nothing
    /// left for this caller.
    pub async fn pop(&self, accepts: &[JobPriority]) -> Option<Job> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking state so a push between the check and
            // the await is not lost.
            notified.as_mut().enable();

            {
                let mut state = self.state.lock().ok()?;

                for priority in JobPriority::DESCENDING {
                    if !accepts.contains(&priority) {
                        continue;
                    }
                    if let Some(job) = state.queues[priority.index()].pop_front() {
                        return Some(job);
                    }
                }

                if state.sealed {
                    return None;
                }
            }

            notified.await;
        }
    }
}

impl Default for JobPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_job(priority: JobPriority, name: &str) -> Job {
        Job::new(priority, name, || async { Ok(()) })
    }

    #[tokio::test]
    async fn test_pop_prefers_higher_priority() {
        let pool = JobPool::new();
        pool.push(noop_job(JobPriority::Normal, "normal")).unwrap();
        pool.push(noop_job(JobPriority::High, "high")).unwrap();
        pool.push(noop_job(JobPriority::Low, "low")).unwrap();

        let accepts = [JobPriority::Normal, JobPriority::High];
        let first = pool.pop(&accepts).await.unwrap();
        assert_eq!(first.name(), "high");
        let second = pool.pop(&accepts).await.unwrap();
        assert_eq!(second.name(), "normal");

        // The Low job is invisible to this worker.
        assert_eq!(pool.pending(), 1);
    }

    #[tokio::test]
    async fn test_push_fails_when_sealed() {
        let pool = JobPool::new();
        assert!(!pool.lock());

        pool.seal(false);
        assert!(pool.lock());
        assert!(pool.push(noop_job(JobPriority::High, "late")).is_err());
    }

    #[tokio::test]
    async fn test_sealed_pool_drains_then_ends() {
        let pool = JobPool::new();
        pool.push(noop_job(JobPriority::Low, "queued")).unwrap();
        pool.seal(false);

        let accepts = [JobPriority::Low];
        assert!(pool.pop(&accepts).await.is_some());
        assert!(pool.pop(&accepts).await.is_none());
    }

    #[tokio::test]
    async fn test_seal_with_discard_drops_queued_jobs() {
        let pool = JobPool::new();
        pool.push(noop_job(JobPriority::Normal, "doomed")).unwrap();
        pool.seal(true);

        assert_eq!(pool.pending(), 0);
        assert!(pool.pop(&[JobPriority::Normal]).await.is_none());
    }

    #[tokio::test]
    async fn test_pop_wakes_on_push() {
        let pool = std::sync::Arc::new(JobPool::new());

        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.pop(&[JobPriority::High]).await })
        };

        tokio::task::yield_now().await;
        pool.push(noop_job(JobPriority::High, "wakeup")).unwrap();

        let job = waiter.await.unwrap().unwrap();
        assert_eq!(job.name(), "wakeup");
    }
}
