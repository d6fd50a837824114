//! Dispatcher lifecycle and the periodic ticker primitive.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use msghub_core::config::DispatchConfig;
use msghub_core::error::AppError;
use msghub_core::result::AppResult;

use crate::job::{Job, JobFuture};
use crate::pool::JobPool;
use crate::priority::JobPriority;
use crate::worker::Worker;

const CREATED: u8 = 0;
const STARTED: u8 = 1;
const STOPPED: u8 = 2;

/// The priority-aware worker pool owned by every msghub process.
///
/// Lifecycle: Created → `start()` → Started → `stop()` → Stopped; no
/// transition returns to a prior state. Workers are added before `start`.
pub struct JobDispatcher {
    pool: Arc<JobPool>,
    workers: Mutex<Vec<Worker>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    state: AtomicU8,
}

impl std::fmt::Debug for JobDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobDispatcher")
            .field("state", &self.state.load(Ordering::SeqCst))
            .finish()
    }
}

impl JobDispatcher {
    /// Create a dispatcher with no workers.
    pub fn new() -> Self {
        Self {
            pool: Arc::new(JobPool::new()),
            workers: Mutex::new(Vec::new()),
            handles: Mutex::new(Vec::new()),
            state: AtomicU8::new(CREATED),
        }
    }

    /// Create a dispatcher with the standard worker taxonomy: `high` workers
    /// accepting {High}, `normal` workers accepting {Normal, High}, `low`
    /// workers accepting {Low}, and one dedicated LongTerm worker.
    pub fn with_taxonomy(config: &DispatchConfig) -> AppResult<Self> {
        let dispatcher = Self::new();

        for _ in 0..config.high_priority_count {
            dispatcher.add_worker(Worker::new(vec![JobPriority::High])?);
        }
        for _ in 0..config.normal_priority_count {
            dispatcher.add_worker(Worker::new(vec![
                JobPriority::Normal,
                JobPriority::High,
            ])?);
        }
        for _ in 0..config.low_priority_count {
            dispatcher.add_worker(Worker::new(vec![JobPriority::Low])?);
        }
        dispatcher.add_worker(Worker::new(vec![JobPriority::LongTerm])?);

        Ok(dispatcher)
    }

    /// Add a worker. Only meaningful before `start`.
    pub fn add_worker(&self, worker: Worker) {
        if let Ok(mut workers) = self.workers.lock() {
            workers.push(worker);
        }
    }

    /// Spawn all workers. Idempotent while Started; fails once Stopped or
    /// when no workers were added.
    pub fn start(&self) -> AppResult<()> {
        match self
            .state
            .compare_exchange(CREATED, STARTED, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => {}
            Err(STARTED) => return Ok(()),
            Err(_) => return Err(AppError::resource("Dispatcher is stopped")),
        }

        let workers = match self.workers.lock() {
            Ok(mut workers) => std::mem::take(&mut *workers),
            Err(_) => Vec::new(),
        };

        if workers.is_empty() {
            self.state.store(STOPPED, Ordering::SeqCst);
            return Err(AppError::resource("Dispatcher has no workers"));
        }

        let mut handles = self
            .handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let count = workers.len();
        for worker in workers {
            let pool = Arc::clone(&self.pool);
            handles.push(tokio::spawn(worker.run(pool)));
        }

        info!(workers = count, "Job dispatcher started");
        Ok(())
    }

    /// Enqueue a job. Fails when the dispatcher is stopped or the pool
    /// rejects the push.
    pub fn push(&self, job: Job) -> AppResult<()> {
        if self.state.load(Ordering::SeqCst) == STOPPED {
            return Err(AppError::resource("Dispatcher is stopped"));
        }
        self.pool.push(job)
    }

    /// Handle usable from inside a running job to re-enqueue work.
    pub fn job_pool(&self) -> Arc<JobPool> {
        Arc::clone(&self.pool)
    }

    /// Whether the dispatcher has been started and not yet stopped.
    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::SeqCst) == STARTED
    }

    /// Stop the dispatcher and join all workers.
    ///
    /// With `drain`, workers finish the current job and everything still
    /// queued; without it, they finish only their current job and the rest
    /// is discarded.
    pub async fn stop(&self, drain: bool) {
        let previous = self.state.swap(STOPPED, Ordering::SeqCst);
        if previous == STOPPED {
            return;
        }

        debug!(drain, "Stopping job dispatcher");
        self.pool.seal(!drain);

        let handles = {
            let mut guard = self
                .handles
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            std::mem::take(&mut *guard)
        };

        for handle in handles {
            let _ = handle.await;
        }

        info!("Job dispatcher stopped");
    }

    /// Run `tick` at a fixed cadence until the dispatcher stops.
    ///
    /// The tick executes as a job at the given priority, sleeps for `period`,
    /// then re-enqueues itself; the advisory pool lock ends the loop once
    /// `stop` has been requested.
    pub fn spawn_ticker<F, Fut>(
        &self,
        priority: JobPriority,
        period: Duration,
        name: impl Into<String>,
        tick: F,
    ) -> AppResult<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = AppResult<()>> + Send + 'static,
    {
        let tick: Arc<dyn Fn() -> JobFuture + Send + Sync> =
            Arc::new(move || -> JobFuture { Box::pin(tick()) });

        self.push(tick_job(
            Arc::clone(&self.pool),
            priority,
            period,
            name.into(),
            tick,
        ))
    }
}

impl Default for JobDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn tick_job(
    pool: Arc<JobPool>,
    priority: JobPriority,
    period: Duration,
    name: String,
    tick: Arc<dyn Fn() -> JobFuture + Send + Sync>,
) -> Job {
    let job_name = name.clone();

    Job::new(priority, job_name, move || async move {
        if let Err(e) = (*tick)().await {
            warn!(job = %name, error = %e, "Periodic job tick failed");
        }

        tokio::time::sleep(period).await;

        if pool.lock() {
            debug!(job = %name, "Dispatcher stopping; periodic job ends");
            return Ok(());
        }

        pool.push(tick_job(
            Arc::clone(&pool),
            priority,
            period,
            name.clone(),
            Arc::clone(&tick),
        ))?;

        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn taxonomy() -> DispatchConfig {
        DispatchConfig {
            high_priority_count: 1,
            normal_priority_count: 2,
            low_priority_count: 1,
            journal_root: String::new(),
        }
    }

    async fn wait_for(counter: &AtomicUsize, expected: usize) {
        for _ in 0..200 {
            if counter.load(Ordering::SeqCst) >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!(
            "counter stuck at {} (expected {expected})",
            counter.load(Ordering::SeqCst)
        );
    }

    #[tokio::test]
    async fn test_pushed_job_executes_exactly_once() {
        let dispatcher = JobDispatcher::with_taxonomy(&taxonomy()).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        let seen = Arc::clone(&counter);
        dispatcher
            .push(Job::new(JobPriority::Normal, "count", move || async move {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
            .unwrap();

        dispatcher.start().unwrap();
        wait_for(&counter, 1).await;

        dispatcher.stop(true).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_with_drain_runs_queued_jobs() {
        let dispatcher = JobDispatcher::with_taxonomy(&taxonomy()).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        dispatcher.start().unwrap();
        for i in 0..10 {
            let seen = Arc::clone(&counter);
            dispatcher
                .push(Job::new(
                    JobPriority::Low,
                    format!("drain-{i}"),
                    move || async move {
                        seen.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    },
                ))
                .unwrap();
        }

        dispatcher.stop(true).await;
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_push_after_stop_fails() {
        let dispatcher = JobDispatcher::with_taxonomy(&taxonomy()).unwrap();
        dispatcher.start().unwrap();
        dispatcher.stop(false).await;

        let result = dispatcher.push(Job::new(JobPriority::High, "late", || async { Ok(()) }));
        assert!(result.is_err());
        assert!(!dispatcher.is_running());
    }

    #[tokio::test]
    async fn test_start_is_idempotent_while_started() {
        let dispatcher = JobDispatcher::with_taxonomy(&taxonomy()).unwrap();
        dispatcher.start().unwrap();
        dispatcher.start().unwrap();
        dispatcher.stop(false).await;
    }

    #[tokio::test]
    async fn test_start_without_workers_fails() {
        let dispatcher = JobDispatcher::new();
        assert!(dispatcher.start().is_err());
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_kill_worker() {
        let dispatcher = JobDispatcher::with_taxonomy(&taxonomy()).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        dispatcher.start().unwrap();
        dispatcher
            .push(Job::new(JobPriority::Normal, "boom", || async {
                panic!("handler exploded");
            }))
            .unwrap();

        let seen = Arc::clone(&counter);
        dispatcher
            .push(Job::new(JobPriority::Normal, "after", move || async move {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
            .unwrap();

        wait_for(&counter, 1).await;
        dispatcher.stop(false).await;
    }

    #[tokio::test]
    async fn test_ticker_reposts_until_stop() {
        let dispatcher = JobDispatcher::with_taxonomy(&taxonomy()).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        dispatcher.start().unwrap();
        let seen = Arc::clone(&counter);
        dispatcher
            .spawn_ticker(
                JobPriority::High,
                Duration::from_millis(5),
                "tick",
                move || {
                    let seen = Arc::clone(&seen);
                    async move {
                        seen.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                },
            )
            .unwrap();

        wait_for(&counter, 3).await;
        dispatcher.stop(false).await;

        let after_stop = counter.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(counter.load(Ordering::SeqCst), after_stop);
    }
}
