//! The unit of work executed by dispatcher workers.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use msghub_core::result::AppResult;

use crate::priority::JobPriority;

/// Boxed future produced by a job's work function.
pub type JobFuture = Pin<Box<dyn Future<Output = AppResult<()>> + Send>>;

type WorkFn = Box<dyn FnOnce() -> JobFuture + Send>;

/// A named, prioritized unit of work.
///
/// The payload is immutable once the job is enqueued; exactly one worker
/// drives the work function to completion. The work function is a
/// first-class value so handlers, parse stages, and periodic ticks all share
/// this one type.
pub struct Job {
    priority: JobPriority,
    name: String,
    payload: Vec<u8>,
    work: WorkFn,
}

impl Job {
    /// Create a job without a payload.
    pub fn new<F, Fut>(priority: JobPriority, name: impl Into<String>, work: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = AppResult<()>> + Send + 'static,
    {
        Self::with_payload(priority, name, Vec::new(), work)
    }

    /// Create a job carrying a payload.
    pub fn with_payload<F, Fut>(
        priority: JobPriority,
        name: impl Into<String>,
        payload: Vec<u8>,
        work: F,
    ) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = AppResult<()>> + Send + 'static,
    {
        Self {
            priority,
            name: name.into(),
            payload,
            work: Box::new(move || -> JobFuture { Box::pin(work()) }),
        }
    }

    /// The job's priority.
    pub fn priority(&self) -> JobPriority {
        self.priority
    }

    /// The job's name, used in logs and journal files.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The job's payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Consume the job, producing its work future.
    pub fn into_future(self) -> JobFuture {
        (self.work)()
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("priority", &self.priority)
            .field("name", &self.name)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_job_runs_work_function() {
        let job = Job::new(JobPriority::Normal, "noop", || async { Ok(()) });
        assert_eq!(job.name(), "noop");
        assert_eq!(job.priority(), JobPriority::Normal);
        assert!(job.into_future().await.is_ok());
    }

    #[tokio::test]
    async fn test_job_payload_is_readable() {
        let job = Job::with_payload(JobPriority::Low, "payload", vec![1, 2, 3], || async {
            Ok(())
        });
        assert_eq!(job.payload(), &[1, 2, 3]);
    }
}
