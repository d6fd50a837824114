//! Worker tasks draining the job pool.

use std::sync::Arc;

use tracing::{error, trace, warn};

use msghub_core::error::AppError;
use msghub_core::result::AppResult;

use crate::pool::JobPool;
use crate::priority::JobPriority;

/// A worker bound to a non-empty subset of priorities.
///
/// Workers consume only jobs whose priority is in their accepted set, always
/// taking the most urgent available. Each runs as its own long-lived task
/// once the dispatcher starts.
#[derive(Debug, Clone)]
pub struct Worker {
    accepts: Vec<JobPriority>,
}

impl Worker {
    /// Create a worker. Fails when the accepted set is empty.
    pub fn new(accepts: Vec<JobPriority>) -> AppResult<Self> {
        if accepts.is_empty() {
            return Err(AppError::resource(
                "Worker requires at least one accepted priority",
            ));
        }
        Ok(Self { accepts })
    }

    /// The priorities this worker consumes.
    pub fn accepts(&self) -> &[JobPriority] {
        &self.accepts
    }

    /// Drain the pool until it is sealed and empty for this worker.
    ///
    /// Each job runs inside its own task so a panicking handler is caught
    /// here, logged, and the worker continues with the next job.
    pub(crate) async fn run(self, pool: Arc<JobPool>) {
        while let Some(job) = pool.pop(&self.accepts).await {
            let name = job.name().to_string();

            let handle = tokio::spawn(async move { job.into_future().await });

            match handle.await {
                Ok(Ok(())) => trace!(job = %name, "Job completed"),
                Ok(Err(e)) => warn!(job = %name, error = %e, "Job failed"),
                Err(e) if e.is_panic() => {
                    error!(job = %name, "Job panicked; worker continues")
                }
                Err(_) => warn!(job = %name, "Job cancelled"),
            }
        }
    }
}
