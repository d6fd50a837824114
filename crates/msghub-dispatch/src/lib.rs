//! Priority-aware job dispatcher.
//!
//! Every msghub process schedules its parsing, execution, and periodic work
//! through one [`JobDispatcher`]: a fixed pool of workers, each bound to a
//! subset of priorities, draining a shared multi-priority [`JobPool`].
//! Transport, queue, and key/value clients keep their own I/O tasks and
//! enter the core only by pushing jobs here.

pub mod dispatcher;
pub mod job;
pub mod journal;
pub mod pool;
pub mod priority;
pub mod worker;

pub use dispatcher::JobDispatcher;
pub use job::{Job, JobFuture};
pub use journal::JobJournal;
pub use pool::JobPool;
pub use priority::JobPriority;
pub use worker::Worker;
