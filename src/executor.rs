//! Where reactions run.
//!
//! Every reaction a promise fires is handed to an [`Executor`] as a [`Task`].
//! The promise never assumes anything about ordering between unrelated
//! submissions, nor whether a task runs before `execute` returns.
use std::sync::Arc;

use futures::executor::ThreadPool;
use tracing::warn;

use crate::{failure::guarded, Failure};

/// One unit of work. A task that fails reports it through its return value.
pub type Task = Box<dyn FnOnce() -> Result<(), Failure> + Send + 'static>;

pub trait Executor: Send + Sync {
    /// Submits `task`. An executor that runs the task inline returns the
    /// task's own result; a deferred executor returns `Ok(())` once the task
    /// is accepted.
    fn execute(&self, task: Task) -> Result<(), Failure>;
}

/// Runs every task on the calling thread before `execute` returns.
#[derive(Debug, Default, Clone, Copy)]
pub struct Inline;

impl Executor for Inline {
    fn execute(&self, task: Task) -> Result<(), Failure> {
        task()
    }
}

/// The default executor used by constructors that do not take one.
pub fn inline() -> Arc<dyn Executor> {
    Arc::new(Inline)
}

/// Submits `reaction` with `item` as one task, catching panics.
pub(crate) fn submit<T>(
    executor: &dyn Executor,
    item: T,
    reaction: Box<dyn FnOnce(T) -> Result<(), Failure> + Send + 'static>,
) -> Result<(), Failure>
where
    T: Send + 'static,
{
    executor.execute(Box::new(move || guarded(move || reaction(item))))
}

/// Tasks run on the pool; a task failure has no caller left to report to,
/// so it is logged.
impl Executor for ThreadPool {
    fn execute(&self, task: Task) -> Result<(), Failure> {
        self.spawn_ok(async move {
            if let Err(failure) = task() {
                warn!(target: "promise_out", failure = %failure, "task failed on thread pool");
            }
        });
        Ok(())
    }
}
