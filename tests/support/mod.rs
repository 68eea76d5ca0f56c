#![allow(dead_code)]

use std::{
    borrow::Cow,
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use promise_out::{Error, Executor, Failure, ReactionQueue, Task};

/// Installs a test-writer subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

/// Holds submitted tasks until the test runs them.
#[derive(Default)]
pub struct ManualExecutor {
    tasks: Mutex<VecDeque<Task>>,
}

impl ManualExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn pending(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    /// Runs the oldest task.
    pub fn run_next(&self) -> Result<(), Failure> {
        let task = self.tasks.lock().unwrap().pop_front().expect("no task queued");
        task()
    }

    /// Runs only the tasks queued right now, not the ones they submit.
    pub fn run_stage(&self) {
        let stage: Vec<Task> = self.tasks.lock().unwrap().drain(..).collect();
        for task in stage {
            task().expect("task failed");
        }
    }

    /// Runs tasks until none are left.
    pub fn run_all(&self) {
        loop {
            let task = self.tasks.lock().unwrap().pop_front();
            match task {
                Some(task) => task().expect("task failed"),
                None => break,
            }
        }
    }
}

impl Executor for ManualExecutor {
    fn execute(&self, task: Task) -> Result<(), Failure> {
        self.tasks.lock().unwrap().push_back(task);
        Ok(())
    }
}

/// A reaction queue that refuses every insert.
pub struct RefusingQueue<T> {
    inner: VecDeque<T>,
}

impl<T> RefusingQueue<T> {
    pub fn boxed() -> Box<Self> {
        Box::new(Self {
            inner: VecDeque::new(),
        })
    }
}

impl<T: Send> ReactionQueue<T> for RefusingQueue<T> {
    fn push(&mut self, _reaction: T) -> Result<(), Error> {
        Err(Error::IllegalState(Cow::Borrowed("queue refused reaction")))
    }

    fn pop(&mut self) -> Option<T> {
        self.inner.pop_front()
    }

    fn clear(&mut self) {
        self.inner.clear()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

/// Collects what reactions observe, in the order they fire.
#[derive(Clone)]
pub struct Log<T> {
    entries: Arc<Mutex<Vec<T>>>,
}

impl<T> Default for Log<T> {
    fn default() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T: Clone> Log<T> {
    pub fn push(&self, entry: T) {
        self.entries.lock().unwrap().push(entry)
    }

    pub fn entries(&self) -> Vec<T> {
        self.entries.lock().unwrap().clone()
    }
}
