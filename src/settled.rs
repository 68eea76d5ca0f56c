//! Promises that are already settled when they are built.
//!
//! They hold no lock and no queue: a matching reaction is submitted on the
//! spot and a non-matching one is dropped. Transforms still go through a
//! fresh pending promise so the transform itself runs on the executor,
//! exactly as it would for a pending promise that had already settled.
use std::sync::Arc;

use crate::{
    executor::{submit, Executor},
    failure::guarded,
    queue::{FailureReaction, ValueReaction},
    Error, Failure, Promise,
};

type SettledReaction = Box<dyn FnOnce() -> Result<(), Failure> + Send + 'static>;

fn run_now(executor: &dyn Executor, reaction: SettledReaction) -> Result<(), Error> {
    submit(executor, (), Box::new(move |()| reaction())).map_err(Error::Reaction)
}

fn supply<W, F>(executor: &Arc<dyn Executor>, supplier: F) -> Promise<W>
where
    W: Clone + Send + 'static,
    F: FnOnce() -> Result<W, Failure> + Send + 'static,
{
    Promise::<W>::new_on(Arc::clone(executor), move |resolver| {
        resolver.settle(guarded(supplier))
    })
}

#[derive(Clone)]
pub(crate) struct Resolved<V> {
    value: V,
    executor: Arc<dyn Executor>,
}

impl<V> Resolved<V>
where
    V: Clone + Send + 'static,
{
    pub(crate) fn new(value: V, executor: Arc<dyn Executor>) -> Self {
        Self { value, executor }
    }

    pub(crate) fn then(&self, reaction: ValueReaction<V>) -> Result<(), Error> {
        submit(&*self.executor, self.value.clone(), reaction).map_err(Error::Reaction)
    }

    pub(crate) fn map<W, F>(&self, transform: F) -> Promise<W>
    where
        W: Clone + Send + 'static,
        F: FnOnce(V) -> Result<W, Failure> + Send + 'static,
    {
        let value = self.value.clone();
        supply(&self.executor, move || transform(value))
    }

    pub(crate) fn finally(&self, reaction: SettledReaction) -> Result<(), Error> {
        run_now(&*self.executor, reaction)
    }

    pub(crate) fn finally_with<W, F>(&self, supplier: F) -> Promise<W>
    where
        W: Clone + Send + 'static,
        F: FnOnce() -> Result<W, Failure> + Send + 'static,
    {
        supply(&self.executor, supplier)
    }
}

#[derive(Clone)]
pub(crate) struct Rejected {
    failure: Failure,
    executor: Arc<dyn Executor>,
}

impl Rejected {
    pub(crate) fn new(failure: Failure, executor: Arc<dyn Executor>) -> Self {
        Self { failure, executor }
    }

    pub(crate) fn catch(&self, reaction: FailureReaction) -> Result<(), Error> {
        submit(&*self.executor, self.failure.clone(), reaction).map_err(Error::Reaction)
    }

    /// The same failure, for a transform that never runs.
    pub(crate) fn propagate<W>(&self) -> Promise<W>
    where
        W: Clone + Send + 'static,
    {
        Promise::rejected_on(self.failure.clone(), Arc::clone(&self.executor))
    }

    pub(crate) fn recover<V, F>(&self, transform: F) -> Promise<V>
    where
        V: Clone + Send + 'static,
        F: FnOnce(Failure) -> Result<V, Failure> + Send + 'static,
    {
        let failure = self.failure.clone();
        supply(&self.executor, move || transform(failure))
    }

    pub(crate) fn finally(&self, reaction: SettledReaction) -> Result<(), Error> {
        run_now(&*self.executor, reaction)
    }

    pub(crate) fn finally_with<W, F>(&self, supplier: F) -> Promise<W>
    where
        W: Clone + Send + 'static,
        F: FnOnce() -> Result<W, Failure> + Send + 'static,
    {
        supply(&self.executor, supplier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::inline;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    #[test]
    fn test_resolved_dispatches_immediately() {
        let resolved = Resolved::new(5, inline());
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        resolved
            .then(Box::new(move |value| {
                *sink.lock().unwrap() = Some(value);
                Ok(())
            }))
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), Some(5));
    }

    #[test]
    fn test_resolved_reaction_failure_is_returned() {
        let resolved = Resolved::new(5, inline());
        let error = resolved
            .then(Box::new(|_| Err(Failure::msg("reaction failed"))))
            .unwrap_err();
        assert_eq!(error.to_string(), "reaction failed");
    }

    #[test]
    fn test_rejected_runs_finally_and_catch() {
        let rejected = Rejected::new(Failure::msg("E"), inline());
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        rejected
            .finally(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
            .unwrap();
        let counter = Arc::clone(&fired);
        rejected
            .catch(Box::new(move |failure| {
                assert_eq!(failure.to_string(), "E");
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
            .unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_rejected_recover_builds_settled_promise() {
        let rejected = Rejected::new(Failure::msg("E"), inline());
        let recovered = rejected.recover(|failure| Ok(failure.to_string().len()));
        assert!(recovered.is_settled());
        let propagated: Promise<u8> = rejected.propagate();
        assert!(propagated.is_settled());
    }
}
