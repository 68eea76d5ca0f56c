//! The public promise handle.
use std::{fmt, sync::Arc};

use tracing::warn;

use crate::{
    executor::{inline, Executor, Task},
    failure::guarded,
    pending::{Resolver, Shared},
    queue::{FailureReaction, ReactionQueue, ValueReaction},
    settled::{Rejected, Resolved},
    Error, Failure, ReactionOutcome,
};

/// A value that settles at most once, with either a `V` or a [`Failure`].
///
/// Cloning a promise clones the handle; every clone observes the same
/// settlement. Side-effecting attachments ([`then`](Promise::then),
/// [`catch`](Promise::catch), [`finally`](Promise::finally)) return the same
/// promise. Transforming attachments ([`map`](Promise::map),
/// [`recover`](Promise::recover), [`finally_with`](Promise::finally_with))
/// return a new one.
///
/// # Examples
///
/// ```
/// use promise_out::{Failure, Promise};
/// use std::sync::{Arc, Mutex};
///
/// let log = Arc::new(Mutex::new(Vec::new()));
/// let sink = log.clone();
/// Promise::<u32>::rejected(Failure::msg("timeout"))
///     .map(|value| Ok(value * 2))
///     .recover(|failure| Ok(failure.to_string().len() as u32))
///     .then(move |value| sink.lock().unwrap().push(value))
///     .unwrap();
/// assert_eq!(*log.lock().unwrap(), vec![7]);
/// ```
pub struct Promise<V> {
    repr: Repr<V>,
}

enum Repr<V> {
    Pending(Arc<Shared<V>>),
    Resolved(Resolved<V>),
    Rejected(Rejected),
    Never,
}

impl<V: Clone> Clone for Promise<V> {
    fn clone(&self) -> Self {
        let repr = match &self.repr {
            Repr::Pending(shared) => Repr::Pending(Arc::clone(shared)),
            Repr::Resolved(resolved) => Repr::Resolved(resolved.clone()),
            Repr::Rejected(rejected) => Repr::Rejected(rejected.clone()),
            Repr::Never => Repr::Never,
        };
        Self { repr }
    }
}

impl<V> fmt::Debug for Promise<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.repr {
            Repr::Pending(_) => "pending",
            Repr::Resolved(_) => "resolved",
            Repr::Rejected(_) => "rejected",
            Repr::Never => "never",
        };
        f.debug_struct("Promise").field("kind", &kind).finish()
    }
}

impl<V> Promise<V>
where
    V: Clone + Send + 'static,
{
    /// A promise already resolved with `value`, reacting inline.
    pub fn resolved(value: V) -> Self {
        Self::resolved_on(value, inline())
    }

    pub fn resolved_on(value: V, executor: Arc<dyn Executor>) -> Self {
        Self {
            repr: Repr::Resolved(Resolved::new(value, executor)),
        }
    }

    /// A promise already rejected with `failure`, reacting inline.
    pub fn rejected(failure: impl Into<Failure>) -> Self {
        Self::rejected_on(failure, inline())
    }

    pub fn rejected_on(failure: impl Into<Failure>, executor: Arc<dyn Executor>) -> Self {
        Self {
            repr: Repr::Rejected(Rejected::new(failure.into(), executor)),
        }
    }

    /// A promise that never settles. Nothing attached to it ever fires.
    pub fn never() -> Self {
        Self { repr: Repr::Never }
    }

    /// A pending promise whose producer runs inline, right now.
    ///
    /// See [`Promise::new_on`].
    pub fn new<P, R>(producer: P) -> Self
    where
        P: FnOnce(Resolver<V>) -> R + Send + 'static,
        R: ReactionOutcome,
    {
        Self::new_on(inline(), producer)
    }

    /// A pending promise. `producer` is submitted to `executor` as one task
    /// and receives the promise's [`Resolver`].
    ///
    /// A producer that fails (returns an error or panics) rejects the
    /// promise if it is still pending; otherwise the failure is logged.
    pub fn new_on<P, R>(executor: Arc<dyn Executor>, producer: P) -> Self
    where
        P: FnOnce(Resolver<V>) -> R + Send + 'static,
        R: ReactionOutcome,
    {
        Self::start(Shared::with_default_queues(executor), producer)
    }

    /// Like [`Promise::new_on`], with caller-supplied reaction queues.
    pub fn with_queues<P, R>(
        executor: Arc<dyn Executor>,
        on_value: Box<dyn ReactionQueue<ValueReaction<V>>>,
        on_failure: Box<dyn ReactionQueue<FailureReaction>>,
        producer: P,
    ) -> Self
    where
        P: FnOnce(Resolver<V>) -> R + Send + 'static,
        R: ReactionOutcome,
    {
        Self::start(Shared::new(executor, on_value, on_failure), producer)
    }

    fn start<P, R>(shared: Arc<Shared<V>>, producer: P) -> Self
    where
        P: FnOnce(Resolver<V>) -> R + Send + 'static,
        R: ReactionOutcome,
    {
        let resolver = Resolver::new(Arc::clone(&shared));
        let cell = Arc::clone(&shared);
        let task: Task = Box::new(move || {
            let failure = match guarded(move || producer(resolver).into_outcome()) {
                Ok(()) => return Ok(()),
                Err(failure) => failure,
            };
            match cell.try_settle(Err(failure.clone())) {
                Ok(true) => Ok(()),
                Ok(false) => {
                    warn!(target: "promise_out", failure = %failure, "producer failed after settling");
                    Ok(())
                }
                Err(error) => Err(error.into_failure()),
            }
        });
        if let Err(failure) = shared.executor().execute(task) {
            warn!(target: "promise_out", failure = %failure, "producer task failed");
        }
        Self {
            repr: Repr::Pending(shared),
        }
    }

    /// Whether the promise has settled. A [`Promise::never`] never has.
    pub fn is_settled(&self) -> bool {
        match &self.repr {
            Repr::Pending(shared) => shared.is_settled(),
            Repr::Resolved(_) | Repr::Rejected(_) => true,
            Repr::Never => false,
        }
    }

    /// Calls `reaction` with the value once the promise resolves. Never
    /// called if it rejects.
    ///
    /// Fails if the reaction had to run right away and failed inline, or if
    /// the reaction queue refused it.
    pub fn then<F, R>(&self, reaction: F) -> Result<&Self, Error>
    where
        F: FnOnce(V) -> R + Send + 'static,
        R: ReactionOutcome,
    {
        let reaction: ValueReaction<V> = Box::new(move |value| reaction(value).into_outcome());
        match &self.repr {
            Repr::Pending(shared) => shared.on_value(reaction)?,
            Repr::Resolved(resolved) => resolved.then(reaction)?,
            Repr::Rejected(_) | Repr::Never => {}
        }
        Ok(self)
    }

    /// A promise of `transform` applied to this promise's value.
    ///
    /// If this promise rejects, so does the returned one, with the same
    /// failure, and `transform` never runs.
    pub fn map<W, F>(&self, transform: F) -> Promise<W>
    where
        W: Clone + Send + 'static,
        F: FnOnce(V) -> Result<W, Failure> + Send + 'static,
    {
        match &self.repr {
            Repr::Pending(shared) => {
                let source = self.clone();
                Promise::<W>::new_on(Arc::clone(shared.executor()), move |resolver| {
                    let resolver = Arc::new(resolver);
                    let forward = Arc::clone(&resolver);
                    source.then(move |value| {
                        resolver
                            .settle(guarded(move || transform(value)))
                            .map_err(Error::into_failure)
                    })?;
                    source.catch(move |failure| forward.reject(failure).map_err(Error::into_failure))?;
                    Ok::<(), Error>(())
                })
            }
            Repr::Resolved(resolved) => resolved.map(transform),
            Repr::Rejected(rejected) => rejected.propagate(),
            Repr::Never => Promise::never(),
        }
    }

    /// Calls `reaction` with the failure once the promise rejects. Never
    /// called if it resolves.
    pub fn catch<F, R>(&self, reaction: F) -> Result<&Self, Error>
    where
        F: FnOnce(Failure) -> R + Send + 'static,
        R: ReactionOutcome,
    {
        let reaction: FailureReaction = Box::new(move |failure| reaction(failure).into_outcome());
        match &self.repr {
            Repr::Pending(shared) => shared.on_failure(reaction)?,
            Repr::Rejected(rejected) => rejected.catch(reaction)?,
            Repr::Resolved(_) | Repr::Never => {}
        }
        Ok(self)
    }

    /// A promise that resolves with this promise's value, or, if this
    /// promise rejects, with whatever `transform` makes of the failure.
    pub fn recover<F>(&self, transform: F) -> Promise<V>
    where
        F: FnOnce(Failure) -> Result<V, Failure> + Send + 'static,
    {
        match &self.repr {
            Repr::Pending(shared) => {
                let source = self.clone();
                Promise::<V>::new_on(Arc::clone(shared.executor()), move |resolver| {
                    let resolver = Arc::new(resolver);
                    let forward = Arc::clone(&resolver);
                    source.catch(move |failure| {
                        resolver
                            .settle(guarded(move || transform(failure)))
                            .map_err(Error::into_failure)
                    })?;
                    source.then(move |value| forward.resolve(value).map_err(Error::into_failure))?;
                    Ok::<(), Error>(())
                })
            }
            Repr::Resolved(resolved) => Promise {
                repr: Repr::Resolved(resolved.clone()),
            },
            Repr::Rejected(rejected) => rejected.recover(transform),
            Repr::Never => Promise::never(),
        }
    }

    /// Calls `reaction` once the promise settles either way. The outcome is
    /// neither observed nor changed.
    pub fn finally<F, R>(&self, reaction: F) -> Result<&Self, Error>
    where
        F: FnOnce() -> R + Send + 'static,
        R: ReactionOutcome,
    {
        let reaction: Box<dyn FnOnce() -> Result<(), Failure> + Send> =
            Box::new(move || reaction().into_outcome());
        match &self.repr {
            Repr::Pending(shared) => shared.on_settled(reaction)?,
            Repr::Resolved(resolved) => resolved.finally(reaction)?,
            Repr::Rejected(rejected) => rejected.finally(reaction)?,
            Repr::Never => {}
        }
        Ok(self)
    }

    /// A promise of whatever `supplier` produces once this promise settles
    /// either way.
    ///
    /// Only the supplier's own result reaches the returned promise: a
    /// rejection of this promise is not carried over.
    pub fn finally_with<W, F>(&self, supplier: F) -> Promise<W>
    where
        W: Clone + Send + 'static,
        F: FnOnce() -> Result<W, Failure> + Send + 'static,
    {
        match &self.repr {
            Repr::Pending(shared) => {
                let source = self.clone();
                Promise::<W>::new_on(Arc::clone(shared.executor()), move |resolver| {
                    source.finally(move || resolver.settle(guarded(supplier)).map_err(Error::into_failure))?;
                    Ok::<(), Error>(())
                })
            }
            Repr::Resolved(resolved) => resolved.finally_with(supplier),
            Repr::Rejected(rejected) => rejected.finally_with(supplier),
            Repr::Never => Promise::never(),
        }
    }
}
