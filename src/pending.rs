//! The general promise: a shared cell that starts pending and settles once.
//!
//! The [`Resolver`] and every [`Promise`](crate::Promise) handle point at
//! the same `Shared` cell. Its lock guards the outcome together with both
//! reaction queues, and is never held while a reaction runs.
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tracing::{debug, trace};

use crate::{
    executor::{submit, Executor},
    queue::{self, FailureReaction, ReactionQueue, ValueReaction},
    Error, Failure,
};

pub(crate) struct Shared<V> {
    executor: Arc<dyn Executor>,
    state: Mutex<State<V>>,
}

struct State<V> {
    outcome: Option<Result<V, Failure>>,
    on_value: Box<dyn ReactionQueue<ValueReaction<V>>>,
    on_failure: Box<dyn ReactionQueue<FailureReaction>>,
}

/// Reactions taken out of the queues by the settling call.
enum Drained<V> {
    Value(V, Vec<ValueReaction<V>>),
    Failure(Failure, Vec<FailureReaction>),
}

/// Reactions never run under the lock, so a poisoned lock still guards
/// consistent state.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Hands each reaction to the executor in order. The first failure is kept
/// and every later one is suppressed onto it.
fn dispatch_all<T>(
    executor: &dyn Executor,
    item: T,
    reactions: Vec<Box<dyn FnOnce(T) -> Result<(), Failure> + Send + 'static>>,
) -> Result<(), Failure>
where
    T: Clone + Send + 'static,
{
    let mut first: Option<Failure> = None;
    let mut suppressed = Vec::new();
    for reaction in reactions {
        if let Err(failure) = submit(executor, item.clone(), reaction) {
            if first.is_none() {
                first = Some(failure);
            } else {
                suppressed.push(failure);
            }
        }
    }
    match first {
        None => Ok(()),
        Some(failure) => Err(failure.with_suppressed(suppressed)),
    }
}

impl<V> Shared<V>
where
    V: Clone + Send + 'static,
{
    pub(crate) fn new(
        executor: Arc<dyn Executor>,
        on_value: Box<dyn ReactionQueue<ValueReaction<V>>>,
        on_failure: Box<dyn ReactionQueue<FailureReaction>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            executor,
            state: Mutex::new(State {
                outcome: None,
                on_value,
                on_failure,
            }),
        })
    }

    pub(crate) fn with_default_queues(executor: Arc<dyn Executor>) -> Arc<Self> {
        Self::new(
            executor,
            Box::new(VecDeque::new()),
            Box::new(VecDeque::new()),
        )
    }

    pub(crate) fn executor(&self) -> &Arc<dyn Executor> {
        &self.executor
    }

    pub(crate) fn is_settled(&self) -> bool {
        lock(&self.state).outcome.is_some()
    }

    /// Queues `reaction`, or submits it right away if the promise already
    /// holds a value. Dropped if the promise was rejected.
    pub(crate) fn on_value(&self, reaction: ValueReaction<V>) -> Result<(), Error> {
        let value = {
            let mut guard = lock(&self.state);
            let state = &mut *guard;
            match &state.outcome {
                Some(Ok(value)) => value.clone(),
                Some(Err(_)) => return Ok(()),
                None => {
                    trace!(target: "promise_out", "queueing value reaction");
                    return state.on_value.push(reaction);
                }
            }
        };
        dispatch_all(&*self.executor, value, vec![reaction]).map_err(Error::Reaction)
    }

    pub(crate) fn on_failure(&self, reaction: FailureReaction) -> Result<(), Error> {
        let failure = {
            let mut guard = lock(&self.state);
            let state = &mut *guard;
            match &state.outcome {
                Some(Err(failure)) => failure.clone(),
                Some(Ok(_)) => return Ok(()),
                None => {
                    trace!(target: "promise_out", "queueing failure reaction");
                    return state.on_failure.push(reaction);
                }
            }
        };
        dispatch_all(&*self.executor, failure, vec![reaction]).map_err(Error::Reaction)
    }

    /// Runs `reaction` once on either outcome. While pending it sits in both
    /// queues; only one of them is ever drained.
    pub(crate) fn on_settled(
        &self,
        reaction: Box<dyn FnOnce() -> Result<(), Failure> + Send + 'static>,
    ) -> Result<(), Error> {
        {
            let mut guard = lock(&self.state);
            let state = &mut *guard;
            if state.outcome.is_none() {
                trace!(target: "promise_out", "queueing settled reaction");
                let slot = Arc::new(Mutex::new(Some(reaction)));
                let on_value = Arc::clone(&slot);
                let on_failure = Arc::clone(&slot);
                state.on_value.push(Box::new(move |_| run_once(&on_value)))?;
                let pushed = state.on_failure.push(Box::new(move |_| run_once(&on_failure)));
                if pushed.is_err() {
                    // the value queue keeps an entry that now runs nothing
                    lock(&slot).take();
                }
                return pushed;
            }
        }
        let reaction: Box<dyn FnOnce(()) -> Result<(), Failure> + Send> =
            Box::new(move |()| reaction());
        dispatch_all(&*self.executor, (), vec![reaction]).map_err(Error::Reaction)
    }

    /// Settles the promise unless it is already settled.
    ///
    /// Returns `Ok(false)` when another settlement won, `Ok(true)` when this
    /// call settled the promise and every queued reaction was dispatched
    /// cleanly, and `Err` with the aggregated reaction failures otherwise.
    pub(crate) fn try_settle(&self, outcome: Result<V, Failure>) -> Result<bool, Error> {
        let drained = {
            let mut guard = lock(&self.state);
            let state = &mut *guard;
            if state.outcome.is_some() {
                return Ok(false);
            }
            let drained = match &outcome {
                Ok(value) => {
                    state.on_failure.clear();
                    Drained::Value(value.clone(), queue::drain(&mut *state.on_value))
                }
                Err(failure) => {
                    state.on_value.clear();
                    Drained::Failure(failure.clone(), queue::drain(&mut *state.on_failure))
                }
            };
            state.outcome = Some(outcome);
            drained
        };
        let dispatched = match drained {
            Drained::Value(value, reactions) => {
                debug!(target: "promise_out", reactions = reactions.len(), "promise resolved");
                dispatch_all(&*self.executor, value, reactions)
            }
            Drained::Failure(failure, reactions) => {
                debug!(
                    target: "promise_out",
                    reactions = reactions.len(),
                    failure = %failure,
                    "promise rejected"
                );
                dispatch_all(&*self.executor, failure, reactions)
            }
        };
        dispatched.map(|()| true).map_err(Error::Reaction)
    }
}

fn run_once(
    slot: &Mutex<Option<Box<dyn FnOnce() -> Result<(), Failure> + Send + 'static>>>,
) -> Result<(), Failure> {
    let reaction = lock(slot).take();
    match reaction {
        Some(reaction) => reaction(),
        None => Ok(()),
    }
}

/// The capability to settle one pending promise.
///
/// Handed to the producer callback given to [`Promise::new`](crate::Promise::new).
///
/// # Examples
///
/// ```
/// use promise_out::Promise;
///
/// let promise = Promise::new(|resolver| {
///     assert!(!resolver.is_settled());
///     resolver.resolve("x").unwrap();
///     assert!(resolver.resolve("y").unwrap_err().is_illegal_state());
///     assert_eq!(resolver.resolve_if_not_settled("z").unwrap(), false);
/// });
/// assert!(promise.is_settled());
/// ```
pub struct Resolver<V> {
    shared: Arc<Shared<V>>,
}

impl<V> std::fmt::Debug for Resolver<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("settled", &lock(&self.shared.state).outcome.is_some())
            .finish()
    }
}

impl<V> Resolver<V>
where
    V: Clone + Send + 'static,
{
    pub(crate) fn new(shared: Arc<Shared<V>>) -> Self {
        Self { shared }
    }

    /// Settles with `value` and dispatches every queued value reaction.
    ///
    /// Fails with [`Error::IllegalState`] if the promise is already settled,
    /// leaving the earlier outcome untouched. Fails with [`Error::Reaction`]
    /// if dispatching reactions failed; the promise is settled regardless.
    pub fn resolve(&self, value: V) -> Result<(), Error> {
        self.settle(Ok(value))
    }

    /// Settles with `failure` and dispatches every queued failure reaction.
    pub fn reject(&self, failure: impl Into<Failure>) -> Result<(), Error> {
        self.settle(Err(failure.into()))
    }

    /// Settles with either outcome.
    pub fn settle(&self, outcome: Result<V, Failure>) -> Result<(), Error> {
        match self.shared.try_settle(outcome)? {
            true => Ok(()),
            false => Err(Error::already_settled()),
        }
    }

    /// Like [`Resolver::resolve`], but an already settled promise is left
    /// alone. Returns whether this call settled it.
    pub fn resolve_if_not_settled(&self, value: V) -> Result<bool, Error> {
        self.shared.try_settle(Ok(value))
    }

    pub fn reject_if_not_settled(&self, failure: impl Into<Failure>) -> Result<bool, Error> {
        self.shared.try_settle(Err(failure.into()))
    }

    pub fn is_settled(&self) -> bool {
        self.shared.is_settled()
    }
}
