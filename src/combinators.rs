//! Fan-in over a fixed set of promises.
//!
//! Every combinator here is an ordinary client of [`Promise`]: it attaches a
//! value reaction and a failure reaction to each input and settles one
//! aggregate promise, built on `executor`, through its [`Resolver`].
use std::sync::{Arc, Mutex};

use crate::{pending::lock, Error, Executor, Failure, Promise, Resolver};

/// One slot per input, filled in input order regardless of completion order.
struct Slots<T> {
    items: Vec<Option<T>>,
    remaining: usize,
}

impl<T> Slots<T> {
    fn new(len: usize) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self {
            items: std::iter::repeat_with(|| None).take(len).collect(),
            remaining: len,
        }))
    }

    /// Stores `item` and, once every slot is filled, hands all of them back.
    fn fill(&mut self, index: usize, item: T) -> Option<Vec<T>> {
        self.items[index] = Some(item);
        self.remaining -= 1;
        if self.remaining > 0 {
            return None;
        }
        Some(std::mem::take(&mut self.items).into_iter().flatten().collect())
    }
}

fn gather<V, T, O>(
    executor: Arc<dyn Executor>,
    promises: Vec<Promise<V>>,
    keep: fn(V) -> T,
    finish: fn(Vec<T>) -> O,
) -> Promise<O>
where
    V: Clone + Send + 'static,
    T: Send + 'static,
    O: Clone + Send + 'static,
{
    if promises.is_empty() {
        return Promise::resolved_on(finish(Vec::new()), executor);
    }
    Promise::new_on(executor, move |resolver: Resolver<O>| {
        let resolver = Arc::new(resolver);
        let slots = Slots::new(promises.len());
        for (index, promise) in promises.iter().enumerate() {
            let on_value = Arc::clone(&resolver);
            let on_failure = Arc::clone(&resolver);
            let slots = Arc::clone(&slots);
            promise
                .then(move |value| {
                    let filled = lock(&slots).fill(index, keep(value));
                    match filled {
                        Some(items) => on_value.resolve(finish(items)).map_err(Error::into_failure),
                        None => Ok(()),
                    }
                })?
                .catch(move |failure| {
                    on_failure
                        .reject_if_not_settled(failure)
                        .map(drop)
                        .map_err(Error::into_failure)
                })?;
        }
        Ok::<(), Error>(())
    })
}

fn first<V, O>(
    executor: Arc<dyn Executor>,
    promises: Vec<Promise<V>>,
    keep: fn(V) -> O,
) -> Promise<O>
where
    V: Clone + Send + 'static,
    O: Clone + Send + 'static,
{
    if promises.is_empty() {
        return Promise::never();
    }
    Promise::new_on(executor, move |resolver: Resolver<O>| {
        let resolver = Arc::new(resolver);
        let slots = Slots::new(promises.len());
        for (index, promise) in promises.iter().enumerate() {
            let on_value = Arc::clone(&resolver);
            let on_failure = Arc::clone(&resolver);
            let slots = Arc::clone(&slots);
            promise
                .then(move |value| {
                    on_value
                        .resolve_if_not_settled(keep(value))
                        .map(drop)
                        .map_err(Error::into_failure)
                })?
                .catch(move |failure| {
                    let filled = lock(&slots).fill(index, failure);
                    match filled {
                        Some(failures) => on_failure
                            .reject(Failure::aggregate("every promise failed", failures))
                            .map_err(Error::into_failure),
                        None => Ok(()),
                    }
                })?;
        }
        Ok::<(), Error>(())
    })
}

/// Resolves with every input's value, in input order, once all of them
/// resolve. Rejects with whichever failure arrives first; later outcomes are
/// ignored. An empty input resolves right away with an empty `Vec`.
///
/// # Examples
///
/// ```
/// use promise_out::{combinators::join_all, executor::inline, Promise};
///
/// let all = join_all(inline(), vec![Promise::resolved(1), Promise::resolved(2)]);
/// let values = futures::executor::block_on(async { all.await.unwrap() });
/// assert_eq!(values, vec![1, 2]);
/// ```
pub fn join_all<V, I>(executor: Arc<dyn Executor>, promises: I) -> Promise<Vec<V>>
where
    V: Clone + Send + 'static,
    I: IntoIterator<Item = Promise<V>>,
{
    gather(executor, promises.into_iter().collect(), |value| value, |values| values)
}

/// Resolves with the first value any input resolves with. If every input
/// rejects, rejects with an aggregate failure whose suppressed failures are
/// the inputs' failures in input order. An empty input never settles.
pub fn race_first_success<V, I>(executor: Arc<dyn Executor>, promises: I) -> Promise<V>
where
    V: Clone + Send + 'static,
    I: IntoIterator<Item = Promise<V>>,
{
    first(executor, promises.into_iter().collect(), |value| value)
}

/// [`join_all`] without the values.
pub fn after_all<V, I>(executor: Arc<dyn Executor>, promises: I) -> Promise<()>
where
    V: Clone + Send + 'static,
    I: IntoIterator<Item = Promise<V>>,
{
    gather(executor, promises.into_iter().collect(), drop, drop)
}

/// [`race_first_success`] without the value.
pub fn after_any<V, I>(executor: Arc<dyn Executor>, promises: I) -> Promise<()>
where
    V: Clone + Send + 'static,
    I: IntoIterator<Item = Promise<V>>,
{
    first(executor, promises.into_iter().collect(), drop)
}
