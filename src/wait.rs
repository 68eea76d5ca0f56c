//! Awaiting a promise from async code.
use std::{
    future::{Future, IntoFuture},
    pin::Pin,
    sync::{Arc, Mutex},
    task::{Context, Poll, Waker},
};

use crate::{pending::lock, Failure, Promise};

/// Waits for a [`Promise`] to settle.
///
/// Built from an ordinary value reaction and failure reaction, so awaiting
/// a promise is just one more observer of it.
///
/// # Examples
///
/// ```
/// use promise_out::{Failure, Promise};
/// use futures::executor::block_on;
/// use std::thread;
///
/// let promise = Promise::<String>::rejected(Failure::msg("💥"));
/// let task = thread::spawn(move || block_on(async {
///     promise.await.unwrap_err().to_string()
/// }));
/// assert_eq!(task.join().expect("The task thread has panicked"), "💥");
/// ```
#[derive(Debug)]
pub struct PromiseFuture<V> {
    promise: Arc<Mutex<Inner<V>>>,
}

#[derive(Debug)]
struct Inner<V> {
    value: Option<Result<V, Failure>>,
    waker: Option<Waker>,
}

fn deliver<V>(promise: &Mutex<Inner<V>>, value: Result<V, Failure>) {
    let waker = {
        let mut promise = lock(promise);
        promise.value = Some(value);
        promise.waker.take()
    };
    if let Some(waker) = waker {
        waker.wake()
    }
}

impl<V> IntoFuture for Promise<V>
where
    V: Clone + Send + 'static,
{
    type Output = Result<V, Failure>;
    type IntoFuture = PromiseFuture<V>;

    fn into_future(self) -> Self::IntoFuture {
        let inner = Arc::new(Mutex::new(Inner {
            value: None,
            waker: None,
        }));
        let on_value = Arc::clone(&inner);
        let on_failure = Arc::clone(&inner);
        let attached = self
            .then(move |value| deliver(&on_value, Ok(value)))
            .and_then(|promise| promise.catch(move |failure| deliver(&on_failure, Err(failure))));
        if let Err(error) = attached {
            deliver(&inner, Err(error.into_failure()));
        }
        PromiseFuture { promise: inner }
    }
}

impl<V> Future for PromiseFuture<V> {
    type Output = Result<V, Failure>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut promise = lock(&self.promise);
        match promise.value.take() {
            Some(value) => Poll::Ready(value),
            None => {
                promise.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}
