//! Glue from completion-callback APIs onto a [`Resolver`].
//!
//! Callback-style I/O reports success with a value (possibly absent) or
//! failure with an error. [`Completion`] maps each of those one-to-one onto
//! settling a promise.
use crate::{Error, Failure, Resolver};

/// A completion handler that settles a promise.
///
/// # Examples
///
/// ```
/// use promise_out::{Completion, Promise};
/// use std::{io, thread};
///
/// let promise = Promise::new(|resolver| {
///     let completion = Completion::new(resolver);
///     thread::spawn(move || {
///         let read: io::Result<usize> = Ok(512);
///         completion.complete(read).unwrap();
///     });
/// });
/// let bytes = futures::executor::block_on(async { promise.await.unwrap() });
/// assert_eq!(bytes, 512);
/// ```
#[derive(Debug)]
pub struct Completion<V> {
    resolver: Resolver<V>,
}

impl<V> Completion<V>
where
    V: Clone + Send + 'static,
{
    pub fn new(resolver: Resolver<V>) -> Self {
        Self { resolver }
    }

    /// The operation succeeded. An absent value is refused with
    /// [`Error::Missing`] and leaves the promise untouched.
    pub fn completed(&self, value: Option<V>) -> Result<(), Error> {
        let value = value.ok_or(Error::Missing("value"))?;
        self.resolver.resolve(value)
    }

    /// The operation failed. An absent failure is refused with
    /// [`Error::Missing`] and leaves the promise untouched.
    pub fn failed(&self, failure: Option<Failure>) -> Result<(), Error> {
        let failure = failure.ok_or(Error::Missing("failure"))?;
        self.resolver.reject(failure)
    }

    /// Settles from a `Result`, the usual shape of a finished operation.
    pub fn complete<E>(&self, result: Result<V, E>) -> Result<(), Error>
    where
        E: Into<Failure>,
    {
        self.resolver.settle(result.map_err(Into::into))
    }

    pub fn into_resolver(self) -> Resolver<V> {
        self.resolver
    }
}

impl<V> From<Resolver<V>> for Completion<V>
where
    V: Clone + Send + 'static,
{
    fn from(resolver: Resolver<V>) -> Self {
        Self::new(resolver)
    }
}
