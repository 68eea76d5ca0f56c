//! Settle-once promises whose reactions run on a pluggable [`Executor`].
//!
//! A producer receives a [`Resolver`] and settles its [`Promise`] exactly
//! once, with a value or a [`Failure`]. Consumers attach reactions before or
//! after that happens; either way each reaction fires exactly once, on the
//! promise's executor.
//!
//! ```
//! use promise_out::Promise;
//! use std::sync::{Arc, Mutex};
//!
//! let seen = Arc::new(Mutex::new(None));
//! let sink = seen.clone();
//! let promise = Promise::new(|resolver| resolver.resolve(20));
//! promise
//!     .map(|value| Ok(value + 1))
//!     .then(move |value| *sink.lock().unwrap() = Some(value))
//!     .unwrap();
//! assert_eq!(*seen.lock().unwrap(), Some(21));
//! ```
//!
//! Promises can also be awaited:
//!
//! ```
//! use promise_out::Promise;
//! use futures::executor::block_on;
//!
//! let promise = Promise::new(|resolver| resolver.resolve("🍓"));
//! assert_eq!(block_on(async { promise.await.unwrap() }), "🍓");
//! ```
use std::borrow::Cow;

use thiserror::Error;

pub mod combinators;
pub mod completion;
pub mod executor;
mod failure;
mod pending;
mod promise;
pub mod queue;
mod settled;
mod wait;

pub use completion::Completion;
pub use executor::{Executor, Inline, Task};
pub use failure::{Failure, ReactionOutcome};
pub use pending::Resolver;
pub use promise::Promise;
pub use queue::ReactionQueue;
pub use wait::PromiseFuture;

#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A required argument was absent.
    #[error("missing {0}")]
    Missing(&'static str),
    /// The promise was already settled, or its reaction queue refused a
    /// reaction.
    #[error("illegal state: {0}")]
    IllegalState(Cow<'static, str>),
    /// One or more reactions failed while being dispatched. Any further
    /// failures are in [`Failure::suppressed`].
    #[error("{0}")]
    Reaction(Failure),
}

impl Error {
    pub(crate) fn already_settled() -> Self {
        Error::IllegalState(Cow::Borrowed("promise already resolved"))
    }

    pub fn is_illegal_state(&self) -> bool {
        matches!(self, Error::IllegalState(_))
    }

    /// The failure to reject with when this error escapes a callback. A
    /// reaction failure is unwrapped rather than wrapped again.
    pub fn into_failure(self) -> Failure {
        match self {
            Error::Reaction(failure) => failure,
            other => Failure::new(other),
        }
    }
}
