//! Storage for reactions attached while a promise is still pending.
use std::collections::VecDeque;

use crate::{Error, Failure};

/// A reaction waiting for a value.
pub type ValueReaction<V> = Box<dyn FnOnce(V) -> Result<(), Failure> + Send + 'static>;

/// A reaction waiting for a failure.
pub type FailureReaction = Box<dyn FnOnce(Failure) -> Result<(), Failure> + Send + 'static>;

/// An ordered sequence of pending reactions.
///
/// The promise only touches its queues while holding its own lock, so an
/// implementation needs no synchronization of its own. `VecDeque` is the
/// default; tests install queues that refuse inserts.
pub trait ReactionQueue<T>: Send {
    /// Appends `reaction` behind every reaction already queued.
    fn push(&mut self, reaction: T) -> Result<(), Error>;

    /// Removes the oldest reaction.
    fn pop(&mut self) -> Option<T>;

    fn clear(&mut self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Send> ReactionQueue<T> for VecDeque<T> {
    fn push(&mut self, reaction: T) -> Result<(), Error> {
        self.push_back(reaction);
        Ok(())
    }

    fn pop(&mut self) -> Option<T> {
        self.pop_front()
    }

    fn clear(&mut self) {
        VecDeque::clear(self)
    }

    fn len(&self) -> usize {
        VecDeque::len(self)
    }
}

/// Empties `queue` in insertion order.
pub(crate) fn drain<T>(queue: &mut dyn ReactionQueue<T>) -> Vec<T> {
    let mut drained = Vec::with_capacity(queue.len());
    while let Some(reaction) = queue.pop() {
        drained.push(reaction);
    }
    drained
}
