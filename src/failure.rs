//! The value a promise rejects with.
//!
//! A [`Failure`] is shared between every reaction that observes it, so it is
//! reference counted and immutable. Secondary failures that happened while
//! the first one was being reported ride along in [`Failure::suppressed`],
//! in the order they occurred.
use std::{
    any::Any,
    fmt,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};

/// A shared, cheaply cloned failure with an ordered list of suppressed
/// secondary failures.
///
/// # Examples
///
/// ```
/// use promise_out::Failure;
///
/// let first = Failure::msg("disk full");
/// let combined = first.with_suppressed([Failure::msg("retry failed")]);
/// assert!(combined.is(&first));
/// assert_eq!(combined.suppressed().len(), 1);
/// ```
#[derive(Clone)]
pub struct Failure {
    error: Arc<anyhow::Error>,
    suppressed: Arc<[Failure]>,
}

impl Failure {
    /// Wraps an error value.
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::from_anyhow(anyhow::Error::new(error))
    }

    /// A failure carrying only a message.
    pub fn msg<M>(message: M) -> Self
    where
        M: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        Self::from_anyhow(anyhow::Error::msg(message))
    }

    /// A fresh failure whose suppressed list is `failures`, in iteration order.
    pub fn aggregate<M, I>(message: M, failures: I) -> Self
    where
        M: fmt::Display + fmt::Debug + Send + Sync + 'static,
        I: IntoIterator<Item = Failure>,
    {
        Self::msg(message).with_suppressed(failures)
    }

    fn from_anyhow(error: anyhow::Error) -> Self {
        Self {
            error: Arc::new(error),
            suppressed: Arc::from(Vec::new()),
        }
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&'static str>() {
            (*message).to_owned()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "opaque panic payload".to_owned()
        };
        Self::msg(format!("callback panicked: {message}"))
    }

    /// Returns the same failure with `failures` appended to its suppressed
    /// list. The primary cause is shared, so [`Failure::is`] still holds
    /// between the two.
    pub fn with_suppressed<I>(&self, failures: I) -> Self
    where
        I: IntoIterator<Item = Failure>,
    {
        let suppressed: Vec<Failure> = self.suppressed.iter().cloned().chain(failures).collect();
        Self {
            error: Arc::clone(&self.error),
            suppressed: suppressed.into(),
        }
    }

    pub fn suppressed(&self) -> &[Failure] {
        &self.suppressed
    }

    /// True when both failures share the same primary cause.
    pub fn is(&self, other: &Failure) -> bool {
        Arc::ptr_eq(&self.error, &other.error)
    }

    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.error.downcast_ref::<E>()
    }
}

impl<E> From<E> for Failure
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Self::new(error)
    }
}

impl fmt::Display for Failure {
    /// The alternate form (`{:#}`) also lists the suppressed failures.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.error, f)?;
        if f.alternate() {
            for suppressed in self.suppressed.iter() {
                write!(f, "\n  suppressed: {suppressed:#}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Failure")
            .field("error", &format_args!("{}", self.error))
            .field("suppressed", &self.suppressed)
            .finish()
    }
}

/// What a reaction or producer callback may return.
///
/// `()` means the callback cannot fail. A `Result` lets it report a failure,
/// which is aggregated into the settling call (reactions) or turns into a
/// rejection (producers).
pub trait ReactionOutcome {
    fn into_outcome(self) -> Result<(), Failure>;
}

impl ReactionOutcome for () {
    fn into_outcome(self) -> Result<(), Failure> {
        Ok(())
    }
}

impl<E> ReactionOutcome for Result<(), E>
where
    E: Into<Failure>,
{
    fn into_outcome(self) -> Result<(), Failure> {
        self.map_err(Into::into)
    }
}

/// Runs user code, turning a panic into a [`Failure`].
pub(crate) fn guarded<T, F>(callback: F) -> Result<T, Failure>
where
    F: FnOnce() -> Result<T, Failure>,
{
    catch_unwind(AssertUnwindSafe(callback))
        .unwrap_or_else(|payload| Err(Failure::from_panic(payload)))
}
