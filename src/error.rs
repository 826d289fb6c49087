use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Failure of an asynchronous operation.
///
/// Library-produced kinds are unit variants; user errors stored through
/// [`Promise::set_error`](crate::Promise::set_error) or a fallible
/// continuation travel as [`Error::Failed`]. The `Arc` keeps stored errors
/// cloneable, so every reader of a shared state observes the same failure.
#[derive(Debug, Clone)]
pub enum Error {
    /// The producer was dropped, or the continuation feeding this value was
    /// discarded, before the state could be fulfilled.
    BrokenPromise,
    /// `get_future` was called twice on the same producer.
    AlreadyRetrieved,
    /// The state was asked to accept a second result.
    AlreadySatisfied,
    /// The value was already consumed out of this handle.
    NoState,
    /// A user error stored as the result of the operation.
    Failed(Arc<dyn StdError + Send + Sync>),
}

impl Error {
    /// Wraps a user error as the failure of an operation.
    pub fn failed<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Error::Failed(Arc::new(error))
    }
}

impl PartialEq for Error {
    /// Library kinds compare by kind; user errors by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Error::BrokenPromise, Error::BrokenPromise)
            | (Error::AlreadyRetrieved, Error::AlreadyRetrieved)
            | (Error::AlreadySatisfied, Error::AlreadySatisfied)
            | (Error::NoState, Error::NoState) => true,
            (Error::Failed(a), Error::Failed(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BrokenPromise => f.write_str("broken promise"),
            Error::AlreadyRetrieved => f.write_str("future already retrieved"),
            Error::AlreadySatisfied => f.write_str("promise already satisfied"),
            Error::NoState => f.write_str("no state"),
            Error::Failed(e) => e.fmt(f),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Failed(e) => Some(&**e),
            _ => None,
        }
    }
}
