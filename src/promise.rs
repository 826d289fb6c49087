use std::mem;
use std::sync::Arc;

use crate::error::Error;
use crate::future::Future;
use crate::state::SharedState;

/// The producing half of a [`Future`].
///
/// A promise fulfils its state at most once; both [`set_value`](Self::set_value)
/// and [`set_error`](Self::set_error) consume the promise, so a second
/// fulfilment through the same promise does not type-check. Dropping an
/// unfulfilled promise resolves the future with [`Error::BrokenPromise`]
/// instead of leaving consumers blocked.
///
/// ```
/// use presto::Promise;
///
/// let mut p = Promise::new();
/// let f = p.get_future().unwrap();
/// p.set_value(7);
/// assert_eq!(f.get().unwrap(), 7);
/// ```
pub struct Promise<T> {
    state: Arc<SharedState<T>>,
    retrieved: bool,
}

impl<T: Send + 'static> Promise<T> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(SharedState::new()),
            retrieved: false,
        }
    }

    /// The consuming half; handed out once per promise.
    pub fn get_future(&mut self) -> Result<Future<T>, Error> {
        if mem::replace(&mut self.retrieved, true) {
            return Err(Error::AlreadyRetrieved);
        }
        Ok(Future::from_state(self.state.clone()))
    }

    /// Fulfils the future with a value.
    pub fn set_value(self, value: T) {
        self.complete(Ok(value));
    }

    /// Fulfils the future with an error.
    pub fn set_error(self, error: Error) {
        self.complete(Err(error));
    }

    /// Producer handle over an existing state; used by the continuation
    /// machinery, which hands futures out through other channels.
    pub(crate) fn over(state: Arc<SharedState<T>>) -> Self {
        Self {
            state,
            retrieved: true,
        }
    }

    pub(crate) fn complete(self, result: Result<T, Error>) {
        let fresh = self.state.fulfil(result);
        debug_assert!(fresh, "a promise is the sole producer of its state");
    }
}

impl<T: Send + 'static> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        // Abandoned before fulfilment: deliver the cancellation error
        // instead of leaving consumers blocked forever
        if !self.state.is_ready() {
            self.state.fulfil(Err(Error::BrokenPromise));
        }
    }
}
