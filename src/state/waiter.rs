use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

/// Blocking waiter of a shared state.
///
/// Registered on the state as one synthetic continuation, so fulfilment
/// wakes blocked threads through the same drain that runs user
/// continuations. Only an actual `wait*` call ever touches the mutex.
pub(crate) struct Waiter {
    notified: Mutex<bool>,
    cv: Condvar,
}

impl Waiter {
    pub fn new() -> Self {
        Self {
            notified: Mutex::new(false),
            cv: Condvar::new(),
        }
    }

    /// Fulfilment-side wake-up; idempotent.
    pub fn notify(&self) {
        *self
            .notified
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = true;
        self.cv.notify_all();
    }

    pub fn wait(&self) {
        let mut notified = self
            .notified
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while !*notified {
            notified = self
                .cv
                .wait(notified)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Returns `false` on timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let notified = self
            .notified
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (_guard, result) = self
            .cv
            .wait_timeout_while(notified, timeout, |notified| !*notified)
            .unwrap_or_else(PoisonError::into_inner);
        !result.timed_out()
    }
}
