use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::future::{Future, WaitStatus};
use crate::shared::SharedFuture;
use crate::state::Waiter;

/// Reusable timed wait over a future's completion signal.
///
/// Built from a borrowed handle via [`notify`](Future::notify), so it can
/// keep waiting with fresh timeouts while the handle stays free for
/// chaining or `get`. Fires on value and error alike.
///
/// ```
/// use std::time::Duration;
/// use presto::{Promise, TimedWaiter, WaitStatus};
///
/// let mut p = Promise::<i32>::new();
/// let f = p.get_future().unwrap();
/// let waiter = TimedWaiter::new(&f);
/// assert_eq!(waiter.wait_for(Duration::from_millis(1)), WaitStatus::Timeout);
/// p.set_value(1);
/// assert_eq!(waiter.wait_for(Duration::from_millis(1)), WaitStatus::Ready);
/// ```
pub struct TimedWaiter {
    waiter: Arc<Waiter>,
}

impl TimedWaiter {
    pub fn new<T: Send + 'static>(future: &Future<T>) -> Self {
        let waiter = Arc::new(Waiter::new());
        let woken = waiter.clone();
        future.notify(move || woken.notify());
        Self { waiter }
    }

    pub fn shared<T: Send + 'static>(future: &SharedFuture<T>) -> Self {
        let waiter = Arc::new(Waiter::new());
        let woken = waiter.clone();
        future.notify(move || woken.notify());
        Self { waiter }
    }

    /// Blocks for at most `timeout`.
    pub fn wait_for(&self, timeout: Duration) -> WaitStatus {
        if self.waiter.wait_timeout(timeout) {
            WaitStatus::Ready
        } else {
            WaitStatus::Timeout
        }
    }

    /// Blocks until `deadline` at the latest.
    pub fn wait_until(&self, deadline: Instant) -> WaitStatus {
        self.wait_for(deadline.saturating_duration_since(Instant::now()))
    }
}
