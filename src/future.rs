use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::chain::{self, ChainHandle, Chained};
use crate::error::Error;
use crate::executor::Executor;
use crate::job::Job;
use crate::shared::SharedFuture;
use crate::state::SharedState;

#[cfg(feature = "async")]
use futures::task::AtomicWaker;

/// Outcome of a bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    Ready,
    Timeout,
}

/// The unique, move-only handle to an eventual value.
///
/// A `Future` is the sole consumer of its state: [`get`](Self::get) moves
/// the value out and consumes the handle, and every chaining operator
/// consumes the handle as well, so stale access does not type-check.
///
/// Without an executor a continuation runs on whichever thread fulfils the
/// state, or inline on the attaching thread when the state is already
/// ready; the `_via` variants run it wherever the supplied
/// [`Executor`] decides.
///
/// ```
/// use presto::{Error, Promise};
///
/// let mut p = Promise::new();
/// let f = p.get_future().unwrap().map(|x: i32| x * 2);
/// p.set_value(21);
/// let value: Result<i32, Error> = f.get();
/// assert_eq!(value, Ok(42));
/// ```
#[must_use = "futures do nothing unless consumed"]
pub struct Future<T> {
    pub(crate) state: Arc<SharedState<T>>,
    #[cfg(feature = "async")]
    waker: Option<Arc<AtomicWaker>>,
}

impl<T> std::fmt::Debug for Future<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Future").finish_non_exhaustive()
    }
}

impl<T: Send + 'static> Future<T> {
    /// A future that is ready with `value` from the start.
    pub fn ready(value: T) -> Self {
        let state = Arc::new(SharedState::new());
        state.fulfil(Ok(value));
        Self::from_state(state)
    }

    /// A future that is ready with `error` from the start.
    pub fn err(error: Error) -> Self {
        let state = Arc::new(SharedState::new());
        state.fulfil(Err(error));
        Self::from_state(state)
    }

    pub(crate) fn from_state(state: Arc<SharedState<T>>) -> Self {
        Self {
            state,
            #[cfg(feature = "async")]
            waker: None,
        }
    }

    pub(crate) fn into_state(self) -> Arc<SharedState<T>> {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    /// Blocks the calling thread until the future is ready.
    pub fn wait(&self) {
        self.state.wait();
    }

    /// Blocks for at most `timeout`; never changes the state.
    pub fn wait_for(&self, timeout: Duration) -> WaitStatus {
        if self.state.wait_timeout(timeout) {
            WaitStatus::Ready
        } else {
            WaitStatus::Timeout
        }
    }

    /// Blocks until `deadline` at the latest; never changes the state.
    pub fn wait_until(&self, deadline: Instant) -> WaitStatus {
        self.wait_for(deadline.saturating_duration_since(Instant::now()))
    }

    /// Blocks until ready and moves the value out, consuming the handle.
    pub fn get(self) -> Result<T, Error> {
        self.state.wait();
        self.state.take()
    }

    /// Converts this unique handle into a copyable one.
    pub fn share(self) -> SharedFuture<T> {
        SharedFuture::from_state(self.into_state())
    }

    /// Keeps the state alive until fulfilment without consuming the result.
    pub fn detach(self) {
        let state = self.into_state();
        let held = state.clone();
        state.push(Job::new(move || drop(held)));
    }

    /// Attaches a completion continuation: `f` receives this future, ready,
    /// and may extract the value or the error itself. The returned handle
    /// carries `f`'s result, with nested futures implicitly unwrapped (see
    /// [`Chained`]).
    pub fn then<R, F>(self, f: F) -> R::Handle
    where
        R: Chained,
        F: FnOnce(Future<T>) -> R + Send + 'static,
    {
        let child = chain::attach(self.into_state(), move |parent, dst| {
            f(Future::from_state(parent)).chain(dst)
        });
        R::Handle::from_future(Future::from_state(child))
    }

    /// [`then`](Self::then) running on `exec`. A continuation the executor
    /// drops resolves the returned future with
    /// [`Error::BrokenPromise`].
    pub fn then_via<X, R, F>(self, exec: X, f: F) -> R::Handle
    where
        X: Executor + Send + 'static,
        R: Chained,
        F: FnOnce(Future<T>) -> R + Send + 'static,
    {
        let child = chain::attach_via(self.into_state(), exec, move |parent, dst| {
            f(Future::from_state(parent)).chain(dst)
        });
        R::Handle::from_future(Future::from_state(child))
    }

    /// Attaches a value continuation: `f` receives the value by move; a
    /// failed parent skips `f` and forwards the error.
    pub fn map<U, F>(self, f: F) -> Future<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let child = chain::attach(self.into_state(), move |parent, dst| {
            match parent.take() {
                Ok(value) => dst.complete(Ok(f(value))),
                Err(error) => dst.complete(Err(error)),
            }
        });
        Future::from_state(child)
    }

    /// [`map`](Self::map) running on `exec`.
    pub fn map_via<X, U, F>(self, exec: X, f: F) -> Future<U>
    where
        X: Executor + Send + 'static,
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let child = chain::attach_via(self.into_state(), exec, move |parent, dst| {
            match parent.take() {
                Ok(value) => dst.complete(Ok(f(value))),
                Err(error) => dst.complete(Err(error)),
            }
        });
        Future::from_state(child)
    }

    /// Value continuation with implicit unwrapping: like
    /// [`map`](Self::map), but `f` may return a future-like value (see
    /// [`Chained`]) and the result is flattened one level.
    pub fn and_then<R, F>(self, f: F) -> R::Handle
    where
        R: Chained,
        F: FnOnce(T) -> R + Send + 'static,
    {
        let child = chain::attach(self.into_state(), move |parent, dst| {
            match parent.take() {
                Ok(value) => f(value).chain(dst),
                Err(error) => dst.complete(Err(error)),
            }
        });
        R::Handle::from_future(Future::from_state(child))
    }

    /// [`and_then`](Self::and_then) running on `exec`.
    pub fn and_then_via<X, R, F>(self, exec: X, f: F) -> R::Handle
    where
        X: Executor + Send + 'static,
        R: Chained,
        F: FnOnce(T) -> R + Send + 'static,
    {
        let child = chain::attach_via(self.into_state(), exec, move |parent, dst| {
            match parent.take() {
                Ok(value) => f(value).chain(dst),
                Err(error) => dst.complete(Err(error)),
            }
        });
        R::Handle::from_future(Future::from_state(child))
    }

    /// Attaches a bare completion signal: `callback` runs once the state is
    /// fulfilled, value and error alike. Does not consume the handle.
    pub fn notify<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.state.push(Job::boxed(callback));
    }

    /// [`notify`](Self::notify) running on `exec`.
    pub fn notify_via<X, F>(&self, exec: X, callback: F)
    where
        X: Executor + Send + 'static,
        F: FnOnce() + Send + 'static,
    {
        self.state.push(Job::boxed(move || {
            exec.post(Job::boxed(callback));
        }));
    }
}

impl<T: Send + 'static> Future<Future<T>> {
    /// Fuses the two levels of asynchrony into one: the result is ready
    /// once the inner future is, carrying the inner result.
    pub fn flatten(self) -> Future<T> {
        self.and_then(|inner| inner)
    }
}

impl<T: Send + 'static> From<Future<Future<T>>> for Future<T> {
    fn from(nested: Future<Future<T>>) -> Self {
        nested.flatten()
    }
}

impl<T: Clone + Send + 'static> From<Future<SharedFuture<T>>> for SharedFuture<T> {
    fn from(nested: Future<SharedFuture<T>>) -> Self {
        nested.and_then(|inner| inner)
    }
}

#[cfg(feature = "async")]
impl<T: Send + 'static> std::future::Future for Future<T> {
    type Output = Result<T, Error>;

    /// Readiness maps onto the state: ready states resolve immediately by
    /// moving the value out; otherwise the waker rides the continuation
    /// list, registered once and re-armed on later polls. Polling again
    /// after completion yields [`Error::NoState`].
    fn poll(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Self::Output> {
        let this = self.get_mut();
        if this.state.is_ready() {
            return std::task::Poll::Ready(this.state.take());
        }
        match &this.waker {
            Some(waker) => waker.register(cx.waker()),
            None => {
                let waker = Arc::new(AtomicWaker::new());
                waker.register(cx.waker());
                let woken = waker.clone();
                // a push that loses the race to fulfilment runs inline and
                // wakes the waker registered just above: no missed wakeup
                this.state.push(Job::new(move || woken.wake()));
                this.waker = Some(waker);
            }
        }
        if this.state.is_ready() {
            return std::task::Poll::Ready(this.state.take());
        }
        std::task::Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promise::Promise;
    use std::thread;

    #[test]
    fn test_ready_future_is_ready() {
        let f = Future::ready(3);
        assert!(f.is_ready());
        assert_eq!(f.get().unwrap(), 3);
    }

    #[test]
    fn test_err_future_carries_error() {
        let f = Future::<i32>::err(Error::BrokenPromise);
        assert_eq!(f.get().unwrap_err(), Error::BrokenPromise);
    }

    #[test]
    fn test_wait_for_reports_timeout_then_ready() {
        let mut p = Promise::<i32>::new();
        let f = p.get_future().unwrap();
        assert_eq!(f.wait_for(Duration::from_millis(5)), WaitStatus::Timeout);
        p.set_value(1);
        assert_eq!(f.wait_for(Duration::from_millis(5)), WaitStatus::Ready);
        assert_eq!(f.wait_until(Instant::now()), WaitStatus::Ready);
    }

    #[test]
    fn test_get_blocks_until_value_arrives() {
        let mut p = Promise::new();
        let f = p.get_future().unwrap();
        let producer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            p.set_value(vec![1, 2, 3]);
        });
        assert_eq!(f.get().unwrap(), vec![1, 2, 3]);
        producer.join().unwrap();
    }

    #[test]
    fn test_share_preserves_value() {
        let shared = Future::ready(8).share();
        assert_eq!(*shared.get().unwrap(), 8);
    }

    #[test]
    fn test_flatten_fuses_nested_futures() {
        let nested: Future<Future<i32>> = Future::ready(Future::ready(4));
        assert_eq!(nested.flatten().get().unwrap(), 4);
    }

    #[test]
    fn test_from_nested_future() {
        let nested = Future::ready(Future::ready(11));
        let flat: Future<i32> = nested.into();
        assert_eq!(flat.get().unwrap(), 11);
    }

    /// Detached futures keep the state alive without blocking anyone
    #[test]
    fn test_detach_releases_on_fulfilment() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let drops = Arc::new(AtomicUsize::new(0));
        struct Tracked(Arc<AtomicUsize>);
        impl Drop for Tracked {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let mut p = Promise::new();
        p.get_future().unwrap().detach();
        p.set_value(Tracked(drops.clone()));
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_notify_fires_on_error_too() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let hits = Arc::new(AtomicUsize::new(0));
        let seen = hits.clone();
        let mut p = Promise::<i32>::new();
        let f = p.get_future().unwrap();
        f.notify(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        drop(p);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(f.get().unwrap_err(), Error::BrokenPromise);
    }

    #[cfg(feature = "async")]
    mod r#async {
        use super::*;

        #[tokio::test]
        async fn test_await_pending_future() {
            let mut p = Promise::new();
            let f = p.get_future().unwrap();
            let producer = thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                p.set_value(27);
            });
            assert_eq!(f.await.unwrap(), 27);
            producer.join().unwrap();
        }

        #[tokio::test]
        async fn test_await_ready_future() {
            assert_eq!(Future::ready(1).await.unwrap(), 1);
        }

        #[tokio::test]
        async fn test_await_broken_promise() {
            let mut p = Promise::<i32>::new();
            let f = p.get_future().unwrap();
            drop(p);
            assert_eq!(f.await.unwrap_err(), Error::BrokenPromise);
        }

        /// Polling after completion reports the value as gone
        #[test]
        fn test_poll_after_completion_is_no_state() {
            use std::task::{Context, Poll, Waker};

            let mut f = Future::ready(2);
            let mut cx = Context::from_waker(Waker::noop());
            let pinned = std::pin::Pin::new(&mut f);
            assert_eq!(
                std::future::Future::poll(pinned, &mut cx),
                Poll::Ready(Ok(2))
            );
            let pinned = std::pin::Pin::new(&mut f);
            assert_eq!(
                std::future::Future::poll(pinned, &mut cx),
                Poll::Ready(Err(Error::NoState))
            );
        }
    }
}
