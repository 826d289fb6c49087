use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::chain::{self, ChainHandle, Chained};
use crate::error::Error;
use crate::executor::Executor;
use crate::future::{Future, WaitStatus};
use crate::job::Job;
use crate::state::SharedState;

#[cfg(feature = "async")]
use futures::task::AtomicWaker;

/// The copyable handle to an eventual value.
///
/// Clones observe the same state: [`get`](Self::get) hands out a shared
/// reference into the stored value and leaves the handle valid, so any
/// number of readers and attached continuations may coexist. A [`Future`]
/// converts into a `SharedFuture` by [`share`](Future::share) or `From`,
/// giving up its move-out right.
pub struct SharedFuture<T> {
    pub(crate) state: Arc<SharedState<T>>,
    #[cfg(feature = "async")]
    waker: Option<Arc<AtomicWaker>>,
}

impl<T> Clone for SharedFuture<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            // each clone polls with its own registration
            #[cfg(feature = "async")]
            waker: None,
        }
    }
}

impl<T: Send + 'static> From<Future<T>> for SharedFuture<T> {
    fn from(future: Future<T>) -> Self {
        future.share()
    }
}

impl<T: Send + 'static> SharedFuture<T> {
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

    /// Blocks until ready and borrows the value; every call returns a
    /// reference to the same stored object. Errors are cloned out.
    pub fn get(&self) -> Result<&T, Error> {
        self.state.wait();
        self.state.peek()
    }

    /// Keeps the state alive until fulfilment without consuming the result.
    pub fn detach(self) {
        let state = self.into_state();
        let held = state.clone();
        state.push(Job::new(move || drop(held)));
    }

    /// Attaches a completion continuation; `f` receives its own shared
    /// handle, ready. Any number of continuations may be attached; the
    /// single fulfilment invokes them all, serially, in LIFO order.
    pub fn then<R, F>(&self, f: F) -> R::Handle
    where
        R: Chained,
        F: FnOnce(SharedFuture<T>) -> R + Send + 'static,
    {
        let child = chain::attach(self.state.clone(), move |parent, dst| {
            f(SharedFuture::from_state(parent)).chain(dst)
        });
        R::Handle::from_future(Future::from_state(child))
    }

    /// [`then`](Self::then) running on `exec`.
    pub fn then_via<X, R, F>(&self, exec: X, f: F) -> R::Handle
    where
        X: Executor + Send + 'static,
        R: Chained,
        F: FnOnce(SharedFuture<T>) -> R + Send + 'static,
    {
        let child = chain::attach_via(self.state.clone(), exec, move |parent, dst| {
            f(SharedFuture::from_state(parent)).chain(dst)
        });
        R::Handle::from_future(Future::from_state(child))
    }

    /// Attaches a value continuation: `f` borrows the stored value; a
    /// failed parent skips `f` and forwards the error.
    pub fn map<U, F>(&self, f: F) -> Future<U>
    where
        U: Send + 'static,
        F: FnOnce(&T) -> U + Send + 'static,
    {
        let child = chain::attach(self.state.clone(), move |parent, dst| {
            match parent.peek() {
                Ok(value) => dst.complete(Ok(f(value))),
                Err(error) => dst.complete(Err(error)),
            }
        });
        Future::from_state(child)
    }

    /// [`map`](Self::map) running on `exec`.
    pub fn map_via<X, U, F>(&self, exec: X, f: F) -> Future<U>
    where
        X: Executor + Send + 'static,
        U: Send + 'static,
        F: FnOnce(&T) -> U + Send + 'static,
    {
        let child = chain::attach_via(self.state.clone(), exec, move |parent, dst| {
            match parent.peek() {
                Ok(value) => dst.complete(Ok(f(value))),
                Err(error) => dst.complete(Err(error)),
            }
        });
        Future::from_state(child)
    }

    /// Value continuation with implicit unwrapping; see [`Chained`].
    pub fn and_then<R, F>(&self, f: F) -> R::Handle
    where
        R: Chained,
        F: FnOnce(&T) -> R + Send + 'static,
    {
        let child = chain::attach(self.state.clone(), move |parent, dst| {
            match parent.peek() {
                Ok(value) => f(value).chain(dst),
                Err(error) => dst.complete(Err(error)),
            }
        });
        R::Handle::from_future(Future::from_state(child))
    }

    /// [`and_then`](Self::and_then) running on `exec`.
    pub fn and_then_via<X, R, F>(&self, exec: X, f: F) -> R::Handle
    where
        X: Executor + Send + 'static,
        R: Chained,
        F: FnOnce(&T) -> R + Send + 'static,
    {
        let child = chain::attach_via(self.state.clone(), exec, move |parent, dst| {
            match parent.peek() {
                Ok(value) => f(value).chain(dst),
                Err(error) => dst.complete(Err(error)),
            }
        });
        R::Handle::from_future(Future::from_state(child))
    }

    /// Attaches a bare completion signal; fires on value and error alike.
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

#[cfg(feature = "async")]
impl<T: Clone + Send + 'static> std::future::Future for SharedFuture<T> {
    type Output = Result<T, Error>;

    /// Shared handles clone the stored value out on completion; the waker
    /// registration mirrors [`Future`](crate::Future)'s.
    fn poll(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Self::Output> {
        let this = self.get_mut();
        if this.state.is_ready() {
            return std::task::Poll::Ready(this.state.peek().cloned());
        }
        match &this.waker {
            Some(waker) => waker.register(cx.waker()),
            None => {
                let waker = Arc::new(AtomicWaker::new());
                waker.register(cx.waker());
                let woken = waker.clone();
                this.state.push(Job::new(move || woken.wake()));
                this.waker = Some(waker);
            }
        }
        if this.state.is_ready() {
            return std::task::Poll::Ready(this.state.peek().cloned());
        }
        std::task::Poll::Pending
    }
}
