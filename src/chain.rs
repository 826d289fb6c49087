//! Continuation wiring
//!
//! Attaching a continuation to a state builds a fresh child state, hands its
//! producing [`Promise`] to a closure, and pushes that closure onto the
//! parent's continuation stack:
//!
//! ```text
//!  parent state ──(ready)──► closure(f) ──► child promise ──► child state
//!        │                                        │
//!        │ closure dropped unrun                  │ f panicked
//!        └────────────► child resolves to `broken promise` ◄──┘
//! ```
//!
//! The child's promise doubles as the abandon guard: whenever the closure is
//! destroyed without completing it (the executor discarded the work, the
//! parent state went away unfulfilled, the user function panicked), the
//! promise's drop delivers [`Error::BrokenPromise`](crate::Error) to the
//! child, so no consumer is ever left blocked.
//!
//! [`Chained`] is the capability the machinery dispatches on to fuse two
//! levels of asynchrony: a continuation returning a future-like value yields
//! a future of the *inner* element type, ready only once the inner value is.

use std::sync::Arc;

use crate::error::Error;
use crate::executor::Executor;
use crate::future::Future;
use crate::job::Job;
use crate::promise::Promise;
use crate::shared::SharedFuture;
use crate::state::SharedState;

/// Builds the child state and wires `run` to fire once `parent` is ready.
pub(crate) fn attach<T, V, F>(parent: Arc<SharedState<T>>, run: F) -> Arc<SharedState<V>>
where
    T: Send + 'static,
    V: Send + 'static,
    F: FnOnce(Arc<SharedState<T>>, Promise<V>) + Send + 'static,
{
    let child = Arc::new(SharedState::new());
    let dst = Promise::over(child.clone());
    let source = parent.clone();
    parent.push(Job::boxed(move || run(source, dst)));
    child
}

/// Like [`attach`], but the parent-ready continuation only reposts the real
/// work onto `exec`; the work then runs wherever the executor decides.
pub(crate) fn attach_via<T, V, X, F>(
    parent: Arc<SharedState<T>>,
    exec: X,
    run: F,
) -> Arc<SharedState<V>>
where
    T: Send + 'static,
    V: Send + 'static,
    X: Executor + Send + 'static,
    F: FnOnce(Arc<SharedState<T>>, Promise<V>) + Send + 'static,
{
    let child = Arc::new(SharedState::new());
    let dst = Promise::over(child.clone());
    let source = parent.clone();
    parent.push(Job::boxed(move || {
        exec.post(Job::boxed(move || run(source, dst)));
    }));
    child
}

/// A value a continuation may resolve to: either a plain fallible result or
/// a nested future whose eventual result is forwarded on.
///
/// This is the implicit-unwrap dispatch: `then`/`and_then` accept any
/// `Chained` return and hand back a future of [`Chained::Value`], never a
/// future of a future. The laws, per implementation:
///
/// - `Future<U>` resolves to a `Future<U>` carrying the inner result;
/// - `SharedFuture<U>` resolves to a `SharedFuture<U>`;
/// - `Result<U, Error>` resolves to a `Future<U>`, with `Err` stored as the
///   failure; this is how a continuation reports an error of its own.
pub trait Chained: Send + Sized + 'static {
    /// Element type of the handle handed back to the caller.
    type Value: Send + 'static;
    /// Handle type handed back to the caller.
    type Handle: ChainHandle<Self::Value>;

    /// Forwards this result into `dst`, now or once it becomes known.
    fn chain(self, dst: Promise<Self::Value>);
}

/// Future handle constructible by the continuation machinery; implemented by
/// [`Future`] and [`SharedFuture`].
pub trait ChainHandle<T>: Sized {
    #[doc(hidden)]
    fn from_future(future: Future<T>) -> Self;
}

impl<T: Send + 'static> ChainHandle<T> for Future<T> {
    fn from_future(future: Future<T>) -> Self {
        future
    }
}

impl<T: Send + 'static> ChainHandle<T> for SharedFuture<T> {
    fn from_future(future: Future<T>) -> Self {
        future.share()
    }
}

impl<T: Send + 'static> Chained for Future<T> {
    type Value = T;
    type Handle = Future<T>;

    fn chain(self, dst: Promise<T>) {
        let inner = self.into_state();
        let source = inner.clone();
        // runs inline when the inner state is already ready
        inner.push(Job::new(move || dst.complete(source.take())));
    }
}

impl<T: Clone + Send + 'static> Chained for SharedFuture<T> {
    type Value = T;
    type Handle = SharedFuture<T>;

    fn chain(self, dst: Promise<T>) {
        let inner = self.into_state();
        let source = inner.clone();
        inner.push(Job::new(move || dst.complete(source.peek().cloned())));
    }
}

impl<T: Send + 'static> Chained for Result<T, Error> {
    type Value = T;
    type Handle = Future<T>;

    fn chain(self, dst: Promise<T>) {
        dst.complete(self);
    }
}
