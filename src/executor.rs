use std::sync::Arc;

use crate::chain::{ChainHandle, Chained};
use crate::future::Future;
use crate::job::Job;
use crate::promise::Promise;
use crate::state::SharedState;

/// Anything that can run [`Job`]s somewhere.
///
/// There is no error channel: an executor that cannot run a job drops it,
/// which the continuation machinery turns into
/// [`Error::BrokenPromise`](crate::Error) on the affected future. The trait
/// bound itself is the compile-time gate on every `_via` operator.
pub trait Executor {
    /// Schedules `job` to run exactly once. Ordering between two posts is
    /// whatever the concrete executor documents.
    fn post(&self, job: Job);
}

impl<X: Executor + ?Sized> Executor for &X {
    fn post(&self, job: Job) {
        (**self).post(job)
    }
}

impl<X: Executor + ?Sized> Executor for Arc<X> {
    fn post(&self, job: Job) {
        (**self).post(job)
    }
}

/// Runs every job immediately on the posting thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn post(&self, job: Job) {
        job.run();
    }
}

/// Runs `f` on `exec` and returns a future for its result.
///
/// The closure captures everything the computation needs. When the executor
/// drops the work instead of running it, the future resolves to
/// [`Error::BrokenPromise`](crate::Error). A nested result flattens with
/// [`Future::flatten`] or [`Future::and_then`].
///
/// ```
/// use presto::{spawn, InlineExecutor};
///
/// let f = spawn(&InlineExecutor, || 6 * 7);
/// assert_eq!(f.get().unwrap(), 42);
/// ```
pub fn spawn<X, F, R>(exec: &X, f: F) -> Future<R>
where
    X: Executor + ?Sized,
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let state = Arc::new(SharedState::new());
    let dst = Promise::over(state.clone());
    exec.post(Job::boxed(move || dst.complete(Ok(f()))));
    Future::from_state(state)
}

/// [`spawn`] for functions returning future-like values: the result is
/// implicitly unwrapped, so `f` returning a `Future<T>` yields a
/// `Future<T>` of the inner value (see [`Chained`]).
pub fn spawn_flat<X, F, R>(exec: &X, f: F) -> R::Handle
where
    X: Executor + ?Sized,
    F: FnOnce() -> R + Send + 'static,
    R: Chained,
{
    let state = Arc::new(SharedState::new());
    let dst = Promise::over(state.clone());
    exec.post(Job::boxed(move || f().chain(dst)));
    R::Handle::from_future(Future::from_state(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::thread;

    /// Runs each job on a freshly spawned thread; the simplest executor
    /// that actually changes threads.
    pub(crate) struct ThreadExecutor;

    impl Executor for ThreadExecutor {
        fn post(&self, job: Job) {
            thread::spawn(move || job.run());
        }
    }

    /// Accepts work and throws it away; models a shut-down executor.
    pub(crate) struct DiscardExecutor;

    impl Executor for DiscardExecutor {
        fn post(&self, job: Job) {
            drop(job);
        }
    }

    #[test]
    fn test_inline_executor_runs_immediately() {
        let f = spawn(&InlineExecutor, || 5);
        assert!(f.is_ready());
        assert_eq!(f.get().unwrap(), 5);
    }

    #[test]
    fn test_spawn_on_thread_executor() {
        let f = spawn(&ThreadExecutor, || "done");
        assert_eq!(f.get().unwrap(), "done");
    }

    /// Scenario: an executor that discards work produces `broken promise`
    #[test]
    fn test_discarded_work_breaks_promise() {
        let f = spawn(&DiscardExecutor, || 1);
        assert_eq!(f.get().unwrap_err(), Error::BrokenPromise);
    }

    /// Same through a continuation: the parent fulfils, the executor drops
    /// the continuation, the child resolves to `broken promise`
    #[test]
    fn test_discarded_continuation_breaks_promise() {
        let mut p = crate::Promise::new();
        let f = p
            .get_future()
            .unwrap()
            .map_via(DiscardExecutor, |x: i32| x + 1);
        p.set_value(1);
        assert_eq!(f.get().unwrap_err(), Error::BrokenPromise);
    }

    #[test]
    fn test_spawned_nested_future_flattens() {
        let f = spawn(&InlineExecutor, || Future::ready(9)).flatten();
        assert_eq!(f.get().unwrap(), 9);
    }

    /// spawn_flat unwraps the launched function's future directly
    #[test]
    fn test_spawn_flat_unwraps() {
        let mut p = crate::Promise::<i32>::new();
        let inner = p.get_future().unwrap();
        let f: Future<i32> = spawn_flat(&ThreadExecutor, move || inner);
        p.set_value(5);
        assert_eq!(f.get().unwrap(), 5);
    }

    #[test]
    fn test_executor_by_reference_and_arc() {
        let exec = Arc::new(InlineExecutor);
        assert_eq!(spawn(&exec, || 1).get().unwrap(), 1);
        let by_ref: &dyn Executor = &InlineExecutor;
        assert_eq!(spawn(by_ref, || 2).get().unwrap(), 2);
    }
}
