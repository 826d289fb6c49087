use std::any::Any;
use std::fmt;
use std::mem;
use std::panic::{self, AssertUnwindSafe, UnwindSafe};
use std::sync::Arc;

use crate::error::Error;
use crate::future::Future;
use crate::state::SharedState;

/// Failure stored when a task's callable panicked.
#[derive(Debug)]
struct CallPanicked(String);

impl fmt::Display for CallPanicked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task panicked: {}", self.0)
    }
}

impl std::error::Error for CallPanicked {}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "opaque panic payload".to_string()
    }
}

/// A callable bundled with the state its result fulfils.
///
/// `A` is the argument the callable is invoked with at
/// [`run`](Self::run) time: `()` for nullary tasks (the default), a plain
/// value for one argument, a tuple for several. Running the task computes
/// the stored function and fulfils the state with its result; a panicking
/// callable is caught and fulfils the state with the failure instead, so
/// the error surfaces through the future, never out of `run` itself. A
/// second run fails with [`Error::AlreadySatisfied`] without invoking the
/// function again.
///
/// [`reset`](Self::reset) rearms the task: the function is kept (it is
/// `FnMut`, so invocation does not consume it) and bound to a fresh state.
/// Dropping a task that never ran resolves its future with
/// [`Error::BrokenPromise`], which is also how an
/// [`Executor`](crate::Executor) discarding a posted task surfaces.
pub struct PackagedTask<R: 'static, A: 'static = ()> {
    func: Box<dyn FnMut(A) -> R + Send>,
    state: Arc<SharedState<R>>,
    retrieved: bool,
}

impl<R: Send + 'static, A: 'static> PackagedTask<R, A> {
    pub fn new<F>(f: F) -> Self
    where
        F: FnMut(A) -> R + Send + UnwindSafe + 'static,
    {
        Self {
            func: Box::new(f),
            state: Arc::new(SharedState::new()),
            retrieved: false,
        }
    }

    /// The future for the current arming; handed out once per state.
    pub fn get_future(&mut self) -> Result<Future<R>, Error> {
        if mem::replace(&mut self.retrieved, true) {
            return Err(Error::AlreadyRetrieved);
        }
        Ok(Future::from_state(self.state.clone()))
    }

    /// Invokes the function with `args` and fulfils the state with its
    /// result, or with the captured failure when the function panics.
    pub fn run(&mut self, args: A) -> Result<(), Error> {
        if self.state.is_ready() {
            return Err(Error::AlreadySatisfied);
        }
        // the callable was UnwindSafe at construction; the assert covers
        // the re-borrow through the box
        match panic::catch_unwind(AssertUnwindSafe(|| (self.func)(args))) {
            Ok(value) => self.state.fulfil(Ok(value)),
            Err(payload) => self
                .state
                .fulfil(Err(Error::failed(CallPanicked(panic_message(&*payload))))),
        };
        Ok(())
    }

    /// Rearms the task with a fresh state, keeping the function. Consumers
    /// of the old state receive `broken promise` if it never ran.
    pub fn reset(&mut self) {
        if !self.state.is_ready() {
            self.state.fulfil(Err(Error::BrokenPromise));
        }
        self.state = Arc::new(SharedState::new());
        self.retrieved = false;
    }
}

impl<R: 'static, A: 'static> Drop for PackagedTask<R, A> {
    fn drop(&mut self) {
        if !self.state.is_ready() {
            self.state.fulfil(Err(Error::BrokenPromise));
        }
    }
}
