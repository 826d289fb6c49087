//! Shared asynchronous state
//!
//! The [`SharedState`] is the one object a producer and every consumer of an
//! eventual value share. It pairs a write-once [`ResultCell`] with a
//! [once-consumable continuation stack](crate::stack::OnceConsumableStack):
//!
//! ```text
//! ┌──────────┐  fulfil   ┌───────────────────────────┐   drain    ┌───────────────┐
//! │ Producer │ ────────► │ ResultCell │ Continuations│ ─────────► │ continuations │
//! │ (once)   │           │ (value|err)│ (LIFO stack) │   (LIFO)   │ + waiter      │
//! └──────────┘           └───────────────────────────┘            └───────────────┘
//! ```
//!
//! Fulfilment stores the result, then consumes the stack and invokes every
//! drained continuation. A state is *ready* exactly when its stack has been
//! consumed; a continuation pushed after that point runs inline on the
//! pushing thread, and the stack's acquire/release handover guarantees it
//! observes the stored result.

mod cell;
mod waiter;

pub(crate) use waiter::Waiter;

use cell::ResultCell;

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::error::Error;
use crate::job::Job;
use crate::stack::OnceConsumableStack;

/// Continuation list of a shared state plus its lazily armed blocking
/// waiter.
pub(crate) struct ContinuationStack {
    stack: OnceConsumableStack<Job>,
    waiter: OnceLock<Arc<Waiter>>,
}

impl ContinuationStack {
    pub fn new() -> Self {
        Self {
            stack: OnceConsumableStack::new(),
            waiter: OnceLock::new(),
        }
    }

    /// Attaches a continuation; runs it inline when the stack was already
    /// drained by fulfilment.
    pub fn push(&self, job: Job) {
        if let Err(job) = self.stack.push(job) {
            job.run();
        }
    }

    /// Drains the list and invokes every continuation in LIFO order. The
    /// single ready transition of the owning state.
    pub fn drain(&self) {
        for job in self.stack.consume() {
            job.run();
        }
    }

    pub fn is_consumed(&self) -> bool {
        self.stack.is_consumed()
    }

    /// The blocking waiter, registered as a continuation on first use.
    /// Registration is idempotent and safe against a concurrent drain: a
    /// push that loses the race runs inline and notifies immediately.
    fn waiter(&self) -> &Arc<Waiter> {
        self.waiter.get_or_init(|| {
            let waiter = Arc::new(Waiter::new());
            let woken = waiter.clone();
            self.push(Job::new(move || woken.notify()));
            waiter
        })
    }

    pub fn wait(&self) {
        if self.is_consumed() {
            return;
        }
        self.waiter().wait();
    }

    /// Returns `false` on timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_consumed() {
            return true;
        }
        self.waiter().wait_timeout(timeout)
    }
}

/// The state a producer fulfils and consumer handles observe.
pub(crate) struct SharedState<T> {
    cell: ResultCell<T>,
    continuations: ContinuationStack,
}

impl<T> SharedState<T> {
    pub fn new() -> Self {
        Self {
            cell: ResultCell::new(),
            continuations: ContinuationStack::new(),
        }
    }

    /// Stores the result and wakes every consumer. Returns `false` when the
    /// state was already satisfied; the late result is dropped and the
    /// stored one is untouched.
    pub fn fulfil(&self, result: Result<T, Error>) -> bool {
        if !self.cell.set(result) {
            return false;
        }
        self.continuations.drain();
        true
    }

    /// Ready means the continuation stack has been drained.
    pub fn is_ready(&self) -> bool {
        self.continuations.is_consumed()
    }

    pub fn push(&self, job: Job) {
        self.continuations.push(job);
    }

    pub fn wait(&self) {
        self.continuations.wait();
    }

    /// Returns `false` on timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.continuations.wait_timeout(timeout)
    }

    /// Moves the result out; readiness is the caller's precondition.
    pub fn take(&self) -> Result<T, Error> {
        self.cell.take()
    }

    /// Borrows the result; errors are cloned.
    pub fn peek(&self) -> Result<&T, Error> {
        self.cell.peek()
    }
}
