use std::cell::UnsafeCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::future::Future;
use crate::job::Job;
use crate::promise::Promise;
use crate::sequence::Sequence;
use crate::state::SharedState;

/// State shared by the per-input continuations of a [`when_all`] call.
///
/// `remaining` counts one slot per input plus one arming slot held by the
/// subscribing thread; the decrement that lands on zero owns the seat. The
/// arming slot keeps already-ready inputs from fulfilling before every
/// subscription is in place.
struct AllOf<S> {
    seat: UnsafeCell<Option<(S, Promise<S>)>>,
    remaining: AtomicUsize,
}

// Safe: the seat is written before the arming decrement and moved out by
// the single decrement that reaches zero; the AcqRel decrements order the
// two accesses
unsafe impl<S: Send> Sync for AllOf<S> {}

impl<S: Sequence> AllOf<S> {
    fn arrive(&self) {
        if self.remaining.fetch_sub(1, Ordering::AcqRel) != 1 {
            return;
        }
        // Safe: this call took the counter to zero, nobody else touches the
        // seat anymore
        if let Some((seq, dst)) = unsafe { &mut *self.seat.get() }.take() {
            dst.complete(Ok(seq));
        }
    }
}

/// Returns a future that becomes ready once every input does.
///
/// Readiness hands the input futures back, in their original order, each
/// ready with its own value or error: a failed input never short-circuits
/// the wait, and failures stay inside the individual futures.
///
/// The empty sequence yields an immediately ready future.
///
/// ```
/// use presto::{Future, when_all};
///
/// let all = when_all(vec![Future::ready(1), Future::ready(2)]);
/// let mut done = all.get().unwrap();
/// assert_eq!(done.remove(0).get().unwrap(), 1);
/// ```
pub fn when_all<S: Sequence>(seq: S) -> Future<S> {
    let state = Arc::new(SharedState::new());
    let dst = Promise::over(state.clone());
    let all = Arc::new(AllOf {
        seat: UnsafeCell::new(None),
        remaining: AtomicUsize::new(seq.len() + 1),
    });
    seq.for_each_state(&mut |input| {
        let all = all.clone();
        input.subscribe(Job::new(move || all.arrive()));
    });
    // Safe: no input continuation can reach zero while the arming slot is
    // outstanding, so the seat is still exclusively ours
    unsafe { *all.seat.get() = Some((seq, dst)) };
    all.arrive();
    Future::from_state(state)
}
