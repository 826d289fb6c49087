use std::cell::UnsafeCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::future::Future;
use crate::job::Job;
use crate::promise::Promise;
use crate::sequence::Sequence;
use crate::state::SharedState;

/// Result of [`when_any`]: which input fulfilled the wait, plus every
/// input handed back in its original order.
#[derive(Debug)]
pub struct WhenAny<S> {
    /// Position of the input that was ready at the moment of fulfilment;
    /// `usize::MAX` for an empty input collection. Inputs completing later
    /// never change it.
    pub index: usize,
    /// The input futures, unconsumed.
    pub futures: S,
}

/// One-shot claim state of a [`when_any`] call.
///
/// The barrier starts at `len + 1`; every input continuation subtracts one
/// and the subscribing thread finally subtracts `len`. Exactly one of those
/// decrements observes the claim condition, scans for the ready index and
/// moves the sequence out; losers leave the seat alone, so the sequence is
/// moved exactly once. The counter wraps below zero for late arrivals; the
/// claim conditions stay false then.
struct AnyOf<S> {
    seat: UnsafeCell<Option<(S, Promise<WhenAny<S>>)>>,
    barrier: AtomicUsize,
}

// Safe: the seat is written before the arming decrement and taken by the
// single claiming decrement; the AcqRel decrements order the two accesses
unsafe impl<S: Send> Sync for AnyOf<S> {}

impl<S: Sequence> AnyOf<S> {
    /// Input-side decrement; claims only when it lands exactly on zero.
    fn arrive(&self) {
        if self.barrier.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.claim();
        }
    }

    /// Subscription-side decrement; claims when an input already arrived.
    fn arm(&self, len: usize) {
        if self.barrier.fetch_sub(len, Ordering::AcqRel) <= len {
            self.claim();
        }
    }

    fn claim(&self) {
        // Safe: exactly one decrement ever satisfies a claim condition
        if let Some((seq, dst)) = unsafe { &mut *self.seat.get() }.take() {
            let index = seq.ready_index();
            dst.complete(Ok(WhenAny {
                index,
                futures: seq,
            }));
        }
    }
}

/// Returns a future that becomes ready as soon as at least one input does.
///
/// The winning index identifies an input that was ready at the moment of
/// fulfilment; the sequence itself is handed back untouched, so every
/// input, winner and losers alike, can still be consumed. An empty
/// sequence yields `index == usize::MAX` immediately.
pub fn when_any<S: Sequence>(seq: S) -> Future<WhenAny<S>> {
    let state = Arc::new(SharedState::new());
    let dst = Promise::over(state.clone());
    let len = seq.len();
    if len == 0 {
        dst.complete(Ok(WhenAny {
            index: usize::MAX,
            futures: seq,
        }));
        return Future::from_state(state);
    }
    let any = Arc::new(AnyOf {
        seat: UnsafeCell::new(None),
        barrier: AtomicUsize::new(len + 1),
    });
    seq.for_each_state(&mut |input| {
        let any = any.clone();
        input.subscribe(Job::new(move || any.arrive()));
    });
    // Safe: the barrier cannot fall to zero before the arming decrement, so
    // the seat is still exclusively ours
    unsafe { *any.seat.get() = Some((seq, dst)) };
    any.arm(len);
    Future::from_state(state)
}
