//! Lock-free once-consumable stack
//!
//! A multi-producer single-consumer LIFO with three extra properties on top
//! of a plain Treiber stack:
//!
//! - consuming may happen only once and flips the stack into the *consumed*
//!   state;
//! - pushing onto a consumed stack fails and hands the value back to the
//!   producer;
//! - a producer that observes the consumed state also observes every write
//!   the consumer made before consuming.
//!
//! ## Synchronization
//!
//! A single atomic head pointer carries all synchronization:
//!
//! | Operation | Memory Ordering | Purpose |
//! |-----------|-----------------|---------|
//! | `push` load / CAS | `Acquire` / `AcqRel` | Link the node, observe the consumed marker |
//! | `consume` swap | `AcqRel` | Take the list, publish the consumer's writes |
//! | `is_consumed` load | `Acquire` | Pair with the consume swap |
//!
//! The last property is the point of the design: the consumer writes a
//! result somewhere, then consumes the stack; any producer whose push fails
//! afterwards is guaranteed to see that result. That single exchange is how
//! a shared state publishes its value to every late subscriber.

use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use crossbeam_utils::CachePadded;

struct Node<T> {
    value: T,
    next: *mut Node<T>,
}

pub(crate) struct OnceConsumableStack<T> {
    head: CachePadded<AtomicPtr<Node<T>>>,
}

impl<T> OnceConsumableStack<T> {
    /// Marker stored in `head` once the stack has been consumed.
    ///
    /// Address 1 cannot alias a live `Box<Node<T>>`: nodes carry a pointer
    /// field, so they are at least pointer aligned. The marker is only ever
    /// compared, never dereferenced.
    fn consumed_marker() -> *mut Node<T> {
        ptr::without_provenance_mut(1)
    }

    pub fn new() -> Self {
        Self {
            head: CachePadded::new(AtomicPtr::new(ptr::null_mut())),
        }
    }

    /// Pushes a value, failing and handing it back when the stack was
    /// already consumed.
    pub fn push(&self, value: T) -> Result<(), T> {
        // acquire-load: pairs with the release half of the consume swap so
        // that a failed push observes the consumer's earlier writes
        let mut head = self.head.load(Ordering::Acquire);
        if head == Self::consumed_marker() {
            return Err(value);
        }
        let node = Box::into_raw(Box::new(Node { value, next: head }));
        loop {
            match self
                .head
                .compare_exchange(head, node, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return Ok(()),
                Err(current) if current == Self::consumed_marker() => {
                    // Safe: the CAS failed, the node never became reachable
                    let node = unsafe { Box::from_raw(node) };
                    return Err(node.value);
                }
                Err(current) => {
                    head = current;
                    // Safe: same as above, we still own the node exclusively
                    unsafe { (*node).next = head };
                }
            }
        }
    }

    /// True once [`consume`](Self::consume) ran.
    pub fn is_consumed(&self) -> bool {
        self.head.load(Ordering::Acquire) == Self::consumed_marker()
    }

    /// Consumes the stack, returning the pushed values in LIFO order.
    ///
    /// Meant to be called once, by the single consumer; racing pushes either
    /// make it into the drained list or fail and keep their value.
    pub fn consume(&self) -> Drain<T> {
        let head = self.head.swap(Self::consumed_marker(), Ordering::AcqRel);
        Drain {
            head: if head == Self::consumed_marker() {
                ptr::null_mut()
            } else {
                head
            },
        }
    }
}

impl<T> Drop for OnceConsumableStack<T> {
    fn drop(&mut self) {
        // Exclusive access (&mut self), a plain load is enough
        let head = *self.head.get_mut();
        if head != Self::consumed_marker() {
            drop(Drain { head });
        }
    }
}

// Safe: values only cross threads as whole nodes, handed over by the CAS on
// `head`; no value is ever aliased by two threads at once
unsafe impl<T: Send> Send for OnceConsumableStack<T> {}
unsafe impl<T: Send> Sync for OnceConsumableStack<T> {}

/// Owning LIFO iterator over a consumed stack; frees the remainder on drop.
pub(crate) struct Drain<T> {
    head: *mut Node<T>,
}

impl<T> Iterator for Drain<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.head.is_null() {
            return None;
        }
        // Safe: nodes of a drained list are owned exclusively by the Drain
        let node = unsafe { Box::from_raw(self.head) };
        self.head = node.next;
        Some(node.value)
    }
}

impl<T> Drop for Drain<T> {
    fn drop(&mut self) {
        while self.next().is_some() {}
    }
}

// Safe: the Drain owns its nodes outright
unsafe impl<T: Send> Send for Drain<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn test_lifo_order() {
        let stack = OnceConsumableStack::new();
        for i in 0..3 {
            stack.push(i).unwrap();
        }
        let drained: Vec<i32> = stack.consume().collect();
        assert_eq!(drained, vec![2, 1, 0]);
    }

    #[test]
    fn test_push_after_consume_returns_value() {
        let stack = OnceConsumableStack::new();
        stack.push(1).unwrap();
        drop(stack.consume());
        assert_eq!(stack.push(2), Err(2));
        assert!(stack.is_consumed());
    }

    #[test]
    fn test_consumed_only_after_consume() {
        let stack = OnceConsumableStack::<()>::new();
        assert!(!stack.is_consumed());
        drop(stack.consume());
        assert!(stack.is_consumed());
    }

    #[derive(Debug, Clone)]
    struct DropCounter(Arc<AtomicUsize>);
    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Values never consumed must be dropped with the stack (no leak)
    #[test]
    fn test_drop_unconsumed_values() {
        let drops = Arc::new(AtomicUsize::new(0));
        {
            let stack = OnceConsumableStack::new();
            stack.push(DropCounter(drops.clone())).unwrap();
            stack.push(DropCounter(drops.clone())).unwrap();
        }
        assert_eq!(drops.load(Ordering::SeqCst), 2);
    }

    /// A partially iterated drain frees the rest of the list
    #[test]
    fn test_partial_drain_frees_remainder() {
        let drops = Arc::new(AtomicUsize::new(0));
        let stack = OnceConsumableStack::new();
        for _ in 0..4 {
            stack.push(DropCounter(drops.clone())).unwrap();
        }
        let mut drain = stack.consume();
        drop(drain.next());
        drop(drain);
        assert_eq!(drops.load(Ordering::SeqCst), 4);
    }

    /// Concurrent pushes against a racing consume: every value is either
    /// drained or returned to its producer, none lost, none duplicated
    #[test]
    fn test_concurrent_push_and_consume() {
        const PER_THREAD: usize = 1_000;
        let threads = num_cpus::get().max(2);
        let stack = Arc::new(OnceConsumableStack::new());
        let rejected = Arc::new(AtomicUsize::new(0));

        let producers: Vec<_> = (0..threads)
            .map(|_| {
                let stack = stack.clone();
                let rejected = rejected.clone();
                thread::spawn(move || {
                    for i in 0..PER_THREAD {
                        if stack.push(i).is_err() {
                            rejected.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();

        // consume somewhere in the middle of the pushes
        thread::yield_now();
        let drained = stack.consume().count();

        for p in producers {
            p.join().unwrap();
        }
        let late = rejected.load(Ordering::SeqCst);
        // everything pushed after the consume bounced back
        assert_eq!(drained + late, threads * PER_THREAD);
    }
}
