use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::Error;

const EMPTY: u8 = 0;
const WRITING: u8 = 1;
const READY: u8 = 2;
const TAKEN: u8 = 3;

/// Write-once result slot of a shared state.
///
/// The tag moves `EMPTY → WRITING → READY` exactly once; the transition is
/// claimed by a CAS so racing fulfilments cannot both write. `READY → TAKEN`
/// marks the single move-out performed by a unique handle.
///
/// Readers call [`take`](Self::take)/[`peek`](Self::peek) only once the
/// owning state is ready; cross-thread visibility of the slot rides on the
/// continuation stack's consume edge, the tag's own release-store covers the
/// same-thread and defensive paths.
pub(crate) struct ResultCell<T> {
    tag: AtomicU8,
    slot: UnsafeCell<MaybeUninit<Result<T, Error>>>,
}

impl<T> ResultCell<T> {
    pub fn new() -> Self {
        Self {
            tag: AtomicU8::new(EMPTY),
            slot: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// Stores the result. Returns `false`, dropping `result`, when the cell
    /// was already claimed by an earlier fulfilment.
    pub fn set(&self, result: Result<T, Error>) -> bool {
        if self
            .tag
            .compare_exchange(EMPTY, WRITING, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return false;
        }
        // Safe: the CAS above granted exclusive write access to the slot
        unsafe { (*self.slot.get()).write(result) };
        // release-store: a reader that observes READY also observes the slot
        self.tag.store(READY, Ordering::Release);
        true
    }

    /// Moves the result out; each cell gives up its value at most once.
    pub fn take(&self) -> Result<T, Error> {
        match self
            .tag
            .compare_exchange(READY, TAKEN, Ordering::Acquire, Ordering::Relaxed)
        {
            // Safe: the CAS granted exclusive ownership of the stored value
            Ok(_) => unsafe { (*self.slot.get()).assume_init_read() },
            Err(_) => Err(Error::NoState),
        }
    }

    /// Reads the result in place; errors are cloned out so every reader
    /// observes the same failure.
    pub fn peek(&self) -> Result<&T, Error> {
        if self.tag.load(Ordering::Acquire) != READY {
            return Err(Error::NoState);
        }
        // Safe: READY slots are initialized and never written again; unique
        // take and shared peek are never live on the same state
        match unsafe { (*self.slot.get()).assume_init_ref() } {
            Ok(value) => Ok(value),
            Err(error) => Err(error.clone()),
        }
    }
}

impl<T> Drop for ResultCell<T> {
    fn drop(&mut self) {
        // Exclusive access; only a READY slot still holds a live value
        if *self.tag.get_mut() == READY {
            // Safe: initialized by set and never taken
            unsafe { (*self.slot.get()).assume_init_drop() };
        }
    }
}

// Safe: the tag protocol serializes every access to the slot
unsafe impl<T: Send> Send for ResultCell<T> {}
unsafe impl<T: Send> Sync for ResultCell<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_set_then_take() {
        let cell = ResultCell::new();
        assert!(cell.set(Ok(5)));
        assert_eq!(cell.take().unwrap(), 5);
    }

    #[test]
    fn test_second_set_rejected() {
        let cell = ResultCell::new();
        assert!(cell.set(Ok(1)));
        assert!(!cell.set(Ok(2)));
        assert_eq!(cell.take().unwrap(), 1);
    }

    #[test]
    fn test_take_twice_reports_no_state() {
        let cell = ResultCell::new();
        cell.set(Ok(1));
        cell.take().unwrap();
        assert_eq!(cell.take(), Err(Error::NoState));
    }

    #[test]
    fn test_peek_clones_error() {
        let cell = ResultCell::<i32>::new();
        cell.set(Err(Error::BrokenPromise));
        assert_eq!(cell.peek(), Err(Error::BrokenPromise));
        // still there for the next reader
        assert_eq!(cell.peek(), Err(Error::BrokenPromise));
    }

    #[derive(Debug)]
    struct DropCounter(Arc<AtomicUsize>);
    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// An untaken value is dropped with the cell, a taken one is not
    #[test]
    fn test_drop_untaken_value() {
        let drops = Arc::new(AtomicUsize::new(0));
        {
            let cell = ResultCell::new();
            cell.set(Ok(DropCounter(drops.clone())));
        }
        assert_eq!(drops.load(Ordering::SeqCst), 1);

        let cell = ResultCell::new();
        cell.set(Ok(DropCounter(drops.clone())));
        drop(cell.take());
        drop(cell);
        assert_eq!(drops.load(Ordering::SeqCst), 2);
    }
}
