use std::sync::{Condvar, Mutex, PoisonError};

/// Single-use countdown barrier.
///
/// The counter is fixed at construction, only ever counts down, and
/// releases every waiting thread when it reaches zero.
pub struct Latch {
    counter: Mutex<usize>,
    cv: Condvar,
}

impl Latch {
    pub fn new(count: usize) -> Self {
        Self {
            counter: Mutex::new(count),
            cv: Condvar::new(),
        }
    }

    /// Decrements the counter by `n`.
    ///
    /// # Panics
    ///
    /// Panics when the counter would fall below zero.
    pub fn count_down(&self, n: usize) {
        let mut counter = self.counter.lock().unwrap_or_else(PoisonError::into_inner);
        assert!(*counter >= n, "latch counted below zero");
        *counter -= n;
        if *counter == 0 {
            self.cv.notify_all();
        }
    }

    /// Decrements by one and blocks until the counter reaches zero.
    pub fn count_down_and_wait(&self) {
        let mut counter = self.counter.lock().unwrap_or_else(PoisonError::into_inner);
        assert!(*counter >= 1, "latch counted below zero");
        *counter -= 1;
        if *counter == 0 {
            self.cv.notify_all();
            return;
        }
        while *counter != 0 {
            counter = self
                .cv
                .wait(counter)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub fn is_ready(&self) -> bool {
        *self.counter.lock().unwrap_or_else(PoisonError::into_inner) == 0
    }

    /// Blocks until the counter reaches zero.
    pub fn wait(&self) {
        let mut counter = self.counter.lock().unwrap_or_else(PoisonError::into_inner);
        while *counter != 0 {
            counter = self
                .cv
                .wait(counter)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_waits_for_all_arrivals() {
        let latch = Arc::new(Latch::new(3));
        let workers: Vec<_> = (0..3)
            .map(|_| {
                let latch = latch.clone();
                thread::spawn(move || latch.count_down_and_wait())
            })
            .collect();
        latch.wait();
        assert!(latch.is_ready());
        for w in workers {
            w.join().unwrap();
        }
    }

    #[test]
    fn test_count_down_by_n() {
        let latch = Latch::new(4);
        latch.count_down(3);
        assert!(!latch.is_ready());
        latch.count_down(1);
        assert!(latch.is_ready());
        latch.wait();
    }

    #[test]
    #[should_panic(expected = "latch counted below zero")]
    fn test_overshoot_panics() {
        let latch = Latch::new(1);
        latch.count_down(2);
    }

    #[test]
    fn test_zero_latch_ready_from_start() {
        let latch = Latch::new(0);
        assert!(latch.is_ready());
        latch.wait();
    }
}
