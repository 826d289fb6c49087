use std::mem::{self, MaybeUninit};
use std::ptr;

/// Inline storage of a [`Job`]: five words, pointer aligned.
type Buffer = MaybeUninit<[usize; 5]>;

/// Per-type dispatch table; immutable after construction.
struct Vtable {
    /// Moves the payload out of the buffer and invokes it.
    call: unsafe fn(*mut Buffer),
    /// Drops the payload in place without invoking it.
    drop: unsafe fn(*mut Buffer),
}

unsafe fn call_raw<F: FnOnce()>(buffer: *mut Buffer) {
    // Safe: the caller guarantees the buffer holds a live `F` and hands
    // ownership over; the value must not be touched again afterwards
    let f = unsafe { ptr::read(buffer.cast::<F>()) };
    f();
}

unsafe fn drop_raw<F>(buffer: *mut Buffer) {
    // Safe: the caller guarantees the buffer holds a live `F`
    unsafe { ptr::drop_in_place(buffer.cast::<F>()) };
}

/// A move-only, one-shot unit of work.
///
/// Small closures are stored inline; the size and alignment limits are
/// enforced at compile time by [`Job::new`], so storing a job never
/// allocates. Bigger closures go through [`Job::boxed`], which pays one
/// allocation and stores the two-word box inline instead.
///
/// Every continuation attached to a state travels as a `Job`, as does the
/// work handed to an [`Executor`](crate::Executor). Moving a job is a plain
/// `memcpy` and can never fail, which is what keeps draining a continuation
/// list panic-safe.
pub struct Job {
    buffer: Buffer,
    vtbl: Option<&'static Vtable>,
}

impl Job {
    /// Stores `f` inline.
    ///
    /// Fails to compile when `f` does not fit the inline buffer; such
    /// closures must be stored with [`Job::boxed`] instead.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        const {
            assert!(
                mem::size_of::<F>() <= mem::size_of::<Buffer>(),
                "closure does not fit the inline buffer, use Job::boxed"
            );
            assert!(
                mem::align_of::<F>() <= mem::align_of::<Buffer>(),
                "closure over-aligned for the inline buffer, use Job::boxed"
            );
        }
        let mut buffer: Buffer = MaybeUninit::uninit();
        // Safe: the const block above proves `f` fits the buffer
        unsafe { buffer.as_mut_ptr().cast::<F>().write(f) };
        Self {
            buffer,
            vtbl: Some(const {
                &Vtable {
                    call: call_raw::<F>,
                    drop: drop_raw::<F>,
                }
            }),
        }
    }

    /// Boxes `f` and stores the box inline; the escape hatch for closures
    /// bigger than the inline buffer.
    pub fn boxed<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let f: Box<dyn FnOnce() + Send> = Box::new(f);
        Self::new(move || f())
    }

    /// True when no work is stored.
    pub fn is_null(&self) -> bool {
        self.vtbl.is_none()
    }

    /// Runs the stored work, consuming the job.
    ///
    /// # Panics
    ///
    /// Panics when the job is null (default constructed).
    pub fn run(mut self) {
        let Some(vtbl) = self.vtbl.take() else {
            panic!("null job invoked");
        };
        // Safe: the vtable was built for the type stored in the buffer;
        // clearing it above keeps Drop away from the moved-out payload
        unsafe { (vtbl.call)(&mut self.buffer) };
    }
}

impl Default for Job {
    /// The null job; [`run`](Self::run) on it panics.
    fn default() -> Self {
        Self {
            buffer: MaybeUninit::uninit(),
            vtbl: None,
        }
    }
}

impl Drop for Job {
    fn drop(&mut self) {
        if let Some(vtbl) = self.vtbl.take() {
            // Safe: run() was never called, the payload is still live
            unsafe { (vtbl.drop)(&mut self.buffer) };
        }
    }
}

// Safe: both constructors only accept Send closures
unsafe impl Send for Job {}
