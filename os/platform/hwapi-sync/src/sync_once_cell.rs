use core::{
    cell::UnsafeCell,
    convert::Infallible,
    fmt,
    hint::spin_loop,
    mem::MaybeUninit,
    sync::atomic::{AtomicU8, Ordering},
};

/// 0 = UNINIT, 1 = INITING, 2 = READY
const UNINIT: u8 = 0;
const INITING: u8 = 1;
const READY: u8 = 2;

/// A thread-safe cell that is written at most once.
pub struct SyncOnceCell<T> {
    state: AtomicU8,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Default for SyncOnceCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SyncOnceCell<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(UNINIT),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// Returns `Some(&T)` if already initialized.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        if self.state.load(Ordering::Acquire) == READY {
            // SAFETY: READY guarantees the write is done
            Some(unsafe { &*(*self.value.get()).as_ptr() })
        } else {
            None
        }
    }

    /// Returns `true` once a value has been published.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.state.load(Ordering::Acquire) == READY
    }

    /// Initialize at most once and return `&T`.
    pub fn get_or_init(&self, init: impl FnOnce() -> T) -> &T {
        match self.get_or_try_init(|| Ok::<T, Infallible>(init())) {
            Ok(v) => v,
            Err(never) => match never {},
        }
    }

    /// Initialize at most once with a fallible initializer.
    ///
    /// If `init` fails the cell stays empty and the error is handed back to
    /// the caller; the next call runs a fresh initializer. Callers arriving
    /// while another thread initializes wait for it to finish.
    ///
    /// # Errors
    /// Returns whatever error `init` produced.
    pub fn get_or_try_init<E>(&self, init: impl FnOnce() -> Result<T, E>) -> Result<&T, E> {
        // Fast path
        if let Some(v) = self.get() {
            return Ok(v);
        }

        let mut init = Some(init);
        loop {
            match self
                .state
                .compare_exchange(UNINIT, INITING, Ordering::Acquire, Ordering::Acquire)
            {
                Ok(_) => {
                    // We are the initializer. The guard rolls back to UNINIT on error or panic.
                    let guard = ResetOnDrop(&self.state);
                    let Some(init) = init.take() else {
                        unreachable!("initializer runs at most once per call");
                    };
                    let v = init()?;
                    // SAFETY: INITING excludes every other writer and reader
                    unsafe {
                        (*self.value.get()).write(v);
                    }
                    core::mem::forget(guard);
                    // Publish value before marking READY
                    self.state.store(READY, Ordering::Release);
                    // SAFETY: just wrote it
                    return Ok(unsafe { &*(*self.value.get()).as_ptr() });
                }
                Err(READY) => {
                    // SAFETY: READY
                    return Ok(unsafe { &*(*self.value.get()).as_ptr() });
                }
                Err(_) => {
                    // Someone else is initializing; wait until they publish or give up
                    while self.state.load(Ordering::Acquire) == INITING {
                        spin_loop();
                    }
                }
            }
        }
    }
}

impl<T> Drop for SyncOnceCell<T> {
    fn drop(&mut self) {
        if *self.state.get_mut() == READY {
            // SAFETY: READY means the value was written and never dropped
            unsafe { self.value.get_mut().assume_init_drop() };
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for SyncOnceCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(v) => f.debug_tuple("SyncOnceCell").field(v).finish(),
            None => f.write_str("SyncOnceCell(<uninit>)"),
        }
    }
}

struct ResetOnDrop<'a>(&'a AtomicU8);

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(UNINIT, Ordering::Release);
    }
}

// Safety: shared after READY; initialization is single-writer.
unsafe impl<T: Sync + Send> Sync for SyncOnceCell<T> {}
unsafe impl<T: Send> Send for SyncOnceCell<T> {}
