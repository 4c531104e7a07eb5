//! Bare metal spinlock using atomic memory operations.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, Ordering};

/// Protects a `T` against concurrent or reentrant access.
///
/// Like `std::sync::Mutex`, minus the ability to block: interrupt context
/// cannot wait, so all locking is best-effort. The intended use is loaning a
/// resource -- typically the [`LineDriver`] -- to an interrupt handler
/// through a `SpinLock<Option<T>>` static: thread mode installs the value
/// once, the ISR takes the lock for the duration of each invocation. Under
/// that discipline `try_lock` never actually fails; a failure means two
/// handlers are fighting over the resource, which is a bug worth a panic.
///
/// [`LineDriver`]: ../../hstate/struct.LineDriver.html
#[derive(Debug)]
pub struct SpinLock<T> {
    locked: AtomicBool,
    contents: UnsafeCell<T>,
}

unsafe impl<T: Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    pub const fn new(contents: T) -> Self {
        SpinLock {
            locked: AtomicBool::new(false),
            contents: UnsafeCell::new(contents),
        }
    }

    /// Attempts to take the lock; `None` if it is already held.
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        if self.locked.swap(true, Ordering::Acquire) {
            None
        } else {
            // We observed the false->true transition, so no other holder
            // exists and an exclusive reference is sound until the guard
            // drops and stores `false` again.
            Some(SpinLockGuard {
                lock: self,
                contents: unsafe { &mut *self.contents.get() },
            })
        }
    }

    /// Takes the lock, spinning until it is available. Never call this from
    /// interrupt context; the holder you are waiting on may be the code you
    /// preempted.
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        loop {
            if let Some(guard) = self.try_lock() {
                return guard;
            }
            core::hint::spin_loop();
        }
    }
}

/// Exclusive access to the contents of a [`SpinLock`]; unlocks on drop.
#[must_use = "if dropped, the spinlock will immediately unlock"]
pub struct SpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
    contents: &'a mut T,
}

impl<'a, T> core::ops::Deref for SpinLockGuard<'a, T> {
    type Target = T;
    fn deref(&self) -> &T {
        self.contents
    }
}

impl<'a, T> core::ops::DerefMut for SpinLockGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.contents
    }
}

impl<'a, T> Drop for SpinLockGuard<'a, T> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}
