//! The spinning lock every other primitive in this crate is built on.
//!
//! Nothing here parks threads. A thread that has to wait busy-polls an atomic
//! with an exponential [`Backoff`] between polls, yielding to the OS once the
//! backoff tops out. Every critical section guarded this way is a handful of
//! instructions long, apart from the guarded value's own reads and writes.
use crate::{
    blocking::RawMutex,
    loom::sync::atomic::{AtomicBool, Ordering::*},
    util::Backoff,
};

/// A test-and-test-and-set spinlock.
///
/// A `Spinlock` is not owned by a thread. It may be unlocked from a different
/// thread than the one that locked it, which [`Exclusion`] relies
/// on to let the last of a group of readers release a lock that the first one
/// acquired.
///
/// [`Exclusion`]: crate::blocking::Exclusion
#[derive(Debug)]
pub struct Spinlock {
    held: AtomicBool,
}

// === impl Spinlock ===

impl Spinlock {
    /// Returns an unlocked `Spinlock`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            held: AtomicBool::new(false),
        }
    }

    /// Unlocks the spinlock, returning `false` if it was not locked.
    #[cfg_attr(test, track_caller)]
    #[inline]
    pub(crate) fn try_unlock(&self) -> bool {
        test_dbg!(self.held.compare_exchange(true, false, Release, Relaxed)).is_ok()
    }
}

impl Default for Spinlock {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl RawMutex for Spinlock {
    #[cfg_attr(test, track_caller)]
    fn lock(&self) {
        let mut boff = Backoff::new();
        while !self.try_lock() {
            // Wait for the lock to look free before trying to take it again,
            // so waiters only read the cache line.
            while self.is_locked() {
                boff.spin();
            }
        }
    }

    #[cfg_attr(test, track_caller)]
    #[inline]
    fn try_lock(&self) -> bool {
        test_dbg!(self.held.compare_exchange(false, true, Acquire, Relaxed)).is_ok()
    }

    #[cfg_attr(test, track_caller)]
    #[inline]
    unsafe fn unlock(&self) {
        self.held.store(false, Release);
    }

    #[inline]
    fn is_locked(&self) -> bool {
        self.held.load(Relaxed)
    }
}
