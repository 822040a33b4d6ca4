use crate::{blocking::RawMutex, error::ProtocolViolation, spin::Spinlock};

/// An ownerless mutual-exclusion lock.
///
/// An `Exclusion` admits at most one holder at a time, but unlike a
/// [`Mutex`](super::Mutex) it protects no data of its own and it is not tied
/// to the thread that acquired it: it may be [released](Exclusion::release)
/// by any thread. This is what reader-writer protocols need when a lock is
/// held on behalf of a *group* of readers, being acquired by the first reader
/// to arrive and released by whichever reader happens to leave last.
///
/// When the same thread acquires and releases the lock, prefer the scoped
/// [`Exclusion::lock`] API, which releases the lock when the returned guard
/// is dropped.
#[derive(Debug, Default)]
pub struct Exclusion {
    lock: Spinlock,
}

/// An RAII guard holding an [`Exclusion`]. When this structure is dropped
/// (falls out of scope), the exclusion is released.
///
/// This structure is created by the [`Exclusion::lock`] and
/// [`Exclusion::try_lock`] methods.
#[derive(Debug)]
#[must_use = "if unused, the `Exclusion` will immediately be released"]
pub struct ExclusionGuard<'a> {
    exclusion: &'a Exclusion,
}

// === impl Exclusion ===

impl Exclusion {
    /// Returns a new `Exclusion`, in the released state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            lock: Spinlock::new(),
        }
    }

    /// Acquires the exclusion, spinning until it is available.
    ///
    /// The exclusion remains held until [`Exclusion::release`] is called,
    /// from this thread or any other.
    #[cfg_attr(test, track_caller)]
    pub fn acquire(&self) {
        self.lock.lock();
    }

    /// Attempts to acquire the exclusion without spinning, returning `true`
    /// if it was acquired.
    #[cfg_attr(test, track_caller)]
    #[must_use]
    pub fn try_acquire(&self) -> bool {
        self.lock.try_lock()
    }

    /// Releases the exclusion, allowing the next waiter to acquire it.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolViolation::NotHeld`] if the exclusion is not
    /// currently held.
    #[cfg_attr(test, track_caller)]
    pub fn release(&self) -> Result<(), ProtocolViolation> {
        if self.lock.try_unlock() {
            Ok(())
        } else {
            Err(ProtocolViolation::NotHeld)
        }
    }

    /// Acquires the exclusion, returning a guard that releases it when
    /// dropped.
    #[cfg_attr(test, track_caller)]
    pub fn lock(&self) -> ExclusionGuard<'_> {
        self.acquire();
        ExclusionGuard { exclusion: self }
    }

    /// Attempts to acquire the exclusion without spinning, returning a guard
    /// that releases it when dropped.
    #[cfg_attr(test, track_caller)]
    pub fn try_lock(&self) -> Option<ExclusionGuard<'_>> {
        if self.try_acquire() {
            Some(ExclusionGuard { exclusion: self })
        } else {
            None
        }
    }

    /// Returns `true` if the exclusion is currently held.
    #[inline]
    #[must_use]
    pub fn is_held(&self) -> bool {
        RawMutex::is_locked(&self.lock)
    }
}

// === impl ExclusionGuard ===

impl Drop for ExclusionGuard<'_> {
    #[cfg_attr(test, track_caller)]
    fn drop(&mut self) {
        let _released = self.exclusion.release();
        debug_assert!(
            _released.is_ok(),
            "an `ExclusionGuard` was dropped, but its exclusion was already released!"
        );
    }
}
