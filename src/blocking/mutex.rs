use crate::{loom::cell::UnsafeCell, spin::Spinlock};
use core::fmt;

/// A raw lock: mutual exclusion with no data attached.
///
/// # Safety
///
/// While one caller holds the lock (between a successful [`lock`] or
/// [`try_lock`] and the matching [`unlock`]), no other caller may acquire it.
///
/// [`lock`]: RawMutex::lock
/// [`try_lock`]: RawMutex::try_lock
/// [`unlock`]: RawMutex::unlock
pub unsafe trait RawMutex {
    /// Acquires the lock, blocking until it is available.
    fn lock(&self);

    /// Acquires the lock if it is available, returning whether it was
    /// acquired.
    fn try_lock(&self) -> bool;

    /// Releases the lock.
    ///
    /// # Safety
    ///
    /// The lock must be held. It may have been acquired on another thread.
    unsafe fn unlock(&self);

    /// Returns `true` if somebody holds the lock.
    fn is_locked(&self) -> bool;
}

/// A value which can only be accessed while holding a [`RawMutex`].
///
/// There are no lock guards: the value is lent to a closure by
/// [`with_lock`] or [`try_with_lock`], and the lock is released as soon as the
/// closure returns or unwinds. The guards in this crate use a `Mutex` for each
/// of their reader and writer counts.
///
/// Waiters are not queued, so there is no fairness between them.
///
/// [`with_lock`]: Mutex::with_lock
/// [`try_with_lock`]: Mutex::try_with_lock
pub struct Mutex<T, Lock = Spinlock> {
    lock: Lock,
    data: UnsafeCell<T>,
}

/// Releases a held [`RawMutex`] when dropped.
struct Held<'lock, Lock: RawMutex>(&'lock Lock);

// === impl Mutex ===

impl<T> Mutex<T> {
    /// Returns a new, unlocked `Mutex` holding `data`, using a [`Spinlock`].
    ///
    /// # Examples
    ///
    /// ```
    /// use rwprio::blocking::Mutex;
    ///
    /// let count = Mutex::new(0);
    /// count.with_lock(|count| *count += 1);
    /// assert_eq!(count.with_lock(|count| *count), 1);
    /// ```
    #[must_use]
    pub fn new(data: T) -> Self {
        Self::with_raw_mutex(data, Spinlock::new())
    }
}

impl<T, Lock> Mutex<T, Lock> {
    /// Returns a new `Mutex` holding `data`, guarded by `lock`.
    ///
    /// `lock` should be unlocked.
    #[must_use]
    pub fn with_raw_mutex(data: T, lock: Lock) -> Self {
        Self {
            lock,
            data: UnsafeCell::new(data),
        }
    }
}

impl<T, Lock: RawMutex> Mutex<T, Lock> {
    /// Locks the mutex, blocking until it is available, and calls `f` with
    /// the data.
    #[cfg_attr(test, track_caller)]
    pub fn with_lock<U>(&self, f: impl FnOnce(&mut T) -> U) -> U {
        self.lock.lock();
        self.locked(f)
    }

    /// Calls `f` with the data if the mutex can be locked without blocking.
    ///
    /// Returns [`None`] without calling `f` if the mutex is already locked.
    #[cfg_attr(test, track_caller)]
    pub fn try_with_lock<U>(&self, f: impl FnOnce(&mut T) -> U) -> Option<U> {
        if self.lock.try_lock() {
            Some(self.locked(f))
        } else {
            None
        }
    }

    /// Returns `true` if the mutex is locked.
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    /// Runs `f` with the data. The lock must already be held; it is released
    /// when `f` returns.
    fn locked<U>(&self, f: impl FnOnce(&mut T) -> U) -> U {
        let _held = Held(&self.lock);
        self.data.with_mut(|data| unsafe {
            // Safety: the lock is held until `_held` is dropped.
            f(&mut *data)
        })
    }
}

impl<T: Default, Lock: Default> Default for Mutex<T, Lock> {
    fn default() -> Self {
        Self::with_raw_mutex(T::default(), Lock::default())
    }
}

impl<T: fmt::Debug, Lock: RawMutex> fmt::Debug for Mutex<T, Lock> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.try_with_lock(|data| f.debug_tuple("Mutex").field(data).finish())
            .unwrap_or_else(|| f.write_str("Mutex(<locked>)"))
    }
}

// Safety: the data is only reachable through the lock.
unsafe impl<T: Send, Lock: Send> Send for Mutex<T, Lock> {}
unsafe impl<T: Send, Lock: Sync> Sync for Mutex<T, Lock> {}

// === impl Held ===

impl<Lock: RawMutex> Drop for Held<'_, Lock> {
    #[inline]
    fn drop(&mut self) {
        unsafe {
            // Safety: a `Held` is only constructed while the lock is held.
            self.0.unlock()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loom::{self, sync::Arc, thread};

    #[test]
    fn increments_are_not_lost() {
        loom::model(|| {
            let count = Arc::new(Mutex::new(0usize));

            let t = thread::spawn({
                let count = count.clone();
                move || count.with_lock(|n| *n += 1)
            });
            count.with_lock(|n| *n += 1);
            t.join().unwrap();

            assert_eq!(count.with_lock(|n| *n), 2);
        });
    }

    #[test]
    fn try_with_lock_while_locked() {
        loom::model(|| {
            let mutex = Mutex::new(42);

            let nested = mutex.with_lock(|n| {
                *n += 1;
                assert!(mutex.is_locked());
                mutex.try_with_lock(|n| *n)
            });
            assert_eq!(nested, None);

            assert_eq!(mutex.try_with_lock(|n| *n), Some(43));
            assert!(!mutex.is_locked());
        });
    }

    #[cfg(not(loom))]
    #[test]
    fn unlocks_on_panic() {
        let mutex = Mutex::new(0usize);
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            mutex.with_lock(|n| {
                *n += 1;
                panic!("oh no");
            })
        }));
        assert!(res.is_err());
        assert!(!mutex.is_locked());
        assert_eq!(mutex.with_lock(|n| *n), 1);
    }

    #[cfg(not(loom))]
    #[test]
    fn debug_shows_data_unless_locked() {
        let mutex = Mutex::new(7);
        assert_eq!(format!("{mutex:?}"), "Mutex(7)");
        mutex.with_lock(|_| assert_eq!(format!("{mutex:?}"), "Mutex(<locked>)"));
    }
}
