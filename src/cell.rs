//! The shared value protected by the guards.
use crate::loom::cell::UnsafeCell;
use core::fmt;

/// The type of the value stored in a [`SharedCell`].
pub type Value = i64;

/// A single mutable integer, shared between threads.
///
/// A `SharedCell` does no synchronization of its own: it is a bare value
/// holder, and the guard that owns it is responsible for serializing access.
/// Both of its accessors are therefore `unsafe`.
pub struct SharedCell {
    value: UnsafeCell<Value>,
}

impl SharedCell {
    /// Returns a new `SharedCell` holding `initial`.
    #[must_use]
    pub fn new(initial: Value) -> Self {
        Self {
            value: UnsafeCell::new(initial),
        }
    }

    /// Returns the current value.
    ///
    /// # Safety
    ///
    /// No other thread may be executing [`SharedCell::write`] concurrently.
    #[inline]
    pub unsafe fn read(&self) -> Value {
        self.value.with(|value| *value)
    }

    /// Replaces the current value with `f(current)`, returning the new value.
    ///
    /// # Safety
    ///
    /// The caller must have exclusive access to the cell for the duration of
    /// the call: no other thread may be executing [`SharedCell::read`] or
    /// [`SharedCell::write`] concurrently.
    #[inline]
    pub unsafe fn write(&self, f: impl FnOnce(Value) -> Value) -> Value {
        self.value.with_mut(|value| {
            let next = f(*value);
            *value = next;
            next
        })
    }
}

unsafe impl Send for SharedCell {}
// Safety: all access goes through `unsafe` methods whose contracts require the
// caller to provide mutual exclusion.
unsafe impl Sync for SharedCell {}

impl fmt::Debug for SharedCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Reading the value here would race with writers.
        f.debug_struct("SharedCell").finish_non_exhaustive()
    }
}
