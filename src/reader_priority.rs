//! A shared value guarded by a reader-priority protocol.
//!
//! See the documentation for [`ReaderPriority`] for details.
use crate::{
    blocking::{Exclusion, Mutex},
    cell::{SharedCell, Value},
    error::ProtocolViolation,
};
use core::ptr;

/// A shared [`Value`] guarded by a *reader-priority* readers-writer protocol.
///
/// Any number of readers may read the value at the same time. A writer may
/// only write while no reader is reading, and once one reader is active,
/// newly arriving readers are admitted immediately, even if a writer has been
/// waiting for longer. Writers are serialized with each other and with
/// readers.
///
/// # Starvation
///
/// Readers are never blocked by a *waiting* writer, only by a writer that is
/// already writing. This means that a continuous stream of overlapping readers
/// will starve writers indefinitely: the writer proceeds only once the last
/// reader has left. This is the defining property of the policy, not a bug.
/// If writers must make progress, use
/// [`WriterPriority`](crate::WriterPriority) instead.
///
/// # Implementation
///
/// The guard tracks the number of active readers behind a [`Mutex`], and uses
/// an [`Exclusion`] to serialize writers. The first reader to arrive acquires
/// the writer exclusion on behalf of all readers, and the last reader to leave
/// releases it, so writers see the whole group of overlapping readers as a
/// single holder of the lock.
///
/// # Examples
///
/// ```
/// use rwprio::ReaderPriority;
///
/// let guard = ReaderPriority::new(1);
///
/// let first = guard.enter_read();
/// let second = guard.enter_read();
/// assert_eq!(first.read(), second.read());
///
/// // Writers must wait until every reader has left.
/// assert_eq!(guard.try_write(|x| x * 2), None);
/// drop((first, second));
///
/// assert_eq!(guard.write(|x| x * 2), 2);
/// assert_eq!(guard.read(), 2);
/// ```
#[derive(Debug)]
pub struct ReaderPriority {
    cell: SharedCell,
    readers: Mutex<usize>,
    writing: Exclusion,
}

/// A reader's critical section in a [`ReaderPriority`] guard.
///
/// While a `ReadSection` exists, no writer can modify the guarded value. The
/// section is exited when it is dropped, or passed to
/// [`ReaderPriority::exit_read`].
///
/// This structure is created by the [`ReaderPriority::enter_read`] method.
#[derive(Debug)]
#[must_use = "if unused, the read section is exited immediately"]
pub struct ReadSection<'guard> {
    guard: &'guard ReaderPriority,
}

// === impl ReaderPriority ===

impl ReaderPriority {
    /// Returns a new `ReaderPriority` guard protecting `initial`.
    #[must_use]
    pub fn new(initial: Value) -> Self {
        Self {
            cell: SharedCell::new(initial),
            readers: Mutex::new(0),
            writing: Exclusion::new(),
        }
    }

    /// Enters a read section, blocking while a writer is writing.
    ///
    /// If other readers are already active, this never blocks on writers,
    /// including writers that are waiting to write.
    #[cfg_attr(test, track_caller)]
    pub fn enter_read(&self) -> ReadSection<'_> {
        self.readers.with_lock(|readers| {
            *readers += 1;
            trace!(readers = *readers, "ReaderPriority::enter_read");
            if *readers == 1 {
                // The first reader in locks writers out on behalf of every
                // reader that follows it.
                self.writing.acquire();
                trace!("ReaderPriority::enter_read -> first reader locked out writers");
            }
        });
        ReadSection { guard: self }
    }

    /// Reads the value inside a read section previously entered on this
    /// guard.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolViolation::ForeignSection`] if `section` was not
    /// entered on this guard.
    pub fn perform_read(&self, section: &ReadSection<'_>) -> Result<Value, ProtocolViolation> {
        self.check_section(section)?;
        Ok(section.read())
    }

    /// Exits a read section previously entered on this guard.
    ///
    /// If this was the last active reader, waiting writers may proceed.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolViolation::ForeignSection`] if `section` was not
    /// entered on this guard. The section is still exited from the guard that
    /// issued it.
    pub fn exit_read(&self, section: ReadSection<'_>) -> Result<(), ProtocolViolation> {
        let checked = self.check_section(&section);
        drop(section);
        checked
    }

    /// Reads the current value.
    ///
    /// This is equivalent to entering a read section, reading the value, and
    /// exiting the section.
    #[cfg_attr(test, track_caller)]
    pub fn read(&self) -> Value {
        self.enter_read().read()
    }

    /// Reads the current value and calls `f` with it, inside the read section.
    ///
    /// No writer can modify the value until `f` returns.
    #[cfg_attr(test, track_caller)]
    pub fn read_with<T>(&self, f: impl FnOnce(Value) -> T) -> T {
        let section = self.enter_read();
        f(section.read())
    }

    /// Replaces the value with `f(current)`, returning the new value.
    ///
    /// This blocks until no reader is active and no other writer is writing.
    #[cfg_attr(test, track_caller)]
    pub fn write(&self, f: impl FnOnce(Value) -> Value) -> Value {
        let _writing = self.writing.lock();
        trace!("ReaderPriority::write -> locked");
        unsafe {
            // Safety: holding the writer exclusion excludes every reader and
            // every other writer.
            self.cell.write(f)
        }
    }

    /// Attempts to replace the value with `f(current)` without blocking.
    ///
    /// Returns [`None`] (without calling `f`) if a reader is active or another
    /// writer is writing.
    #[cfg_attr(test, track_caller)]
    pub fn try_write(&self, f: impl FnOnce(Value) -> Value) -> Option<Value> {
        let _writing = self.writing.try_lock()?;
        Some(unsafe {
            // Safety: holding the writer exclusion excludes every reader and
            // every other writer.
            self.cell.write(f)
        })
    }

    /// Returns the number of readers currently inside a read section.
    ///
    /// The count is read under the reader count lock, but may be stale as
    /// soon as this method returns.
    #[must_use]
    pub fn active_readers(&self) -> usize {
        self.readers.with_lock(|readers| *readers)
    }

    fn check_section(&self, section: &ReadSection<'_>) -> Result<(), ProtocolViolation> {
        if ptr::eq(self, section.guard) {
            Ok(())
        } else {
            Err(ProtocolViolation::ForeignSection)
        }
    }

    fn leave(&self) {
        self.readers.with_lock(|readers| {
            debug_assert_ne!(*readers, 0, "left a read section nobody entered");
            *readers -= 1;
            trace!(readers = *readers, "ReaderPriority::exit_read");
            if *readers == 0 {
                let _released = self.writing.release();
                debug_assert!(
                    _released.is_ok(),
                    "the last reader left, but writers were not locked out!"
                );
                trace!("ReaderPriority::exit_read -> last reader let writers in");
            }
        })
    }
}

impl Default for ReaderPriority {
    /// Returns a guard protecting the value `1`.
    fn default() -> Self {
        Self::new(1)
    }
}

// === impl ReadSection ===

impl ReadSection<'_> {
    /// Reads the value.
    ///
    /// Other readers may be reading concurrently, but no writer is writing.
    #[inline]
    #[must_use]
    pub fn read(&self) -> Value {
        unsafe {
            // Safety: while any read section exists, the readers collectively
            // hold the writer exclusion.
            self.guard.cell.read()
        }
    }
}

impl Drop for ReadSection<'_> {
    fn drop(&mut self) {
        self.guard.leave();
    }
}
