//! A shared value guarded by a writer-priority protocol.
//!
//! See the documentation for [`WriterPriority`] for details.
use crate::{
    blocking::{Exclusion, Gate, Mutex},
    cell::{SharedCell, Value},
    error::ProtocolViolation,
};
use core::ptr;

/// A shared [`Value`] guarded by a *writer-priority* readers-writer protocol.
///
/// Any number of readers may read the value at the same time, and writers are
/// serialized with each other and with readers. As soon as a writer arrives,
/// no *new* reader may begin reading until every waiting or active writer has
/// finished. Readers that were already admitted when the writer arrived
/// finish their reads normally; the writer waits for them to drain.
///
/// # Starvation
///
/// A continuous stream of writers will starve readers indefinitely, since the
/// admission gate stays closed for as long as at least one writer is waiting
/// or writing. This is the defining property of the policy, not a bug.
///
/// # Implementation
///
/// The guard keeps separate counts of writers and readers, each behind its own
/// [`Mutex`]. The first writer to arrive closes an admission [`Gate`], which
/// every reader must pass through before registering itself; the last writer
/// to leave reopens it. Writers that arrive while the gate is already closed
/// do *not* wait at the gate, which only ever blocks readers.
///
/// The value itself is protected by an [`Exclusion`], which is held either by
/// one writer at a time or, on behalf of the whole group, by the readers (the
/// first reader in acquires it, and the last reader out releases it). Readers
/// only occupy the gate while registering, not for the duration of their read.
///
/// # Examples
///
/// ```
/// use rwprio::WriterPriority;
///
/// let guard = WriterPriority::new(1);
///
/// let mut section = guard.enter_write();
/// // No new reader is admitted while a writer is pending.
/// assert_eq!(guard.try_read(), None);
/// assert_eq!(section.write(|x| x * 2), 2);
/// drop(section);
///
/// assert_eq!(guard.read(), 2);
/// ```
#[derive(Debug)]
pub struct WriterPriority {
    cell: SharedCell,
    writers: Mutex<usize>,
    readers: Mutex<usize>,
    admission: Gate,
    writing: Exclusion,
}

/// A writer's critical section in a [`WriterPriority`] guard.
///
/// While a `WriteSection` exists, the writer has exclusive access to the
/// guarded value. The section is exited when it is dropped, or passed to
/// [`WriterPriority::exit_write`].
///
/// This structure is created by the [`WriterPriority::enter_write`] method.
#[derive(Debug)]
#[must_use = "if unused, the write section is exited immediately"]
pub struct WriteSection<'guard> {
    guard: &'guard WriterPriority,
}

/// An admitted reader. Unregisters the reader when dropped.
struct Reading<'guard> {
    guard: &'guard WriterPriority,
}

// === impl WriterPriority ===

impl WriterPriority {
    /// Returns a new `WriterPriority` guard protecting `initial`.
    #[must_use]
    pub fn new(initial: Value) -> Self {
        Self {
            cell: SharedCell::new(initial),
            writers: Mutex::new(0),
            readers: Mutex::new(0),
            admission: Gate::new(),
            writing: Exclusion::new(),
        }
    }

    /// Enters a write section, blocking until every admitted reader and every
    /// writer ahead of this one has left.
    ///
    /// As soon as this method is called, and before it returns, no new reader
    /// is admitted.
    #[cfg_attr(test, track_caller)]
    pub fn enter_write(&self) -> WriteSection<'_> {
        self.writers.with_lock(|writers| {
            *writers += 1;
            trace!(writers = *writers, "WriterPriority::enter_write");
            if *writers == 1 {
                // The first writer in shuts readers out until the last writer
                // leaves. Later writers skip the gate entirely.
                self.admission.close();
                trace!("WriterPriority::enter_write -> first writer closed the gate");
            }
        });
        self.writing.acquire();
        trace!("WriterPriority::enter_write -> writing");
        WriteSection { guard: self }
    }

    /// Replaces the value with `f(current)` inside a write section previously
    /// entered on this guard, returning the new value.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolViolation::ForeignSection`] (without calling `f`) if
    /// `section` was not entered on this guard.
    pub fn perform_write(
        &self,
        section: &mut WriteSection<'_>,
        f: impl FnOnce(Value) -> Value,
    ) -> Result<Value, ProtocolViolation> {
        self.check_section(section)?;
        Ok(section.write(f))
    }

    /// Exits a write section previously entered on this guard.
    ///
    /// If this was the last waiting or active writer, readers are admitted
    /// again.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolViolation::ForeignSection`] if `section` was not
    /// entered on this guard. The section is still exited from the guard that
    /// issued it.
    pub fn exit_write(&self, section: WriteSection<'_>) -> Result<(), ProtocolViolation> {
        let checked = self.check_section(&section);
        drop(section);
        checked
    }

    /// Replaces the value with `f(current)`, returning the new value.
    ///
    /// This is equivalent to entering a write section, writing, and exiting
    /// the section.
    #[cfg_attr(test, track_caller)]
    pub fn write(&self, f: impl FnOnce(Value) -> Value) -> Value {
        self.enter_write().write(f)
    }

    /// Reads the current value.
    ///
    /// This blocks while any writer is waiting or writing.
    #[cfg_attr(test, track_caller)]
    pub fn read(&self) -> Value {
        self.read_with(|value| value)
    }

    /// Reads the current value and calls `f` with it, inside the read section.
    ///
    /// No writer can modify the value until `f` returns, although writers
    /// arriving in the meantime will stop any further readers from being
    /// admitted.
    #[cfg_attr(test, track_caller)]
    pub fn read_with<T>(&self, f: impl FnOnce(Value) -> T) -> T {
        let reading = self.admit();
        f(reading.read())
    }

    /// Attempts to read the current value without blocking.
    ///
    /// Returns [`None`] if a writer is waiting or writing. This may also fail
    /// spuriously while another reader is being admitted.
    #[cfg_attr(test, track_caller)]
    pub fn try_read(&self) -> Option<Value> {
        let reading = {
            let _passage = self.admission.try_pass()?;
            let admitted = self.readers.with_lock(|readers| {
                if *readers == 0 && !self.writing.try_acquire() {
                    return false;
                }
                *readers += 1;
                true
            });
            if !admitted {
                return None;
            }
            Reading { guard: self }
        };
        Some(reading.read())
    }

    /// Returns the number of readers currently admitted.
    #[must_use]
    pub fn active_readers(&self) -> usize {
        self.readers.with_lock(|readers| *readers)
    }

    /// Returns the number of writers currently waiting or writing.
    #[must_use]
    pub fn active_writers(&self) -> usize {
        self.writers.with_lock(|writers| *writers)
    }

    /// Returns `true` if new readers are currently being turned away.
    #[must_use]
    pub fn is_admission_closed(&self) -> bool {
        self.admission.is_closed()
    }

    #[cfg_attr(test, track_caller)]
    fn admit(&self) -> Reading<'_> {
        // The passage is held only while the reader registers itself.
        let _passage = self.admission.pass();
        self.readers.with_lock(|readers| {
            *readers += 1;
            trace!(readers = *readers, "WriterPriority::read");
            if *readers == 1 {
                self.writing.acquire();
                trace!("WriterPriority::read -> first reader locked out writers");
            }
        });
        Reading { guard: self }
    }

    fn check_section(&self, section: &WriteSection<'_>) -> Result<(), ProtocolViolation> {
        if ptr::eq(self, section.guard) {
            Ok(())
        } else {
            Err(ProtocolViolation::ForeignSection)
        }
    }
}

impl Default for WriterPriority {
    /// Returns a guard protecting the value `1`.
    fn default() -> Self {
        Self::new(1)
    }
}

// === impl WriteSection ===

impl WriteSection<'_> {
    /// Replaces the value with `f(current)`, returning the new value.
    #[inline]
    pub fn write(&mut self, f: impl FnOnce(Value) -> Value) -> Value {
        unsafe {
            // Safety: a write section holds the value exclusion, which
            // excludes readers and every other writer.
            self.guard.cell.write(f)
        }
    }

    /// Reads the value.
    #[inline]
    #[must_use]
    pub fn read(&self) -> Value {
        unsafe {
            // Safety: a write section holds the value exclusion.
            self.guard.cell.read()
        }
    }
}

impl Drop for WriteSection<'_> {
    fn drop(&mut self) {
        let guard = self.guard;
        let _released = guard.writing.release();
        debug_assert!(
            _released.is_ok(),
            "a write section was dropped, but it was not holding the exclusion!"
        );

        guard.writers.with_lock(|writers| {
            debug_assert_ne!(*writers, 0, "left a write section nobody entered");
            *writers -= 1;
            trace!(writers = *writers, "WriterPriority::exit_write");
            if *writers == 0 {
                let _opened = guard.admission.open();
                debug_assert!(
                    _opened.is_ok(),
                    "the last writer left, but the admission gate was open!"
                );
                trace!("WriterPriority::exit_write -> last writer opened the gate");
            }
        });
    }
}

// === impl Reading ===

impl Reading<'_> {
    #[inline]
    fn read(&self) -> Value {
        unsafe {
            // Safety: while any reader is admitted, the readers collectively
            // hold the value exclusion.
            self.guard.cell.read()
        }
    }
}

impl Drop for Reading<'_> {
    fn drop(&mut self) {
        let guard = self.guard;
        guard.readers.with_lock(|readers| {
            debug_assert_ne!(*readers, 0, "left a read section nobody entered");
            *readers -= 1;
            trace!(readers = *readers, "WriterPriority::read -> done");
            if *readers == 0 {
                let _released = guard.writing.release();
                debug_assert!(
                    _released.is_ok(),
                    "the last reader left, but writers were not locked out!"
                );
                trace!("WriterPriority::read -> last reader let writers in");
            }
        });
    }
}

#[cfg(test)]
mod tests;
