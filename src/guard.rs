//! Choosing a priority policy at runtime.
use crate::{
    cell::Value, reader_priority::ReaderPriority, writer_priority::WriterPriority,
};
use core::fmt;

/// Which role a [`Guard`] favors when readers and writers contend.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Policy {
    /// Readers are favored: a writer waits until no reader is active, and
    /// new readers are admitted even while a writer is waiting.
    ///
    /// See [`ReaderPriority`].
    ReaderPriority,
    /// Writers are favored: once a writer is waiting, no new reader is
    /// admitted until every writer has finished.
    ///
    /// See [`WriterPriority`].
    WriterPriority,
}

/// A shared [`Value`] guarded by one of the priority [`Policy`]s, selected at
/// construction time.
///
/// # Examples
///
/// ```
/// use rwprio::{Guard, Policy};
///
/// for policy in [Policy::ReaderPriority, Policy::WriterPriority] {
///     let guard = Guard::new(policy, 1);
///     std::thread::scope(|s| {
///         for _ in 0..3 {
///             s.spawn(|| guard.write(|x| x * 2));
///         }
///     });
///     assert_eq!(guard.read(), 8);
/// }
/// ```
#[derive(Debug)]
pub enum Guard {
    /// A [`ReaderPriority`] guard.
    ReaderPriority(ReaderPriority),
    /// A [`WriterPriority`] guard.
    WriterPriority(WriterPriority),
}

// === impl Policy ===

impl Policy {
    /// Both policies, in a fixed order.
    pub const ALL: [Policy; 2] = [Policy::ReaderPriority, Policy::WriterPriority];

    /// Returns a short, human-readable name for this policy.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::ReaderPriority => "reader-priority",
            Policy::WriterPriority => "writer-priority",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// === impl Guard ===

impl Guard {
    /// Returns a new guard enforcing `policy`, protecting `initial`.
    #[must_use]
    pub fn new(policy: Policy, initial: Value) -> Self {
        debug!(%policy, initial, "Guard::new");
        match policy {
            Policy::ReaderPriority => Guard::ReaderPriority(ReaderPriority::new(initial)),
            Policy::WriterPriority => Guard::WriterPriority(WriterPriority::new(initial)),
        }
    }

    /// Returns the policy this guard enforces.
    #[must_use]
    pub fn policy(&self) -> Policy {
        match self {
            Guard::ReaderPriority(_) => Policy::ReaderPriority,
            Guard::WriterPriority(_) => Policy::WriterPriority,
        }
    }

    /// Reads the current value.
    #[cfg_attr(test, track_caller)]
    pub fn read(&self) -> Value {
        match self {
            Guard::ReaderPriority(guard) => guard.read(),
            Guard::WriterPriority(guard) => guard.read(),
        }
    }

    /// Reads the current value and calls `f` with it, inside the read section.
    #[cfg_attr(test, track_caller)]
    pub fn read_with<T>(&self, f: impl FnOnce(Value) -> T) -> T {
        match self {
            Guard::ReaderPriority(guard) => guard.read_with(f),
            Guard::WriterPriority(guard) => guard.read_with(f),
        }
    }

    /// Replaces the value with `f(current)`, returning the new value.
    #[cfg_attr(test, track_caller)]
    pub fn write(&self, f: impl FnOnce(Value) -> Value) -> Value {
        match self {
            Guard::ReaderPriority(guard) => guard.write(f),
            Guard::WriterPriority(guard) => guard.write(f),
        }
    }
}

impl From<ReaderPriority> for Guard {
    fn from(guard: ReaderPriority) -> Self {
        Guard::ReaderPriority(guard)
    }
}

impl From<WriterPriority> for Guard {
    fn from(guard: WriterPriority) -> Self {
        Guard::WriterPriority(guard)
    }
}
