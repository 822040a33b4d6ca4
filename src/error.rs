//! Errors returned when a synchronization protocol is used incorrectly.

/// A synchronization protocol was not followed.
///
/// These errors indicate a bug in the *calling* code, such as releasing a lock
/// that was never acquired, or handing a read section obtained from one guard
/// to a different guard. They are reported as soon as they are detected,
/// rather than tolerated, since continuing after a protocol violation would
/// break the mutual exclusion the guards exist to provide.
///
/// Starvation and deadlock are *not* protocol violations: starving writers
/// (under reader priority) or readers (under writer priority) is the expected
/// behavior of each policy, and a task that never leaves its critical section
/// blocks everyone else without any error being raised.
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum ProtocolViolation {
    /// A section was passed to a guard other than the one that issued it.
    #[error("protocol violation: section belongs to a different guard")]
    ForeignSection,

    /// An [`Exclusion`](crate::blocking::Exclusion) was released while it was
    /// not held.
    #[error("protocol violation: released an exclusion that was not held")]
    NotHeld,

    /// A [`Gate`](crate::blocking::Gate) was opened while it was already open.
    #[error("protocol violation: opened an admission gate that was not closed")]
    GateOpen,
}
