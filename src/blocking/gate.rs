use crate::{
    error::ProtocolViolation,
    loom::sync::atomic::{AtomicU8, Ordering::*},
    util::Backoff,
};
use core::fmt;

/// A binary admission gate.
///
/// A `Gate` is either *open* or *closed*. While it is open, threads may
/// [pass](Gate::pass) through it, one at a time; while it is closed, any
/// thread trying to pass blocks until the gate is opened again.
///
/// Closing the gate waits for a passage in progress to complete, so once
/// [`Gate::close`] returns, nobody is inside the gate and nobody else will get
/// through until it is reopened. A gate is not owned by the thread that closed
/// it: any thread may [open](Gate::open) it.
///
/// Unlike a lock, a gate is not *held* for the duration of the work it admits.
/// A passage lasts only as long as the [`Passage`] guard returned by
/// [`Gate::pass`], which is typically just long enough to register the
/// admitted thread somewhere.
pub struct Gate {
    state: AtomicU8,
}

/// An RAII guard representing a thread passing through an open [`Gate`].
///
/// While a `Passage` exists, the gate cannot be closed, and no other thread
/// can pass. Dropping the `Passage` completes it.
///
/// This structure is created by the [`Gate::pass`] and [`Gate::try_pass`]
/// methods.
#[derive(Debug)]
#[must_use = "if unused, the passage through the `Gate` completes immediately"]
pub struct Passage<'gate> {
    gate: &'gate Gate,
}

const OPEN: u8 = 0;
const PASSING: u8 = 1;
const CLOSED: u8 = 2;

// === impl Gate ===

impl Gate {
    /// Returns a new, open `Gate`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(OPEN),
        }
    }

    /// Passes through the gate, spinning while it is closed or while another
    /// thread is passing.
    ///
    /// Returns a [`Passage`] guard; the passage completes when it is dropped.
    #[cfg_attr(test, track_caller)]
    pub fn pass(&self) -> Passage<'_> {
        let mut boff = Backoff::new();
        loop {
            if let Some(passage) = self.try_pass() {
                return passage;
            }
            boff.spin();
        }
    }

    /// Attempts to pass through the gate without spinning.
    ///
    /// Returns [`None`] if the gate is closed, or if another thread is
    /// currently passing.
    #[cfg_attr(test, track_caller)]
    pub fn try_pass(&self) -> Option<Passage<'_>> {
        test_dbg!(self
            .state
            .compare_exchange(OPEN, PASSING, Acquire, Relaxed))
        .ok()
        .map(|_| Passage { gate: self })
    }

    /// Closes the gate, spinning until any passage in progress completes.
    ///
    /// Closing a gate that is already closed blocks until some other thread
    /// reopens it.
    #[cfg_attr(test, track_caller)]
    pub fn close(&self) {
        let mut boff = Backoff::new();
        while !self.try_close() {
            boff.spin();
        }
    }

    /// Attempts to close the gate without spinning, returning `true` if it was
    /// closed by this call.
    #[cfg_attr(test, track_caller)]
    #[must_use]
    pub fn try_close(&self) -> bool {
        test_dbg!(self
            .state
            .compare_exchange(OPEN, CLOSED, Acquire, Relaxed))
        .is_ok()
    }

    /// Reopens a closed gate, releasing any threads waiting to pass.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolViolation::GateOpen`] if the gate was not closed.
    #[cfg_attr(test, track_caller)]
    pub fn open(&self) -> Result<(), ProtocolViolation> {
        test_dbg!(self
            .state
            .compare_exchange(CLOSED, OPEN, Release, Relaxed))
        .map(|_| ())
        .map_err(|_| ProtocolViolation::GateOpen)
    }

    /// Returns `true` if the gate is currently closed.
    ///
    /// A gate with a passage in progress is still open.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.load(Acquire) == CLOSED
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state.load(Relaxed) {
            OPEN => "open",
            PASSING => "passing",
            _ => "closed",
        };
        f.debug_struct("Gate").field("state", &state).finish()
    }
}

// === impl Passage ===

impl Drop for Passage<'_> {
    #[cfg_attr(test, track_caller)]
    fn drop(&mut self) {
        let _prev = test_dbg!(self.gate.state.swap(OPEN, Release));
        debug_assert_eq!(
            _prev, PASSING,
            "a `Passage` was dropped, but its gate was not being passed!"
        );
    }
}
