/// Exponential backoff for spin loops.
///
/// Every call to [`Backoff::spin`] busy-waits twice as long as the previous
/// one, until the ceiling set by the maximum exponent is reached. From then
/// on, each spin also yields to the OS scheduler, so a thread waiting on a
/// lock whose holder has been descheduled gives the holder a chance to run.
///
/// Under `loom`, every spin yields to the model checker instead, which is how
/// `loom` learns that the thread cannot make progress.
#[derive(Debug, Copy, Clone)]
pub struct Backoff {
    exp: u8,
    max: u8,
}

// === impl Backoff ===

impl Backoff {
    /// The largest exponent a `Backoff` may grow to, and the one used by
    /// [`Backoff::new`]: at most 2^8 spin loop hints per spin.
    pub const DEFAULT_MAX_EXPONENT: u8 = 8;

    /// Returns a `Backoff` that grows up to
    /// [`DEFAULT_MAX_EXPONENT`](Self::DEFAULT_MAX_EXPONENT).
    #[must_use]
    pub const fn new() -> Self {
        Self::with_max_exponent(Self::DEFAULT_MAX_EXPONENT)
    }

    /// Returns a `Backoff` that grows up to `max`.
    ///
    /// # Panics
    ///
    /// If `max` is greater than
    /// [`DEFAULT_MAX_EXPONENT`](Self::DEFAULT_MAX_EXPONENT).
    #[must_use]
    pub const fn with_max_exponent(max: u8) -> Self {
        assert!(
            max <= Self::DEFAULT_MAX_EXPONENT,
            "backoff exponent would overflow"
        );
        Self { exp: 0, max }
    }

    /// Waits for a little longer than last time.
    #[inline(always)]
    pub fn spin(&mut self) {
        #[cfg(not(loom))]
        {
            for _ in 0..(1u32 << self.exp) {
                crate::loom::hint::spin_loop();
            }
            if self.exp == self.max {
                crate::loom::thread::yield_now();
            }
        }

        #[cfg(loom)]
        {
            test_debug!(exp = self.exp, "Backoff::spin -> yielding to loom");
            loom::thread::yield_now();
        }

        self.exp = core::cmp::min(self.exp + 1, self.max);
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn exponent_saturates_at_max() {
        let mut boff = Backoff::with_max_exponent(2);
        for _ in 0..8 {
            boff.spin();
        }
        assert_eq!(boff.exp, 2);
    }

    #[test]
    #[should_panic]
    fn max_exponent_is_bounded() {
        let _ = Backoff::with_max_exponent(Backoff::DEFAULT_MAX_EXPONENT + 1);
    }
}
