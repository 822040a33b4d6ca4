//! Utilities shared by the primitives and guards.
//!
//! - [`Backoff`]: exponential backoff for spin loops
//!
//! The logging macros defined here compile to nothing unless the `tracing`
//! feature is enabled (or the crate is being tested). `test_dbg!` and
//! `test_debug!` are noisier still, and are only enabled in tests or with
//! `--cfg rwprio_ultraverbose`.

macro_rules! trace {
    ($($t:tt)*) => {
        #[cfg(any(test, feature = "tracing", loom))]
        tracing::trace!($($t)*);
    };
}

macro_rules! debug {
    ($($t:tt)*) => {
        #[cfg(any(test, feature = "tracing", loom))]
        tracing::debug!($($t)*);
    };
}

/// Evaluates an expression, logging its value at the call site.
macro_rules! test_dbg {
    ($e:expr) => {{
        let value = $e;
        #[cfg(any(test, all(rwprio_ultraverbose, feature = "tracing")))]
        tracing::debug!(
            location = %core::panic::Location::caller(),
            "{} = {:?}",
            stringify!($e),
            &value
        );
        value
    }};
}

#[allow(unused_macros)]
macro_rules! test_debug {
    ($($t:tt)*) => {
        #[cfg(any(test, all(rwprio_ultraverbose, feature = "tracing")))]
        tracing::debug!($($t)*);
    };
}

mod backoff;

pub use self::backoff::Backoff;
