//! Indirection over the concurrency primitives used by this crate.
//!
//! With `--cfg loom`, everything here comes from the [`loom`] model checker,
//! so that the guards and primitives can be exhaustively tested. Otherwise,
//! `std` and `core` are used directly, along with tiny stand-ins for the
//! parts of `loom`'s API that have no `std` equivalent.
//!
//! [`loom`]: https://crates.io/crates/loom
#![allow(dead_code, unused_imports)]

#[cfg(loom)]
pub(crate) use loom::{cell, hint, model, sync, thread};

#[cfg(not(loom))]
pub(crate) use core::hint;

#[cfg(not(loom))]
pub(crate) use std::sync;

#[cfg(not(loom))]
pub(crate) mod thread {
    pub(crate) use std::thread::yield_now;

    /// Spawns a thread which logs to the spawning thread's `tracing`
    /// subscriber, inside the spawning thread's current span.
    #[cfg(test)]
    pub(crate) fn spawn<F, T>(f: F) -> std::thread::JoinHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let dispatch = tracing::dispatcher::get_default(Clone::clone);
        let parent = tracing::Span::current();
        std::thread::spawn(move || {
            let _dispatch = tracing::dispatcher::set_default(&dispatch);
            let _span = tracing::debug_span!(parent: &parent, "spawned").entered();
            f()
        })
    }
}

/// Runs `f` once, with test logging enabled.
///
/// Under `loom`, this is `loom::model`, which runs `f` once for every
/// permitted interleaving of the threads it spawns.
#[cfg(all(test, not(loom)))]
pub(crate) fn model(f: impl FnOnce()) {
    let _trace = crate::util::test::trace_init();
    let thread = std::thread::current();
    let _span = tracing::info_span!("model", test = thread.name()).entered();
    f();
    tracing::debug!("model completed");
}

#[cfg(not(loom))]
pub(crate) mod cell {
    /// A `core::cell::UnsafeCell` with `loom`'s closure-based access API.
    #[derive(Debug)]
    pub(crate) struct UnsafeCell<T: ?Sized>(core::cell::UnsafeCell<T>);

    impl<T> UnsafeCell<T> {
        pub(crate) const fn new(data: T) -> Self {
            Self(core::cell::UnsafeCell::new(data))
        }
    }

    impl<T: ?Sized> UnsafeCell<T> {
        #[inline(always)]
        pub(crate) fn with<R>(&self, f: impl FnOnce(*const T) -> R) -> R {
            f(self.0.get())
        }

        #[inline(always)]
        pub(crate) fn with_mut<R>(&self, f: impl FnOnce(*mut T) -> R) -> R {
            f(self.0.get())
        }
    }
}
