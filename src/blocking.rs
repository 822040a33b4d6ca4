//! Synchronous (blocking) synchronization primitives.
//!
//! These primitives block the current thread until they are released by
//! another thread. Waiting is performed by *spinning* on a [`Spinlock`], so
//! they work identically on any platform with atomics, and under [`loom`]'s
//! model checker.
//!
//! This module provides the following APIs:
//!
//! - [`Mutex`]: a synchronous [mutual exclusion] lock protecting a value,
//!       accessed through an RAII guard. The guards in this crate use it for
//!       their reader and writer counters.
//! - [`Exclusion`]: an ownerless mutual-exclusion lock, which protects no data
//!       of its own and may be released by a different thread than the one
//!       that acquired it.
//! - [`Gate`]: a binary admission gate, which is either open or closed, and
//!       blocks threads trying to pass through it while it is closed.
//!
//! [`Spinlock`]: crate::spin::Spinlock
//! [`loom`]: https://crates.io/crates/loom
//! [mutual exclusion]: https://en.wikipedia.org/wiki/Mutual_exclusion
mod exclusion;
mod gate;
mod mutex;

pub use self::{exclusion::*, gate::*, mutex::*};
