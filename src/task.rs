//! Reader and writer tasks, and a log of what they observed.
//!
//! A [`Task`] describes one actor contending for a [`Guard`]: its [`Role`], an
//! identifier, and an optional delay before it starts. Running a task performs
//! a single read or write and produces an [`Event`] recording the value the
//! task observed (for readers) or produced (for writers). The events of a run
//! are collected in an [`EventLog`], from which the ordering of operations can
//! be checked after the fact.
//!
//! Delays exist to shake up the interleaving of tasks, and are not part of the
//! guards' contract.
use crate::{blocking::Mutex, cell::Value, guard::Guard};
use core::{fmt, time::Duration};
use std::time::Instant;

/// The role a [`Task`] plays.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Role {
    /// Reads the shared value.
    Reader,
    /// Modifies the shared value.
    Writer,
}

/// A single reader or writer.
#[derive(Clone, Debug)]
pub struct Task {
    role: Role,
    id: usize,
    delay: Duration,
}

/// A record of one completed operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Event {
    /// The role of the task that performed the operation.
    pub role: Role,
    /// The ID of the task that performed the operation.
    pub id: usize,
    /// The value read by a reader, or the new value written by a writer.
    pub value: Value,
    /// When the operation took place. This is taken inside the critical
    /// section, so writers' events are ordered the same way as their writes.
    pub at: Instant,
}

/// A thread-safe, append-only log of [`Event`]s.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<Event>>,
}

// === impl Role ===

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Role::Reader => "Reader",
            Role::Writer => "Writer",
        })
    }
}

// === impl Task ===

impl Task {
    /// Returns a new reader task with the given ID.
    #[must_use]
    pub fn reader(id: usize) -> Self {
        Self {
            role: Role::Reader,
            id,
            delay: Duration::ZERO,
        }
    }

    /// Returns a new writer task with the given ID.
    #[must_use]
    pub fn writer(id: usize) -> Self {
        Self {
            role: Role::Writer,
            id,
            delay: Duration::ZERO,
        }
    }

    /// Makes the task sleep for `delay` before performing its operation.
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        Self { delay, ..self }
    }

    /// Returns this task's role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns this task's ID.
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Returns the delay before this task performs its operation.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Runs the task against `guard`, recording the resulting [`Event`] in
    /// `log`.
    ///
    /// A reader reads the value; a writer replaces it with `transform(current)`.
    /// Readers ignore `transform`.
    pub fn run(
        &self,
        guard: &Guard,
        transform: impl FnOnce(Value) -> Value,
        log: &EventLog,
    ) -> Event {
        if !self.delay.is_zero() {
            trace!(role = %self.role, id = self.id, delay = ?self.delay, "Task::run -> sleeping");
            std::thread::sleep(self.delay);
        }

        let (value, at) = match self.role {
            Role::Reader => guard.read_with(|value| (value, Instant::now())),
            Role::Writer => {
                let mut at = None;
                let value = guard.write(|current| {
                    let next = transform(current);
                    at = Some(Instant::now());
                    next
                });
                (value, at.unwrap_or_else(Instant::now))
            }
        };

        let event = Event {
            role: self.role,
            id: self.id,
            value,
            at,
        };
        debug!(role = %self.role, id = self.id, value, "Task::run -> done");
        log.record(event);
        event
    }
}

// === impl EventLog ===

impl EventLog {
    /// Returns a new, empty `EventLog`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event to the log.
    pub fn record(&self, event: Event) {
        self.events.with_lock(|events| events.push(event));
    }

    /// Returns every event recorded so far, ordered by when it happened.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        let mut events = self.events.with_lock(|events| events.clone());
        events.sort_by_key(|event| event.at);
        events
    }

    /// Returns the events recorded for `role`, ordered by when they happened.
    #[must_use]
    pub fn events_for(&self, role: Role) -> Vec<Event> {
        let mut events = self.events();
        events.retain(|event| event.role == role);
        events
    }

    /// Returns the number of events recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.with_lock(|events| events.len())
    }

    /// Returns `true` if no events have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
