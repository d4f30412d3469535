//! # Runtime events published by the scheduler.
//!
//! The [`EventKind`] enum classifies event types:
//! - **Task outcomes**: a job completed ([`EventKind::JobDone`]) or failed
//!   ([`EventKind::JobFailed`]); the payload carries the full task record.
//! - **Periodic reporting**: a statistics snapshot ([`EventKind::Stats`]).
//! - **Quiescence**: the queue emptied and the last in-flight job finished
//!   ([`EventKind::Drained`]).
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore order when observers record events
//! from multiple threads.
//!
//! ## Example
//! ```rust
//! use jobvisor::{Event, EventKind, StatsSnapshot};
//!
//! let ev: Event<u32> = Event::stats(StatsSnapshot::default());
//! assert_eq!(ev.kind(), EventKind::Stats);
//! assert!(ev.snapshot().is_some());
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::jobs::Task;
use crate::stats::StatsSnapshot;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of scheduler events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A job completed successfully; payload carries the task with its result.
    JobDone,
    /// A job failed (returned an error or panicked); payload carries the task
    /// with its captured error. The task is not in the completed log.
    JobFailed,
    /// A statistics snapshot was computed.
    Stats,
    /// The scheduler reached quiescence: no job in flight, nothing eligible to run.
    Drained,
}

impl EventKind {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::JobDone => "done",
            EventKind::JobFailed => "error",
            EventKind::Stats => "stats",
            EventKind::Drained => "drain",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Event payload, by kind.
#[derive(Clone)]
pub enum Payload<T> {
    /// Completed task, including its `result`.
    JobDone(Task<T>),
    /// Failed task, including its `error`.
    JobFailed(Task<T>),
    /// Point-in-time statistics.
    Stats(StatsSnapshot),
    /// No payload.
    Drained,
}

/// Scheduler event with ordering metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
#[derive(Clone)]
pub struct Event<T> {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event payload.
    pub payload: Payload<T>,
}

impl<T> Event<T> {
    fn with_payload(payload: Payload<T>) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            payload,
        }
    }

    /// Creates a completion event carrying the finished task.
    pub fn job_done(task: Task<T>) -> Self {
        Self::with_payload(Payload::JobDone(task))
    }

    /// Creates a failure event carrying the failed task.
    pub fn job_failed(task: Task<T>) -> Self {
        Self::with_payload(Payload::JobFailed(task))
    }

    /// Creates a statistics event.
    pub fn stats(snapshot: StatsSnapshot) -> Self {
        Self::with_payload(Payload::Stats(snapshot))
    }

    /// Creates a quiescence event.
    pub fn drained() -> Self {
        Self::with_payload(Payload::Drained)
    }

    /// Returns the event classification.
    pub fn kind(&self) -> EventKind {
        match self.payload {
            Payload::JobDone(_) => EventKind::JobDone,
            Payload::JobFailed(_) => EventKind::JobFailed,
            Payload::Stats(_) => EventKind::Stats,
            Payload::Drained => EventKind::Drained,
        }
    }

    /// Returns the task carried by a `JobDone`/`JobFailed` payload.
    pub fn task(&self) -> Option<&Task<T>> {
        match &self.payload {
            Payload::JobDone(task) | Payload::JobFailed(task) => Some(task),
            _ => None,
        }
    }

    /// Returns the snapshot carried by a `Stats` payload.
    pub fn snapshot(&self) -> Option<&StatsSnapshot> {
        match &self.payload {
            Payload::Stats(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}

impl<T> fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("Event");
        dbg.field("seq", &self.seq).field("kind", &self.kind());
        if let Some(task) = self.task() {
            dbg.field("task", task);
        }
        if let Some(snapshot) = self.snapshot() {
            dbg.field("snapshot", snapshot);
        }
        dbg.finish()
    }
}
