//! # Task record: one admitted unit of work with identity and outcome.
//!
//! A [`Task`] is created by `push`, mutated by the scheduler while it moves
//! through the queue and the in-flight set, and becomes immutable once it
//! reaches the completed log. Event payloads carry a clone of the task, so
//! observers see the full record (priority, attempt count, timestamps,
//! result or error).
//!
//! ## Identity
//! [`JobId`] is a per-scheduler monotonic counter. Ids are unique for the
//! lifetime of the scheduler instance that issued them and are never reused,
//! including across `clear()`.

use std::fmt;

use tokio::time::Instant;

use crate::error::JobError;
use crate::jobs::job::JobRef;

/// Unique identifier of a pushed job, stable for the task's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

impl JobId {
    #[inline]
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric id.
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One admitted unit of asynchronous work.
///
/// Fields are written by the scheduler only; observers receive tasks by value
/// in event payloads and via [`wait`](crate::Scheduler::wait) lookups.
#[derive(Clone)]
pub struct Task<T> {
    pub(crate) id: JobId,
    pub(crate) job: JobRef<T>,
    pub(crate) priority: u8,
    pub(crate) attempts: u32,
    pub(crate) error: Option<JobError>,
    pub(crate) started_at: Option<Instant>,
    pub(crate) finished_at: Option<Instant>,
    pub(crate) result: Option<T>,
}

impl<T> Task<T> {
    pub(crate) fn new(id: JobId, job: JobRef<T>, priority: u8) -> Self {
        Self {
            id,
            job,
            priority,
            attempts: 0,
            error: None,
            started_at: None,
            finished_at: None,
            result: None,
        }
    }

    /// Returns the task's unique id.
    #[inline]
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Returns the clamped priority the task was stored under.
    #[inline]
    pub fn priority(&self) -> u8 {
        self.priority
    }

    /// Number of times the task has been attempted.
    #[inline]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// The failure captured from the last attempt, if any.
    #[inline]
    pub fn error(&self) -> Option<&JobError> {
        self.error.as_ref()
    }

    /// The value produced by a successful attempt, if any.
    #[inline]
    pub fn result(&self) -> Option<&T> {
        self.result.as_ref()
    }

    /// When the last attempt started executing.
    #[inline]
    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// When the last attempt finished successfully.
    #[inline]
    pub fn finished_at(&self) -> Option<Instant> {
        self.finished_at
    }

    /// Wall time the successful attempt took, if the task completed.
    pub fn exec_time(&self) -> Option<std::time::Duration> {
        match (self.started_at, self.finished_at) {
            (Some(started), Some(finished)) => Some(finished.duration_since(started)),
            _ => None,
        }
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("attempts", &self.attempts)
            .field("error", &self.error)
            .field("completed", &self.result.is_some())
            .finish()
    }
}
