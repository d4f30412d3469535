//! Error types used by the scheduler runtime and jobs.
//!
//! This module defines two main error enums:
//!
//! - [`SchedulerError`] — errors raised by the scheduling runtime itself.
//! - [`JobError`] — errors raised by individual job executions.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.
//! A [`JobError`] is never returned to the caller that pushed the job: it is
//! captured on the task and surfaced through the `JobFailed` event only, so one
//! failing job cannot abort the dispatch loop or its siblings.

use thiserror::Error;

/// # Errors produced by the scheduling runtime.
///
/// These represent misuse of the scheduler itself, surfaced synchronously to
/// the caller: malformed configuration at construction time, or any operation
/// invoked after [`destroy`](crate::Scheduler::destroy).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// Configuration rejected at construction time.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Which field was rejected and why.
        reason: String,
    },

    /// The scheduler was destroyed; all further operations fail fast.
    #[error("scheduler destroyed")]
    Destroyed,
}

impl SchedulerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use jobvisor::SchedulerError;
    ///
    /// assert_eq!(SchedulerError::Destroyed.as_label(), "scheduler_destroyed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SchedulerError::InvalidConfig { .. } => "invalid_config",
            SchedulerError::Destroyed => "scheduler_destroyed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SchedulerError::InvalidConfig { reason } => reason.clone(),
            SchedulerError::Destroyed => "scheduler destroyed".to_string(),
        }
    }
}

/// # Errors produced by job execution.
///
/// Captured on the task that failed and carried in the `JobFailed` event
/// payload. A failed task is not appended to the completed log and is not
/// retried.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// Job execution returned an error.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Job execution panicked; the panic was caught and isolated.
    #[error("job panicked: {error}")]
    Panic {
        /// The panic payload, best-effort stringified.
        error: String,
    },
}

impl JobError {
    /// Creates a plain execution failure from any displayable error.
    pub fn fail(error: impl Into<String>) -> Self {
        JobError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            JobError::Fail { .. } => "job_failed",
            JobError::Panic { .. } => "job_panicked",
        }
    }

    /// Returns the underlying error message, without the variant prefix.
    ///
    /// # Example
    /// ```
    /// use jobvisor::JobError;
    ///
    /// assert_eq!(JobError::fail("boom").as_message(), "boom");
    /// ```
    pub fn as_message(&self) -> &str {
        match self {
            JobError::Fail { error } => error,
            JobError::Panic { error } => error,
        }
    }
}
