//! # Job abstraction.
//!
//! This module defines the [`Job`] trait, the opaque unit of asynchronous work
//! a caller hands to the scheduler. The common handle type is [`JobRef`], an
//! `Arc<dyn Job<T>>` suitable for sharing across the runtime.
//!
//! A job is invoked at most once per attempt and produces either a value of
//! the scheduler's output type `T` or a [`JobError`]. The scheduler never
//! inspects the job beyond awaiting its outcome.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::JobError;

/// # Asynchronous unit of work.
///
/// A `Job` has a single async [`run`](Job::run) method. The scheduler awaits
/// the returned future off the hot path; bookkeeping never blocks on it.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use jobvisor::{Job, JobError};
///
/// struct Fetch;
///
/// #[async_trait]
/// impl Job<u32> for Fetch {
///     async fn run(&self) -> Result<u32, JobError> {
///         // do work...
///         Ok(7)
///     }
/// }
/// ```
#[async_trait]
pub trait Job<T>: Send + Sync + 'static {
    /// Executes one attempt of the job.
    async fn run(&self) -> Result<T, JobError>;
}

/// Shared handle to a job (`Arc<dyn Job<T>>`).
pub type JobRef<T> = Arc<dyn Job<T>>;
