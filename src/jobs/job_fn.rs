//! # Function-backed job (`JobFn`)
//!
//! [`JobFn`] wraps a closure `F: Fn() -> Fut`, producing a fresh future per
//! attempt. This avoids shared mutable state inside the job itself; if shared
//! state is needed, capture an `Arc<...>` explicitly inside the closure.
//!
//! ## Example
//! ```rust
//! use jobvisor::{JobError, JobFn, JobRef};
//!
//! let job: JobRef<u32> = JobFn::arc(|| async {
//!     // do work...
//!     Ok::<_, JobError>(42)
//! });
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::JobError;
use crate::jobs::job::Job;

/// Function-backed job implementation.
///
/// Wraps a closure that *creates* a new future per attempt.
#[derive(Debug)]
pub struct JobFn<F> {
    f: F,
}

impl<F> JobFn<F> {
    /// Creates a new function-backed job.
    ///
    /// Prefer [`JobFn::arc`] when you immediately need a [`JobRef`](crate::JobRef).
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the job and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut, T> Job<T> for JobFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<T, JobError>> + Send + 'static,
    T: Send + Sync + 'static,
{
    async fn run(&self) -> Result<T, JobError> {
        (self.f)().await
    }
}
