//! # Run a single attempt of an admitted task.
//!
//! Executes one attempt of a [`Task`]'s job, settles the outcome into the
//! scheduler's bookkeeping, and publishes the terminal event.
//!
//! ## Outcome flow
//! ```text
//! Success:
//!   job.run() → Ok(value)  → stamp finish, append to completed log,
//!                            bump counters → publish JobDone
//!
//! Failure:
//!   job.run() → Err(e)     → capture error on the task → publish JobFailed
//!   job panics → caught    → same path, JobError::Panic
//! ```
//!
//! ## Rules
//! - Always publishes **exactly one** terminal event: `JobDone` or `JobFailed`.
//! - A failed task is **not** appended to the completed log and not retried.
//! - The task leaves the in-flight set before the event is published.
//! - Bookkeeping runs under the scheduler lock; the job itself is awaited
//!   outside it, and the event is published outside it.
//! - An execution that outlives `destroy()` observes the epoch mismatch and
//!   returns without touching reset state.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::Ordering as AtomicOrdering;
use std::sync::Arc;

use futures::FutureExt;
use tokio::time::Instant;

use crate::core::scheduler::Shared;
use crate::error::JobError;
use crate::events::Event;
use crate::jobs::Task;

/// Executes one attempt of `task` and settles it against `shared`.
///
/// `epoch` is the scheduler generation observed at admission; a completion
/// from a stale generation is discarded wholesale.
pub(crate) async fn run_task<T>(shared: Arc<Shared<T>>, mut task: Task<T>, epoch: u64)
where
    T: Clone + Send + Sync + 'static,
{
    task.attempts += 1;
    task.error = None;
    task.started_at = Some(Instant::now());

    let job = Arc::clone(&task.job);
    let outcome = match AssertUnwindSafe(job.run()).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic) => Err(JobError::Panic {
            error: panic_message(&*panic),
        }),
    };

    let event = {
        let mut inner = shared.lock();
        if shared.epoch.load(AtomicOrdering::Relaxed) != epoch {
            return;
        }
        inner.in_flight.remove(&task.id);

        match outcome {
            Ok(value) => {
                task.finished_at = Some(Instant::now());
                task.result = Some(value);
                inner.done.push(task.clone());
                inner.total_done += 1;
                inner.done_since_snapshot += 1;
                Event::job_done(task)
            }
            Err(error) => {
                task.error = Some(error);
                Event::job_failed(task)
            }
        }
    };

    shared.bus.publish(&event);
}

/// Best-effort extraction of a panic payload's message.
fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
