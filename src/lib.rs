//! # jobvisor
//!
//! **jobvisor** is a priority-aware, rate-limited job scheduler for async Rust.
//!
//! Callers push asynchronous jobs with a priority level; the scheduler admits
//! a bounded number of concurrently running jobs, reports throughput/latency
//! statistics, and notifies observers of completion, failure, and full-queue
//! drain. It is meant to be embedded inside a single process to smooth bursts
//! of asynchronous work against a concurrency ceiling. It is not a durable
//! queue and not a distributed scheduler.
//!
//! ## Architecture
//! ```text
//!     push(job, priority)
//!            │
//!            ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │  Scheduler                                                    │
//! │  - PriorityQueue (FIFO buckets, ascending priority first)     │
//! │  - in-flight set (at most rate_limit members)                 │
//! │  - completed log (append-only, feeds statistics and wait)     │
//! │  - Bus (typed event registry)                                 │
//! └──────┬──────────────────────────────┬─────────────────────────┘
//!        │ dispatch activity            │ statistics activity
//!        │ (every loop_interval)        │ (every stats_interval)
//!        ▼                              ▼
//!   admit up to                    publish Stats snapshot,
//!   rate_limit - |in_flight|       detect quiescence ─► publish Drained
//!        │
//!        ▼
//!   task execution (one future per job, concurrent)
//!        │
//!        ├── Ok(value) ──► completed log ──► publish JobDone
//!        └── Err/panic ──► capture error ──► publish JobFailed
//! ```
//!
//! ## Lifecycle
//! ```text
//! Stopped ──start()──► Running ──pause() / queue drained──► Paused
//!                         ▲                                   │
//!                         └──────────────start()──────────────┘
//! ```
//! `start()` while running is a no-op ([`StartResult::AlreadyRunning`]).
//! `pause()` stops admission but never preempts in-flight jobs; it resolves
//! once the statistics activity observes quiescence and publishes `Drained`.
//! `destroy()` is a hard reset: both activities halt, bookkeeping is freed,
//! and late completions are discarded via an epoch check.
//!
//! ## Features
//! | Area           | Description                                           | Key types                       |
//! |----------------|-------------------------------------------------------|---------------------------------|
//! | **Jobs**       | Define jobs as trait impls or async closures.         | [`Job`], [`JobFn`], [`JobRef`]  |
//! | **Admission**  | Priority buckets, clamped levels, FIFO within level.  | [`Config`], [`Scheduler`]       |
//! | **Events**     | Observe done/error/stats/drain with ack-based onces.  | [`EventKind`], [`Event`]        |
//! | **Statistics** | Trailing-window throughput and latency snapshots.     | [`StatsSnapshot`]               |
//! | **Errors**     | Typed errors for misuse and job failure.              | [`SchedulerError`], [`JobError`]|
//!
//! ## Optional features
//! - `logging`: exports [`LogWriter`], which forwards events to the `log` facade.
//!
//! ## Example
//! ```rust
//! use jobvisor::{Config, EventKind, JobError, JobFn, Scheduler};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scheduler: Scheduler<u32> = Scheduler::new(Config::default())?;
//!
//!     scheduler.on(EventKind::Drained, |_| {
//!         println!("queue fully drained");
//!     });
//!
//!     // Urgent job (priority 1 is served first), plus a background one.
//!     let urgent = scheduler.push(JobFn::arc(|| async { Ok::<_, JobError>(42) }), 1)?;
//!     scheduler.push_fn(|| async { Ok(7) }, 9)?;
//!
//!     scheduler.start()?;
//!     assert_eq!(scheduler.wait(urgent).await?, 42);
//!
//!     // Resolves once nothing is queued and nothing is in flight.
//!     scheduler.pause().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod jobs;
mod stats;

// ---- Public re-exports ----

pub use config::Config;
pub use core::{Scheduler, StartResult, State};
pub use error::{JobError, SchedulerError};
pub use events::{Bus, Event, EventKind, Payload, Subscription, SubscriptionId};
pub use jobs::{Job, JobFn, JobId, JobRef, Task};
pub use stats::{StatsSnapshot, THROUGHPUT_WINDOW};

// Optional: expose the log-facade observer.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
mod observers;
#[cfg(feature = "logging")]
pub use observers::LogWriter;
