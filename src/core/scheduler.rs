//! # Scheduler: priority admission, rate limiting, and quiescence detection.
//!
//! The [`Scheduler`] owns the priority queue, the in-flight set, the
//! completed-task log, and the event bus. It runs two independent periodic
//! activities and any number of concurrent task executions.
//!
//! ## High-level architecture
//! ```text
//! push(job, priority) ──► PriorityQueue (FIFO buckets, ascending priority)
//!                              │
//!        dispatch activity     │ every loop_interval while Running:
//!        ─────────────────     ▼ admit up to rate_limit - |in_flight| tasks
//!                         task execution (one spawned future per task)
//!                              │
//!                              ├─ Ok(value)  ─► completed log ─► publish JobDone
//!                              └─ Err / panic ─► capture error ─► publish JobFailed
//!
//!        statistics activity: every stats_interval while armed:
//!          compute snapshot ─► publish Stats
//!          on quiescence    ─► transition to Paused ─► publish Drained ─► halt
//! ```
//!
//! ## Concurrency model
//! Task executions run on the async runtime and may land on any worker
//! thread, so the queue, in-flight set, completed log, and counters live
//! behind one mutex. Critical sections are plain bookkeeping: they never
//! await and never invoke user code. Events are published with the lock
//! released.
//!
//! ## Lifecycle
//! State changes go through [`transition`]; see [`crate::core::state`]. The
//! `stopped → running → paused → running` cycle has no terminal state short
//! of [`destroy`](Scheduler::destroy), which bumps the scheduler epoch so
//! that executions finishing late cannot write into reset bookkeeping.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::core::exec;
use crate::core::queue::PriorityQueue;
use crate::core::state::{transition, Actions, Request, State};
use crate::error::{JobError, SchedulerError};
use crate::events::{Bus, Event, EventKind, Payload, Subscription, SubscriptionId};
use crate::jobs::{JobFn, JobId, JobRef, Task};
use crate::stats::{self, StatsSnapshot};

/// Outcome of a [`Scheduler::start`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartResult {
    /// The scheduler transitioned to running and armed its activities.
    Started,
    /// The scheduler was already running; nothing changed.
    AlreadyRunning,
}

/// Mutable scheduler bookkeeping, serialized behind one mutex.
pub(crate) struct Inner<T> {
    pub(crate) state: State,
    pub(crate) queue: PriorityQueue<T>,
    pub(crate) in_flight: HashSet<JobId>,
    pub(crate) done: Vec<Task<T>>,
    pub(crate) total_done: u64,
    pub(crate) done_since_snapshot: u64,
    dispatch_token: Option<CancellationToken>,
    stats_token: Option<CancellationToken>,
    destroyed: bool,
}

/// State shared between the scheduler handle, its activities, and executions.
pub(crate) struct Shared<T> {
    pub(crate) cfg: Config,
    pub(crate) bus: Bus<T>,
    pub(crate) inner: Mutex<Inner<T>>,
    /// Generation counter; bumped by `destroy` to invalidate late completions.
    pub(crate) epoch: AtomicU64,
    next_id: AtomicU64,
}

impl<T> Shared<T> {
    // Critical sections never run user code, so a poisoned lock can only come
    // from a bug in our own bookkeeping; the data is still consistent enough
    // to fail fast on, not worth propagating.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Priority-aware, rate-limited job scheduler.
///
/// All methods take `&self`; share the scheduler across tasks with an `Arc`
/// if needed. Dropping the scheduler tears it down like
/// [`destroy`](Scheduler::destroy).
///
/// ## Example
/// ```rust
/// use jobvisor::{Config, JobError, JobFn, Scheduler};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let scheduler: Scheduler<u32> = Scheduler::new(Config::default())?;
///
///     let id = scheduler.push(JobFn::arc(|| async { Ok::<_, JobError>(42) }), 1)?;
///     scheduler.start()?;
///
///     assert_eq!(scheduler.wait(id).await?, 42);
///     scheduler.pause().await?;
///     Ok(())
/// }
/// ```
pub struct Scheduler<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Scheduler<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a stopped scheduler after validating `cfg`.
    pub fn new(cfg: Config) -> Result<Self, SchedulerError> {
        cfg.validate()?;
        let queue = PriorityQueue::new(cfg.max_priority);
        Ok(Self {
            shared: Arc::new(Shared {
                cfg,
                bus: Bus::new(),
                inner: Mutex::new(Inner {
                    state: State::Stopped,
                    queue,
                    in_flight: HashSet::new(),
                    done: Vec::new(),
                    total_done: 0,
                    done_since_snapshot: 0,
                    dispatch_token: None,
                    stats_token: None,
                    destroyed: false,
                }),
                epoch: AtomicU64::new(0),
                next_id: AtomicU64::new(1),
            }),
        })
    }

    /// Enqueues a job at the given priority (clamped into `[1, max_priority]`).
    ///
    /// Allowed in any state; the job becomes eligible at the next dispatch
    /// tick. Returns the task's id, usable with [`wait`](Scheduler::wait).
    pub fn push(&self, job: JobRef<T>, priority: u8) -> Result<JobId, SchedulerError> {
        let mut inner = self.shared.lock();
        if inner.destroyed {
            return Err(SchedulerError::Destroyed);
        }
        let id = JobId::new(self.shared.next_id.fetch_add(1, AtomicOrdering::Relaxed));
        inner.queue.push(Task::new(id, job, priority));
        Ok(id)
    }

    /// Enqueues a job at the mid-range priority (see [`Config::default_priority`]).
    pub fn push_default(&self, job: JobRef<T>) -> Result<JobId, SchedulerError> {
        self.push(job, self.shared.cfg.default_priority())
    }

    /// Convenience: enqueues an async closure (see [`JobFn`]).
    pub fn push_fn<F, Fut>(&self, f: F, priority: u8) -> Result<JobId, SchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<T, JobError>> + Send + 'static,
    {
        self.push(JobFn::arc(f), priority)
    }

    /// Starts (or resumes) dispatching.
    ///
    /// Idempotent: returns [`StartResult::AlreadyRunning`] without side
    /// effects if already running. Otherwise publishes one immediate `Stats`
    /// snapshot, performs the first admission pass before returning, and arms
    /// the dispatch activity (next tick after `loop_interval`) and the
    /// statistics activity (first tick after `stats_interval`).
    ///
    /// Returns once the activities are armed, not once the queue drains.
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> Result<StartResult, SchedulerError> {
        let snapshot = {
            let mut inner = self.shared.lock();
            if inner.destroyed {
                return Err(SchedulerError::Destroyed);
            }
            if inner.state == State::Running {
                return Ok(StartResult::AlreadyRunning);
            }
            let snapshot = compute_snapshot(&mut inner);
            let (next, actions) = transition(inner.state, Request::Start);
            apply(&self.shared, &mut inner, next, actions);
            snapshot
        };
        self.shared.bus.publish(&Event::stats(snapshot));
        dispatch_tick(&self.shared);
        Ok(StartResult::Started)
    }

    /// Halts admission and resolves once the scheduler drains.
    ///
    /// Resolves immediately unless running. Otherwise future dispatch ticks
    /// stop admitting tasks, in-flight tasks keep running, and the future
    /// resolves when the statistics activity publishes `Drained`.
    pub async fn pause(&self) -> Result<(), SchedulerError> {
        // Subscribe before transitioning so a drain published in between
        // cannot be missed.
        let (tx, rx) = oneshot::channel::<()>();
        let tx = Mutex::new(Some(tx));
        let sub = self.shared.bus.subscribe(
            EventKind::Drained,
            move |_| {
                if let Ok(mut slot) = tx.lock() {
                    if let Some(tx) = slot.take() {
                        let _ = tx.send(());
                    }
                }
                true
            },
            true,
        );

        {
            let mut inner = self.shared.lock();
            if inner.destroyed {
                drop(inner);
                sub.cancel();
                return Err(SchedulerError::Destroyed);
            }
            if inner.state != State::Running {
                drop(inner);
                sub.cancel();
                return Ok(());
            }
            let (next, actions) = transition(inner.state, Request::Pause);
            apply(&self.shared, &mut inner, next, actions);
        }

        rx.await.map_err(|_| SchedulerError::Destroyed)
    }

    /// Resolves with the result of the task with the given id.
    ///
    /// Race-free against completion: a once-subscription on `JobDone` is
    /// registered first (its handler acknowledges only on an id match), then
    /// the completed log is scanned; a task that already finished resolves
    /// immediately without waiting for any event.
    ///
    /// A task that *fails* never resolves this future; observe
    /// [`EventKind::JobFailed`] for failures. Resolves with
    /// [`SchedulerError::Destroyed`] if the scheduler is destroyed while
    /// waiting.
    pub async fn wait(&self, id: JobId) -> Result<T, SchedulerError> {
        let (tx, rx) = oneshot::channel::<T>();
        let tx = Mutex::new(Some(tx));
        let sub = self.shared.bus.subscribe(
            EventKind::JobDone,
            move |event| {
                let Payload::JobDone(task) = &event.payload else {
                    return false;
                };
                if task.id() != id {
                    return false;
                }
                if let Ok(mut slot) = tx.lock() {
                    if let (Some(tx), Some(result)) = (slot.take(), task.result().cloned()) {
                        let _ = tx.send(result);
                    }
                }
                true
            },
            true,
        );

        {
            let inner = self.shared.lock();
            if inner.destroyed {
                drop(inner);
                sub.cancel();
                return Err(SchedulerError::Destroyed);
            }
            let already = inner
                .done
                .iter()
                .find(|task| task.id() == id)
                .and_then(|task| task.result().cloned());
            drop(inner);
            if let Some(result) = already {
                sub.cancel();
                return Ok(result);
            }
        }

        rx.await.map_err(|_| SchedulerError::Destroyed)
    }

    /// Registers a handler for `kind`; removal only through the returned
    /// handle or [`off`](Scheduler::off).
    pub fn on(
        &self,
        kind: EventKind,
        handler: impl Fn(&Event<T>) + Send + Sync + 'static,
    ) -> Subscription<T> {
        self.shared.bus.subscribe(
            kind,
            move |event| {
                handler(event);
                false
            },
            false,
        )
    }

    /// Registers a handler removed once it acknowledges an event by
    /// returning `true`; see the bus rules in [`crate::events`].
    pub fn once(
        &self,
        kind: EventKind,
        handler: impl Fn(&Event<T>) -> bool + Send + Sync + 'static,
    ) -> Subscription<T> {
        self.shared.bus.subscribe(kind, handler, true)
    }

    /// Removes the subscription with the given identity; returns whether one
    /// was found.
    pub fn off(&self, kind: EventKind, id: SubscriptionId) -> bool {
        self.shared.bus.unsubscribe(kind, id)
    }

    /// Computes a fresh statistics snapshot.
    ///
    /// Side effect: drains the `done_since_last` rolling counter, so two
    /// consecutive calls with no intervening completions return the delta,
    /// then zero. The armed statistics activity performs the same read on its
    /// own cadence.
    pub fn stats(&self) -> Result<StatsSnapshot, SchedulerError> {
        let mut inner = self.shared.lock();
        if inner.destroyed {
            return Err(SchedulerError::Destroyed);
        }
        Ok(compute_snapshot(&mut inner))
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> State {
        self.shared.lock().state
    }

    /// Empties the queue, the in-flight bookkeeping, and the completed log.
    ///
    /// Does not change the lifecycle state and does not cancel executions
    /// already running; their completions re-enter the fresh log.
    pub fn clear(&self) -> Result<(), SchedulerError> {
        let mut inner = self.shared.lock();
        if inner.destroyed {
            return Err(SchedulerError::Destroyed);
        }
        inner.queue.clear();
        inner.in_flight.clear();
        inner.done.clear();
        inner.total_done = 0;
        inner.done_since_snapshot = 0;
        Ok(())
    }
}

impl<T> Scheduler<T> {
    /// Releases all scheduler resources and halts both periodic activities.
    ///
    /// In-flight jobs are not cancelled, but their completions are discarded:
    /// the epoch bump makes any execution admitted before the destroy settle
    /// into nothing. Every subsequent operation fails fast with
    /// [`SchedulerError::Destroyed`]; pending [`wait`](Scheduler::wait) and
    /// [`pause`](Scheduler::pause) futures resolve with the same error.
    pub fn destroy(&self) {
        let mut inner = self.shared.lock();
        if inner.destroyed {
            return;
        }
        self.shared.epoch.fetch_add(1, AtomicOrdering::Relaxed);

        let (next, actions) = transition(inner.state, Request::Stop);
        if actions.halt_dispatch {
            if let Some(token) = inner.dispatch_token.take() {
                token.cancel();
            }
        }
        if actions.halt_stats {
            if let Some(token) = inner.stats_token.take() {
                token.cancel();
            }
        }
        inner.state = next;
        inner.destroyed = true;
        inner.queue.clear();
        inner.in_flight.clear();
        inner.done.clear();
        inner.total_done = 0;
        inner.done_since_snapshot = 0;
        drop(inner);

        self.shared.bus.clear();
    }
}

impl<T> Drop for Scheduler<T> {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Applies a transition's outcome: flips the state and arms/halts activities.
///
/// Arming spawns onto the current Tokio runtime; the token for each armed
/// activity is kept so a later halt can cancel it.
fn apply<T>(shared: &Arc<Shared<T>>, inner: &mut Inner<T>, next: State, actions: Actions)
where
    T: Clone + Send + Sync + 'static,
{
    inner.state = next;

    if actions.halt_dispatch {
        if let Some(token) = inner.dispatch_token.take() {
            token.cancel();
        }
    }
    if actions.halt_stats {
        if let Some(token) = inner.stats_token.take() {
            token.cancel();
        }
    }
    if actions.arm_dispatch && inner.dispatch_token.is_none() {
        let token = CancellationToken::new();
        inner.dispatch_token = Some(token.clone());
        tokio::spawn(dispatch_loop(Arc::clone(shared), token));
    }
    if actions.arm_stats && inner.stats_token.is_none() {
        let token = CancellationToken::new();
        inner.stats_token = Some(token.clone());
        tokio::spawn(stats_loop(Arc::clone(shared), token));
    }
}

/// Dispatch activity: admits queued tasks up to the concurrency ceiling.
///
/// `start()` already ran the first admission pass, so the first tick fires
/// one `loop_interval` after arming.
async fn dispatch_loop<T>(shared: Arc<Shared<T>>, token: CancellationToken)
where
    T: Clone + Send + Sync + 'static,
{
    let period = shared.cfg.loop_interval;
    let mut tick = time::interval_at(Instant::now() + period, period);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tick.tick() => {}
        }
        if !dispatch_tick(&shared) {
            break;
        }
    }
}

/// One admission pass; returns `false` when the loop should exit.
fn dispatch_tick<T>(shared: &Arc<Shared<T>>) -> bool
where
    T: Clone + Send + Sync + 'static,
{
    let mut inner = shared.lock();
    if inner.destroyed {
        return false;
    }
    if inner.state != State::Running {
        // Halt is on its way through the cancelled token; just idle.
        return true;
    }

    let epoch = shared.epoch.load(AtomicOrdering::Relaxed);
    let capacity = shared.cfg.rate_limit.saturating_sub(inner.in_flight.len());
    for _ in 0..capacity {
        let Some(task) = inner.queue.shift() else {
            break;
        };
        inner.in_flight.insert(task.id());
        tokio::spawn(exec::run_task(Arc::clone(shared), task, epoch));
    }
    true
}

/// Statistics activity: periodic snapshots plus quiescence detection.
///
/// The first tick fires one `stats_interval` after arming; `start()` already
/// published the immediate snapshot.
async fn stats_loop<T>(shared: Arc<Shared<T>>, token: CancellationToken)
where
    T: Clone + Send + Sync + 'static,
{
    let period = shared.cfg.stats_interval;
    let mut tick = time::interval_at(Instant::now() + period, period);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tick.tick() => {}
        }
        if !stats_tick(&shared) {
            break;
        }
    }
}

/// One statistics pass; returns `false` when the loop should exit.
///
/// Quiescence means no job is in flight and nothing is eligible to run:
/// either the queue is empty, or the scheduler is no longer running and the
/// backlog is frozen. On quiescence the scheduler moves to `Paused` (if still
/// running), `Drained` is published exactly once, and the activity halts
/// until the next `start()`.
fn stats_tick<T>(shared: &Arc<Shared<T>>) -> bool
where
    T: Clone + Send + Sync + 'static,
{
    let (snapshot, quiesced) = {
        let mut inner = shared.lock();
        if inner.destroyed {
            return false;
        }
        let snapshot = compute_snapshot(&mut inner);
        let quiesced =
            snapshot.current == 0 && (snapshot.remaining == 0 || inner.state != State::Running);
        if quiesced {
            let (next, actions) = transition(inner.state, Request::Quiesce);
            apply(shared, &mut inner, next, actions);
        }
        (snapshot, quiesced)
    };

    shared.bus.publish(&Event::stats(snapshot));
    if quiesced {
        shared.bus.publish(&Event::drained());
        return false;
    }
    true
}

/// Computes a snapshot and drains the rolling delta counter.
fn compute_snapshot<T>(inner: &mut Inner<T>) -> StatsSnapshot {
    let now = Instant::now();
    let (jobs_per_second, average_exec_time) = stats::window_metrics(&inner.done, now);
    StatsSnapshot {
        jobs_per_second,
        done_since_last: std::mem::take(&mut inner.done_since_snapshot),
        done: inner.total_done,
        current: inner.in_flight.len(),
        remaining: inner.queue.len(),
        average_exec_time,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn scheduler() -> Scheduler<u32> {
        match Scheduler::new(Config::default()) {
            Ok(scheduler) => scheduler,
            Err(err) => panic!("default config rejected: {err}"),
        }
    }

    #[tokio::test]
    async fn test_push_assigns_monotonic_ids() {
        let q = scheduler();
        let first = q.push_fn(|| async { Ok(1) }, 1).unwrap();
        let second = q.push_fn(|| async { Ok(2) }, 1).unwrap();
        assert!(second > first);
        assert_eq!(q.stats().unwrap().remaining, 2);
    }

    #[tokio::test]
    async fn test_operations_fail_fast_after_destroy() {
        let q = scheduler();
        q.destroy();

        assert_eq!(
            q.push_fn(|| async { Ok(1) }, 1),
            Err(SchedulerError::Destroyed)
        );
        assert_eq!(q.start(), Err(SchedulerError::Destroyed));
        assert_eq!(q.stats(), Err(SchedulerError::Destroyed));
        assert_eq!(q.clear(), Err(SchedulerError::Destroyed));
        assert_eq!(q.pause().await, Err(SchedulerError::Destroyed));
        assert_eq!(q.state(), State::Stopped);
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent() {
        let q = scheduler();
        q.destroy();
        q.destroy();
        assert_eq!(q.state(), State::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_counter_drained_once_per_read() {
        let mut cfg = Config::default();
        // Keep the statistics activity out of the way of the manual reads.
        cfg.stats_interval = Duration::from_secs(3600);
        let q: Scheduler<u32> = Scheduler::new(cfg).unwrap();

        let id = q.push_fn(|| async { Ok(9) }, 1).unwrap();
        q.start().unwrap();
        assert_eq!(q.wait(id).await.unwrap(), 9);

        let first = q.stats().unwrap();
        assert_eq!(first.done_since_last, 1);
        assert_eq!(first.done, 1);

        let second = q.stats().unwrap();
        assert_eq!(second.done_since_last, 0);
        assert_eq!(second.done, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent_while_running() {
        let q = scheduler();
        assert_eq!(q.start().unwrap(), StartResult::Started);
        assert_eq!(q.start().unwrap(), StartResult::AlreadyRunning);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_outside_running_resolves_immediately() {
        let q = scheduler();
        q.pause().await.unwrap();
        assert_eq!(q.state(), State::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_resets_bookkeeping() {
        let q = scheduler();
        let id = q.push_fn(|| async { Ok(1) }, 1).unwrap();
        q.start().unwrap();
        q.wait(id).await.unwrap();

        q.clear().unwrap();
        let stats = q.stats().unwrap();
        assert_eq!(stats.done, 0);
        assert_eq!(stats.remaining, 0);
        assert_eq!(stats.current, 0);
        assert_eq!(stats.done_since_last, 0);
    }
}
