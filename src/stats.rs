//! # Throughput and latency statistics.
//!
//! A [`StatsSnapshot`] is a point-in-time computation over the completed-task
//! log and the live queue/in-flight counters. Nothing is cached: every
//! snapshot scans the trailing window of the log, so two snapshots taken at
//! different times can disagree even with no intervening completions.
//!
//! `done_since_last` is a rolling counter drained by the snapshot that reads
//! it: the first read returns the accumulated delta, the next returns 0.
//! Callers should not request snapshots more often than they intend to
//! consume that delta.

use std::time::Duration;

use tokio::time::Instant;

use crate::jobs::Task;

/// Trailing window over which throughput and latency are computed.
pub const THROUGHPUT_WINDOW: Duration = Duration::from_secs(1);

/// Point-in-time scheduler statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Completions whose finish time falls inside the trailing window.
    pub jobs_per_second: u64,
    /// Completions since the previous snapshot (drained by each read).
    pub done_since_last: u64,
    /// Lifetime completion total.
    pub done: u64,
    /// Number of jobs currently executing.
    pub current: usize,
    /// Number of jobs still queued.
    pub remaining: usize,
    /// Mean execution time over the trailing window (zero if the window is empty).
    pub average_exec_time: Duration,
}

impl StatsSnapshot {
    /// True when nothing is queued and nothing is in flight.
    #[inline]
    pub fn is_quiescent(&self) -> bool {
        self.remaining == 0 && self.current == 0
    }
}

/// Computes `(jobs_per_second, average_exec_time)` over the trailing window.
///
/// The log is append-only in completion order, so the scan walks backwards and
/// stops at the first entry older than the window.
pub(crate) fn window_metrics<T>(log: &[Task<T>], now: Instant) -> (u64, Duration) {
    let mut count: u64 = 0;
    let mut total = Duration::ZERO;

    for task in log.iter().rev() {
        let Some(finished) = task.finished_at() else {
            continue;
        };
        if now.duration_since(finished) > THROUGHPUT_WINDOW {
            break;
        }
        count += 1;
        total += task.exec_time().unwrap_or_default();
    }

    if count == 0 {
        (0, Duration::ZERO)
    } else {
        (count, total / count as u32)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::JobError;
    use crate::jobs::{JobFn, JobId, JobRef, Task};

    fn completed_task(id: u64, started: Instant, finished: Instant) -> Task<u32> {
        let job: JobRef<u32> = JobFn::arc(|| async { Ok::<_, JobError>(0) });
        let mut task = Task::new(JobId::new(id), Arc::clone(&job), 1);
        task.started_at = Some(started);
        task.finished_at = Some(finished);
        task.result = Some(0);
        task
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_log_yields_zeroes() {
        let now = Instant::now();
        let log: Vec<Task<u32>> = Vec::new();
        assert_eq!(window_metrics(&log, now), (0, Duration::ZERO));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_counts_only_recent_completions() {
        let origin = Instant::now();
        tokio::time::advance(Duration::from_secs(10)).await;
        let now = Instant::now();

        let log = vec![
            // finished 10s ago: outside the window
            completed_task(1, origin, origin),
            // finished 200ms ago, ran for 100ms: inside
            completed_task(
                2,
                now - Duration::from_millis(300),
                now - Duration::from_millis(200),
            ),
            // finished just now, ran for 300ms: inside
            completed_task(3, now - Duration::from_millis(300), now),
        ];

        let (per_second, avg) = window_metrics(&log, now);
        assert_eq!(per_second, 2);
        assert_eq!(avg, Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_stops_at_first_stale_entry() {
        let origin = Instant::now();
        tokio::time::advance(Duration::from_secs(5)).await;
        let now = Instant::now();

        let log = vec![completed_task(1, origin, origin), completed_task(2, now, now)];
        let (per_second, _) = window_metrics(&log, now);
        assert_eq!(per_second, 1);
    }
}
