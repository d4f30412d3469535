//! # LogWriter — event-to-log bridge
//!
//! A minimal observer that forwards every scheduler event to the `log`
//! facade. Use it for demos or as a reference for writing your own handlers.
//!
//! ## Example output
//! ```text
//! [done] job=3 priority=1 exec=12ms
//! [error] job=4 err="connection refused"
//! [stats] done=10 current=2 remaining=5 per_second=8
//! [drain]
//! ```

use crate::core::Scheduler;
use crate::events::{Event, EventKind, Payload, Subscription};

/// Bridges scheduler events into `log` records.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Subscribes a logging handler to every event kind.
    ///
    /// The returned handles keep nothing alive; drop them to forget about the
    /// subscriptions, or `cancel()` them to detach logging again.
    pub fn attach<T>(scheduler: &Scheduler<T>) -> Vec<Subscription<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        [
            EventKind::JobDone,
            EventKind::JobFailed,
            EventKind::Stats,
            EventKind::Drained,
        ]
        .into_iter()
        .map(|kind| scheduler.on(kind, write))
        .collect()
    }
}

fn write<T>(event: &Event<T>) {
    match &event.payload {
        Payload::JobDone(task) => {
            log::info!(
                "[done] job={} priority={} exec={:?}",
                task.id(),
                task.priority(),
                task.exec_time().unwrap_or_default()
            );
        }
        Payload::JobFailed(task) => {
            log::warn!(
                "[error] job={} err={:?}",
                task.id(),
                task.error().map(|e| e.as_message()).unwrap_or("unknown")
            );
        }
        Payload::Stats(snapshot) => {
            log::debug!(
                "[stats] done={} current={} remaining={} per_second={}",
                snapshot.done,
                snapshot.current,
                snapshot.remaining,
                snapshot.jobs_per_second
            );
        }
        Payload::Drained => {
            log::info!("[drain]");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn test_attach_subscribes_every_kind() {
        let scheduler: Scheduler<u32> = match Scheduler::new(Config::default()) {
            Ok(s) => s,
            Err(err) => panic!("default config rejected: {err}"),
        };
        let subs = LogWriter::attach(&scheduler);
        assert_eq!(subs.len(), 4);
        for sub in &subs {
            assert!(sub.cancel());
        }
    }
}
