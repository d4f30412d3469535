//! # Priority queue: FIFO buckets, one per priority level.
//!
//! Pure data structure, no concurrency concerns of its own; the scheduler
//! serializes access. Every level in `1..=max_priority` is always present.
//!
//! ## Invariants
//! - Every stored task's priority is in `[1, max_priority]` (clamped on push).
//! - `len()` equals the sum of all bucket lengths.
//! - Dequeue order is strictly ascending priority, FIFO within a level.

use std::collections::VecDeque;

use crate::jobs::Task;

/// Pending tasks, bucketed by priority level.
pub(crate) struct PriorityQueue<T> {
    /// `buckets[i]` holds priority `i + 1`.
    buckets: Vec<VecDeque<Task<T>>>,
}

impl<T> PriorityQueue<T> {
    /// Creates a queue with `max_priority` empty levels.
    pub(crate) fn new(max_priority: u8) -> Self {
        Self {
            buckets: (0..max_priority.max(1)).map(|_| VecDeque::new()).collect(),
        }
    }

    /// Clamps `priority` into this queue's valid range.
    pub(crate) fn clamp(&self, priority: u8) -> u8 {
        priority.clamp(1, self.buckets.len() as u8)
    }

    /// Appends a task to the bucket for its (clamped) priority.
    pub(crate) fn push(&mut self, mut task: Task<T>) {
        task.priority = self.clamp(task.priority);
        self.buckets[(task.priority - 1) as usize].push_back(task);
    }

    /// Removes and returns the head of the first non-empty bucket.
    pub(crate) fn shift(&mut self) -> Option<Task<T>> {
        self.buckets.iter_mut().find_map(VecDeque::pop_front)
    }

    /// Total number of pending tasks.
    pub(crate) fn len(&self) -> usize {
        self.buckets.iter().map(VecDeque::len).sum()
    }

    /// Empties all buckets; the levels themselves remain.
    pub(crate) fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::JobError;
    use crate::jobs::{JobFn, JobId, JobRef, Task};

    fn task(id: u64, priority: u8) -> Task<u32> {
        let job: JobRef<u32> = JobFn::arc(|| async { Ok::<_, JobError>(0) });
        Task::new(JobId::new(id), Arc::clone(&job), priority)
    }

    #[test]
    fn test_priority_clamped_on_push() {
        let mut queue = PriorityQueue::new(10);
        queue.push(task(1, 0));
        queue.push(task(2, 200));

        let first = queue.shift().unwrap();
        assert_eq!(first.priority(), 1);
        let second = queue.shift().unwrap();
        assert_eq!(second.priority(), 10);
    }

    #[test]
    fn test_shift_ascending_priority_then_fifo() {
        let mut queue = PriorityQueue::new(10);
        queue.push(task(1, 5));
        queue.push(task(2, 1));
        queue.push(task(3, 5));
        queue.push(task(4, 10));

        let order: Vec<u64> = std::iter::from_fn(|| queue.shift())
            .map(|t| t.id().as_u64())
            .collect();
        assert_eq!(order, vec![2, 1, 3, 4]);
    }

    #[test]
    fn test_len_tracks_pushes_and_shifts() {
        let mut queue = PriorityQueue::new(3);
        assert_eq!(queue.len(), 0);

        queue.push(task(1, 1));
        queue.push(task(2, 2));
        queue.push(task(3, 3));
        assert_eq!(queue.len(), 3);

        queue.shift();
        assert_eq!(queue.len(), 2);

        queue.clear();
        assert_eq!(queue.len(), 0);
        assert!(queue.shift().is_none());
    }

    #[test]
    fn test_shift_on_empty_returns_none() {
        let mut queue: PriorityQueue<u32> = PriorityQueue::new(10);
        assert!(queue.shift().is_none());
    }
}
