// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory FIFO job queue shared by the front-ends and the executor.
//
// Producers (one tokio task per connection) call `submit`, which only holds
// the mutex long enough to push onto the deque.  The executor thread blocks
// on the condition variable with a bounded wait so it can notice shutdown.
// Jobs are not persisted; a restart loses anything still queued.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, info, warn};

use printdown_core::error::{PrintdownError, Result};
use printdown_core::types::{JobId, PrintJob};

/// Outcome of waiting for the next job.
#[derive(Debug)]
pub enum Next {
    /// The oldest queued job.
    Job(PrintJob),
    /// Nothing arrived within the wait.
    Empty,
    /// The queue is closed and every accepted job has been handed out.
    Closed,
}

#[derive(Debug, Default)]
struct State {
    jobs: VecDeque<PrintJob>,
    closed: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<State>,
    available: Condvar,
}

/// Cloneable handle to the shared job queue.
#[derive(Debug, Clone, Default)]
pub struct JobQueue {
    shared: Arc<Shared>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job to the tail of the queue.
    ///
    /// # Errors
    ///
    /// Returns [`PrintdownError::QueueClosed`] once [`close`](Self::close)
    /// has been called.
    pub fn submit(&self, job: PrintJob) -> Result<JobId> {
        let id = job.id();
        let kind = job.kind();
        let depth = {
            let mut state = self.lock();
            if state.closed {
                warn!(job_id = %id, origin = job.origin(), "job rejected: queue closed");
                return Err(PrintdownError::QueueClosed);
            }
            state.jobs.push_back(job);
            state.jobs.len()
        };
        self.shared.available.notify_one();
        info!(job_id = %id, kind = %kind, depth, "job queued");
        Ok(id)
    }

    /// Wait up to `timeout` for the oldest job.
    ///
    /// After the queue is closed the remaining jobs are still returned in
    /// order; `Next::Closed` is only reported once the queue is empty.
    pub fn next_job(&self, timeout: Duration) -> Next {
        let state = self.lock();
        let (mut state, _) = self
            .shared
            .available
            .wait_timeout_while(state, timeout, |s| s.jobs.is_empty() && !s.closed)
            .unwrap_or_else(PoisonError::into_inner);

        match state.jobs.pop_front() {
            Some(job) => Next::Job(job),
            None if state.closed => Next::Closed,
            None => Next::Empty,
        }
    }

    /// Stop accepting new jobs.  Idempotent.
    pub fn close(&self) {
        let pending = {
            let mut state = self.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            state.jobs.len()
        };
        self.shared.available.notify_all();
        debug!(pending, "job queue closed");
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of jobs waiting to be executed.
    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Nothing panics while the lock is held, so a poisoned state is still
    // consistent.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use printdown_core::types::JobPayload;
    use std::thread;
    use std::time::Instant;

    const WAIT: Duration = Duration::from_millis(10);

    fn text_of(next: Next) -> String {
        match next {
            Next::Job(job) => match job.payload() {
                JobPayload::Text(t) => t.clone(),
                JobPayload::Image(_) => panic!("expected a text job"),
            },
            other => panic!("expected a job, got {other:?}"),
        }
    }

    #[test]
    fn submit_returns_the_job_id() {
        let queue = JobQueue::new();
        let job = PrintJob::text("a", "test");
        let expected = job.id();
        assert_eq!(queue.submit(job).unwrap(), expected);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn jobs_come_out_in_submission_order() {
        let queue = JobQueue::new();
        for text in ["a", "b", "c"] {
            queue.submit(PrintJob::text(text, "test")).unwrap();
        }
        assert_eq!(text_of(queue.next_job(WAIT)), "a");
        assert_eq!(text_of(queue.next_job(WAIT)), "b");
        assert_eq!(text_of(queue.next_job(WAIT)), "c");
        assert!(matches!(queue.next_job(WAIT), Next::Empty));
    }

    #[test]
    fn empty_wait_is_bounded() {
        let queue = JobQueue::new();
        let start = Instant::now();
        assert!(matches!(queue.next_job(Duration::from_millis(30)), Next::Empty));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn closed_queue_rejects_but_drains() {
        let queue = JobQueue::new();
        queue.submit(PrintJob::text("kept", "test")).unwrap();
        queue.close();
        queue.close();

        let err = queue.submit(PrintJob::text("late", "test")).unwrap_err();
        assert!(matches!(err, PrintdownError::QueueClosed));
        assert!(queue.is_closed());

        assert_eq!(text_of(queue.next_job(WAIT)), "kept");
        assert!(matches!(queue.next_job(WAIT), Next::Closed));
    }

    #[test]
    fn close_wakes_a_waiting_consumer() {
        let queue = JobQueue::new();
        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || queue.next_job(Duration::from_secs(30)))
        };
        thread::sleep(Duration::from_millis(20));
        queue.close();
        assert!(matches!(consumer.join().unwrap(), Next::Closed));
    }

    #[test]
    fn per_producer_order_is_kept_across_threads() {
        let queue = JobQueue::new();
        let producers: Vec<_> = (0..4)
            .map(|p| {
                let queue = queue.clone();
                thread::spawn(move || {
                    for i in 0..50 {
                        queue.submit(PrintJob::text(format!("{p}:{i}"), "test")).unwrap();
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }

        let mut last = [None::<u32>; 4];
        let mut total = 0;
        while let Next::Job(job) = queue.next_job(WAIT) {
            let JobPayload::Text(text) = job.payload() else {
                panic!("expected text");
            };
            let (p, i) = text.split_once(':').unwrap();
            let (p, i): (usize, u32) = (p.parse().unwrap(), i.parse().unwrap());
            if let Some(prev) = last[p] {
                assert!(i > prev, "producer {p} reordered: {prev} then {i}");
            }
            last[p] = Some(i);
            total += 1;
        }
        assert_eq!(total, 200);
    }
}
