//! Job lifecycle observation and counters.
//!
//! Observers are notified synchronously after each lifecycle transition
//! commits, outside the scheduler's lock. [`JobStats`] is the stock
//! observer backing the stats endpoint counters.

use crate::jobs::job::JobData;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// A committed job lifecycle transition.
#[derive(Debug, Clone)]
pub enum JobEvent {
    /// A job entered the waiting queue.
    Enqueued { job: JobData },
    /// A worker claimed the job for execution.
    Claimed { job: JobData },
    /// The job finished successfully.
    Completed { job: JobData },
    /// An execution failed and the job was rescheduled.
    Retried { job: JobData, error: String },
    /// The job exhausted its attempt budget. Terminal.
    Exhausted { job: JobData, error: String },
    /// The job was cancelled while still waiting.
    Cancelled { job: JobData },
}

/// Callback interface for job lifecycle transitions.
///
/// Implementations must be cheap and non-blocking; the scheduler calls
/// them inline on whatever task drove the transition.
pub trait JobObserver: Send + Sync {
    fn on_event(&self, event: &JobEvent);
}

/// Point-in-time view of the scheduler counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobStatsSnapshot {
    /// Jobs ever enqueued.
    pub total: u64,
    /// Jobs that finished successfully.
    pub completed: u64,
    /// Jobs that exhausted their attempt budget.
    pub failed: u64,
}

/// Monotonic scheduler counters.
///
/// `total` counts enqueues; retries of the same job do not inflate it.
#[derive(Debug, Default)]
pub struct JobStats {
    total: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

impl JobStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn snapshot(&self) -> JobStatsSnapshot {
        JobStatsSnapshot {
            total: self.total.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

impl JobObserver for JobStats {
    fn on_event(&self, event: &JobEvent) {
        match event {
            JobEvent::Enqueued { .. } => {
                self.total.fetch_add(1, Ordering::Relaxed);
            }
            JobEvent::Completed { .. } => {
                self.completed.fetch_add(1, Ordering::Relaxed);
            }
            JobEvent::Exhausted { .. } => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
            JobEvent::Claimed { .. } | JobEvent::Retried { .. } | JobEvent::Cancelled { .. } => {}
        }
    }
}

/// Observer that logs lifecycle transitions through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl JobObserver for TracingObserver {
    fn on_event(&self, event: &JobEvent) {
        match event {
            JobEvent::Enqueued { job } => {
                tracing::debug!(job_id = %job.id, kind = %job.kind, not_before = %job.not_before, "Job enqueued");
            }
            JobEvent::Claimed { job } => {
                tracing::debug!(job_id = %job.id, kind = %job.kind, attempt = job.attempts_made, "Job claimed");
            }
            JobEvent::Completed { job } => {
                tracing::info!(job_id = %job.id, kind = %job.kind, "Job completed");
            }
            JobEvent::Retried { job, error } => {
                tracing::warn!(
                    job_id = %job.id,
                    kind = %job.kind,
                    attempt = job.attempts_made,
                    max_attempts = job.max_attempts,
                    error = %error,
                    "Job failed, retry scheduled"
                );
            }
            JobEvent::Exhausted { job, error } => {
                tracing::error!(
                    job_id = %job.id,
                    kind = %job.kind,
                    attempts = job.attempts_made,
                    error = %error,
                    "Job failed permanently"
                );
            }
            JobEvent::Cancelled { job } => {
                tracing::info!(job_id = %job.id, kind = %job.kind, "Job cancelled");
            }
        }
    }
}

/// Convenience observer for tests: records every event it sees.
pub mod test {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    pub struct RecordingObserver {
        events: Mutex<Vec<JobEvent>>,
    }

    impl RecordingObserver {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<JobEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl JobObserver for RecordingObserver {
        fn on_event(&self, event: &JobEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }
}
