//! Delayed job scheduler.
//!
//! Jobs wait in a time-ordered queue until their due instant, get claimed
//! by workers one at a time, and either complete or fail back into the
//! queue with exponential backoff until their attempt budget runs out.
//!
//! Claim-before-execute: a claimed job sits in the active set while its
//! handler runs, so a crashed worker leaves a visible stalled entry that
//! [`JobScheduler::reap_stalled`] can recover instead of losing the job.

use crate::clock::Clock;
use crate::error::{PledgewaveError, Result};
use crate::jobs::job::{JobData, JobKind, JobStatus, NotificationPayload};
use crate::jobs::stats::{JobEvent, JobObserver};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Default base for the retry backoff, doubled per failed attempt.
const DEFAULT_RETRY_BACKOFF_SECONDS: i64 = 60;
/// Ceiling on a single backoff step.
const DEFAULT_MAX_BACKOFF_SECONDS: i64 = 3600;
/// How long a claimed job may sit in the active set before it is
/// presumed lost.
const DEFAULT_STALL_TIMEOUT_SECONDS: i64 = 300;

/// Outcome of reporting a failed execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum FailDisposition {
    /// The job went back to the waiting queue.
    Retried { next_attempt_at: DateTime<Utc> },
    /// The attempt budget is spent; the job is terminally failed.
    Exhausted,
}

struct ActiveJob {
    job: JobData,
    claimed_at: DateTime<Utc>,
}

#[derive(Default)]
struct SchedulerState {
    /// Keyed by (due time, enqueue sequence): jobs due at the same
    /// instant are claimed in enqueue order.
    waiting: BTreeMap<(DateTime<Utc>, u64), JobData>,
    active: HashMap<String, ActiveJob>,
    seq: u64,
}

/// In-memory delayed job scheduler.
///
/// All state mutations happen under one lock; observers are notified
/// after the lock is released, so an observer can call back into the
/// scheduler without deadlocking.
pub struct JobScheduler {
    state: Mutex<SchedulerState>,
    observers: Vec<Arc<dyn JobObserver>>,
    clock: Arc<dyn Clock>,
    retry_backoff: Duration,
    max_backoff: Duration,
    stall_timeout: Duration,
}

impl JobScheduler {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(SchedulerState::default()),
            observers: Vec::new(),
            clock,
            retry_backoff: Duration::seconds(DEFAULT_RETRY_BACKOFF_SECONDS),
            max_backoff: Duration::seconds(DEFAULT_MAX_BACKOFF_SECONDS),
            stall_timeout: Duration::seconds(DEFAULT_STALL_TIMEOUT_SECONDS),
        }
    }

    /// Set the base retry backoff (doubled per failed attempt).
    #[must_use]
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Set the ceiling for a single backoff step.
    #[must_use]
    pub fn with_max_backoff(mut self, max: Duration) -> Self {
        self.max_backoff = max;
        self
    }

    /// Set how long a claimed job may run before it is presumed lost.
    #[must_use]
    pub fn with_stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout = timeout;
        self
    }

    /// Attach an observer. Observers must be attached before the
    /// scheduler is shared.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn JobObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    fn notify(&self, event: &JobEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }

    /// Enqueue a job to run after `delay`. Negative delays clamp to zero,
    /// so a job scheduled "in the past" runs at the next poll.
    pub async fn enqueue(
        &self,
        kind: JobKind,
        payload: &NotificationPayload,
        delay: Duration,
        max_attempts: u32,
    ) -> Result<String> {
        if max_attempts == 0 {
            return Err(PledgewaveError::bad_request(
                "max_attempts must be at least 1",
            ));
        }

        let now = self.clock.now();
        let job = JobData {
            id: Uuid::new_v4().to_string(),
            kind,
            payload: serde_json::to_value(payload)?,
            not_before: now + delay.max(Duration::zero()),
            attempts_made: 0,
            max_attempts,
            status: JobStatus::Waiting,
        };

        {
            let mut state = self.state.lock().await;
            let key = (job.not_before, state.seq);
            state.seq += 1;
            state.waiting.insert(key, job.clone());
        }

        self.notify(&JobEvent::Enqueued { job: job.clone() });
        Ok(job.id)
    }

    /// Claim the earliest due job, if any.
    ///
    /// The claim increments the job's attempt counter and parks it in the
    /// active set; the caller must follow up with [`complete`](Self::complete)
    /// or [`fail`](Self::fail).
    pub async fn claim_due(&self) -> Result<Option<JobData>> {
        let now = self.clock.now();
        let claimed = {
            let mut state = self.state.lock().await;
            let due_key = state
                .waiting
                .keys()
                .next()
                .filter(|(not_before, _)| *not_before <= now)
                .copied();

            match due_key {
                Some(key) => {
                    let mut job = state
                        .waiting
                        .remove(&key)
                        .ok_or_else(|| PledgewaveError::internal("waiting queue desynchronized"))?;
                    job.attempts_made += 1;
                    job.status = JobStatus::Active;
                    state.active.insert(
                        job.id.clone(),
                        ActiveJob {
                            job: job.clone(),
                            claimed_at: now,
                        },
                    );
                    Some(job)
                }
                None => None,
            }
        };

        if let Some(job) = &claimed {
            self.notify(&JobEvent::Claimed { job: job.clone() });
        }
        Ok(claimed)
    }

    /// Mark an active job as successfully completed.
    pub async fn complete(&self, job_id: &str) -> Result<()> {
        let mut job = {
            let mut state = self.state.lock().await;
            state
                .active
                .remove(job_id)
                .ok_or_else(|| {
                    PledgewaveError::not_found(format!("No active job with id {}", job_id))
                })?
                .job
        };

        job.status = JobStatus::Completed;
        self.notify(&JobEvent::Completed { job });
        Ok(())
    }

    /// Report a failed execution of an active job.
    ///
    /// While attempts remain the job is requeued with a capped exponential
    /// backoff; otherwise it is terminally failed.
    pub async fn fail(&self, job_id: &str, error: &str) -> Result<FailDisposition> {
        let now = self.clock.now();
        let (disposition, event) = {
            let mut state = self.state.lock().await;
            let mut job = state
                .active
                .remove(job_id)
                .ok_or_else(|| {
                    PledgewaveError::not_found(format!("No active job with id {}", job_id))
                })?
                .job;

            if job.has_attempts_left() {
                let next_attempt_at = now + self.backoff_for(job.attempts_made);
                job.not_before = next_attempt_at;
                job.status = JobStatus::Waiting;
                let key = (next_attempt_at, state.seq);
                state.seq += 1;
                state.waiting.insert(key, job.clone());
                (
                    FailDisposition::Retried { next_attempt_at },
                    JobEvent::Retried {
                        job,
                        error: error.to_string(),
                    },
                )
            } else {
                job.status = JobStatus::Failed;
                (
                    FailDisposition::Exhausted,
                    JobEvent::Exhausted {
                        job,
                        error: error.to_string(),
                    },
                )
            }
        };

        self.notify(&event);
        Ok(disposition)
    }

    /// Cancel a waiting job. Returns `Ok(false)` when the job is not in
    /// the waiting queue (already claimed, finished, or unknown).
    pub async fn cancel(&self, job_id: &str) -> Result<bool> {
        let cancelled = {
            let mut state = self.state.lock().await;
            let key = state
                .waiting
                .iter()
                .find(|(_, job)| job.id == job_id)
                .map(|(key, _)| *key);
            key.and_then(|key| state.waiting.remove(&key))
        };

        match cancelled {
            Some(job) => {
                self.notify(&JobEvent::Cancelled { job });
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Recover jobs whose claim has outlived the stall timeout, treating
    /// each as a failed execution. Returns how many were reaped.
    pub async fn reap_stalled(&self) -> Result<usize> {
        let now = self.clock.now();
        let stalled: Vec<String> = {
            let state = self.state.lock().await;
            state
                .active
                .values()
                .filter(|active| active.claimed_at + self.stall_timeout <= now)
                .map(|active| active.job.id.clone())
                .collect()
        };

        let count = stalled.len();
        for job_id in stalled {
            self.fail(&job_id, "claim stalled past timeout").await?;
        }
        Ok(count)
    }

    /// Time until the earliest waiting job is due. `None` when the queue
    /// is empty; zero when something is already due.
    pub async fn next_due_in(&self) -> Option<Duration> {
        let state = self.state.lock().await;
        let (not_before, _) = state.waiting.keys().next()?;
        Some((*not_before - self.clock.now()).max(Duration::zero()))
    }

    /// Number of jobs waiting for their due time.
    pub async fn waiting_len(&self) -> usize {
        self.state.lock().await.waiting.len()
    }

    /// Number of jobs currently claimed.
    pub async fn active_len(&self) -> usize {
        self.state.lock().await.active.len()
    }

    fn backoff_for(&self, attempts_made: u32) -> Duration {
        // attempts_made is at least 1 here: the failing execution counted.
        let factor = 2_i32.saturating_pow(attempts_made.saturating_sub(1).min(16));
        (self.retry_backoff * factor).min(self.max_backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::jobs::stats::JobStats;
    use chrono::TimeZone;

    fn payload() -> NotificationPayload {
        NotificationPayload {
            recipient: "ada@example.com".to_string(),
            donor_name: "Ada".to_string(),
            plan_name: "Clean Water".to_string(),
            amount: 500,
            due_date: None,
        }
    }

    fn setup() -> (JobScheduler, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(),
        ));
        let scheduler = JobScheduler::new(clock.clone());
        (scheduler, clock)
    }

    #[tokio::test]
    async fn test_zero_delay_job_is_immediately_claimable() {
        let (scheduler, _) = setup();
        let id = scheduler
            .enqueue(JobKind::PaymentSuccess, &payload(), Duration::zero(), 1)
            .await
            .unwrap();

        let job = scheduler.claim_due().await.unwrap().unwrap();
        assert_eq!(job.id, id);
        assert_eq!(job.attempts_made, 1);
        assert_eq!(job.status, JobStatus::Active);
    }

    #[tokio::test]
    async fn test_delayed_job_waits_for_due_time() {
        let (scheduler, clock) = setup();
        scheduler
            .enqueue(JobKind::PaymentReminder, &payload(), Duration::days(9), 3)
            .await
            .unwrap();

        assert!(scheduler.claim_due().await.unwrap().is_none());
        assert_eq!(scheduler.next_due_in().await, Some(Duration::days(9)));

        clock.advance(Duration::days(9) - Duration::seconds(1));
        assert!(scheduler.claim_due().await.unwrap().is_none());

        clock.advance(Duration::seconds(1));
        assert!(scheduler.claim_due().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_negative_delay_clamps_to_now() {
        let (scheduler, _) = setup();
        scheduler
            .enqueue(JobKind::PaymentReminder, &payload(), Duration::days(-3), 3)
            .await
            .unwrap();
        assert!(scheduler.claim_due().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_fifo_among_jobs_due_at_same_instant() {
        let (scheduler, _) = setup();
        let first = scheduler
            .enqueue(JobKind::PaymentSuccess, &payload(), Duration::zero(), 1)
            .await
            .unwrap();
        let second = scheduler
            .enqueue(JobKind::PaymentSuccess, &payload(), Duration::zero(), 1)
            .await
            .unwrap();

        assert_eq!(scheduler.claim_due().await.unwrap().unwrap().id, first);
        assert_eq!(scheduler.claim_due().await.unwrap().unwrap().id, second);
    }

    #[tokio::test]
    async fn test_failed_job_requeues_with_exponential_backoff() {
        let (scheduler, clock) = setup();
        let scheduler = scheduler.with_retry_backoff(Duration::seconds(60));
        let id = scheduler
            .enqueue(JobKind::PaymentReminder, &payload(), Duration::zero(), 3)
            .await
            .unwrap();

        scheduler.claim_due().await.unwrap().unwrap();
        let disposition = scheduler.fail(&id, "transport down").await.unwrap();
        let first_retry = clock.now() + Duration::seconds(60);
        assert_eq!(
            disposition,
            FailDisposition::Retried {
                next_attempt_at: first_retry
            }
        );

        clock.advance(Duration::seconds(60));
        let job = scheduler.claim_due().await.unwrap().unwrap();
        assert_eq!(job.attempts_made, 2);

        // Second failure doubles the backoff
        let disposition = scheduler.fail(&id, "transport down").await.unwrap();
        assert_eq!(
            disposition,
            FailDisposition::Retried {
                next_attempt_at: clock.now() + Duration::seconds(120)
            }
        );
    }

    #[tokio::test]
    async fn test_backoff_is_capped() {
        let (scheduler, _) = setup();
        let scheduler = scheduler
            .with_retry_backoff(Duration::seconds(60))
            .with_max_backoff(Duration::seconds(90));
        assert_eq!(scheduler.backoff_for(1), Duration::seconds(60));
        assert_eq!(scheduler.backoff_for(2), Duration::seconds(90));
        assert_eq!(scheduler.backoff_for(10), Duration::seconds(90));
    }

    #[tokio::test]
    async fn test_attempt_budget_exhaustion_is_terminal() {
        let (scheduler, clock) = setup();
        let scheduler = scheduler.with_retry_backoff(Duration::seconds(1));
        let stats = Arc::new(JobStats::new());
        let scheduler = scheduler.with_observer(stats.clone());

        let id = scheduler
            .enqueue(JobKind::PaymentFailure, &payload(), Duration::zero(), 3)
            .await
            .unwrap();

        for attempt in 1..=3 {
            clock.advance(Duration::seconds(10));
            let job = scheduler.claim_due().await.unwrap().unwrap();
            assert_eq!(job.attempts_made, attempt);
            let disposition = scheduler.fail(&id, "transport down").await.unwrap();
            if attempt < 3 {
                assert!(matches!(disposition, FailDisposition::Retried { .. }));
            } else {
                assert_eq!(disposition, FailDisposition::Exhausted);
            }
        }

        clock.advance(Duration::hours(1));
        assert!(scheduler.claim_due().await.unwrap().is_none());
        let snap = stats.snapshot();
        assert_eq!(snap.total, 1);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.completed, 0);
    }

    #[tokio::test]
    async fn test_complete_removes_job_from_active_set() {
        let (scheduler, _) = setup();
        let id = scheduler
            .enqueue(JobKind::PaymentSuccess, &payload(), Duration::zero(), 1)
            .await
            .unwrap();
        scheduler.claim_due().await.unwrap().unwrap();
        assert_eq!(scheduler.active_len().await, 1);

        scheduler.complete(&id).await.unwrap();
        assert_eq!(scheduler.active_len().await, 0);
        assert!(scheduler.complete(&id).await.is_err());
    }

    #[tokio::test]
    async fn test_cancel_waiting_job_only() {
        let (scheduler, _) = setup();
        let waiting = scheduler
            .enqueue(JobKind::PaymentReminder, &payload(), Duration::days(1), 3)
            .await
            .unwrap();
        let claimed = scheduler
            .enqueue(JobKind::PaymentSuccess, &payload(), Duration::zero(), 1)
            .await
            .unwrap();
        scheduler.claim_due().await.unwrap().unwrap();

        assert!(scheduler.cancel(&waiting).await.unwrap());
        assert!(!scheduler.cancel(&claimed).await.unwrap());
        assert!(!scheduler.cancel("unknown").await.unwrap());
        assert_eq!(scheduler.waiting_len().await, 0);
    }

    #[tokio::test]
    async fn test_reap_stalled_requeues_lost_claims() {
        let (scheduler, clock) = setup();
        let scheduler = scheduler
            .with_stall_timeout(Duration::seconds(300))
            .with_retry_backoff(Duration::seconds(1));
        scheduler
            .enqueue(JobKind::PaymentSuccess, &payload(), Duration::zero(), 3)
            .await
            .unwrap();
        scheduler.claim_due().await.unwrap().unwrap();

        assert_eq!(scheduler.reap_stalled().await.unwrap(), 0);

        clock.advance(Duration::seconds(300));
        assert_eq!(scheduler.reap_stalled().await.unwrap(), 1);
        assert_eq!(scheduler.active_len().await, 0);
        assert_eq!(scheduler.waiting_len().await, 1);
    }

    #[tokio::test]
    async fn test_enqueue_rejects_zero_attempt_budget() {
        let (scheduler, _) = setup();
        let err = scheduler
            .enqueue(JobKind::PaymentSuccess, &payload(), Duration::zero(), 0)
            .await;
        assert!(err.is_err());
    }
}
