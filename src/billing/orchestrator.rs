//! Billing orchestration.
//!
//! Composes the subscription manager with the job scheduler: a successful
//! create fans out into an immediate confirmation job and, when there is
//! room before the next charge, a reminder job due one day ahead of it.

use crate::billing::storage::Subscription;
use crate::billing::subscription::{NewSubscriptionRequest, SubscriptionManager};
use crate::billing::plans::PlanStore;
use crate::billing::storage::SubscriptionStore;
use crate::clock::Clock;
use crate::error::Result;
use crate::gateway::PaymentGateway;
use crate::jobs::{JobKind, JobScheduler, JobStats, JobStatsSnapshot, NotificationPayload};
use chrono::Duration;
use std::sync::Arc;

/// Top-level billing flow coordinator.
pub struct BillingOrchestrator<P: PlanStore, S: SubscriptionStore, G: PaymentGateway> {
    subscriptions: SubscriptionManager<P, S, G>,
    scheduler: Arc<JobScheduler>,
    stats: Arc<JobStats>,
    clock: Arc<dyn Clock>,
    /// Attempt budget for retryable notification jobs.
    retry_attempts: u32,
}

impl<P: PlanStore, S: SubscriptionStore, G: PaymentGateway> BillingOrchestrator<P, S, G> {
    #[must_use]
    pub fn new(
        subscriptions: SubscriptionManager<P, S, G>,
        scheduler: Arc<JobScheduler>,
        stats: Arc<JobStats>,
        clock: Arc<dyn Clock>,
        retry_attempts: u32,
    ) -> Self {
        Self {
            subscriptions,
            scheduler,
            stats,
            clock,
            retry_attempts,
        }
    }

    /// Create a subscription and schedule its notifications.
    ///
    /// The confirmation job is enqueued immediately with a single attempt.
    /// The reminder targets one day before the next charge and is only
    /// scheduled when that instant is still in the future.
    pub async fn create_subscription(
        &self,
        request: NewSubscriptionRequest,
    ) -> Result<Subscription> {
        let recipient = request.email.clone();
        let donor_name = request.donor_name.clone();
        let subscription = self.subscriptions.create(request).await?;

        let confirmation = NotificationPayload {
            recipient: recipient.clone(),
            donor_name: donor_name.clone(),
            plan_name: subscription.plan.name.clone(),
            amount: subscription.plan.amount,
            due_date: None,
        };
        self.scheduler
            .enqueue(JobKind::PaymentSuccess, &confirmation, Duration::zero(), 1)
            .await?;

        self.schedule_reminder(&subscription, &recipient, &donor_name)
            .await?;

        Ok(subscription)
    }

    /// Schedule the pre-charge reminder for a subscription.
    ///
    /// A no-op when the one-day-ahead instant has already passed.
    pub async fn schedule_reminder(
        &self,
        subscription: &Subscription,
        recipient: &str,
        donor_name: &str,
    ) -> Result<Option<String>> {
        let reminder_at = subscription.next_charge_date - Duration::days(1);
        let delay = reminder_at - self.clock.now();
        if delay <= Duration::zero() {
            tracing::debug!(
                subscription_id = %subscription.id,
                next_charge_date = %subscription.next_charge_date,
                "Next charge too close, skipping reminder"
            );
            return Ok(None);
        }

        let payload = NotificationPayload {
            recipient: recipient.to_string(),
            donor_name: donor_name.to_string(),
            plan_name: subscription.plan.name.clone(),
            amount: subscription.plan.amount,
            due_date: Some(subscription.next_charge_date),
        };
        let job_id = self
            .scheduler
            .enqueue(
                JobKind::PaymentReminder,
                &payload,
                delay,
                self.retry_attempts,
            )
            .await?;
        Ok(Some(job_id))
    }

    /// Notify a donor that a charge against their subscription failed.
    pub async fn notify_payment_failure(
        &self,
        subscription: &Subscription,
        recipient: &str,
        donor_name: &str,
    ) -> Result<String> {
        let payload = NotificationPayload {
            recipient: recipient.to_string(),
            donor_name: donor_name.to_string(),
            plan_name: subscription.plan.name.clone(),
            amount: subscription.plan.amount,
            due_date: None,
        };
        self.scheduler
            .enqueue(
                JobKind::PaymentFailure,
                &payload,
                Duration::zero(),
                self.retry_attempts,
            )
            .await
    }

    /// Cancel a subscription. Already-scheduled notifications run as
    /// planned.
    pub async fn cancel_subscription(&self, subscription_id: &str) -> Result<()> {
        self.subscriptions.cancel(subscription_id).await
    }

    /// A donor's full subscription history.
    pub async fn list_subscriptions(&self, donor_id: &str) -> Result<Vec<Subscription>> {
        self.subscriptions.list_for_donor(donor_id).await
    }

    /// Current scheduler counters.
    #[must_use]
    pub fn job_stats(&self) -> JobStatsSnapshot {
        self.stats.snapshot()
    }
}
