//! End-to-end billing flow tests.
//!
//! Drives the orchestrator with a deterministic clock and executes due
//! jobs by hand through the registry, so every assertion about timing
//! and delivery is exact.

use chrono::{Duration, TimeZone, Utc};
use pledgewave::billing::{
    BillingInterval, BillingOrchestrator, InMemoryPlanStore, InMemorySubscriptionStore,
    NewSubscriptionRequest, Plan, PlanFundingTracker, PlanSnapshot, PlanStore, SubscriptionManager,
    SubscriptionStatus,
};
use pledgewave::clock::{Clock, ManualClock};
use pledgewave::email::RecordingMailer;
use pledgewave::gateway::test::{AlwaysApprove, AlwaysDecline};
use pledgewave::gateway::PaymentGateway;
use pledgewave::jobs::{JobKind, JobRegistry, JobScheduler, JobStats};
use pledgewave::notify::NotificationDispatcher;
use std::sync::Arc;

struct Harness<G: PaymentGateway> {
    orchestrator: BillingOrchestrator<InMemoryPlanStore, InMemorySubscriptionStore, G>,
    scheduler: Arc<JobScheduler>,
    registry: Arc<JobRegistry>,
    plan_store: InMemoryPlanStore,
    mailer: Arc<RecordingMailer>,
    clock: Arc<ManualClock>,
}

impl<G: PaymentGateway> Harness<G> {
    async fn new(gateway: G, plan: Plan) -> Self {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(),
        ));
        let stats = Arc::new(JobStats::new());
        let scheduler = Arc::new(
            JobScheduler::new(clock.clone() as Arc<dyn Clock>).with_observer(stats.clone()),
        );

        let registry = Arc::new(JobRegistry::new());
        let mailer = Arc::new(RecordingMailer::new());
        let dispatcher = Arc::new(NotificationDispatcher::new(
            mailer.clone(),
            "billing@pledgewave.example",
        ));
        dispatcher.register(&registry).await;

        let plan_store = InMemoryPlanStore::new();
        plan_store.insert(plan).await.unwrap();

        let manager = SubscriptionManager::new(
            InMemorySubscriptionStore::new(),
            gateway,
            PlanFundingTracker::new(plan_store.clone()),
            clock.clone() as Arc<dyn Clock>,
        );
        let orchestrator = BillingOrchestrator::new(
            manager,
            scheduler.clone(),
            stats,
            clock.clone() as Arc<dyn Clock>,
            3,
        );

        Self {
            orchestrator,
            scheduler,
            registry,
            plan_store,
            mailer,
            clock,
        }
    }

    /// Claim and execute every currently-due job, reporting outcomes back
    /// to the scheduler the way a worker would.
    async fn run_due_jobs(&self) {
        while let Some(job) = self.scheduler.claim_due().await.unwrap() {
            let job_id = job.id.clone();
            match self.registry.execute(job).await {
                Ok(()) => self.scheduler.complete(&job_id).await.unwrap(),
                Err(e) => {
                    let _ = self.scheduler.fail(&job_id, &e.to_string()).await.unwrap();
                }
            }
        }
    }
}

fn water_plan() -> Plan {
    Plan::new("plan-1", "Clean Water", 500, BillingInterval::Month, 1000)
}

fn request_for(donor: &str) -> NewSubscriptionRequest {
    NewSubscriptionRequest {
        donor_id: donor.to_string(),
        plan: PlanSnapshot {
            plan_id: "plan-1".to_string(),
            name: "Clean Water".to_string(),
            amount: 500,
            interval: BillingInterval::Month,
        },
        donor_name: "Ada".to_string(),
        email: format!("{}@example.com", donor),
        payment_method: "card".to_string(),
    }
}

#[tokio::test]
async fn two_donors_fund_plan_to_goal() {
    let h = Harness::new(AlwaysApprove, water_plan()).await;

    h.orchestrator
        .create_subscription(request_for("donor-1"))
        .await
        .unwrap();
    let plan = h.plan_store.get("plan-1").await.unwrap().unwrap();
    assert_eq!(plan.current_amount, 500);
    assert!(plan.active);

    h.orchestrator
        .create_subscription(request_for("donor-2"))
        .await
        .unwrap();
    let plan = h.plan_store.get("plan-1").await.unwrap().unwrap();
    assert_eq!(plan.current_amount, 1000);
    assert!(!plan.active);
}

#[tokio::test]
async fn confirmation_email_flows_through_dispatcher() {
    let h = Harness::new(AlwaysApprove, water_plan()).await;
    h.orchestrator
        .create_subscription(request_for("donor-1"))
        .await
        .unwrap();

    h.run_due_jobs().await;

    let sent = h.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "donor-1@example.com");
    assert_eq!(sent[0].subject, "Payment Successful");
    assert!(sent[0].body.contains("$5.00"));
    assert!(sent[0].body.contains("Clean Water"));

    let snap = h.orchestrator.job_stats();
    assert_eq!(snap.total, 2);
    assert_eq!(snap.completed, 1);
    assert_eq!(snap.failed, 0);
}

#[tokio::test]
async fn reminder_fires_one_day_before_next_charge() {
    let h = Harness::new(AlwaysApprove, water_plan()).await;
    let subscription = h
        .orchestrator
        .create_subscription(request_for("donor-1"))
        .await
        .unwrap();

    h.run_due_jobs().await;
    assert_eq!(h.mailer.sent_count(), 1);

    // A day short of the reminder instant nothing more is due
    let reminder_at = subscription.next_charge_date - Duration::days(1);
    h.clock.set(reminder_at - Duration::hours(1));
    h.run_due_jobs().await;
    assert_eq!(h.mailer.sent_count(), 1);

    h.clock.set(reminder_at);
    h.run_due_jobs().await;
    let sent = h.mailer.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].subject, "Upcoming Payment Reminder");
    assert!(sent[1].body.contains("due on 2024-02-15"));
}

#[tokio::test]
async fn declined_payment_leaves_no_trace() {
    let h = Harness::new(AlwaysDecline, water_plan()).await;

    let err = h
        .orchestrator
        .create_subscription(request_for("donor-1"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Payment declined"));

    assert!(h
        .orchestrator
        .list_subscriptions("donor-1")
        .await
        .unwrap()
        .is_empty());
    let plan = h.plan_store.get("plan-1").await.unwrap().unwrap();
    assert_eq!(plan.current_amount, 0);
    assert_eq!(h.orchestrator.job_stats().total, 0);
    h.run_due_jobs().await;
    assert_eq!(h.mailer.sent_count(), 0);
}

#[tokio::test]
async fn duplicate_active_subscription_is_rejected() {
    let h = Harness::new(AlwaysApprove, water_plan()).await;

    h.orchestrator
        .create_subscription(request_for("donor-1"))
        .await
        .unwrap();
    let err = h
        .orchestrator
        .create_subscription(request_for("donor-1"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("already has an active subscription"));

    // The rejected attempt funds nothing and schedules nothing new
    let plan = h.plan_store.get("plan-1").await.unwrap().unwrap();
    assert_eq!(plan.current_amount, 500);
    assert_eq!(h.orchestrator.job_stats().total, 2);
}

#[tokio::test]
async fn cancel_twice_is_idempotent_and_keeps_history() {
    let h = Harness::new(AlwaysApprove, water_plan()).await;
    let subscription = h
        .orchestrator
        .create_subscription(request_for("donor-1"))
        .await
        .unwrap();

    h.orchestrator
        .cancel_subscription(&subscription.id)
        .await
        .unwrap();
    h.orchestrator
        .cancel_subscription(&subscription.id)
        .await
        .unwrap();

    let subs = h.orchestrator.list_subscriptions("donor-1").await.unwrap();
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].status, SubscriptionStatus::Cancelled);

    // Cancellation does not claw back funding
    let plan = h.plan_store.get("plan-1").await.unwrap().unwrap();
    assert_eq!(plan.current_amount, 500);
}

#[tokio::test]
async fn failure_notification_retries_through_mail_outage() {
    let h = Harness::new(AlwaysApprove, water_plan()).await;
    let subscription = h
        .orchestrator
        .create_subscription(request_for("donor-1"))
        .await
        .unwrap();
    h.run_due_jobs().await;
    assert_eq!(h.mailer.sent_count(), 1);

    h.orchestrator
        .notify_payment_failure(&subscription, "donor-1@example.com", "Ada")
        .await
        .unwrap();

    // First execution hits a transport failure and is requeued
    h.mailer.fail_next(1);
    h.run_due_jobs().await;
    assert_eq!(h.mailer.sent_count(), 1);

    // After the backoff elapses the retry goes through
    h.clock.advance(Duration::minutes(2));
    h.run_due_jobs().await;
    let sent = h.mailer.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].subject, "Payment Failed");

    let snap = h.orchestrator.job_stats();
    assert_eq!(snap.completed, 2);
    assert_eq!(snap.failed, 0);
}

#[tokio::test]
async fn persistent_mail_outage_exhausts_the_attempt_budget() {
    let h = Harness::new(AlwaysApprove, water_plan()).await;
    let subscription = h
        .orchestrator
        .create_subscription(request_for("donor-1"))
        .await
        .unwrap();
    h.run_due_jobs().await;

    h.orchestrator
        .notify_payment_failure(&subscription, "donor-1@example.com", "Ada")
        .await
        .unwrap();

    h.mailer.fail_next(3);
    for _ in 0..3 {
        h.run_due_jobs().await;
        h.clock.advance(Duration::hours(2));
    }

    let snap = h.orchestrator.job_stats();
    assert_eq!(snap.failed, 1);
    assert_eq!(h.mailer.sent_count(), 1);

    // Nothing left to run; the job is terminally failed, not requeued
    h.run_due_jobs().await;
    assert_eq!(h.orchestrator.job_stats().failed, 1);
}
