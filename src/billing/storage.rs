//! Subscription model and storage traits.
//!
//! Implement [`SubscriptionStore`] to persist subscriptions to your
//! database. The store is where the "at most one active subscription per
//! (donor, plan)" invariant is ultimately enforced, via a uniqueness
//! constraint on inserts; the in-memory implementation keeps an index
//! under its lock for the same guarantee.

use crate::billing::plans::BillingInterval;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Plan terms captured at subscription time.
///
/// Deliberately denormalized: later plan edits must not retroactively
/// change an existing subscription's obligations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanSnapshot {
    pub plan_id: String,
    pub name: String,
    /// Charge amount in minor currency units.
    pub amount: i64,
    pub interval: BillingInterval,
}

/// Subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    /// Terminal. No transition leaves this state.
    Cancelled,
}

impl SubscriptionStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Cancelled => "cancelled",
        }
    }
}

/// A donor's standing commitment to a plan's recurring charge.
///
/// Subscriptions are never physically deleted; cancellation flips the
/// status and the record stays visible as history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subscription {
    pub id: String,
    pub donor_id: String,
    /// Snapshot of the plan terms at subscription time.
    pub plan: PlanSnapshot,
    /// Token issued by the payment gateway.
    pub gateway_token: String,
    pub start_date: DateTime<Utc>,
    pub next_charge_date: DateTime<Utc>,
    pub status: SubscriptionStatus,
}

impl Subscription {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.status == SubscriptionStatus::Cancelled
    }
}

/// Trait for storing subscriptions.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Insert a new active subscription.
    ///
    /// Returns `Ok(false)` when the uniqueness constraint on
    /// (donor_id, plan_id, status=active) rejects the insert. The caller
    /// treats that exactly like its advisory pre-check failing.
    async fn insert_active(&self, subscription: &Subscription) -> Result<bool>;

    /// Look up a subscription by id.
    async fn get(&self, subscription_id: &str) -> Result<Option<Subscription>>;

    /// Find the active subscription for a (donor, plan) pair, if any.
    async fn find_active(&self, donor_id: &str, plan_id: &str) -> Result<Option<Subscription>>;

    /// Mark a subscription cancelled.
    ///
    /// A no-op for subscriptions that are already cancelled. Errors with
    /// `NotFound` for unknown ids.
    async fn mark_cancelled(&self, subscription_id: &str) -> Result<()>;

    /// All subscriptions for a donor, regardless of status.
    async fn list_for_donor(&self, donor_id: &str) -> Result<Vec<Subscription>>;
}

#[derive(Default)]
struct InMemoryState {
    subscriptions: HashMap<String, Subscription>,
    /// Uniqueness index on (donor_id, plan_id) for active subscriptions.
    active_index: HashSet<(String, String)>,
}

/// In-memory subscription store.
///
/// Index and record mutations happen under one lock, so the uniqueness
/// constraint holds even against concurrent inserts.
#[derive(Clone, Default)]
pub struct InMemorySubscriptionStore {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemorySubscriptionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn insert_active(&self, subscription: &Subscription) -> Result<bool> {
        let key = (
            subscription.donor_id.clone(),
            subscription.plan.plan_id.clone(),
        );
        let mut state = self.state.lock().await;
        if state.active_index.contains(&key) {
            return Ok(false);
        }
        state.active_index.insert(key);
        state
            .subscriptions
            .insert(subscription.id.clone(), subscription.clone());
        Ok(true)
    }

    async fn get(&self, subscription_id: &str) -> Result<Option<Subscription>> {
        let state = self.state.lock().await;
        Ok(state.subscriptions.get(subscription_id).cloned())
    }

    async fn find_active(&self, donor_id: &str, plan_id: &str) -> Result<Option<Subscription>> {
        let state = self.state.lock().await;
        Ok(state
            .subscriptions
            .values()
            .find(|s| s.is_active() && s.donor_id == donor_id && s.plan.plan_id == plan_id)
            .cloned())
    }

    async fn mark_cancelled(&self, subscription_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let subscription = state
            .subscriptions
            .get(subscription_id)
            .cloned()
            .ok_or_else(|| {
                crate::error::PledgewaveError::not_found(format!(
                    "Subscription not found: {}",
                    subscription_id
                ))
            })?;

        if subscription.is_cancelled() {
            return Ok(());
        }

        state
            .active_index
            .remove(&(subscription.donor_id.clone(), subscription.plan.plan_id.clone()));
        if let Some(stored) = state.subscriptions.get_mut(subscription_id) {
            stored.status = SubscriptionStatus::Cancelled;
        }
        Ok(())
    }

    async fn list_for_donor(&self, donor_id: &str) -> Result<Vec<Subscription>> {
        let state = self.state.lock().await;
        let mut subs: Vec<Subscription> = state
            .subscriptions
            .values()
            .filter(|s| s.donor_id == donor_id)
            .cloned()
            .collect();
        subs.sort_by(|a, b| a.start_date.cmp(&b.start_date));
        Ok(subs)
    }
}
