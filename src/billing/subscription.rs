//! Subscription lifecycle management.
//!
//! Drives the per-subscription state machine: a request is validated,
//! gated on payment authorization, persisted as active, and funds its
//! plan. Rejected requests are a transient outcome surfaced to the caller
//! and never persisted. `Active → Cancelled` is one-way and terminal.

use crate::billing::error::BillingError;
use crate::billing::funding::PlanFundingTracker;
use crate::billing::plans::PlanStore;
use crate::billing::storage::{PlanSnapshot, Subscription, SubscriptionStatus, SubscriptionStore};
use crate::clock::Clock;
use crate::error::Result;
use crate::gateway::{AuthorizationOutcome, PaymentGateway};
use std::sync::Arc;
use uuid::Uuid;

/// A request to create a subscription.
#[derive(Debug, Clone)]
pub struct NewSubscriptionRequest {
    pub donor_id: String,
    /// Plan terms as resolved by the request layer. Copied verbatim onto
    /// the subscription so later plan edits don't change it.
    pub plan: PlanSnapshot,
    pub donor_name: String,
    pub email: String,
    pub payment_method: String,
}

impl NewSubscriptionRequest {
    /// Names of all required fields that are absent, in request order.
    fn missing_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.donor_id.is_empty() {
            missing.push("donor_id".to_string());
        }
        if self.plan.plan_id.is_empty() {
            missing.push("plan".to_string());
        }
        if self.donor_name.is_empty() {
            missing.push("donor_name".to_string());
        }
        if self.email.is_empty() {
            missing.push("email".to_string());
        }
        if self.payment_method.is_empty() {
            missing.push("payment_method".to_string());
        }
        missing
    }
}

/// Subscription management operations.
pub struct SubscriptionManager<P: PlanStore, S: SubscriptionStore, G: PaymentGateway> {
    store: S,
    gateway: G,
    funding: PlanFundingTracker<P>,
    clock: Arc<dyn Clock>,
}

impl<P: PlanStore, S: SubscriptionStore, G: PaymentGateway> SubscriptionManager<P, S, G> {
    #[must_use]
    pub fn new(store: S, gateway: G, funding: PlanFundingTracker<P>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            gateway,
            funding,
            clock,
        }
    }

    /// Create a subscription.
    ///
    /// Validation and authorization failures abort before any write. The
    /// post-persist funding update is best-effort: a failure there leaves
    /// the subscription active and is reconciled out-of-band.
    pub async fn create(&self, request: NewSubscriptionRequest) -> Result<Subscription> {
        let missing = request.missing_fields();
        if !missing.is_empty() {
            return Err(BillingError::Validation { missing }.into());
        }

        self.funding.require_plan(&request.plan.plan_id).await?;

        // Advisory pre-check; the storage uniqueness constraint is the
        // real guard against a concurrent duplicate create.
        if self
            .store
            .find_active(&request.donor_id, &request.plan.plan_id)
            .await?
            .is_some()
        {
            return Err(BillingError::DuplicateActiveSubscription {
                donor_id: request.donor_id,
                plan_id: request.plan.plan_id,
            }
            .into());
        }

        let outcome = self
            .gateway
            .authorize(request.plan.amount, &request.payment_method)
            .await?;
        let gateway_token = match outcome {
            AuthorizationOutcome::Approved { gateway_token } => gateway_token,
            AuthorizationOutcome::Declined => {
                return Err(BillingError::PaymentDeclined {
                    method: request.payment_method,
                }
                .into());
            }
        };

        let now = self.clock.now();
        let subscription = Subscription {
            id: Uuid::new_v4().to_string(),
            donor_id: request.donor_id.clone(),
            plan: request.plan.clone(),
            gateway_token,
            start_date: now,
            next_charge_date: request.plan.interval.advance(now),
            status: SubscriptionStatus::Active,
        };

        let inserted = self.store.insert_active(&subscription).await?;
        if !inserted {
            // Lost the race to a concurrent create for the same pair.
            return Err(BillingError::DuplicateActiveSubscription {
                donor_id: request.donor_id,
                plan_id: request.plan.plan_id,
            }
            .into());
        }

        // Best-effort: the subscription stands even if funding fails here.
        if let Err(e) = self
            .funding
            .apply_funding(&subscription.plan.plan_id, subscription.plan.amount)
            .await
        {
            tracing::warn!(
                subscription_id = %subscription.id,
                plan_id = %subscription.plan.plan_id,
                error = %e,
                "Funding update failed after subscription persist; left for reconciliation"
            );
        }

        tracing::info!(
            subscription_id = %subscription.id,
            donor_id = %subscription.donor_id,
            plan_id = %subscription.plan.plan_id,
            next_charge_date = %subscription.next_charge_date,
            "Subscription created"
        );

        Ok(subscription)
    }

    /// Cancel a subscription. Idempotent: cancelling an already-cancelled
    /// subscription is a no-op success.
    pub async fn cancel(&self, subscription_id: &str) -> Result<()> {
        let subscription = self.store.get(subscription_id).await?.ok_or_else(|| {
            BillingError::SubscriptionNotFound {
                subscription_id: subscription_id.to_string(),
            }
        })?;

        if subscription.is_cancelled() {
            return Ok(());
        }

        self.store.mark_cancelled(subscription_id).await?;
        tracing::info!(subscription_id, "Subscription cancelled");
        Ok(())
    }

    /// All subscriptions for a donor, cancelled history included.
    pub async fn list_for_donor(&self, donor_id: &str) -> Result<Vec<Subscription>> {
        self.store.list_for_donor(donor_id).await
    }
}
