//! Plan funding tracker.
//!
//! Owns the running total for a plan. The increment and the goal check
//! commit in one atomic step through the store's compare-and-swap, so two
//! subscriptions funding the same plan concurrently can never lose an
//! update or both miss the goal crossing.

use crate::billing::error::BillingError;
use crate::billing::plans::PlanStore;
use crate::error::Result;

/// Bound on optimistic retries when the compare-and-swap loses a race.
const MAX_CAS_RETRIES: u32 = 16;

/// Result of applying a funding increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct FundingOutcome {
    /// The plan total after the increment.
    pub new_total: i64,
    /// Whether this increment pushed the plan to (or past) its goal.
    pub goal_reached: bool,
}

/// Applies funding increments to plans and retires them at goal.
#[derive(Clone)]
pub struct PlanFundingTracker<P: PlanStore> {
    store: P,
}

impl<P: PlanStore> PlanFundingTracker<P> {
    #[must_use]
    pub fn new(store: P) -> Self {
        Self { store }
    }

    /// Load a plan, erroring when it does not exist.
    pub async fn require_plan(&self, plan_id: &str) -> Result<crate::billing::plans::Plan> {
        self.store
            .get(plan_id)
            .await?
            .ok_or_else(|| {
                BillingError::PlanNotFound {
                    plan_id: plan_id.to_string(),
                }
                .into()
            })
    }

    /// Add `amount` to the plan's raised total, deactivating the plan in
    /// the same atomic step when the new total meets the goal.
    ///
    /// Lost compare-and-swap races are retried with a fresh read, bounded
    /// by `MAX_CAS_RETRIES`; exhaustion surfaces as a storage conflict.
    /// No retries happen at this layer for missing plans.
    pub async fn apply_funding(&self, plan_id: &str, amount: i64) -> Result<FundingOutcome> {
        for _ in 0..MAX_CAS_RETRIES {
            let plan = self.require_plan(plan_id).await?;

            let new_total = plan.current_amount + amount;
            let goal_reached = new_total >= plan.goal_amount;

            let swapped = self
                .store
                .compare_and_fund(plan_id, plan.current_amount, new_total, goal_reached)
                .await?;

            if swapped {
                if goal_reached {
                    tracing::info!(
                        plan_id,
                        new_total,
                        goal = plan.goal_amount,
                        "Plan reached funding goal, deactivated"
                    );
                }
                return Ok(FundingOutcome {
                    new_total,
                    goal_reached,
                });
            }

            tracing::debug!(plan_id, "Lost funding race, retrying with fresh read");
        }

        Err(BillingError::StorageConflict {
            detail: format!(
                "funding update for plan '{}' lost {} consecutive races",
                plan_id, MAX_CAS_RETRIES
            ),
        }
        .into())
    }
}
