//! Funding plans.
//!
//! A plan is a funding campaign with a fixed recurring charge and a goal
//! amount. Plans are created by an administrative layer; this module owns
//! the model, the billing interval arithmetic, and the storage trait.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

/// How often a plan charges.
///
/// Parsed leniently: an unrecognized interval string falls back to
/// [`Month`](Self::Month). This is a deliberate policy carried through
/// deserialization, not an error path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BillingInterval {
    Month,
    Quarter,
    HalfYear,
}

impl BillingInterval {
    /// Parse from the wire form. Unknown values default to monthly.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "month" => Self::Month,
            "quarter" => Self::Quarter,
            "half_year" => Self::HalfYear,
            _ => Self::Month,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Month => "month",
            Self::Quarter => "quarter",
            Self::HalfYear => "half_year",
        }
    }

    /// Number of calendar months between charges.
    #[must_use]
    pub fn months(&self) -> u32 {
        match self {
            Self::Month => 1,
            Self::Quarter => 3,
            Self::HalfYear => 6,
        }
    }

    /// Advance `from` by one billing interval using calendar-month
    /// arithmetic. Month-end dates clamp (Jan 31 + 1 month = Feb 29 in a
    /// leap year, Feb 28 otherwise).
    #[must_use]
    pub fn advance(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        from.checked_add_months(Months::new(self.months()))
            .unwrap_or_else(|| from + Duration::days(30 * i64::from(self.months())))
    }
}

impl From<String> for BillingInterval {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<BillingInterval> for String {
    fn from(interval: BillingInterval) -> Self {
        interval.as_str().to_string()
    }
}

/// A funding plan.
///
/// `current_amount` is monotonically non-decreasing and only mutated
/// through [`PlanStore::compare_and_fund`]. `active` flips to false in the
/// same atomic step that pushes the total past `goal_amount`, and is only
/// ever set back to true by an explicit administrative
/// [`PlanStore::set_active`] call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Plan {
    /// Plan identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Charge amount per billing interval, in minor currency units.
    pub amount: i64,
    /// Billing cadence.
    pub interval: BillingInterval,
    /// Funding goal, in minor currency units.
    pub goal_amount: i64,
    /// Total raised so far, in minor currency units.
    pub current_amount: i64,
    /// Whether the plan accepts new subscriptions.
    pub active: bool,
}

impl Plan {
    /// Create a new active plan with nothing raised yet.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        amount: i64,
        interval: BillingInterval,
        goal_amount: i64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            amount,
            interval,
            goal_amount,
            current_amount: 0,
            active: true,
        }
    }

    #[must_use]
    pub fn goal_reached(&self) -> bool {
        self.current_amount >= self.goal_amount
    }
}

/// Trait for storing plans.
///
/// Implement this to persist plans to your database. The in-memory
/// implementation is the default for single-instance deployments and tests.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Look up a plan by id.
    async fn get(&self, plan_id: &str) -> Result<Option<Plan>>;

    /// Insert a new plan.
    async fn insert(&self, plan: Plan) -> Result<()>;

    /// Plans currently accepting subscriptions.
    async fn list_active(&self) -> Result<Vec<Plan>>;

    /// Administrative activation toggle.
    async fn set_active(&self, plan_id: &str, active: bool) -> Result<()>;

    /// Atomically advance a plan's raised total.
    ///
    /// Sets `current_amount = new_total` (and `active = false` when
    /// `deactivate` is set) only if the stored total still equals
    /// `expected_total`. Returns `Ok(false)` when another writer got there
    /// first; the caller retries with a fresh read. This is the
    /// compare-and-swap that keeps concurrent funding linearizable.
    async fn compare_and_fund(
        &self,
        plan_id: &str,
        expected_total: i64,
        new_total: i64,
        deactivate: bool,
    ) -> Result<bool>;
}

/// In-memory plan store.
///
/// The compare-and-swap runs under a single lock, so funding updates are
/// linearizable within one process.
#[derive(Clone, Default)]
pub struct InMemoryPlanStore {
    plans: std::sync::Arc<tokio::sync::Mutex<std::collections::HashMap<String, Plan>>>,
}

impl InMemoryPlanStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlanStore for InMemoryPlanStore {
    async fn get(&self, plan_id: &str) -> Result<Option<Plan>> {
        let plans = self.plans.lock().await;
        Ok(plans.get(plan_id).cloned())
    }

    async fn insert(&self, plan: Plan) -> Result<()> {
        let mut plans = self.plans.lock().await;
        plans.insert(plan.id.clone(), plan);
        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<Plan>> {
        let plans = self.plans.lock().await;
        Ok(plans.values().filter(|p| p.active).cloned().collect())
    }

    async fn set_active(&self, plan_id: &str, active: bool) -> Result<()> {
        let mut plans = self.plans.lock().await;
        let plan = plans.get_mut(plan_id).ok_or_else(|| {
            crate::error::PledgewaveError::not_found(format!("Plan not found: {}", plan_id))
        })?;
        plan.active = active;
        Ok(())
    }

    async fn compare_and_fund(
        &self,
        plan_id: &str,
        expected_total: i64,
        new_total: i64,
        deactivate: bool,
    ) -> Result<bool> {
        let mut plans = self.plans.lock().await;
        let plan = plans.get_mut(plan_id).ok_or_else(|| {
            crate::error::PledgewaveError::not_found(format!("Plan not found: {}", plan_id))
        })?;

        if plan.current_amount != expected_total {
            return Ok(false);
        }

        plan.current_amount = new_total;
        if deactivate {
            plan.active = false;
        }
        Ok(true)
    }
}
