//! Subscription billing.
//!
//! Plans, subscriptions, plan funding, and the orchestrator that wires a
//! successful subscription into scheduled notifications.

pub mod error;
pub mod funding;
pub mod orchestrator;
pub mod plans;
pub mod storage;
pub mod subscription;

pub use error::BillingError;
pub use funding::{FundingOutcome, PlanFundingTracker};
pub use orchestrator::BillingOrchestrator;
pub use plans::{BillingInterval, InMemoryPlanStore, Plan, PlanStore};
pub use storage::{
    InMemorySubscriptionStore, PlanSnapshot, Subscription, SubscriptionStatus, SubscriptionStore,
};
pub use subscription::{NewSubscriptionRequest, SubscriptionManager};
