//! Billing-specific error types.
//!
//! These carry the domain outcomes of the billing flows and convert to
//! `PledgewaveError` at the crate boundary.

use std::fmt;

/// Billing-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    /// Required request fields are missing. Lists every missing field,
    /// not just the first.
    Validation { missing: Vec<String> },

    /// The donor already has an active subscription for this plan.
    DuplicateActiveSubscription { donor_id: String, plan_id: String },

    /// The gateway declined the charge.
    PaymentDeclined { method: String },

    /// The referenced plan does not exist.
    PlanNotFound { plan_id: String },

    /// The referenced subscription does not exist.
    SubscriptionNotFound { subscription_id: String },

    /// A race was lost on a storage-level constraint or compare-and-swap.
    StorageConflict { detail: String },

    /// A notification job used up its entire retry budget.
    SchedulerExhausted {
        job_id: String,
        kind: String,
        attempts: u32,
    },
}

impl fmt::Display for BillingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { missing } => {
                write!(
                    f,
                    "Missing required subscription fields: {}",
                    missing.join(", ")
                )
            }
            Self::DuplicateActiveSubscription { donor_id, plan_id } => {
                write!(
                    f,
                    "Donor '{}' already has an active subscription for plan '{}'",
                    donor_id, plan_id
                )
            }
            Self::PaymentDeclined { method } => {
                write!(f, "Payment declined for method '{}'", method)
            }
            Self::PlanNotFound { plan_id } => {
                write!(f, "Plan not found: {}", plan_id)
            }
            Self::SubscriptionNotFound { subscription_id } => {
                write!(f, "Subscription not found: {}", subscription_id)
            }
            Self::StorageConflict { detail } => {
                write!(f, "Storage conflict: {}", detail)
            }
            Self::SchedulerExhausted {
                job_id,
                kind,
                attempts,
            } => {
                write!(
                    f,
                    "Job {} ({}) failed after {} attempts",
                    job_id, kind, attempts
                )
            }
        }
    }
}

impl std::error::Error for BillingError {}

impl From<BillingError> for crate::error::PledgewaveError {
    fn from(err: BillingError) -> Self {
        match &err {
            BillingError::Validation { .. } | BillingError::PaymentDeclined { .. } => {
                crate::error::PledgewaveError::BadRequest(err.to_string())
            }
            BillingError::DuplicateActiveSubscription { .. } => {
                crate::error::PledgewaveError::Conflict(err.to_string())
            }
            BillingError::PlanNotFound { .. } | BillingError::SubscriptionNotFound { .. } => {
                crate::error::PledgewaveError::NotFound(err.to_string())
            }
            BillingError::StorageConflict { .. } | BillingError::SchedulerExhausted { .. } => {
                crate::error::PledgewaveError::Internal(err.to_string())
            }
        }
    }
}

impl BillingError {
    /// Whether the caller can recover by changing its request.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::DuplicateActiveSubscription { .. }
                | Self::PaymentDeclined { .. }
                | Self::PlanNotFound { .. }
                | Self::SubscriptionNotFound { .. }
        )
    }

    /// Whether retrying the same operation may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StorageConflict { .. } | Self::PaymentDeclined { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_lists_all_fields() {
        let err = BillingError::Validation {
            missing: vec!["donor_id".to_string(), "email".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Missing required subscription fields: donor_id, email"
        );
    }

    #[test]
    fn test_error_classification() {
        let err = BillingError::PaymentDeclined {
            method: "card".to_string(),
        };
        assert!(err.is_client_error());
        assert!(err.is_retryable());

        let err = BillingError::StorageConflict {
            detail: "lost funding race".to_string(),
        };
        assert!(!err.is_client_error());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_convert_to_pledgewave_error() {
        let err = BillingError::DuplicateActiveSubscription {
            donor_id: "donor-1".to_string(),
            plan_id: "plan-1".to_string(),
        };
        let converted: crate::error::PledgewaveError = err.into();
        assert!(matches!(
            converted,
            crate::error::PledgewaveError::Conflict(_)
        ));

        let err = BillingError::PlanNotFound {
            plan_id: "plan-9".to_string(),
        };
        let converted: crate::error::PledgewaveError = err.into();
        assert!(matches!(
            converted,
            crate::error::PledgewaveError::NotFound(_)
        ));
    }
}
