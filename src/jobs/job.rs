//! Job model for the notification scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The kinds of notification jobs the scheduler carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    /// Confirmation sent right after a successful charge.
    PaymentSuccess,
    /// Notice sent after a failed charge.
    PaymentFailure,
    /// Reminder sent one day ahead of the next charge.
    PaymentReminder,
}

impl JobKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentSuccess => "payment-success",
            Self::PaymentFailure => "payment-failure",
            Self::PaymentReminder => "payment-reminder",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a job currently sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for its due time.
    Waiting,
    /// Claimed by a worker and executing.
    Active,
    /// Finished successfully. Terminal.
    Completed,
    /// Exhausted its attempt budget. Terminal.
    Failed,
}

/// A scheduled notification job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobData {
    pub id: String,
    pub kind: JobKind,
    /// Serialized [`NotificationPayload`].
    pub payload: Value,
    /// Earliest instant at which the job may be claimed.
    pub not_before: DateTime<Utc>,
    /// Executions started so far, the in-flight one included.
    pub attempts_made: u32,
    /// Total executions allowed before the job is declared failed.
    pub max_attempts: u32,
    pub status: JobStatus,
}

impl JobData {
    /// Whether another execution remains in the attempt budget.
    #[must_use]
    pub fn has_attempts_left(&self) -> bool {
        self.attempts_made < self.max_attempts
    }
}

/// What a notification job carries to the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationPayload {
    /// Destination email address.
    pub recipient: String,
    pub donor_name: String,
    pub plan_name: String,
    /// Charge amount in minor currency units.
    pub amount: i64,
    /// The upcoming charge date, set on reminder jobs only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
}
