//! Notification dispatch.
//!
//! Turns job payloads into rendered emails and hands them to the mailer.
//! Rendering is deterministic so a retried job resends the same message.

use crate::email::{Email, Mailer};
use crate::error::{PledgewaveError, Result};
use crate::jobs::{JobData, JobKind, JobRegistry, NotificationPayload};
use std::sync::Arc;

/// Renders and sends notification emails for scheduled jobs.
#[derive(Clone)]
pub struct NotificationDispatcher {
    mailer: Arc<dyn Mailer>,
    /// Sender address stamped on every outgoing email.
    from: String,
}

impl NotificationDispatcher {
    #[must_use]
    pub fn new(mailer: Arc<dyn Mailer>, from: impl Into<String>) -> Self {
        Self {
            mailer,
            from: from.into(),
        }
    }

    /// Render the email for a job kind and payload.
    #[must_use]
    pub fn render(&self, kind: JobKind, payload: &NotificationPayload) -> Email {
        let amount = format_dollars(payload.amount);
        let (subject, body) = match kind {
            JobKind::PaymentSuccess => (
                "Payment Successful".to_string(),
                format!(
                    "Dear {},\n\nYour payment of ${} for plan \"{}\" has been successfully processed.\n\nThank you!",
                    payload.donor_name, amount, payload.plan_name
                ),
            ),
            JobKind::PaymentFailure => (
                "Payment Failed".to_string(),
                format!(
                    "Dear {},\n\nWe were unable to process your payment of ${} for plan \"{}\". Please update your payment information.\n\nThank you!",
                    payload.donor_name, amount, payload.plan_name
                ),
            ),
            JobKind::PaymentReminder => {
                let due = payload
                    .due_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "soon".to_string());
                (
                    "Upcoming Payment Reminder".to_string(),
                    format!(
                        "Dear {},\n\nThis is a reminder that your payment of ${} for plan \"{}\" is due on {}.\n\nThank you!",
                        payload.donor_name, amount, payload.plan_name, due
                    ),
                )
            }
        };

        Email {
            from: self.from.clone(),
            to: payload.recipient.clone(),
            subject,
            body,
        }
    }

    /// Render and send the notification for one job.
    ///
    /// Mailer errors propagate so the scheduler's retry bookkeeping sees
    /// the failure.
    pub async fn dispatch(&self, job: &JobData) -> Result<()> {
        let payload: NotificationPayload =
            serde_json::from_value(job.payload.clone()).map_err(|e| {
                PledgewaveError::internal(format!(
                    "Malformed payload on job {}: {}",
                    job.id, e
                ))
            })?;

        let email = self.render(job.kind, &payload);
        email.validate()?;
        self.mailer.send(&email).await?;

        tracing::debug!(
            job_id = %job.id,
            kind = %job.kind,
            recipient = %payload.recipient,
            "Notification sent"
        );
        Ok(())
    }

    /// Register this dispatcher as the handler for every notification
    /// job kind.
    pub async fn register(self: &Arc<Self>, registry: &JobRegistry) {
        for kind in [
            JobKind::PaymentSuccess,
            JobKind::PaymentFailure,
            JobKind::PaymentReminder,
        ] {
            let dispatcher = self.clone();
            registry
                .register(kind, move |job| {
                    let dispatcher = dispatcher.clone();
                    Box::pin(async move { dispatcher.dispatch(&job).await })
                })
                .await;
        }
    }
}

/// Minor currency units to a dollars string with two decimals.
fn format_dollars(amount: i64) -> String {
    format!("{:.2}", amount as f64 / 100.0)
}
