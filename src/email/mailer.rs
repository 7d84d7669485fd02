//! Mailer trait for sending notification emails.
//!
//! This trait abstracts the mail transport so the dispatcher can run
//! against SMTP, a third-party provider, or console output in development.

use crate::error::Result;
use async_trait::async_trait;

/// An email message to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    /// Sender address (e.g., "noreply@example.com")
    pub from: String,
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// Plain text body
    pub body: String,
}

impl Email {
    /// Create a new email with all required fields.
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Validate the email has its required fields.
    pub fn validate(&self) -> Result<()> {
        if self.from.is_empty() {
            return Err(crate::error::PledgewaveError::bad_request(
                "Email 'from' is required",
            ));
        }
        if self.to.is_empty() {
            return Err(crate::error::PledgewaveError::bad_request(
                "Email 'to' is required",
            ));
        }
        if self.subject.is_empty() {
            return Err(crate::error::PledgewaveError::bad_request(
                "Email 'subject' is required",
            ));
        }
        if self.body.is_empty() {
            return Err(crate::error::PledgewaveError::bad_request(
                "Email body is required",
            ));
        }
        Ok(())
    }
}

/// Mailer trait for sending emails.
///
/// Implement this trait to plug in a real transport. Send failures must be
/// returned as errors so the job layer can retry delivery.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send an email. `Ok(())` means the transport accepted the message.
    async fn send(&self, email: &Email) -> Result<()>;

    /// Check if the mailer backend is healthy/connected.
    fn is_healthy(&self) -> bool;
}
