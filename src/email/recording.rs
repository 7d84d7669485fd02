//! Recording mailer for tests.
//!
//! Captures sent emails in memory and can be told to fail the next N sends,
//! which is how the job retry path is exercised.

use crate::email::mailer::{Email, Mailer};
use crate::error::{PledgewaveError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// A mailer that records every send instead of delivering anything.
#[derive(Debug, Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<Email>>>,
    fail_next: Arc<AtomicU32>,
}

impl RecordingMailer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` sends fail with a transport error.
    pub fn fail_next(&self, count: u32) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Emails accepted so far, in send order.
    #[must_use]
    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().expect("mailer lock poisoned").clone()
    }

    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent.lock().expect("mailer lock poisoned").len()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &Email) -> Result<()> {
        email.validate()?;

        let remaining = self.fail_next.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next.store(remaining - 1, Ordering::SeqCst);
            return Err(PledgewaveError::service_unavailable(
                "Simulated mail transport failure",
            ));
        }

        self.sent
            .lock()
            .expect("mailer lock poisoned")
            .push(email.clone());
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        true
    }
}
