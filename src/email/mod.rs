//! Email sending functionality.
//!
//! Backends:
//! - [`ConsoleMailer`] - prints emails to stdout (development)
//! - [`RecordingMailer`] - captures emails in memory (tests)
//!
//! Real transports (SMTP, provider APIs) live behind the [`Mailer`] trait
//! and are supplied by the embedding application.

mod console;
mod mailer;
mod recording;

pub use console::ConsoleMailer;
pub use mailer::{Email, Mailer};
pub use recording::RecordingMailer;
