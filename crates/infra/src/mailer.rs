//! Outbound mail seam.
//!
//! Actual delivery is an external collaborator; the API only needs a place to
//! hand a rendered message. The default implementation writes the message to
//! the log, which is also what the black-box tests observe against.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("mail delivery failed: {0}")]
    Delivery(String),
}

/// Outbound mail boundary.
pub trait Mailer: Send + Sync {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailerError>;
}

/// Mailer that emits the message as a structured log line.
#[derive(Debug, Default)]
pub struct TracingMailer;

impl TracingMailer {
    pub fn new() -> Self {
        Self
    }
}

impl Mailer for TracingMailer {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailerError> {
        tracing::info!(to, subject, body, "outbound mail");
        Ok(())
    }
}
