//! Outgoing mail seam. Reminders are handed to a [`Mailer`]; the default
//! [`LogMailer`] writes them to the log instead of delivering them.

use async_trait::async_trait;

use crate::domain::DomainError;

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), DomainError>;
}

#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), DomainError> {
        tracing::info!(to = %mail.to, subject = %mail.subject, "mail queued (log only)");
        tracing::debug!(body = %mail.body);
        Ok(())
    }
}
