use tracing::info;

use super::{MailError, Mailer, OutgoingEmail};

/// Transport that only logs messages. Used when no SMTP relay is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        info!(
            from = %email.from,
            to = ?email.to,
            subject = %email.subject,
            attachments = email.attachments.len(),
            body_len = email.body.len(),
            "email not sent (log-only transport)"
        );
        Ok(())
    }
}
