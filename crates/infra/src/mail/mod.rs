//! Outbound email: message model, transport trait and implementations.
//!
//! Handlers build an [`OutgoingEmail`] and hand it to a [`Mailer`]. The SMTP
//! transport is used in production; the in-memory outbox backs tests and the
//! log-only transport backs local runs without an SMTP relay.

pub mod log;
pub mod memory;
pub mod smtp;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use self::log::LogMailer;
pub use memory::InMemoryMailer;
pub use smtp::{SmtpConfig, SmtpMailer};

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum MailError {
    /// A sender or recipient address could not be parsed.
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    /// An attachment declared an unparseable MIME type.
    #[error("invalid content type: {0}")]
    InvalidContentType(String),

    /// Failed to build the MIME message.
    #[error("failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// SMTP transport error (connection, TLS, rejected command).
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// The transport is not able to send right now.
    #[error("mail transport unavailable: {0}")]
    Unavailable(String),
}

/// A file attached to an email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data,
        }
    }

    pub fn pdf(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self::new(filename, "application/pdf", data)
    }
}

/// A plain-text email, optionally with attachments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl OutgoingEmail {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: vec![to.into()],
            subject: subject.into(),
            body: body.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

/// Email transport.
pub trait Mailer: Send + Sync {
    fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;
}

impl<M> Mailer for Arc<M>
where
    M: Mailer + ?Sized,
{
    fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        (**self).send(email)
    }
}
