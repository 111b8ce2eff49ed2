//! SMTP delivery via lettre.

use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::{Attachment as MimeAttachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{MailError, Mailer, OutgoingEmail};

/// SMTP relay settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Upgrade the connection with STARTTLS (plain SMTP when false, e.g. a local relay).
    pub starttls: bool,
    pub timeout: Duration,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 587,
            username: None,
            password: None,
            starttls: true,
            timeout: Duration::from_secs(30),
        }
    }
}

// Keep the password out of logs.
impl core::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("starttls", &self.starttls)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Mailer that delivers through an SMTP relay.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: SmtpTransport,
    host: String,
}

impl SmtpMailer {
    /// Build the transport. Connections are opened lazily on first send.
    ///
    /// # Errors
    ///
    /// Returns error if the TLS parameters for `host` cannot be built.
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let builder = if config.starttls {
            SmtpTransport::starttls_relay(&config.host)?
        } else {
            SmtpTransport::builder_dangerous(&config.host)
        };

        let mut builder = builder.port(config.port).timeout(Some(config.timeout));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        info!(host = %config.host, port = config.port, starttls = config.starttls, "SMTP mailer configured");

        Ok(Self {
            transport: builder.build(),
            host: config.host.clone(),
        })
    }

    /// Open a connection and issue NOOP, to fail fast on bad settings.
    pub fn test_connection(&self) -> Result<bool, MailError> {
        Ok(self.transport.test_connection()?)
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let message = build_message(email)?;
        self.transport.send(&message)?;

        debug!(host = %self.host, to = ?email.to, subject = %email.subject, "email sent");
        Ok(())
    }
}

fn mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .parse()
        .map_err(|_| MailError::InvalidAddress(address.to_string()))
}

/// Render an [`OutgoingEmail`] as a MIME message.
///
/// Without attachments this is a single `text/plain` part; with attachments it
/// becomes `multipart/mixed` with the body first.
pub fn build_message(email: &OutgoingEmail) -> Result<Message, MailError> {
    let mut builder = Message::builder()
        .from(mailbox(&email.from)?)
        .subject(email.subject.clone());

    for to in &email.to {
        builder = builder.to(mailbox(to)?);
    }

    if email.attachments.is_empty() {
        return Ok(builder
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())?);
    }

    let mut multipart = MultiPart::mixed().singlepart(SinglePart::plain(email.body.clone()));
    for attachment in &email.attachments {
        let content_type = ContentType::parse(&attachment.content_type)
            .map_err(|_| MailError::InvalidContentType(attachment.content_type.clone()))?;
        multipart = multipart.singlepart(
            MimeAttachment::new(attachment.filename.clone())
                .body(attachment.data.clone(), content_type),
        );
    }

    Ok(builder.multipart(multipart)?)
}
