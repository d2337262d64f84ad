//! Outbound mail transports.
//!
//! The workflow depends on the [`MailTransport`] trait only; the SMTP
//! adapter is constructed once at process start and injected, replacing
//! any module-level transporter caching.

use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::info;

use crate::config::MailConfig;

/// Transport-agnostic message. Composition happens in the notifier; the
/// transport only moves bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub attachment: Option<EmailAttachment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Delivery seam so tests can observe sends without a relay.
pub trait MailTransport: Send + Sync {
    fn deliver(&self, email: &OutboundEmail) -> Result<(), NotificationError>;
}

/// Send failures. Logged by the workflow layer, never surfaced to the
/// caller of a transition.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("invalid mail address: {0}")]
    InvalidAddress(String),
    #[error("failed to compose message: {0}")]
    Compose(String),
    #[error("mail transport failed: {0}")]
    Transport(String),
}

/// SMTP adapter over a blocking lettre transport with an explicit send
/// timeout, so a hung relay degrades into a logged failure instead of a
/// stalled transition.
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(
        host: &str,
        port: u16,
        credentials: Option<(String, String)>,
        from_address: &str,
        timeout: Duration,
    ) -> Result<Self, NotificationError> {
        let from = parse_mailbox(from_address)?;

        let mut builder = match &credentials {
            Some(_) => SmtpTransport::starttls_relay(host)
                .map_err(|err| NotificationError::Transport(err.to_string()))?,
            // Plaintext relays only appear in development setups.
            None => SmtpTransport::builder_dangerous(host),
        };
        builder = builder.port(port).timeout(Some(timeout));
        if let Some((user, pass)) = credentials {
            builder = builder.credentials(Credentials::new(user, pass));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    pub fn from_config(config: &MailConfig) -> Result<Option<Self>, NotificationError> {
        let Some(host) = config.smtp_host.as_deref() else {
            return Ok(None);
        };
        let credentials = match (&config.smtp_user, &config.smtp_pass) {
            (Some(user), Some(pass)) => Some((user.clone(), pass.clone())),
            _ => None,
        };
        Self::new(
            host,
            config.smtp_port,
            credentials,
            &config.from_address,
            config.send_timeout,
        )
        .map(Some)
    }
}

impl MailTransport for SmtpMailer {
    fn deliver(&self, email: &OutboundEmail) -> Result<(), NotificationError> {
        let to = parse_mailbox(&email.to)?;
        let builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.clone());

        let body = SinglePart::html(email.html_body.clone());
        let message = match &email.attachment {
            Some(attachment) => {
                let content_type = ContentType::parse(&attachment.content_type)
                    .map_err(|err| NotificationError::Compose(err.to_string()))?;
                let part = Attachment::new(attachment.filename.clone())
                    .body(attachment.bytes.clone(), content_type);
                builder.multipart(MultiPart::mixed().singlepart(body).singlepart(part))
            }
            None => builder.singlepart(body),
        }
        .map_err(|err| NotificationError::Compose(err.to_string()))?;

        self.transport
            .send(&message)
            .map(|_| ())
            .map_err(|err| NotificationError::Transport(err.to_string()))
    }
}

fn parse_mailbox(raw: &str) -> Result<Mailbox, NotificationError> {
    raw.parse::<Mailbox>()
        .map_err(|err| NotificationError::InvalidAddress(format!("'{raw}': {err}")))
}

/// Development fallback when no SMTP relay is configured: the message is
/// written to the log instead of the wire.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

impl MailTransport for LogMailer {
    fn deliver(&self, email: &OutboundEmail) -> Result<(), NotificationError> {
        info!(
            to = %email.to,
            subject = %email.subject,
            attachment = email.attachment.as_ref().map(|a| a.filename.as_str()),
            "no SMTP relay configured; logging outbound email instead of sending"
        );
        Ok(())
    }
}

/// Concrete transport selected from configuration at startup.
pub enum ConfiguredMailer {
    Smtp(SmtpMailer),
    Log(LogMailer),
}

impl ConfiguredMailer {
    pub fn from_config(config: &MailConfig) -> Result<Self, NotificationError> {
        match SmtpMailer::from_config(config)? {
            Some(mailer) => Ok(Self::Smtp(mailer)),
            None => Ok(Self::Log(LogMailer)),
        }
    }
}

impl MailTransport for ConfiguredMailer {
    fn deliver(&self, email: &OutboundEmail) -> Result<(), NotificationError> {
        match self {
            ConfiguredMailer::Smtp(mailer) => mailer.deliver(email),
            ConfiguredMailer::Log(mailer) => mailer.deliver(email),
        }
    }
}
