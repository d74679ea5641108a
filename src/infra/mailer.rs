//! Email transport. Message composition lives in `app::email`; this module only delivers.

use crate::domain::EmailAddress;
use crate::infra::config::{self, MailTransport, SmtpSettings};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: EmailAddress,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MailError {
    #[error("Invalid email message: {0}")]
    Message(String),

    #[error("Email transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;

    /// Connectivity probe used by `preflight`.
    async fn check(&self) -> Result<(), MailError> {
        Ok(())
    }
}

/// SMTP relay with STARTTLS and login credentials.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings, from: &str) -> anyhow::Result<Self> {
        let from: Mailbox = from
            .parse()
            .map_err(|e| anyhow::anyhow!("EMAIL_FROM is not a valid mailbox: {}", e))?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .build();
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let to: Mailbox = email
            .to
            .as_str()
            .parse()
            .map_err(|e: lettre::address::AddressError| MailError::Message(e.to_string()))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(email.html.clone())
            .map_err(|e| MailError::Message(e.to_string()))?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        info!(to = %email.to, code = %response.code(), "Email sent");
        Ok(())
    }

    async fn check(&self) -> Result<(), MailError> {
        match self.transport.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(MailError::Transport("SMTP server did not accept NOOP".to_string())),
            Err(e) => Err(MailError::Transport(e.to_string())),
        }
    }
}

/// Writes messages to the log instead of delivering them.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        info!(to = %email.to, subject = %email.subject, "Email not delivered (MAIL_TRANSPORT=log)");
        Ok(())
    }
}

/// Builds the mailer selected by `MAIL_TRANSPORT`.
pub fn from_env() -> anyhow::Result<Arc<dyn Mailer>> {
    match config::mail_transport()? {
        MailTransport::Smtp => {
            let settings = config::smtp_settings()?.ok_or_else(|| {
                anyhow::anyhow!("MAIL_TRANSPORT=smtp requires SMTP_USERNAME and SMTP_PASSWORD")
            })?;
            info!(host = %settings.host, port = settings.port, "Using SMTP mail transport");
            Ok(Arc::new(SmtpMailer::new(&settings, &config::email_from())?))
        }
        MailTransport::Log => {
            info!("Using log mail transport; alerts will not be delivered");
            Ok(Arc::new(LogMailer))
        }
    }
}
