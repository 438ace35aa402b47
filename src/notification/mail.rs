//! Email delivery of error records through an authenticated SMTP relay.

use crate::config::MailRelay;
use crate::core::Alert;
use crate::error::NotifyError;
use crate::notification::Notifier;
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

/// Upper bound for a single SMTP conversation.
const SMTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Something that can hand a finished message to a mail server.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, message: Message) -> Result<(), NotifyError>;
}

/// STARTTLS relay with username/password authentication.
pub struct SmtpRelay {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpRelay {
    pub fn new(relay: &MailRelay) -> Result<Self, NotifyError> {
        let creds = Credentials::new(relay.sender.clone(), relay.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&relay.smtp_host)?
            .port(relay.smtp_port)
            .credentials(creds)
            .timeout(Some(SMTP_TIMEOUT))
            .build();
        Ok(Self { transport })
    }
}

#[async_trait]
impl MailTransport for SmtpRelay {
    async fn deliver(&self, message: Message) -> Result<(), NotifyError> {
        self.transport.send(message).await?;
        Ok(())
    }
}

/// Sends each alert as a separate email thread.
pub struct MailNotifier {
    sender: String,
    recipient: String,
    transport: Arc<dyn MailTransport>,
}

impl MailNotifier {
    /// Creates a notifier delivering through the configured SMTP relay.
    pub fn new(relay: &MailRelay) -> Result<Self, NotifyError> {
        Ok(Self::with_transport(relay, Arc::new(SmtpRelay::new(relay)?)))
    }

    pub fn with_transport(relay: &MailRelay, transport: Arc<dyn MailTransport>) -> Self {
        Self {
            sender: relay.sender.clone(),
            recipient: relay.recipient.clone(),
            transport,
        }
    }

    /// Builds the message for an alert.
    ///
    /// Every message gets a fresh `References` id so mail clients keep
    /// distinct errors in distinct threads.
    pub fn compose(&self, alert: &Alert) -> Result<Message, NotifyError> {
        let message = Message::builder()
            .from(parse_mailbox(&self.sender)?)
            .to(parse_mailbox(&self.recipient)?)
            .subject(format!("{} error", alert.module_tag))
            .references(format!("<{}@escalog>", Uuid::new_v4()))
            .header(ContentType::TEXT_PLAIN)
            .body(alert.text.as_str().to_string())?;
        Ok(message)
    }
}

#[async_trait]
impl Notifier for MailNotifier {
    #[instrument(skip_all, fields(to = %self.recipient))]
    async fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        let message = self.compose(alert)?;
        self.transport.deliver(message).await?;
        info!("Sent record by email.");
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address.parse().map_err(|source| NotifyError::Address {
        address: address.to_string(),
        source,
    })
}
