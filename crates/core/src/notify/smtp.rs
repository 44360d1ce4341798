use crate::config::{EmailSettings, Secret};
use crate::error::{Error, Result};
use crate::notify::{Mailer, Notification};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

/// Sends through an authenticated STARTTLS relay.
///
/// Every send opens its own connection and closes it when done, including
/// on error.
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    host: String,
    port: u16,
    username: String,
    password: Secret,
    timeout: Duration,
}

impl SmtpMailer {
    pub fn from_settings(settings: &EmailSettings) -> Self {
        Self {
            host: settings.smtp_host.clone(),
            port: settings.smtp_port,
            username: settings.sender_email.clone(),
            password: settings.smtp_password.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let creds = Credentials::new(
            self.username.clone(),
            self.password.expose().to_string(),
        );
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)
            .map_err(|e| Error::Delivery(format!("SMTP relay {} unusable: {e}", self.host)))?
            .port(self.port)
            .credentials(creds)
            .timeout(Some(self.timeout))
            .build();
        Ok(transport)
    }
}

#[async_trait::async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, notification: &Notification) -> Result<()> {
        let message = build_message(notification)?;
        let transport = self.transport()?;

        tracing::debug!(
            host = %self.host,
            port = self.port,
            recipients = notification.to.len(),
            "sending email"
        );
        transport
            .send(message)
            .await
            .map_err(|e| Error::Delivery(format!("SMTP send via {} failed: {e}", self.host)))?;
        Ok(())
    }
}

/// Plain-text message from the sender to every receiver in a single `To`.
pub fn build_message(notification: &Notification) -> Result<Message> {
    let from: Mailbox = notification
        .from
        .parse()
        .map_err(|e| Error::Delivery(format!("bad sender address {:?}: {e}", notification.from)))?;

    let mut builder = Message::builder()
        .from(from)
        .subject(notification.subject.as_str())
        .header(ContentType::TEXT_PLAIN);

    for to in &notification.to {
        let mailbox: Mailbox = to
            .parse()
            .map_err(|e| Error::Delivery(format!("bad receiver address {to:?}: {e}")))?;
        builder = builder.to(mailbox);
    }

    builder
        .body(notification.body.clone())
        .map_err(|e| Error::Delivery(format!("failed to build message: {e}")))
}
