//! Email channel: delivers notifications over SMTP.
//!
//! The adapter owns message composition (headers, subject, plain-text body);
//! the SMTP conversation itself is lettre's job. Plain connections are used
//! by default; configuring credentials switches to STARTTLS with
//! authentication.

use crate::config::EmailConfig;
use crate::core::{Event, Notifier};
use crate::render::{action_name, RenderFormat, Renderer};
use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use tracing::info;

/// Sends one plain-text message per notification (or per flushed batch) to
/// all configured recipients.
pub struct EmailNotifier {
    from: Mailbox,
    to: Vec<Mailbox>,
    renderer: Arc<Renderer>,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailNotifier {
    pub fn new(config: &EmailConfig, renderer: Arc<Renderer>) -> Result<Self> {
        let from: Mailbox = config
            .from_address
            .parse()
            .with_context(|| format!("invalid sender address {:?}", config.from_address))?;
        let to = config
            .to_addresses
            .iter()
            .map(|addr| {
                addr.parse()
                    .with_context(|| format!("invalid recipient address {addr:?}"))
            })
            .collect::<Result<Vec<Mailbox>>>()?;
        if to.is_empty() {
            anyhow::bail!("email channel configured without recipients");
        }

        let transport = match (&config.smtp_username, &config.smtp_password) {
            (Some(username), Some(password)) => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                    .context("invalid SMTP relay host")?
                    .port(config.smtp_port)
                    .credentials(Credentials::new(username.clone(), password.clone()))
                    .build()
            }
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                .port(config.smtp_port)
                .build(),
        };

        Ok(Self {
            from,
            to,
            renderer,
            transport,
        })
    }

    fn subject_for(event: &Event) -> String {
        [
            event.kind.as_str(),
            action_name(&event.action),
            event.name.as_str(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
    }

    fn build_message(&self, subject: &str, body: String) -> Result<Message> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }
        builder.body(body).context("failed to compose email message")
    }

    async fn send(&self, subject: &str, body: String) -> Result<()> {
        let message = self.build_message(subject, body)?;
        self.transport
            .send(message)
            .await
            .context("SMTP delivery failed")?;
        info!(subject = %subject, "delivered notification email");
        Ok(())
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &str {
        "email"
    }

    async fn notify(&self, event: &Event) -> Result<()> {
        let subject = Self::subject_for(event);
        let body = self.renderer.render(event, RenderFormat::Plain);
        self.send(&subject, body).await
    }

    async fn notify_batch(&self, events: &[Event]) -> Result<()> {
        match events {
            [] => Ok(()),
            [single] => self.notify(single).await,
            batch => {
                let subject = format!("{} docker events", batch.len());
                let body = batch
                    .iter()
                    .map(|event| self.renderer.render(event, RenderFormat::Plain))
                    .collect::<Vec<_>>()
                    .join("\n");
                self.send(&subject, body).await
            }
        }
    }
}
