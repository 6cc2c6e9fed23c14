//! Email provider — SMTP sending via async lettre.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message as LettreMessage, message::Mailbox,
    message::header::ContentType, transport::smtp::authentication::Credentials,
};

use shepherd_core::config::EmailConfig;
use shepherd_core::error::{Result, ShepherdError};
use shepherd_core::types::User;

use crate::router::MessageProvider;

pub struct EmailProvider {
    config: EmailConfig,
}

impl EmailProvider {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    pub async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let from_name = self.config.display_name.as_deref().unwrap_or("Shepherd");
        let from_mailbox: Mailbox = format!("{from_name} <{}>", self.config.email)
            .parse()
            .map_err(|e| ShepherdError::Channel(format!("Invalid from: {e}")))?;

        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|e| ShepherdError::Channel(format!("Invalid to: {e}")))?;

        let email = LettreMessage::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| ShepherdError::Channel(format!("Build email: {e}")))?;

        let creds = Credentials::new(self.config.email.clone(), self.config.password.clone());

        let mailer =
            AsyncSmtpTransport::<lettre::Tokio1Executor>::starttls_relay(&self.config.smtp_host)
                .map_err(|e| ShepherdError::Channel(format!("SMTP relay: {e}")))?
                .port(self.config.smtp_port)
                .credentials(creds)
                .build();

        mailer
            .send(email)
            .await
            .map_err(|e| ShepherdError::Channel(format!("SMTP send: {e}")))?;

        tracing::info!("📤 Email sent to: {to}");
        Ok(())
    }
}

#[async_trait]
impl MessageProvider for EmailProvider {
    fn name(&self) -> &str {
        "email"
    }

    fn recipient(&self, user: &User) -> Option<String> {
        Some(user.email.clone())
    }

    async fn send(&self, to: &str, body: &str) -> Result<()> {
        self.send_email(to, "Follow-up reminder", body).await
    }
}
