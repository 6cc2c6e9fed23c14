//! SMS gateway provider.
//!
//! Posts to a Twilio-style HTTP endpoint. The gateway URL and key come from
//! config, so Twilio, Africa's Talking, or an in-house relay all work with
//! the same shape.

use async_trait::async_trait;

use shepherd_core::config::SmsConfig;
use shepherd_core::error::{Result, ShepherdError};
use shepherd_core::types::User;

use crate::router::MessageProvider;

pub struct SmsProvider {
    config: SmsConfig,
    client: reqwest::Client,
}

impl SmsProvider {
    pub fn new(config: SmsConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl MessageProvider for SmsProvider {
    fn name(&self) -> &str {
        "sms"
    }

    fn recipient(&self, user: &User) -> Option<String> {
        user.phone.clone()
    }

    async fn send(&self, to: &str, body: &str) -> Result<()> {
        let payload = serde_json::json!({
            "to": to,
            "message": body,
            "sender": self.config.sender_name,
        });

        let response = self
            .client
            .post(&self.config.api_url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| ShepherdError::Channel(format!("SMS gateway request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ShepherdError::Channel(format!(
                "SMS gateway error {status}: {error_text}"
            )));
        }

        tracing::debug!("📨 SMS sent to {to}");
        Ok(())
    }
}
