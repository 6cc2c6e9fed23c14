//! WhatsApp Business Cloud API provider.
//!
//! Uses the official WhatsApp Business Platform (Cloud API) for messaging.
//! Requires: Access Token + Phone Number ID from Meta Business Suite.

use async_trait::async_trait;

use shepherd_core::config::WhatsAppConfig;
use shepherd_core::error::{Result, ShepherdError};
use shepherd_core::types::User;

use crate::router::MessageProvider;

pub struct WhatsAppProvider {
    config: WhatsAppConfig,
    client: reqwest::Client,
}

impl WhatsAppProvider {
    pub fn new(config: WhatsAppConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Send a text message via WhatsApp Cloud API.
    async fn send_text_message(&self, to: &str, text: &str) -> Result<String> {
        let url = format!(
            "https://graph.facebook.com/v21.0/{}/messages",
            self.config.phone_number_id
        );

        let body = serde_json::json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": to,
            "type": "text",
            "text": {
                "preview_url": false,
                "body": text
            }
        });

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.access_token),
            )
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ShepherdError::Channel(format!("WhatsApp API request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ShepherdError::Channel(format!(
                "WhatsApp API error {status}: {error_text}"
            )));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ShepherdError::Channel(format!("Invalid WhatsApp response: {e}")))?;

        let msg_id = result["messages"][0]["id"]
            .as_str()
            .unwrap_or("unknown")
            .to_string();

        tracing::debug!("WhatsApp message sent: {} → {}", msg_id, to);
        Ok(msg_id)
    }
}

#[async_trait]
impl MessageProvider for WhatsAppProvider {
    fn name(&self) -> &str {
        "whatsapp"
    }

    fn recipient(&self, user: &User) -> Option<String> {
        user.phone.clone()
    }

    async fn send(&self, to: &str, body: &str) -> Result<()> {
        self.send_text_message(to, body).await?;
        Ok(())
    }
}
