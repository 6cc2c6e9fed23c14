//! Provider trait and priority-ordered reminder routing.

use std::sync::Arc;

use async_trait::async_trait;

use shepherd_core::config::ChannelsConfig;
use shepherd_core::error::{Result, ShepherdError};
use shepherd_core::traits::ReminderSink;
use shepherd_core::types::{FollowUp, Priority, TargetKind, User};

use crate::{EmailProvider, SmsProvider, WhatsAppProvider};

/// One delivery transport. `recipient` resolves the address this transport
/// needs from the user record (phone vs email); `None` means the user is
/// unreachable on this transport and the router moves on.
#[async_trait]
pub trait MessageProvider: Send + Sync {
    fn name(&self) -> &str;

    fn recipient(&self, user: &User) -> Option<String>;

    async fn send(&self, to: &str, body: &str) -> Result<()>;
}

/// Tries providers in priority order; the first successful delivery wins.
pub struct ReminderRouter {
    providers: Vec<Arc<dyn MessageProvider>>,
}

impl ReminderRouter {
    pub fn new(providers: Vec<Arc<dyn MessageProvider>>) -> Self {
        Self { providers }
    }

    /// Build a router from config, instantiating one provider per entry in
    /// `channels.priority` that is configured and enabled.
    pub fn from_config(config: &ChannelsConfig) -> Self {
        let mut providers: Vec<Arc<dyn MessageProvider>> = Vec::new();
        for name in &config.priority {
            match name.as_str() {
                "sms" => {
                    if let Some(sms) = config.sms.as_ref().filter(|c| c.enabled) {
                        providers.push(Arc::new(SmsProvider::new(sms.clone())));
                    }
                }
                "email" => {
                    if let Some(email) = config.email.as_ref().filter(|c| c.enabled) {
                        providers.push(Arc::new(EmailProvider::new(email.clone())));
                    }
                }
                "whatsapp" => {
                    if let Some(wa) = config.whatsapp.as_ref().filter(|c| c.enabled) {
                        providers.push(Arc::new(WhatsAppProvider::new(wa.clone())));
                    }
                }
                other => {
                    tracing::warn!("unknown channel '{other}' in channels.priority, skipping");
                }
            }
        }
        Self::new(providers)
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[async_trait]
impl ReminderSink for ReminderRouter {
    async fn notify(&self, user: &User, follow_up: &FollowUp) -> Result<()> {
        let body = reminder_text(follow_up);
        let mut last_err: Option<ShepherdError> = None;

        for provider in &self.providers {
            let Some(to) = provider.recipient(user) else {
                continue;
            };
            match provider.send(&to, &body).await {
                Ok(()) => {
                    tracing::info!(
                        "🔔 Reminder delivered via {} to {} (follow-up {})",
                        provider.name(),
                        user.name,
                        follow_up.id
                    );
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("{} delivery to {} failed: {e}", provider.name(), user.name);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            ShepherdError::Channel(format!(
                "no configured channel can reach user {}",
                user.id
            ))
        }))
    }
}

/// Reminder body shared by all transports.
fn reminder_text(follow_up: &FollowUp) -> String {
    let target = match follow_up.target_kind {
        TargetKind::Member => "member",
        TargetKind::Convert => "convert",
    };
    let priority = match follow_up.priority {
        Priority::Low => "low",
        Priority::Medium => "medium",
        Priority::High => "high",
    };
    format!(
        "Follow-up reminder: {target} {} is due for contact ({priority} priority, {} attempt(s) so far).",
        follow_up.target_id,
        follow_up.attempts.len()
    )
}

/// In-memory provider for tests and dry runs. Records every message;
/// optionally fails each send.
#[derive(Default)]
pub struct MockProvider {
    pub sent: std::sync::Mutex<Vec<(String, String)>>,
    pub fail: bool,
    pub phone_based: bool,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn recipient(&self, user: &User) -> Option<String> {
        if self.phone_based {
            user.phone.clone()
        } else {
            Some(user.email.clone())
        }
    }

    async fn send(&self, to: &str, body: &str) -> Result<()> {
        if self.fail {
            return Err(ShepherdError::Channel("mock provider down".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), body.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shepherd_core::types::{FollowUpStatus, Role, new_id};

    fn user(phone: Option<&str>) -> User {
        User {
            id: "u1".into(),
            name: "Grace".into(),
            email: "grace@example.org".into(),
            phone: phone.map(String::from),
            role: Role::FollowUpTeam,
        }
    }

    fn follow_up() -> FollowUp {
        let now = Utc::now();
        FollowUp {
            id: new_id(),
            target_kind: TargetKind::Convert,
            target_id: "c9".into(),
            assigned_to: Some("u1".into()),
            status: FollowUpStatus::Pending,
            attempts: vec![],
            next_attempt_at: None,
            scheduled_at: Some(now),
            priority: Priority::High,
            created_by: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_first_provider_wins() {
        let first = Arc::new(MockProvider::new());
        let second = Arc::new(MockProvider::new());
        let router = ReminderRouter::new(vec![first.clone(), second.clone()]);

        router.notify(&user(None), &follow_up()).await.unwrap();
        assert_eq!(first.sent.lock().unwrap().len(), 1);
        assert!(second.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_falls_through_on_failure() {
        let first = Arc::new(MockProvider {
            fail: true,
            ..Default::default()
        });
        let second = Arc::new(MockProvider::new());
        let router = ReminderRouter::new(vec![first, second.clone()]);

        router.notify(&user(None), &follow_up()).await.unwrap();
        assert_eq!(second.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_skips_provider_without_recipient() {
        // phone-based provider first, user has no phone
        let first = Arc::new(MockProvider {
            phone_based: true,
            ..Default::default()
        });
        let second = Arc::new(MockProvider::new());
        let router = ReminderRouter::new(vec![first.clone(), second.clone()]);

        router.notify(&user(None), &follow_up()).await.unwrap();
        assert!(first.sent.lock().unwrap().is_empty());
        assert_eq!(second.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_all_providers_fail() {
        let only = Arc::new(MockProvider {
            fail: true,
            ..Default::default()
        });
        let router = ReminderRouter::new(vec![only]);
        let err = router.notify(&user(None), &follow_up()).await.unwrap_err();
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_no_reachable_provider_is_an_error() {
        let router = ReminderRouter::new(vec![]);
        assert!(router.notify(&user(None), &follow_up()).await.is_err());
    }

    #[test]
    fn test_reminder_text_mentions_target_and_priority() {
        let body = reminder_text(&follow_up());
        assert!(body.contains("convert c9"));
        assert!(body.contains("high priority"));
    }

    #[test]
    fn test_from_config_respects_priority_and_enabled() {
        use shepherd_core::config::{ChannelsConfig, SmsConfig, WhatsAppConfig};

        let config = ChannelsConfig {
            priority: vec!["whatsapp".into(), "sms".into(), "email".into()],
            sms: Some(SmsConfig {
                api_url: "https://sms.example.org/send".into(),
                api_key: "k".into(),
                sender_name: "Church".into(),
                enabled: false,
            }),
            email: None,
            whatsapp: Some(WhatsAppConfig {
                access_token: "t".into(),
                phone_number_id: "123".into(),
                enabled: true,
            }),
        };
        let router = ReminderRouter::from_config(&config);
        // sms disabled, email unconfigured, whatsapp survives
        assert_eq!(router.providers.len(), 1);
        assert_eq!(router.providers[0].name(), "whatsapp");
    }
}
