//! Shepherd configuration system.
//!
//! TOML file at `~/.shepherd/config.toml`; every field has a serde default
//! so a partial (or absent) file still yields a working config. Channel
//! provider settings live here and are handed to the engines at
//! construction — there is no process-wide provider registry.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, ShepherdError};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShepherdConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
}

impl ShepherdConfig {
    /// Load config from the default path, falling back to defaults when the
    /// file does not exist.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ShepherdError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| ShepherdError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| ShepherdError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Shepherd home directory (~/.shepherd).
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".shepherd")
    }
}

/// Reminder scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    /// Seconds between due-reminder sweeps.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_sweep_interval() -> u64 {
    300
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// Persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "sqlite" or "memory".
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Database file path; defaults to ~/.shepherd/shepherd.db.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_backend() -> String {
    "sqlite".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: None,
        }
    }
}

impl StoreConfig {
    pub fn db_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| ShepherdConfig::home_dir().join("shepherd.db"))
    }
}

/// Notification channel settings. Providers are tried in `priority` order
/// until one reaches the assignee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelsConfig {
    #[serde(default = "default_priority")]
    pub priority: Vec<String>,
    #[serde(default)]
    pub sms: Option<SmsConfig>,
    #[serde(default)]
    pub email: Option<EmailConfig>,
    #[serde(default)]
    pub whatsapp: Option<WhatsAppConfig>,
}

fn default_priority() -> Vec<String> {
    vec!["sms".into(), "whatsapp".into(), "email".into()]
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            priority: default_priority(),
            sms: None,
            email: None,
            whatsapp: None,
        }
    }
}

/// HTTP SMS gateway (Twilio-style REST endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    pub api_url: String,
    pub api_key: String,
    #[serde(default)]
    pub sender_name: String,
    #[serde(default = "bool_true")]
    pub enabled: bool,
}

/// SMTP email sending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default = "bool_true")]
    pub enabled: bool,
}

fn default_smtp_port() -> u16 {
    587
}

/// WhatsApp Business Cloud API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    pub access_token: String,
    pub phone_number_id: String,
    #[serde(default = "bool_true")]
    pub enabled: bool,
}

fn bool_true() -> bool {
    true
}
