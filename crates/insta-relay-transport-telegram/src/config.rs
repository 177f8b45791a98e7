//! Telegram transport settings.

use config::ConfigError;
use insta_relay_core::config::RelaySettings;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Telegram transport settings loaded from environment variables.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct TelegramSettings {
    /// Telegram Bot API token (`BOT_TOKEN`).
    pub bot_token: Option<String>,
    /// Alternative name for the token (`TELEGRAM_TOKEN`).
    pub telegram_token: Option<String>,
    /// Public HTTPS URL Telegram pushes updates to; enables webhook mode.
    pub webhook_url: Option<String>,
    /// Listen port for the webhook, or for the liveness responder in polling mode.
    pub port: Option<u16>,
}

/// How updates reach the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Long polling; optionally keep a liveness port open.
    Polling {
        /// Port for the liveness responder
        liveness_port: Option<u16>,
    },
    /// Telegram pushes updates to `url`, received on `port`.
    Webhook {
        /// Public callback URL
        url: String,
        /// Local listen port
        port: u16,
    },
}

impl TelegramSettings {
    /// Create new settings by loading from environment and files.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or a required value is missing.
    pub fn new() -> Result<Self, ConfigError> {
        let settings: Self = insta_relay_core::config::build_config()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Bot token, preferring `BOT_TOKEN` over `TELEGRAM_TOKEN`.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        [self.bot_token.as_deref(), self.telegram_token.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|t| !t.is_empty())
    }

    /// Fails fast on a missing token or an incomplete webhook setup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Message` describing what is missing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token().is_none() {
            return Err(ConfigError::Message(
                "Bot token is missing: set BOT_TOKEN (or TELEGRAM_TOKEN)".to_string(),
            ));
        }
        if self.webhook_url().is_some() && self.port.is_none() {
            return Err(ConfigError::Message(
                "WEBHOOK_URL is set but PORT is missing".to_string(),
            ));
        }
        Ok(())
    }

    fn webhook_url(&self) -> Option<&str> {
        self.webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }

    /// Delivery mode derived from the webhook and port settings.
    #[must_use]
    pub fn delivery_mode(&self) -> DeliveryMode {
        match (self.webhook_url(), self.port) {
            (Some(url), Some(port)) => DeliveryMode::Webhook {
                url: url.to_string(),
                port,
            },
            _ => DeliveryMode::Polling {
                liveness_port: self.port,
            },
        }
    }
}

/// Combined settings used by the Telegram transport layer.
#[derive(Clone)]
pub struct BotSettings {
    /// Pipeline settings.
    pub relay: Arc<RelaySettings>,
    /// Telegram-specific settings.
    pub telegram: Arc<TelegramSettings>,
}

impl BotSettings {
    /// Create a new combined settings bundle.
    #[must_use]
    pub fn new(relay: RelaySettings, telegram: TelegramSettings) -> Self {
        Self {
            relay: Arc::new(relay),
            telegram: Arc::new(telegram),
        }
    }
}
