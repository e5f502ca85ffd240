use std::time::Duration;

use reqwest::Client;

use crate::config::TelegramConfig;
use crate::error::{AppError, Context, Result};

pub mod message;

pub use message::{alert_message, startup_message};

const TELEGRAM_API_URL: &str = "https://api.telegram.org";
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivers rendered messages to the configured Telegram chat.
pub struct Notifier {
    client: Client,
    config: TelegramConfig,
}

impl Notifier {
    pub fn new(config: TelegramConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .context("failed to construct notification HTTP client")?;

        Ok(Self { client, config })
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn startup_enabled(&self) -> bool {
        self.config.enabled && self.config.startup_notification
    }

    /// Send one rendered message; failures are reported, never retried here.
    pub async fn send(&self, text: &str) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let url = format!(
            "{TELEGRAM_API_URL}/bot{}/sendMessage",
            self.config.bot_token
        );
        let payload = serde_json::json!({
            "chat_id": self.config.chat_id,
            "text": text,
            "parse_mode": "MarkdownV2",
        });

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Notify(format!("telegram request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Notify(format!(
                "telegram responded with {status}: {body}"
            )));
        }

        Ok(())
    }
}
