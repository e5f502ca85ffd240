use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use chrono::Duration;
use serde::Deserialize;

use crate::error::{AppError, Context, Result};
use crate::instrument::Instrument;

use super::{
    validator, Config, EndpointConfig, TelegramConfig, DEFAULT_COOLDOWN_SECS,
    DEFAULT_FUTURES_API_URL, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_RETENTION_HOURS,
    DEFAULT_SANITY_CEILING_PERCENT, DEFAULT_SPOT_API_URL, DEFAULT_STATE_FILE,
};

/// Load and validate the monitor configuration from a JSON file.
pub fn load_config(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;

    let raw: RawConfig = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse config JSON at {}", path.display()))?;

    let config = raw.into_config()?;
    validator::validate_config(&config)?;

    Ok(config)
}

/// Expand `${VAR}` placeholders so secrets can stay out of the config file.
pub fn expand_env_vars(value: &str) -> Result<String> {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut name = String::new();
            let mut closed = false;
            while let Some(&next) = chars.peek() {
                chars.next();
                if next == '}' {
                    closed = true;
                    break;
                }
                name.push(next);
            }

            if name.is_empty() {
                return Err(AppError::message(
                    "encountered empty environment placeholder in config value",
                ));
            }

            if !closed {
                return Err(AppError::message(
                    "unterminated environment placeholder in config value",
                ));
            }

            let value = std::env::var(&name).with_context(|| {
                format!("environment variable {name} required by the config is not set")
            })?;
            result.push_str(&value);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    symbols: Vec<String>,
    #[serde(default = "default_poll_interval_secs")]
    poll_interval_secs: u64,
    #[serde(default = "default_window_thresholds")]
    windows: HashMap<String, f64>,
    #[serde(default = "default_retention_hours")]
    retention_hours: u32,
    #[serde(default = "default_cooldown_secs")]
    cooldown_secs: u64,
    #[serde(default = "default_sanity_ceiling")]
    sanity_ceiling_percent: f64,
    #[serde(default = "default_state_file")]
    state_file: String,
    #[serde(default = "default_spot_api_url")]
    spot_api_url: String,
    #[serde(default = "default_futures_api_url")]
    futures_api_url: String,
    #[serde(default)]
    proxy_url: Option<String>,
    #[serde(default)]
    telegram: RawTelegramConfig,
}

impl RawConfig {
    fn into_config(self) -> Result<Config> {
        let instruments = self
            .symbols
            .iter()
            .map(|key| Instrument::parse(key))
            .collect::<Result<Vec<_>>>()?;

        let mut windows = BTreeMap::new();
        for (minutes, threshold) in self.windows {
            let parsed: u32 = minutes.trim().parse().map_err(|_| {
                AppError::message(format!(
                    "window `{minutes}` is not a whole number of minutes"
                ))
            })?;
            windows.insert(parsed, threshold);
        }

        Ok(Config {
            instruments,
            poll_interval: StdDuration::from_secs(self.poll_interval_secs),
            windows,
            retention_hours: self.retention_hours,
            cooldown: Duration::seconds(self.cooldown_secs as i64),
            sanity_ceiling_percent: self.sanity_ceiling_percent,
            state_file: PathBuf::from(self.state_file),
            endpoints: EndpointConfig {
                spot_api_url: self.spot_api_url,
                futures_api_url: self.futures_api_url,
            },
            proxy_url: self.proxy_url,
            telegram: self.telegram.into_telegram_config()?,
        })
    }
}

#[derive(Debug, Deserialize, Default)]
struct RawTelegramConfig {
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    bot_token: String,
    #[serde(default)]
    chat_id: String,
    #[serde(default = "default_true")]
    startup_notification: bool,
}

impl RawTelegramConfig {
    fn into_telegram_config(self) -> Result<TelegramConfig> {
        // Secrets are only resolved when the sink is actually in use.
        let (bot_token, chat_id) = if self.enabled {
            (
                expand_env_vars(&self.bot_token)?,
                expand_env_vars(&self.chat_id)?,
            )
        } else {
            (self.bot_token, self.chat_id)
        };

        Ok(TelegramConfig {
            enabled: self.enabled,
            bot_token,
            chat_id,
            startup_notification: self.startup_notification,
        })
    }
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_window_thresholds() -> HashMap<String, f64> {
    HashMap::from([
        ("5".to_string(), 2.0),
        ("15".to_string(), 2.0),
        ("60".to_string(), 2.0),
    ])
}

fn default_retention_hours() -> u32 {
    DEFAULT_RETENTION_HOURS
}

fn default_cooldown_secs() -> u64 {
    DEFAULT_COOLDOWN_SECS
}

fn default_sanity_ceiling() -> f64 {
    DEFAULT_SANITY_CEILING_PERCENT
}

fn default_state_file() -> String {
    DEFAULT_STATE_FILE.to_string()
}

fn default_spot_api_url() -> String {
    DEFAULT_SPOT_API_URL.to_string()
}

fn default_futures_api_url() -> String {
    DEFAULT_FUTURES_API_URL.to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::Instrument;
    use std::path::Path;

    #[test]
    fn loads_the_example_config() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR"));
        let config = load_config(&root.join("assets").join("config.example.json"))
            .expect("example config should load");

        assert!(config
            .instruments
            .contains(&Instrument::Perpetual("BTCUSDT".to_string())));
        assert_eq!(config.poll_interval.as_secs(), 30);
        assert_eq!(config.windows.get(&5), Some(&2.0));
        assert!(!config.telegram.enabled);
    }

    #[test]
    fn minimal_config_falls_back_to_defaults() {
        let raw: RawConfig = serde_json::from_str(r#"{"symbols": ["BTCUSDT"]}"#).unwrap();
        let config = raw.into_config().unwrap();

        assert_eq!(config.poll_interval.as_secs(), DEFAULT_POLL_INTERVAL_SECS);
        assert_eq!(config.retention_hours, DEFAULT_RETENTION_HOURS);
        assert_eq!(config.cooldown, Duration::seconds(DEFAULT_COOLDOWN_SECS as i64));
        assert_eq!(config.windows.len(), 3);
        assert_eq!(config.state_file, PathBuf::from(DEFAULT_STATE_FILE));
        assert_eq!(config.endpoints.spot_api_url, DEFAULT_SPOT_API_URL);
    }

    #[test]
    fn rejects_non_numeric_window_keys() {
        let raw: RawConfig = serde_json::from_str(
            r#"{"symbols": ["BTCUSDT"], "windows": {"soon": 2.0}}"#,
        )
        .unwrap();

        let err = raw.into_config().expect_err("window key should be rejected");
        assert!(
            err.to_string().contains("whole number of minutes"),
            "unexpected error message: {err}"
        );
    }

    #[test]
    fn expands_placeholders_from_the_environment() {
        std::env::set_var("PRICEWATCH_TEST_TOKEN", "s3cret");
        let expanded = expand_env_vars("bot-${PRICEWATCH_TEST_TOKEN}").unwrap();
        assert_eq!(expanded, "bot-s3cret");
    }

    #[test]
    fn rejects_malformed_placeholders() {
        assert!(expand_env_vars("${}").is_err());
        assert!(expand_env_vars("${UNTERMINATED").is_err());
    }

    #[test]
    fn disabled_telegram_keeps_placeholders_unresolved() {
        let raw = RawTelegramConfig {
            enabled: false,
            bot_token: "${PRICEWATCH_UNSET_TOKEN}".to_string(),
            chat_id: String::new(),
            startup_notification: true,
        };

        let telegram = raw.into_telegram_config().unwrap();
        assert_eq!(telegram.bot_token, "${PRICEWATCH_UNSET_TOKEN}");
    }
}
