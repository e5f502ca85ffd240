use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration as StdDuration;

use chrono::Duration;

use crate::instrument::Instrument;

pub mod loader;
pub mod validator;

pub use loader::load_config;

pub const DEFAULT_SPOT_API_URL: &str = "https://api.binance.com";
pub const DEFAULT_FUTURES_API_URL: &str = "https://fapi.binance.com";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_RETENTION_HOURS: u32 = 24;
pub const DEFAULT_COOLDOWN_SECS: u64 = 300;
pub const DEFAULT_SANITY_CEILING_PERCENT: f64 = 1000.0;
pub const DEFAULT_STATE_FILE: &str = "price_history.json";

/// Immutable runtime configuration, validated once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub instruments: Vec<Instrument>,
    pub poll_interval: StdDuration,
    /// Look-back window minutes mapped to the alert threshold in percent.
    pub windows: BTreeMap<u32, f64>,
    pub retention_hours: u32,
    pub cooldown: Duration,
    pub sanity_ceiling_percent: f64,
    pub state_file: PathBuf,
    pub endpoints: EndpointConfig,
    pub proxy_url: Option<String>,
    pub telegram: TelegramConfig,
}

impl Config {
    pub fn window_minutes(&self) -> Vec<u32> {
        self.windows.keys().copied().collect()
    }
}

#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub spot_api_url: String,
    pub futures_api_url: String,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub bot_token: String,
    pub chat_id: String,
    pub startup_notification: bool,
}
