use std::collections::BTreeMap;

use chrono::Utc;
use log::{debug, error, info, warn};
use tokio::time::{sleep, Duration};

use crate::alert::{evaluate_change, AlertVerdict, CooldownTracker};
use crate::config::Config;
use crate::error::Result;
use crate::fetch::QuoteFetcher;
use crate::history::{load_history, save_history, ChangeResult, PriceHistory};
use crate::instrument::Instrument;
use crate::notify::{alert_message, startup_message, Notifier};

/// Pause before retrying after a cycle in which nothing could be fetched.
const CYCLE_FAILURE_BACKOFF: Duration = Duration::from_secs(30);

/// Owns all mutable monitoring state and drives the poll/evaluate/notify cycle.
pub struct Monitor {
    config: Config,
    fetcher: QuoteFetcher,
    notifier: Notifier,
    history: PriceHistory,
    cooldowns: CooldownTracker,
    windows: Vec<u32>,
}

impl Monitor {
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = QuoteFetcher::new(config.endpoints.clone(), config.proxy_url.as_deref())?;
        let notifier = Notifier::new(config.telegram.clone())?;
        let history = load_history(&config.state_file, config.retention_hours);
        let cooldowns = CooldownTracker::new(config.cooldown);
        let windows = config.window_minutes();

        Ok(Self {
            config,
            fetcher,
            notifier,
            history,
            cooldowns,
            windows,
        })
    }

    /// Run forever: announce, then poll on the configured cadence.
    pub async fn run(&mut self) -> Result<()> {
        self.announce().await;

        loop {
            match self.run_cycle().await {
                Ok(appended) => {
                    debug!("cycle complete, {appended} samples appended");
                    sleep(self.config.poll_interval).await;
                }
                Err(e) => {
                    error!("monitoring cycle failed: {e}");
                    sleep(CYCLE_FAILURE_BACKOFF).await;
                }
            }
        }
    }

    /// Run exactly one cycle, for the `--once` flag.
    pub async fn run_once(&mut self) -> Result<()> {
        self.run_cycle().await.map(|_| ())
    }

    async fn announce(&self) {
        info!("=== price monitor starting ===");
        info!(
            "instruments: {}",
            self.config
                .instruments
                .iter()
                .map(Instrument::key)
                .collect::<Vec<_>>()
                .join(", ")
        );
        info!("poll interval: {}s", self.config.poll_interval.as_secs());
        for (window, threshold) in &self.config.windows {
            info!("{window} minute window alerts at {threshold}%");
        }

        if !self.notifier.enabled() {
            info!("telegram notifications disabled");
            return;
        }

        info!("telegram notifications enabled");
        if !self.notifier.startup_enabled() {
            return;
        }

        let initial = self.probe_initial_prices().await;
        let text = startup_message(
            &initial,
            &self.config.windows,
            self.config.poll_interval.as_secs(),
            Utc::now(),
        );
        if let Err(e) = self.notifier.send(&text).await {
            warn!("startup notification failed: {e}");
        }
    }

    /// One probe per instrument for the launch summary; failures stay per-instrument.
    async fn probe_initial_prices(&self) -> Vec<(Instrument, Option<f64>)> {
        let mut entries = Vec::with_capacity(self.config.instruments.len());
        for instrument in &self.config.instruments {
            match self.fetcher.fetch_quote(instrument).await {
                Ok(quote) => {
                    info!("{} initial price: {}", instrument.key(), quote.price);
                    entries.push((instrument.clone(), Some(quote.price)));
                }
                Err(e) => {
                    warn!("failed to probe initial price for {}: {e}", instrument.key());
                    entries.push((instrument.clone(), None));
                }
            }
        }
        entries
    }

    async fn run_cycle(&mut self) -> Result<usize> {
        let quotes = self.fetcher.fetch_all(&self.config.instruments).await?;

        let mut appended = 0;
        for quote in quotes {
            let key = quote.instrument.key();
            let now = Utc::now();

            if let Err(e) = self.history.append(&key, quote.price, now) {
                warn!("{e}");
                continue;
            }
            appended += 1;

            if let Err(e) = save_history(&self.history, &self.config.state_file) {
                warn!("{e}");
            }

            let changes = self.history.changes(&key, &self.windows);
            self.evaluate_alerts(&quote.instrument, &changes).await;
        }

        Ok(appended)
    }

    async fn evaluate_alerts(
        &mut self,
        instrument: &Instrument,
        changes: &BTreeMap<u32, ChangeResult>,
    ) {
        let key = instrument.key();

        for (window, change) in changes {
            let Some(&threshold) = self.config.windows.get(window) else {
                continue;
            };

            match evaluate_change(change, threshold, self.config.sanity_ceiling_percent) {
                AlertVerdict::BelowThreshold => {}
                AlertVerdict::InsufficientHistory => {
                    debug!("{key}: not enough history for the {window} minute window");
                }
                AlertVerdict::Implausible => {
                    warn!(
                        "{key}: implausible {:.2}% move over {window} minutes, ignoring",
                        change.change_percent.abs()
                    );
                }
                AlertVerdict::Fire => {
                    let now = Utc::now();
                    if !self.cooldowns.ready(&key, *window, now) {
                        debug!("{key}: {window} minute window still cooling down");
                        continue;
                    }

                    // Cooldown is recorded at the attempt, not on delivery.
                    self.cooldowns.record(&key, *window, now);

                    info!(
                        "ALERT: {key} moved {:.2}% over {window} minutes",
                        change.change_percent
                    );
                    let text = alert_message(instrument, change, threshold, now);
                    if let Err(e) = self.notifier.send(&text).await {
                        error!("{e}");
                    }
                }
            }
        }
    }
}
