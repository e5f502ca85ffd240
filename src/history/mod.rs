use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

pub mod persistence;

pub use persistence::{load_history, save_history};

/// One observed price for an instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

/// Percentage change over one look-back window.
///
/// `start_price` is `None` when the series holds no usable sample inside the
/// window; `change_percent` is then reported as 0.0 rather than an error.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeResult {
    pub window_minutes: u32,
    pub start_price: Option<f64>,
    pub current_price: f64,
    pub change_percent: f64,
}

/// Rolling per-instrument price series bounded by a retention horizon.
#[derive(Debug)]
pub struct PriceHistory {
    series: HashMap<String, Vec<Sample>>,
    retention: Duration,
}

impl PriceHistory {
    pub fn new(retention_hours: u32) -> Self {
        Self::from_series(HashMap::new(), retention_hours)
    }

    pub fn from_series(series: HashMap<String, Vec<Sample>>, retention_hours: u32) -> Self {
        Self {
            series,
            retention: Duration::hours(i64::from(retention_hours)),
        }
    }

    pub fn series(&self) -> &HashMap<String, Vec<Sample>> {
        &self.series
    }

    /// Record a new sample and drop everything past the retention horizon.
    pub fn append(&mut self, key: &str, price: f64, now: DateTime<Utc>) -> Result<()> {
        if !price.is_finite() || price <= 0.0 {
            return Err(AppError::InvalidPrice {
                symbol: key.to_string(),
                price,
            });
        }

        let samples = self.series.entry(key.to_string()).or_default();
        samples.push(Sample {
            timestamp: now,
            price,
        });

        let cutoff = now - self.retention;
        samples.retain(|sample| sample.timestamp >= cutoff);

        Ok(())
    }

    /// Change over each window, anchored at the latest sample for `key`.
    pub fn changes(&self, key: &str, windows: &[u32]) -> BTreeMap<u32, ChangeResult> {
        match self.series.get(key).and_then(|samples| samples.last()) {
            Some(latest) => self.changes_at(key, windows, latest.timestamp),
            None => BTreeMap::new(),
        }
    }

    /// Same as `changes`, anchored at an explicit reference instant.
    pub fn changes_at(
        &self,
        key: &str,
        windows: &[u32],
        now_reference: DateTime<Utc>,
    ) -> BTreeMap<u32, ChangeResult> {
        let Some(samples) = self.series.get(key) else {
            return BTreeMap::new();
        };
        let Some(current) = samples.last().map(|sample| sample.price) else {
            return BTreeMap::new();
        };

        let mut results = BTreeMap::new();
        for &window in windows {
            let cutoff = now_reference - Duration::minutes(i64::from(window));

            // The earliest sample inside the window anchors the change; a
            // non-positive price can never serve as the anchor.
            let start = samples
                .iter()
                .find(|sample| sample.timestamp >= cutoff && sample.price > 0.0)
                .map(|sample| sample.price);

            let change_percent = match start {
                Some(start_price) => round_percent(((current - start_price) / start_price) * 100.0),
                None => 0.0,
            };

            results.insert(
                window,
                ChangeResult {
                    window_minutes: window,
                    start_price: start,
                    current_price: current,
                    change_percent,
                },
            );
        }

        results
    }
}

fn round_percent(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
