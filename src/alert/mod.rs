use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::history::ChangeResult;

/// Outcome of weighing one window change against its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertVerdict {
    /// Threshold breached and the move is plausible.
    Fire,
    BelowThreshold,
    /// Magnitude beyond the sanity ceiling, almost certainly a bad tick.
    Implausible,
    InsufficientHistory,
}

/// Pure decision step: cooldown handling stays with [`CooldownTracker`].
pub fn evaluate_change(change: &ChangeResult, threshold: f64, sanity_ceiling: f64) -> AlertVerdict {
    let Some(start_price) = change.start_price else {
        return AlertVerdict::InsufficientHistory;
    };
    if start_price <= 0.0 || change.current_price <= 0.0 {
        return AlertVerdict::InsufficientHistory;
    }

    let magnitude = change.change_percent.abs();
    if magnitude > sanity_ceiling {
        return AlertVerdict::Implausible;
    }
    if magnitude < threshold {
        return AlertVerdict::BelowThreshold;
    }

    AlertVerdict::Fire
}

/// Tracks the last alert instant per (instrument, window) pair.
#[derive(Debug)]
pub struct CooldownTracker {
    cooldown: Duration,
    last_fired: HashMap<(String, u32), DateTime<Utc>>,
}

impl CooldownTracker {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_fired: HashMap::new(),
        }
    }

    /// Whether the pair is out of its cooldown at `now`.
    pub fn ready(&self, key: &str, window: u32, now: DateTime<Utc>) -> bool {
        match self.last_fired.get(&(key.to_string(), window)) {
            Some(last) => now.signed_duration_since(*last) > self.cooldown,
            None => true,
        }
    }

    /// Record an alert attempt; the pair stays quiet until the cooldown lapses.
    pub fn record(&mut self, key: &str, window: u32, now: DateTime<Utc>) {
        self.last_fired.insert((key.to_string(), window), now);
    }
}
