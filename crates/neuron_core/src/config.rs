//! Engine timing configuration.
//!
//! # Responsibility
//! - Hold the scheduler tick resolution, notification poll cadence and
//!   snooze delay as data rather than constants baked into logic.
//! - Allow per-process overrides through environment variables.
//!
//! # Invariants
//! - Durations are never zero; zero inputs are clamped to `MIN_RESOLUTION`.
//! - Invalid environment values fall back to defaults and never fail startup.

use log::warn;
use std::time::Duration;

pub const DEFAULT_TICK_RESOLUTION: Duration = Duration::from_secs(1);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);
pub const DEFAULT_SNOOZE_DELAY: Duration = Duration::from_secs(10);

const MIN_RESOLUTION: Duration = Duration::from_millis(1);

pub const TICK_MS_ENV: &str = "NEURON_TICK_MS";
pub const POLL_MS_ENV: &str = "NEURON_POLL_MS";
pub const SNOOZE_SECS_ENV: &str = "NEURON_SNOOZE_SECS";

/// Timing knobs shared by the engine and its background runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Period of the background fire-dispatch loop.
    pub tick_resolution: Duration,
    /// Suggested cadence for presentation-layer notification polling.
    pub poll_interval: Duration,
    /// Offset applied to `fired_at` when a notification is snoozed.
    pub snooze_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_resolution: DEFAULT_TICK_RESOLUTION,
            poll_interval: DEFAULT_POLL_INTERVAL,
            snooze_delay: DEFAULT_SNOOZE_DELAY,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds defaults overridden by `NEURON_TICK_MS`, `NEURON_POLL_MS` and
    /// `NEURON_SNOOZE_SECS` when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(ms) = read_u64(&lookup, TICK_MS_ENV) {
            config = config.with_tick_resolution(Duration::from_millis(ms));
        }
        if let Some(ms) = read_u64(&lookup, POLL_MS_ENV) {
            config = config.with_poll_interval(Duration::from_millis(ms));
        }
        if let Some(secs) = read_u64(&lookup, SNOOZE_SECS_ENV) {
            config = config.with_snooze_delay(Duration::from_secs(secs));
        }
        config
    }

    pub fn with_tick_resolution(mut self, value: Duration) -> Self {
        self.tick_resolution = value.max(MIN_RESOLUTION);
        self
    }

    pub fn with_poll_interval(mut self, value: Duration) -> Self {
        self.poll_interval = value.max(MIN_RESOLUTION);
        self
    }

    pub fn with_snooze_delay(mut self, value: Duration) -> Self {
        self.snooze_delay = value.max(MIN_RESOLUTION);
        self
    }

    /// Snooze delay as a calendar offset.
    pub fn snooze_delta(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::from_std(self.snooze_delay).unwrap_or_else(|_| {
            chrono::TimeDelta::seconds(DEFAULT_SNOOZE_DELAY.as_secs() as i64)
        })
    }
}

fn read_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Some(value),
        _ => {
            warn!("event=config_invalid module=config status=skipped key={key} value={raw}");
            None
        }
    }
}
