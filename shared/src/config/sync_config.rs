use std::{default::Default, time::Duration};

use log::debug;

use crate::config::{ConfigError, ConfigSource, SyncOption};

/// Contains Config properties which drive latency sampling, clock
/// estimation and resync after reconnect.
///
/// Built once per session (see [`SyncConfig::resolve`]) and then changed only
/// through [`SyncConfig::set`], after which the owner pushes the new value to
/// every dependent.
#[derive(Clone, Debug, PartialEq)]
pub struct SyncConfig {
    /// Interval between latency probes while a peer is connected
    pub latency_update_period: Duration,
    /// Minimum safety margin, regardless of how good the link looks
    pub safety_latency_margin: Duration,
    /// How long a reconnected peer is probed at the accelerated rate
    pub offline_clock_sync_duration: Duration,
    /// Number of probe periods to wait for a reply before it times out
    pub probe_timeout_periods: u32,
    /// Consecutive probe timeouts after which a connected peer goes Offline
    pub offline_after_missed_probes: u32,
    /// Weight given to each new sample in the smoothed estimates
    pub smoothing_factor: f64,
    /// Interval between probes while resyncing
    pub resync_probe_interval: Duration,
    /// Consecutive samples whose offsets must agree before resync ends early
    pub stable_sample_count: usize,
    /// Maximum offset variance (seconds squared) considered stable
    pub stable_offset_variance: f64,
    /// Margin multiplier applied while a resync window expired unstabilized
    pub resync_margin_widening: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            latency_update_period: secs(SyncOption::LatencyUpdatePeriod.default_value()),
            safety_latency_margin: secs(SyncOption::SafetyLatencyMargin.default_value()),
            offline_clock_sync_duration: secs(
                SyncOption::OfflineClockSyncDuration.default_value(),
            ),
            probe_timeout_periods: 3,
            offline_after_missed_probes: 3,
            smoothing_factor: 0.1,
            resync_probe_interval: Duration::from_millis(250),
            stable_sample_count: 3,
            stable_offset_variance: 1.0e-6,
            resync_margin_widening: 2.0,
        }
    }
}

impl SyncConfig {
    /// Resolve every named option from the preference store, falling back to
    /// the option's default when the store has no value.
    pub fn resolve(source: &dyn ConfigSource) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for option in SyncOption::ALL {
            if let Some(value) = source.get_float(option.key()) {
                config.set(option, value)?;
            }
        }
        debug!("resolved sync config: {:?}", config);
        Ok(config)
    }

    pub fn get(&self, option: SyncOption) -> f64 {
        match option {
            SyncOption::LatencyUpdatePeriod => self.latency_update_period.as_secs_f64(),
            SyncOption::SafetyLatencyMargin => self.safety_latency_margin.as_secs_f64(),
            SyncOption::OfflineClockSyncDuration => {
                self.offline_clock_sync_duration.as_secs_f64()
            }
        }
    }

    pub fn set(&mut self, option: SyncOption, value: f64) -> Result<(), ConfigError> {
        let value = secs(option.validate(value)?);
        match option {
            SyncOption::LatencyUpdatePeriod => self.latency_update_period = value,
            SyncOption::SafetyLatencyMargin => self.safety_latency_margin = value,
            SyncOption::OfflineClockSyncDuration => self.offline_clock_sync_duration = value,
        }
        Ok(())
    }

    /// Set an option by its string key.
    pub fn set_by_key(&mut self, key: &str, value: f64) -> Result<(), ConfigError> {
        self.set(SyncOption::from_key(key)?, value)
    }

    pub fn probe_period(&self, accelerated: bool) -> Duration {
        if accelerated {
            self.resync_probe_interval.min(self.latency_update_period)
        } else {
            self.latency_update_period
        }
    }

    pub fn probe_timeout(&self, accelerated: bool) -> Duration {
        self.probe_period(accelerated) * self.probe_timeout_periods.max(1)
    }
}

fn secs(value: f64) -> Duration {
    Duration::from_micros((value * 1_000_000.0).round() as u64)
}
