use crate::config::ConfigError;

/// The named numeric knobs the synchronization core reads from the
/// preference collaborator. All values are in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SyncOption {
    /// Interval between latency probes to a connected peer
    LatencyUpdatePeriod,
    /// Floor for a peer's safety margin
    SafetyLatencyMargin,
    /// Length of the accelerated resync window after a reconnect
    OfflineClockSyncDuration,
}

impl SyncOption {
    pub const ALL: [SyncOption; 3] = [
        SyncOption::LatencyUpdatePeriod,
        SyncOption::SafetyLatencyMargin,
        SyncOption::OfflineClockSyncDuration,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            SyncOption::LatencyUpdatePeriod => "latencyUpdatePeriod",
            SyncOption::SafetyLatencyMargin => "safetyLatencyMargin",
            SyncOption::OfflineClockSyncDuration => "offlineClockSyncDuration",
        }
    }

    pub fn default_value(&self) -> f64 {
        match self {
            SyncOption::LatencyUpdatePeriod => 10.0,
            SyncOption::SafetyLatencyMargin => 0.05,
            SyncOption::OfflineClockSyncDuration => 5.0,
        }
    }

    pub fn from_key(key: &str) -> Result<Self, ConfigError> {
        Self::ALL
            .iter()
            .copied()
            .find(|option| option.key() == key)
            .ok_or_else(|| ConfigError::UnknownOption {
                key: key.to_string(),
            })
    }

    /// Check a raw value before it is stored.
    pub fn validate(&self, value: f64) -> Result<f64, ConfigError> {
        if !value.is_finite() {
            return Err(self.invalid(value, "must be finite"));
        }
        if value < 0.0 {
            return Err(self.invalid(value, "must not be negative"));
        }
        if *self == SyncOption::LatencyUpdatePeriod && value == 0.0 {
            return Err(self.invalid(value, "probe period must be positive"));
        }
        Ok(value)
    }

    fn invalid(&self, value: f64, reason: &'static str) -> ConfigError {
        ConfigError::InvalidValue {
            key: self.key(),
            value,
            reason,
        }
    }
}
