use std::{default::Default, time::Duration};

/// Contains Config properties which will be used by the Server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// How often a snapshot of every authoritative entity is published
    pub snapshot_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            snapshot_interval: Duration::from_millis(50),
        }
    }
}
