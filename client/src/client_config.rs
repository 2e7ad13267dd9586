use std::default::Default;

use kinesync_shared::{ReconciliationConfig, SyncConfig};

/// Contains Config properties which will be used by a [`SyncClient`](crate::SyncClient)
#[derive(Clone, Debug, Default)]
pub struct ClientConfig {
    /// Probe cadence, clock smoothing and resync behaviour
    pub sync: SyncConfig,
    /// Thresholds for accepting, blending or snapping to authoritative state
    pub reconciliation: ReconciliationConfig,
}
