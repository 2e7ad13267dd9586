use std::{default::Default, time::Duration};

/// Thresholds used when deciding how to reconcile a prediction with an
/// authoritative snapshot. Distances are in world units.
#[derive(Clone, Debug, PartialEq)]
pub struct ReconciliationConfig {
    /// Deltas at or below this are accepted without a visible correction
    pub snap_tolerance: f32,
    /// Deltas above this skip blending and snap immediately
    pub snap_ceiling: f32,
    /// Blend window length as a multiple of the peer's current margin
    pub blend_window_scale: f32,
    /// Lower bound on the blend window, so a blend is never shorter than
    /// about one displayed frame even with a zero margin
    pub min_blend_window: Duration,
    /// Upper bound on the blend window
    pub max_blend_window: Duration,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            snap_tolerance: 0.1,
            snap_ceiling: 5.0,
            blend_window_scale: 1.0,
            min_blend_window: Duration::from_millis(16),
            max_blend_window: Duration::from_secs(1),
        }
    }
}
