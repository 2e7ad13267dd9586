use std::time::Duration;

use kinesync_shared::{MotionState, ReconciliationConfig};

/// What to do with an authoritative state that disagrees with the
/// prediction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Correction {
    /// Close enough: adopt it without any visible correction
    Accept { distance: f32 },
    /// Blend the displayed state toward it over `window`
    Blend { distance: f32, window: Duration },
    /// Too far to blend (teleport, respawn): jump to it this tick
    Snap { distance: f32 },
}

impl Correction {
    pub fn distance(&self) -> f32 {
        match self {
            Correction::Accept { distance }
            | Correction::Blend { distance, .. }
            | Correction::Snap { distance } => *distance,
        }
    }
}

/// Pure decision function mapping (prediction, target, peer margin) to a
/// [`Correction`].
#[derive(Clone, Debug, Default)]
pub struct ReconciliationPolicy {
    config: ReconciliationConfig,
}

impl ReconciliationPolicy {
    pub fn new(config: ReconciliationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReconciliationConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ReconciliationConfig) {
        self.config = config;
    }

    pub fn tolerance(&self) -> f32 {
        self.config.snap_tolerance
    }

    pub fn ceiling(&self) -> f32 {
        self.config.snap_ceiling
    }

    /// A noisier peer (larger margin) gets a longer, gentler blend. Never
    /// shorter than the configured minimum, so a blend cannot collapse into a
    /// single-tick jump.
    pub fn blend_window(&self, margin: Duration) -> Duration {
        let scaled = margin.as_secs_f64() * f64::from(self.config.blend_window_scale.max(0.0));
        let scaled = Duration::from_micros((scaled * 1_000_000.0).round() as u64);
        scaled
            .min(self.config.max_blend_window)
            .max(self.config.min_blend_window)
    }

    pub fn decide(
        &self,
        predicted: &MotionState,
        target: &MotionState,
        margin: Duration,
    ) -> Correction {
        let distance = predicted.distance_to(target);
        if distance > self.config.snap_ceiling {
            Correction::Snap { distance }
        } else if distance <= self.config.snap_tolerance {
            Correction::Accept { distance }
        } else {
            Correction::Blend {
                distance,
                window: self.blend_window(margin),
            }
        }
    }
}
