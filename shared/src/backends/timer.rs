use std::time::Duration;

use crate::GameInstant;

/// A recurring deadline. Rings once `duration` has elapsed since the last
/// reset.
#[derive(Clone, Debug)]
pub struct Timer {
    duration: Duration,
    last: Option<GameInstant>,
}

impl Timer {
    /// Create a timer that rings immediately on its first check.
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            last: None,
        }
    }

    /// Create a timer that first rings `duration` after `now`.
    pub fn started_at(duration: Duration, now: &GameInstant) -> Self {
        Self {
            duration,
            last: Some(*now),
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Change the period without losing the last reset point.
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration = duration;
    }

    pub fn reset(&mut self, now: &GameInstant) {
        self.last = Some(*now);
    }

    /// Forget the last reset so the timer rings on the next check.
    pub fn expire(&mut self) {
        self.last = None;
    }

    pub fn ringing(&self, now: &GameInstant) -> bool {
        match &self.last {
            None => true,
            Some(last) => now.elapsed_since(last) >= self.duration,
        }
    }
}
