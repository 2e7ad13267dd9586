use std::time::Instant;

use crate::{backends::Clock, GameInstant};

/// Monotonic clock whose epoch is the moment it was created.
///
/// ```
/// use kinesync_shared::{Clock, GameInstant, SystemClock};
///
/// let clock = SystemClock::new();
/// assert!(clock.now() >= GameInstant::EPOCH);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> GameInstant {
        let elapsed = self.epoch.elapsed();
        GameInstant::from_micros(i64::try_from(elapsed.as_micros()).unwrap_or(i64::MAX))
    }
}
