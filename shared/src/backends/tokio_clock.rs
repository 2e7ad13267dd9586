use tokio::time::Instant;

use crate::{backends::Clock, GameInstant};

/// Clock backed by tokio's time source, so paused test runtimes drive it.
#[derive(Clone, Copy, Debug)]
pub struct TokioClock {
    epoch: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> GameInstant {
        let elapsed = Instant::now().duration_since(self.epoch);
        GameInstant::from_micros(i64::try_from(elapsed.as_micros()).unwrap_or(i64::MAX))
    }
}
