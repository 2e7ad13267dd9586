use std::{
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
    time::Duration,
};

use crate::{backends::Clock, GameInstant};

/// A clock that only moves when told to. Clones share the same reading, so a
/// test can hand one clone to the code under test and advance the other.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    micros: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(instant: GameInstant) -> Self {
        Self {
            micros: Arc::new(AtomicI64::new(instant.as_micros())),
        }
    }

    pub fn set(&self, instant: GameInstant) {
        self.micros.store(instant.as_micros(), Ordering::SeqCst);
    }

    pub fn advance(&self, duration: Duration) -> GameInstant {
        let step = i64::try_from(duration.as_micros()).unwrap_or(i64::MAX);
        let previous = self.micros.fetch_add(step, Ordering::SeqCst);
        GameInstant::from_micros(previous.saturating_add(step))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> GameInstant {
        GameInstant::from_micros(self.micros.load(Ordering::SeqCst))
    }
}
