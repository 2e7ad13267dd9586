use std::{
    fmt,
    ops::{Add, Neg, Sub},
    time::Duration,
};

const MICROS_PER_SEC: f64 = 1_000_000.0;

/// A point in time on one host's local clock, in microseconds since that
/// clock's session epoch.
///
/// Unlike a wall clock reading this is only meaningful relative to other
/// instants produced by the same [`Clock`](crate::Clock). Translating an
/// instant reported by a remote host onto the local timeline requires a
/// [`ClockOffset`] estimate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GameInstant {
    micros: i64,
}

impl GameInstant {
    pub const EPOCH: Self = Self { micros: 0 };

    pub fn from_micros(micros: i64) -> Self {
        Self { micros }
    }

    pub fn from_millis(millis: i64) -> Self {
        Self {
            micros: millis.saturating_mul(1000),
        }
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        Self {
            micros: (secs * MICROS_PER_SEC).round() as i64,
        }
    }

    pub fn as_micros(&self) -> i64 {
        self.micros
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.micros as f64 / MICROS_PER_SEC
    }

    pub fn add_duration(&self, duration: &Duration) -> Self {
        Self {
            micros: self.micros.saturating_add(duration_to_micros(duration)),
        }
    }

    pub fn sub_duration(&self, duration: &Duration) -> Self {
        Self {
            micros: self.micros.saturating_sub(duration_to_micros(duration)),
        }
    }

    /// Signed distance from `self` to `other`: positive when `other` is later.
    pub fn offset_from(&self, other: &GameInstant) -> ClockOffset {
        ClockOffset::from_micros(other.micros.saturating_sub(self.micros))
    }

    /// Time elapsed since `earlier`, or zero if `earlier` is actually later.
    pub fn elapsed_since(&self, earlier: &GameInstant) -> Duration {
        let diff = self.micros.saturating_sub(earlier.micros);
        if diff <= 0 {
            Duration::ZERO
        } else {
            Duration::from_micros(diff as u64)
        }
    }

    pub fn is_more_than(&self, other: &GameInstant) -> bool {
        self.micros > other.micros
    }

    pub fn shifted(&self, offset: ClockOffset) -> Self {
        Self {
            micros: self.micros.saturating_add(offset.as_micros()),
        }
    }
}

impl fmt::Display for GameInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}s", self.as_secs_f64())
    }
}

/// Signed time difference between two clocks (or two instants), in
/// microseconds. For peer clocks this is `remote - local`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ClockOffset {
    micros: i64,
}

impl ClockOffset {
    pub const ZERO: Self = Self { micros: 0 };

    pub fn from_micros(micros: i64) -> Self {
        Self { micros }
    }

    pub fn from_millis(millis: i64) -> Self {
        Self {
            micros: millis.saturating_mul(1000),
        }
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        Self {
            micros: (secs * MICROS_PER_SEC).round() as i64,
        }
    }

    pub fn as_micros(&self) -> i64 {
        self.micros
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.micros as f64 / MICROS_PER_SEC
    }

    /// Magnitude of the offset as an unsigned duration.
    pub fn abs_duration(&self) -> Duration {
        Duration::from_micros(self.micros.unsigned_abs())
    }
}

impl Neg for ClockOffset {
    type Output = ClockOffset;

    fn neg(self) -> Self::Output {
        ClockOffset::from_micros(self.micros.saturating_neg())
    }
}

impl Add<ClockOffset> for GameInstant {
    type Output = GameInstant;

    fn add(self, rhs: ClockOffset) -> Self::Output {
        self.shifted(rhs)
    }
}

impl Sub<ClockOffset> for GameInstant {
    type Output = GameInstant;

    fn sub(self, rhs: ClockOffset) -> Self::Output {
        self.shifted(-rhs)
    }
}

impl fmt::Display for ClockOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+.3}ms", self.micros as f64 / 1000.0)
    }
}

fn duration_to_micros(duration: &Duration) -> i64 {
    i64::try_from(duration.as_micros()).unwrap_or(i64::MAX)
}
