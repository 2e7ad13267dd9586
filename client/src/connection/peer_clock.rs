use std::{collections::VecDeque, time::Duration};

use log::debug;

use kinesync_shared::{ClockOffset, GameInstant, SyncConfig};

use crate::connection::clock_sampler::ClockSample;

// Enough to cover a full resync window at the accelerated rate.
const REPLACEMENT_WINDOW_CAPACITY: usize = 64;
const RECENT_OFFSET_CAPACITY: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Estimate {
    rtt: f64,
    jitter: f64,
    offset: f64,
}

enum EstimateMode {
    /// Exponentially weighted average, resistant to single-sample spikes
    Smoothing,
    /// Prior state is known-invalid: the estimate is the plain mean of the
    /// samples received since replacement began
    Replacing { samples: VecDeque<(f64, f64)> },
}

/// Running estimate of round-trip time, jitter and clock offset for one peer.
pub struct PeerClock {
    smoothing_factor: f64,
    margin_floor: Duration,
    widening: f64,
    widened: bool,
    estimate: Option<Estimate>,
    mode: EstimateMode,
    recent_offsets: VecDeque<f64>,
    sample_count: u64,
}

impl PeerClock {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            smoothing_factor: config.smoothing_factor.clamp(0.0, 1.0),
            margin_floor: config.safety_latency_margin,
            widening: config.resync_margin_widening.max(1.0),
            widened: false,
            estimate: None,
            mode: EstimateMode::Smoothing,
            recent_offsets: VecDeque::new(),
            sample_count: 0,
        }
    }

    pub fn reconfigure(&mut self, config: &SyncConfig) {
        self.smoothing_factor = config.smoothing_factor.clamp(0.0, 1.0);
        self.margin_floor = config.safety_latency_margin;
        self.widening = config.resync_margin_widening.max(1.0);
    }

    pub fn has_estimate(&self) -> bool {
        self.estimate.is_some()
    }

    pub fn is_replacing(&self) -> bool {
        matches!(self.mode, EstimateMode::Replacing { .. })
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// Fold a new sample into the estimate.
    pub fn update(&mut self, sample: &ClockSample) {
        let rtt = sample.round_trip_time().as_secs_f64();
        let offset = sample.offset().as_secs_f64();

        self.sample_count += 1;
        self.recent_offsets.push_back(offset);
        if self.recent_offsets.len() > RECENT_OFFSET_CAPACITY {
            self.recent_offsets.pop_front();
        }

        let next = match &mut self.mode {
            EstimateMode::Replacing { samples } => {
                samples.push_back((rtt, offset));
                if samples.len() > REPLACEMENT_WINDOW_CAPACITY {
                    samples.pop_front();
                }
                window_estimate(samples)
            }
            EstimateMode::Smoothing => match self.estimate {
                None => Estimate {
                    rtt,
                    jitter: 0.0,
                    offset,
                },
                Some(current) => {
                    let weight = self.smoothing_factor;
                    let new_jitter = ((rtt - current.rtt) / 2.0).abs();
                    Estimate {
                        jitter: (1.0 - weight) * current.jitter + weight * new_jitter,
                        rtt: (1.0 - weight) * current.rtt + weight * rtt,
                        offset: (1.0 - weight) * current.offset + weight * offset,
                    }
                }
            },
        };

        debug!(
            "{}: sample rtt {:.3}ms offset {:.3}ms -> estimate rtt {:.3}ms jitter {:.3}ms offset {:.3}ms",
            sample.peer_id,
            rtt * 1000.0,
            offset * 1000.0,
            next.rtt * 1000.0,
            next.jitter * 1000.0,
            next.offset * 1000.0
        );
        self.estimate = Some(next);
    }

    /// Throw away every estimate. Used when the current state is presumed stale.
    pub fn reset(&mut self) {
        self.estimate = None;
        self.mode = EstimateMode::Smoothing;
        self.recent_offsets.clear();
        self.widened = false;
    }

    /// Discard the current estimate and rebuild it only from samples received
    /// from now on.
    pub fn begin_replacing(&mut self) {
        self.reset();
        self.mode = EstimateMode::Replacing {
            samples: VecDeque::new(),
        };
    }

    /// Keep the replacement estimate and resume normal smoothing from it.
    pub fn finish_replacing(&mut self) {
        self.mode = EstimateMode::Smoothing;
        self.widened = false;
    }

    pub fn set_widened(&mut self, widened: bool) {
        self.widened = widened;
    }

    pub fn is_widened(&self) -> bool {
        self.widened
    }

    pub fn rtt(&self) -> Duration {
        self.estimate
            .map(|estimate| secs(estimate.rtt))
            .unwrap_or(Duration::ZERO)
    }

    pub fn jitter(&self) -> Duration {
        self.estimate
            .map(|estimate| secs(estimate.jitter))
            .unwrap_or(Duration::ZERO)
    }

    pub fn offset(&self) -> ClockOffset {
        self.estimate
            .map(|estimate| ClockOffset::from_secs_f64(estimate.offset))
            .unwrap_or(ClockOffset::ZERO)
    }

    /// How far into the past a snapshot must be before it is trusted: the
    /// greatest of the configured floor, half the round trip and the jitter.
    pub fn current_margin(&self) -> Duration {
        let margin = self.margin_floor.max(self.rtt() / 2).max(self.jitter());
        if self.widened {
            secs(margin.as_secs_f64() * self.widening)
        } else {
            margin
        }
    }

    /// Map an instant read from the peer's clock onto the local timeline.
    pub fn translate(&self, remote: &GameInstant) -> GameInstant {
        *remote - self.offset()
    }

    /// Whether the last `count` offset observations agree to within
    /// `max_variance` (seconds squared).
    pub fn is_stable(&self, count: usize, max_variance: f64) -> bool {
        let count = count.max(1);
        if self.recent_offsets.len() < count {
            return false;
        }
        let recent = self
            .recent_offsets
            .iter()
            .skip(self.recent_offsets.len() - count);
        variance(recent.copied(), count) <= max_variance
    }
}

fn window_estimate(samples: &VecDeque<(f64, f64)>) -> Estimate {
    let count = samples.len().max(1) as f64;
    let rtt = samples.iter().map(|(rtt, _)| rtt).sum::<f64>() / count;
    let offset = samples.iter().map(|(_, offset)| offset).sum::<f64>() / count;
    let jitter = samples
        .iter()
        .map(|(sample_rtt, _)| ((sample_rtt - rtt) / 2.0).abs())
        .sum::<f64>()
        / count;
    Estimate {
        rtt,
        jitter,
        offset,
    }
}

fn variance(values: impl Iterator<Item = f64> + Clone, count: usize) -> f64 {
    let count = count as f64;
    let mean = values.clone().sum::<f64>() / count;
    values.map(|value| (value - mean).powi(2)).sum::<f64>() / count
}

fn secs(value: f64) -> Duration {
    Duration::from_micros((value.max(0.0) * 1_000_000.0).round() as u64)
}
