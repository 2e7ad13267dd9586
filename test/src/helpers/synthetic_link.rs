use std::time::Duration;

use kinesync_shared::{ClockOffset, GameInstant, MovementSnapshot, ProbeReply, ProbeRequest};

/// Shape of the simulated network between one observer and one host.
#[derive(Clone, Copy, Debug)]
pub struct LinkProfile {
    /// Minimum one-way delay
    pub base_delay: Duration,
    /// Extra one-way delay, drawn uniformly from `0..=jitter` per message
    pub jitter: Duration,
    /// `host - observer` clock difference
    pub host_offset: ClockOffset,
}

impl LinkProfile {
    /// Symmetric link with no jitter and the given round trip.
    pub fn steady(round_trip: Duration, host_offset: ClockOffset) -> Self {
        Self {
            base_delay: round_trip / 2,
            jitter: Duration::ZERO,
            host_offset,
        }
    }
}

impl Default for LinkProfile {
    fn default() -> Self {
        Self::steady(Duration::from_millis(100), ClockOffset::ZERO)
    }
}

#[derive(Clone, Copy, Debug)]
pub enum Payload {
    Probe(ProbeRequest),
    Reply(ProbeReply),
    Snapshot(MovementSnapshot),
}

struct InFlight {
    deliver_at: GameInstant,
    sequence: u64,
    payload: Payload,
}

/// Deterministic in-memory link. Every message is delayed by the profile's
/// base delay plus seeded random jitter, and delivered in arrival order.
pub struct SyntheticLink {
    profile: LinkProfile,
    rng: fastrand::Rng,
    in_flight: Vec<InFlight>,
    next_sequence: u64,
    down: bool,
    dropped: u64,
}

impl SyntheticLink {
    pub fn new(profile: LinkProfile, seed: u64) -> Self {
        Self {
            profile,
            rng: fastrand::Rng::with_seed(seed),
            in_flight: Vec::new(),
            next_sequence: 0,
            down: false,
            dropped: 0,
        }
    }

    pub fn profile(&self) -> &LinkProfile {
        &self.profile
    }

    /// The host restarted its clock, or the observer moved to another host.
    pub fn set_host_offset(&mut self, host_offset: ClockOffset) {
        self.profile.host_offset = host_offset;
    }

    /// While down, everything sent is lost.
    pub fn set_down(&mut self, down: bool) {
        self.down = down;
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// The host's clock reading at observer time `local`.
    pub fn host_time(&self, local: &GameInstant) -> GameInstant {
        *local + self.profile.host_offset
    }

    pub fn send(&mut self, payload: Payload, sent_at: &GameInstant) {
        if self.down {
            self.dropped += 1;
            return;
        }
        let jitter = self.profile.jitter.as_micros() as u64;
        let extra = Duration::from_micros(self.rng.u64(0..=jitter));
        let deliver_at = sent_at.add_duration(&(self.profile.base_delay + extra));
        self.in_flight.push(InFlight {
            deliver_at,
            sequence: self.next_sequence,
            payload,
        });
        self.next_sequence += 1;
    }

    /// Earliest message due at or before `until`, with its arrival time.
    pub fn pop_due(&mut self, until: &GameInstant) -> Option<(GameInstant, Payload)> {
        let index = self
            .in_flight
            .iter()
            .enumerate()
            .filter(|(_, message)| message.deliver_at <= *until)
            .min_by_key(|(_, message)| (message.deliver_at, message.sequence))
            .map(|(index, _)| index)?;
        let message = self.in_flight.swap_remove(index);
        Some((message.deliver_at, message.payload))
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinesync_shared::PeerId;

    #[test]
    fn delivers_in_arrival_order() {
        let mut link = SyntheticLink::new(LinkProfile::default(), 1);
        let probe = |ms| Payload::Probe(ProbeRequest::new(PeerId::new(1), GameInstant::from_millis(ms)));

        link.send(probe(20), &GameInstant::from_millis(20));
        link.send(probe(0), &GameInstant::from_millis(0));

        assert!(link.pop_due(&GameInstant::from_millis(49)).is_none());
        let (at, _) = link.pop_due(&GameInstant::from_millis(100)).unwrap();
        assert_eq!(at, GameInstant::from_millis(50));
        let (at, _) = link.pop_due(&GameInstant::from_millis(100)).unwrap();
        assert_eq!(at, GameInstant::from_millis(70));
    }

    #[test]
    fn jitter_stays_within_profile() {
        let profile = LinkProfile {
            base_delay: Duration::from_millis(10),
            jitter: Duration::from_millis(5),
            host_offset: ClockOffset::ZERO,
        };
        let mut link = SyntheticLink::new(profile, 42);
        for _ in 0..100 {
            link.send(
                Payload::Probe(ProbeRequest::new(PeerId::new(1), GameInstant::EPOCH)),
                &GameInstant::EPOCH,
            );
        }

        while let Some((at, _)) = link.pop_due(&GameInstant::from_millis(1000)) {
            assert!(at >= GameInstant::from_millis(10));
            assert!(at <= GameInstant::from_millis(15));
        }
    }
}
