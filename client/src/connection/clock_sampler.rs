use std::{collections::VecDeque, time::Duration};

use log::{debug, warn};

use kinesync_shared::{
    ClockOffset, GameInstant, PeerId, ProbeReply, ProbeRequest, SyncConfig, SyncError, Timer,
};

/// One completed probe: when it left, when its reply came back, and what the
/// remote clock read when it answered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockSample {
    pub peer_id: PeerId,
    pub send_time: GameInstant,
    pub receive_time: GameInstant,
    pub remote_time: GameInstant,
}

impl ClockSample {
    pub fn round_trip_time(&self) -> Duration {
        self.receive_time.elapsed_since(&self.send_time)
    }

    /// Local instant halfway between send and receive, the best guess for
    /// when the remote host read its clock.
    pub fn local_midpoint(&self) -> GameInstant {
        self.send_time.add_duration(&(self.round_trip_time() / 2))
    }

    /// `remote - local` as observed by this sample alone.
    pub fn offset(&self) -> ClockOffset {
        self.local_midpoint().offset_from(&self.remote_time)
    }
}

/// Issues latency probes to one peer on a fixed period and matches their
/// replies, producing [`ClockSample`]s.
pub struct ClockSampler {
    peer_id: PeerId,
    timer: Timer,
    timeout: Duration,
    in_flight: VecDeque<GameInstant>,
    active: bool,
    accelerated: bool,
    consecutive_timeouts: u32,
}

impl ClockSampler {
    pub fn new(peer_id: PeerId, config: &SyncConfig) -> Self {
        Self {
            peer_id,
            timer: Timer::new(config.probe_period(false)),
            timeout: config.probe_timeout(false),
            in_flight: VecDeque::new(),
            active: false,
            accelerated: false,
            consecutive_timeouts: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_accelerated(&self) -> bool {
        self.accelerated
    }

    pub fn period(&self) -> Duration {
        self.timer.duration()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn consecutive_timeouts(&self) -> u32 {
        self.consecutive_timeouts
    }

    /// Begin probing. The first probe goes out on the next poll.
    pub fn start(&mut self, config: &SyncConfig, accelerated: bool) {
        self.active = true;
        self.consecutive_timeouts = 0;
        self.set_accelerated(config, accelerated);
        self.timer.expire();
    }

    /// Stop probing and discard every in-flight probe. Replies that arrive
    /// later no longer match anything.
    pub fn stop(&mut self) {
        if !self.in_flight.is_empty() {
            debug!(
                "discarding {} in-flight probe(s) to {}",
                self.in_flight.len(),
                self.peer_id
            );
        }
        self.active = false;
        self.in_flight.clear();
        self.consecutive_timeouts = 0;
    }

    pub fn set_accelerated(&mut self, config: &SyncConfig, accelerated: bool) {
        self.accelerated = accelerated;
        self.reconfigure(config);
    }

    pub fn reconfigure(&mut self, config: &SyncConfig) {
        self.timer.set_duration(config.probe_period(self.accelerated));
        self.timeout = config.probe_timeout(self.accelerated);
    }

    /// Returns a probe to send if the period has elapsed.
    pub fn poll_probe(&mut self, now: &GameInstant) -> Option<ProbeRequest> {
        if !self.active || !self.timer.ringing(now) {
            return None;
        }
        self.timer.reset(now);
        self.in_flight.push_back(*now);
        Some(ProbeRequest::new(self.peer_id, *now))
    }

    /// Match a reply against the in-flight probes and turn it into a sample.
    pub fn receive_reply(
        &mut self,
        reply: &ProbeReply,
        now: &GameInstant,
    ) -> Result<ClockSample, SyncError> {
        let sent_at = reply.original_send_timestamp;
        let Some(index) = self.in_flight.iter().position(|sent| *sent == sent_at) else {
            return Err(SyncError::UnsolicitedProbeReply {
                peer: self.peer_id,
                sent_at,
            });
        };
        self.in_flight.remove(index);
        self.consecutive_timeouts = 0;

        Ok(ClockSample {
            peer_id: self.peer_id,
            send_time: sent_at,
            receive_time: *now,
            remote_time: reply.remote_timestamp_at_reply,
        })
    }

    /// Expire probes that have waited longer than the timeout.
    pub fn check_timeouts(&mut self, now: &GameInstant) -> Vec<SyncError> {
        let mut expired = Vec::new();
        while let Some(sent_at) = self.in_flight.front().copied() {
            if now.elapsed_since(&sent_at) < self.timeout {
                break;
            }
            self.in_flight.pop_front();
            self.consecutive_timeouts += 1;
            warn!(
                "probe to {} sent at {} timed out ({} in a row)",
                self.peer_id, sent_at, self.consecutive_timeouts
            );
            expired.push(SyncError::ProbeTimeout {
                peer: self.peer_id,
                sent_at,
                timeout: self.timeout,
            });
        }
        expired
    }
}
