use std::{fmt, time::Duration};

use log::{debug, info, warn};

use kinesync_shared::{
    ClockOffset, GameInstant, PeerId, ProbeReply, ProbeRequest, SyncConfig, SyncError,
};

use crate::{
    connection::{
        clock_sampler::ClockSampler, peer_clock::PeerClock,
        resync_coordinator::ResyncCoordinator,
    },
    events::{SyncEvent, SyncEvents},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Connected,
    Resyncing,
    Offline,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Connected => "Connected",
            ConnectionState::Resyncing => "Resyncing",
            ConnectionState::Offline => "Offline",
        };
        f.write_str(name)
    }
}

/// Immutable copy of a peer's clock and connection state, handed to readers
/// that must not touch the peer itself.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PeerStatus {
    pub peer_id: PeerId,
    pub state: ConnectionState,
    pub rtt: Duration,
    pub jitter: Duration,
    pub offset: ClockOffset,
    pub margin: Duration,
    pub margin_widened: bool,
    pub has_estimate: bool,
}

impl PeerStatus {
    /// Map an instant read from the peer's clock onto the local timeline.
    pub fn translate(&self, remote: &GameInstant) -> GameInstant {
        *remote - self.offset
    }
}

/// Bookkeeping for an accelerated resync window.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct ResyncWindow {
    pub(crate) started: Option<GameInstant>,
    pub(crate) expired: bool,
}

/// Everything the core tracks about one remote participant. Owned by exactly
/// one driver (the [`PeerArena`](crate::PeerArena) or a peer task).
pub struct Peer {
    id: PeerId,
    pub(crate) state: ConnectionState,
    pub(crate) clock: PeerClock,
    pub(crate) sampler: ClockSampler,
    pub(crate) resync: ResyncWindow,
    offline_after_missed_probes: u32,
}

impl Peer {
    /// A new peer starts Offline until its connection is announced.
    pub fn new(id: PeerId, config: &SyncConfig) -> Self {
        Self {
            id,
            state: ConnectionState::Offline,
            clock: PeerClock::new(config),
            sampler: ClockSampler::new(id, config),
            resync: ResyncWindow::default(),
            offline_after_missed_probes: config.offline_after_missed_probes.max(1),
        }
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn clock(&self) -> &PeerClock {
        &self.clock
    }

    pub fn sampler(&self) -> &ClockSampler {
        &self.sampler
    }

    pub fn status(&self) -> PeerStatus {
        PeerStatus {
            peer_id: self.id,
            state: self.state,
            rtt: self.clock.rtt(),
            jitter: self.clock.jitter(),
            offset: self.clock.offset(),
            margin: self.clock.current_margin(),
            margin_widened: self.clock.is_widened(),
            has_estimate: self.clock.has_estimate(),
        }
    }

    pub fn reconfigure(&mut self, config: &SyncConfig) {
        self.offline_after_missed_probes = config.offline_after_missed_probes.max(1);
        self.clock.reconfigure(config);
        self.sampler.reconfigure(config);
    }

    pub(crate) fn transition(&mut self, to: ConnectionState, events: &mut SyncEvents) {
        let from = self.state;
        if from == to {
            return;
        }
        info!("{}: {} -> {}", self.id, from, to);
        self.state = to;
        events.push(SyncEvent::PeerStateChanged {
            peer: self.id,
            from,
            to,
        });
    }

    /// Returns a probe to send now, if one is due.
    pub fn poll_probe(&mut self, now: &GameInstant) -> Option<ProbeRequest> {
        self.sampler.poll_probe(now)
    }

    /// Turn a probe reply into a sample and fold it into the clock estimate.
    pub fn receive_reply(
        &mut self,
        reply: &ProbeReply,
        now: &GameInstant,
        resync: &ResyncCoordinator,
        events: &mut SyncEvents,
    ) -> Result<(), SyncError> {
        let sample = match self.sampler.receive_reply(reply, now) {
            Ok(sample) => sample,
            Err(error) => {
                debug!("{}: {}", self.id, error);
                events.count_unsolicited_reply();
                return Err(error);
            }
        };

        if self.state == ConnectionState::Offline {
            // the link came back on its own after repeated timeouts
            resync.on_reconnect(self, now, events);
        }

        self.clock.update(&sample);
        resync.on_sample(self, now, events);
        Ok(())
    }

    /// Expire overdue probes and advance any resync window.
    pub fn update(
        &mut self,
        now: &GameInstant,
        resync: &ResyncCoordinator,
        events: &mut SyncEvents,
    ) -> Vec<SyncError> {
        let mut errors = self.sampler.check_timeouts(now);
        for error in &errors {
            if let SyncError::ProbeTimeout { sent_at, .. } = error {
                events.push(SyncEvent::ProbeTimedOut {
                    peer: self.id,
                    sent_at: *sent_at,
                });
            }
        }

        let missed = self.sampler.consecutive_timeouts();
        if self.state != ConnectionState::Offline && missed >= self.offline_after_missed_probes {
            warn!("{}: {} consecutive probes unanswered", self.id, missed);
            resync.on_link_lost(self, events);
            errors.push(SyncError::PeerOffline {
                peer: self.id,
                missed,
            });
        }

        resync.poll(self, now, events);
        errors
    }
}
