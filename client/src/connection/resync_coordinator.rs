use std::time::Duration;

use log::{info, warn};

use kinesync_shared::{GameInstant, SyncConfig};

use crate::{
    connection::peer::{ConnectionState, Peer, ResyncWindow},
    events::{SyncEvent, SyncEvents},
};

/// Drives a peer's clock estimate through connection loss and recovery.
///
/// On disconnect the estimate is discarded. On reconnect the peer enters
/// `Resyncing`: probes go out at the accelerated rate and the estimate is
/// rebuilt only from fresh samples. The window closes early once consecutive
/// samples agree, or after `offline_clock_sync_duration`, in which case the
/// peer stays `Resyncing` with a widened margin.
#[derive(Clone, Debug)]
pub struct ResyncCoordinator {
    config: SyncConfig,
}

impl ResyncCoordinator {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn reconfigure(&mut self, config: &SyncConfig) {
        self.config = config.clone();
    }

    pub fn window_duration(&self) -> Duration {
        self.config.offline_clock_sync_duration
    }

    /// The connection-lifecycle collaborator reported the peer gone. Probing
    /// stops and in-flight probes are discarded.
    pub fn on_disconnect(&self, peer: &mut Peer, events: &mut SyncEvents) {
        peer.sampler.stop();
        peer.clock.reset();
        peer.resync = ResyncWindow::default();
        peer.transition(ConnectionState::Offline, events);
    }

    /// Probes stopped being answered. The estimate is dropped like on a
    /// disconnect, but probing continues at the normal period so the peer can
    /// recover on its own.
    pub(crate) fn on_link_lost(&self, peer: &mut Peer, events: &mut SyncEvents) {
        peer.clock.reset();
        peer.resync = ResyncWindow::default();
        peer.sampler.set_accelerated(&self.config, false);
        peer.transition(ConnectionState::Offline, events);
    }

    pub fn on_reconnect(&self, peer: &mut Peer, now: &GameInstant, events: &mut SyncEvents) {
        peer.clock.begin_replacing();
        if peer.sampler.is_active() {
            peer.sampler.set_accelerated(&self.config, true);
        } else {
            peer.sampler.start(&self.config, true);
        }
        peer.resync = ResyncWindow {
            started: Some(*now),
            expired: false,
        };
        peer.transition(ConnectionState::Resyncing, events);
    }

    /// Called after each sample is folded into the peer's clock.
    pub fn on_sample(&self, peer: &mut Peer, now: &GameInstant, events: &mut SyncEvents) {
        if peer.state != ConnectionState::Resyncing {
            return;
        }
        if peer.clock.is_stable(
            self.config.stable_sample_count,
            self.config.stable_offset_variance,
        ) {
            self.finish(peer, now, events);
            return;
        }
        self.poll(peer, now, events);
    }

    /// Close the window if it has run out without stabilizing.
    pub fn poll(&self, peer: &mut Peer, now: &GameInstant, events: &mut SyncEvents) {
        if peer.state != ConnectionState::Resyncing || peer.resync.expired {
            return;
        }
        let Some(started) = peer.resync.started else {
            return;
        };
        if now.elapsed_since(&started) < self.config.offline_clock_sync_duration {
            return;
        }

        peer.resync.expired = true;
        peer.clock.set_widened(true);
        peer.sampler.set_accelerated(&self.config, false);
        let margin = peer.clock.current_margin();
        warn!(
            "{}: clock did not stabilize within {:?}, widening margin to {:?}",
            peer.id(),
            self.config.offline_clock_sync_duration,
            margin
        );
        events.push(SyncEvent::ResyncWindowExpired {
            peer: peer.id(),
            margin,
        });
    }

    fn finish(&self, peer: &mut Peer, now: &GameInstant, events: &mut SyncEvents) {
        let took = peer
            .resync
            .started
            .map(|started| now.elapsed_since(&started))
            .unwrap_or_default();
        info!(
            "{}: clock stabilized after {:?} (offset {}, rtt {:?})",
            peer.id(),
            took,
            peer.clock.offset(),
            peer.clock.rtt()
        );
        peer.clock.finish_replacing();
        peer.sampler.set_accelerated(&self.config, false);
        peer.resync = ResyncWindow::default();
        peer.transition(ConnectionState::Connected, events);
    }
}
