use log::info;

use kinesync_shared::{GameInstant, MovementSnapshot, ProbeReply, ProbeRequest, Timer};

use crate::{
    authoritative_world::AuthoritativeWorld, probe_responder::ProbeResponder,
    server_config::ServerConfig,
};

/// Authoritative side of kinesync. Answers clock probes and publishes
/// timestamped snapshots of its world at a fixed interval. Delivering them
/// is up to the caller's transport.
pub struct SyncServer {
    config: ServerConfig,
    responder: ProbeResponder,
    world: AuthoritativeWorld,
    snapshot_timer: Timer,
}

impl SyncServer {
    pub fn new(config: ServerConfig) -> Self {
        info!(
            "sync server publishing snapshots every {:?}",
            config.snapshot_interval
        );
        Self {
            snapshot_timer: Timer::new(config.snapshot_interval),
            responder: ProbeResponder::new(),
            world: AuthoritativeWorld::new(),
            config,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn world(&self) -> &AuthoritativeWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut AuthoritativeWorld {
        &mut self.world
    }

    pub fn receive_probe(&mut self, request: &ProbeRequest, now: &GameInstant) -> ProbeReply {
        self.responder.respond(request, now)
    }

    pub fn probes_answered(&self) -> u64 {
        self.responder.replies()
    }

    /// Snapshots of every entity if the snapshot interval has elapsed,
    /// otherwise nothing.
    pub fn update(&mut self, now: &GameInstant) -> Option<Vec<MovementSnapshot>> {
        if !self.snapshot_timer.ringing(now) {
            return None;
        }
        self.snapshot_timer.reset(now);
        Some(self.world.snapshots(now))
    }
}
