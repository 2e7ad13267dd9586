use std::collections::HashMap;

use log::{debug, info};

use kinesync_shared::{
    EntityDisplay, EntityId, GameInstant, MotionState, MovementSnapshot, PeerId, ProbeReply,
    ProbeRequest, ReconciliationConfig, SyncError, SyncOption,
};

use crate::{
    client_config::ClientConfig,
    connection::{PeerArena, PeerStatus},
    error::ClientError,
    events::{SyncDiagnostics, SyncEvent, SyncEvents},
    replication::{
        MovementReplicator, ReconciliationPolicy, ReconciliationState, SharedSnapshotBuffer,
    },
};

/// Observer side of kinesync. Samples every connected peer's clock, buffers
/// the movement snapshots they send and produces, once per tick, a smoothly
/// reconciled display state for every replicated entity.
///
/// Transport and connection lifecycle stay with the caller: probes to send
/// are returned from [`send_probes`](Self::send_probes), and replies,
/// snapshots, connects and disconnects are fed back in.
pub struct SyncClient {
    config: ClientConfig,
    peers: PeerArena,
    snapshots: SharedSnapshotBuffer,
    replicator: MovementReplicator,
    events: SyncEvents,
}

impl SyncClient {
    pub fn new(config: ClientConfig) -> Self {
        let replicator = MovementReplicator::new(
            ReconciliationPolicy::new(config.reconciliation.clone()),
            config.sync.safety_latency_margin,
        );
        Self {
            peers: PeerArena::new(&config.sync),
            snapshots: SharedSnapshotBuffer::new(),
            replicator,
            events: SyncEvents::new(),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // Peers

    /// A peer's connection was established or re-established.
    pub fn connect_peer(&mut self, peer_id: PeerId, now: &GameInstant) {
        info!("{} connected", peer_id);
        self.peers.connect(peer_id, now, &mut self.events);
    }

    pub fn disconnect_peer(&mut self, peer_id: &PeerId) -> Result<(), ClientError> {
        info!("{} disconnected", peer_id);
        self.peers.disconnect(peer_id, &mut self.events)?;
        Ok(())
    }

    /// Forget a peer along with every entity it owns.
    pub fn remove_peer(&mut self, peer_id: &PeerId) -> bool {
        if self.peers.remove(peer_id).is_none() {
            return false;
        }
        let owned: Vec<EntityId> = self.replicator.entities_owned_by(*peer_id).collect();
        for entity in owned {
            let _ = self.unregister_entity(&entity);
        }
        true
    }

    pub fn peer_status(&self, peer_id: &PeerId) -> Option<PeerStatus> {
        self.peers.status(peer_id)
    }

    pub fn peer_statuses(&self) -> HashMap<PeerId, PeerStatus> {
        self.peers.statuses()
    }

    /// Probes that are due now, one per peer at most.
    pub fn send_probes(&mut self, now: &GameInstant) -> Vec<ProbeRequest> {
        self.peers.poll_probes(now)
    }

    pub fn receive_probe_reply(
        &mut self,
        reply: &ProbeReply,
        now: &GameInstant,
    ) -> Result<(), ClientError> {
        self.peers.receive_reply(reply, now, &mut self.events)?;
        Ok(())
    }

    // Entities

    /// Store a snapshot received from `peer_id`. Returns false if it was
    /// dropped: it was not newer than what is already buffered, its entity
    /// is not registered, or the peer has no clock estimate to translate its
    /// timestamp with.
    pub fn receive_snapshot(
        &mut self,
        peer_id: &PeerId,
        snapshot: MovementSnapshot,
    ) -> Result<bool, ClientError> {
        let status = self
            .peers
            .status(peer_id)
            .ok_or(SyncError::UnknownPeer { peer: *peer_id })?;
        if !status.has_estimate {
            debug!(
                "dropping snapshot for {} from {} ({}, no clock estimate)",
                snapshot.entity_id, peer_id, status.state
            );
            return Ok(false);
        }
        if !self.replicator.contains(&snapshot.entity_id) {
            debug!(
                "dropping snapshot for unregistered {} from {}",
                snapshot.entity_id, peer_id
            );
            self.events.count_unknown_entity_snapshot();
            return Ok(false);
        }

        match self.snapshots.insert(snapshot, &status) {
            Ok(()) => Ok(true),
            Err(SyncError::StaleSnapshot {
                entity, timestamp, ..
            }) => {
                debug!("dropping stale snapshot for {} at {}", entity, timestamp);
                self.events
                    .push(SyncEvent::StaleSnapshotDropped { entity, timestamp });
                Ok(false)
            }
            Err(error) => Err(error.into()),
        }
    }

    pub fn register_entity(
        &mut self,
        entity: EntityId,
        owner: PeerId,
        initial: MotionState,
        now: &GameInstant,
    ) -> Result<bool, ClientError> {
        if !self.peers.contains(&owner) {
            return Err(SyncError::UnknownPeer { peer: owner }.into());
        }
        Ok(self.replicator.register(entity, owner, initial, now))
    }

    pub fn unregister_entity(&mut self, entity: &EntityId) -> Result<(), ClientError> {
        self.snapshots.remove_entity(entity);
        self.replicator
            .unregister(entity)
            .map(|_| ())
            .ok_or_else(|| SyncError::UnknownEntity { entity: *entity }.into())
    }

    pub fn entity_state(&self, entity: &EntityId) -> Option<ReconciliationState> {
        self.replicator.state(entity)
    }

    /// Handle to the snapshot buffer for a receive path running elsewhere.
    pub fn snapshot_buffer(&self) -> SharedSnapshotBuffer {
        self.snapshots.clone()
    }

    // Tick

    /// Advance every peer and entity to `now` and return the state to
    /// display, ordered by entity id.
    ///
    /// The snapshot buffer is locked only to evict and to copy out the
    /// snapshots due this tick; reconciliation runs after it is released.
    pub fn update(&mut self, now: &GameInstant) -> Vec<EntityDisplay> {
        for error in self.peers.update(now, &mut self.events) {
            debug!("{}", error);
        }

        let statuses = self.peers.statuses();
        let replicator = &self.replicator;
        let due = self.snapshots.with(|buffer| {
            buffer.evict_older_than(now);
            let forgotten = buffer.evict_entities(now, |entity| replicator.contains(entity));
            if forgotten > 0 {
                debug!("forgot snapshots of {} unregistered entities", forgotten);
            }
            replicator.due_snapshots(now, buffer, &statuses)
        });

        self.replicator
            .apply_due(now, &due, &statuses, &mut self.events)
    }

    pub fn take_events(&mut self) -> std::vec::IntoIter<SyncEvent> {
        self.events.take()
    }

    pub fn diagnostics(&self) -> SyncDiagnostics {
        *self.events.diagnostics()
    }

    // Configuration

    /// Change one of the named sync options at runtime. Applies to every
    /// peer from its next probe on.
    pub fn set_option(&mut self, option: SyncOption, value: f64) -> Result<(), ClientError> {
        self.config.sync.set(option, value)?;
        info!("{} set to {}", option.key(), value);
        self.peers.reconfigure(&self.config.sync);
        self.replicator
            .set_fallback_margin(self.config.sync.safety_latency_margin);
        Ok(())
    }

    pub fn set_reconciliation_config(&mut self, config: ReconciliationConfig) {
        self.replicator.policy_mut().set_config(config.clone());
        self.config.reconciliation = config;
    }
}
