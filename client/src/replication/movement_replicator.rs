use std::{collections::HashMap, time::Duration};

use log::debug;

use kinesync_shared::{EntityDisplay, EntityId, GameInstant, MotionState, PeerId};

use crate::{
    connection::PeerStatus,
    events::SyncEvents,
    replication::{
        reconciliation_policy::ReconciliationPolicy,
        replicated_entity::{ReconciliationState, ReplicatedEntity},
        snapshot_buffer::{BufferedSnapshot, SnapshotBuffer},
    },
};

/// Produces the displayed state of every registered entity, once per tick,
/// by combining local extrapolation with the newest snapshot that is at
/// least the owning peer's margin old.
///
/// Peer state is only ever read here, through [`PeerStatus`] copies.
pub struct MovementReplicator {
    policy: ReconciliationPolicy,
    fallback_margin: Duration,
    entities: HashMap<EntityId, ReplicatedEntity>,
}

impl MovementReplicator {
    /// `fallback_margin` is used for entities whose owning peer has no status.
    pub fn new(policy: ReconciliationPolicy, fallback_margin: Duration) -> Self {
        Self {
            policy,
            fallback_margin,
            entities: HashMap::new(),
        }
    }

    pub fn policy(&self) -> &ReconciliationPolicy {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut ReconciliationPolicy {
        &mut self.policy
    }

    pub fn set_fallback_margin(&mut self, margin: Duration) {
        self.fallback_margin = margin;
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Returns false if the entity was already registered.
    pub fn register(
        &mut self,
        entity: EntityId,
        owner: PeerId,
        initial: MotionState,
        now: &GameInstant,
    ) -> bool {
        if self.entities.contains_key(&entity) {
            return false;
        }
        debug!("registering {} owned by {}", entity, owner);
        self.entities
            .insert(entity, ReplicatedEntity::new(entity, owner, initial, now));
        true
    }

    pub fn unregister(&mut self, entity: &EntityId) -> Option<ReplicatedEntity> {
        self.entities.remove(entity)
    }

    pub fn get(&self, entity: &EntityId) -> Option<&ReplicatedEntity> {
        self.entities.get(entity)
    }

    pub fn state(&self, entity: &EntityId) -> Option<ReconciliationState> {
        self.entities.get(entity).map(ReplicatedEntity::state)
    }

    pub fn owner(&self, entity: &EntityId) -> Option<PeerId> {
        self.entities.get(entity).map(ReplicatedEntity::owner)
    }

    pub fn entities_owned_by(&self, owner: PeerId) -> impl Iterator<Item = EntityId> + '_ {
        self.entities
            .values()
            .filter(move |entity| entity.owner() == owner)
            .map(ReplicatedEntity::entity_id)
    }

    pub fn contains(&self, entity: &EntityId) -> bool {
        self.entities.contains_key(entity)
    }

    /// Apply any newer trusted snapshots, advance blends and return what to
    /// display, ordered by entity id.
    pub fn tick(
        &mut self,
        now: &GameInstant,
        snapshots: &SnapshotBuffer,
        peers: &HashMap<PeerId, PeerStatus>,
        events: &mut SyncEvents,
    ) -> Vec<EntityDisplay> {
        let due = self.due_snapshots(now, snapshots, peers);
        self.apply_due(now, &due, peers, events)
    }

    /// For every registered entity, the snapshot the next tick would apply:
    /// the newest one at least the owner's margin old that is newer than
    /// what is already applied. Only reads `snapshots`, so a caller sharing
    /// the buffer can release it before [`apply_due`](Self::apply_due).
    pub fn due_snapshots(
        &self,
        now: &GameInstant,
        snapshots: &SnapshotBuffer,
        peers: &HashMap<PeerId, PeerStatus>,
    ) -> HashMap<EntityId, BufferedSnapshot> {
        self.entities
            .values()
            .filter_map(|entity| {
                let owner = peers.get(&entity.owner());
                // without a clock estimate the owner's timestamps cannot be
                // trusted, so keep extrapolating the last applied state
                if !owner.map(|status| status.has_estimate).unwrap_or(true) {
                    return None;
                }
                snapshots
                    .trusted(&entity.entity_id(), now, self.margin_for(owner))
                    .filter(|buffered| entity.accepts(buffered))
                    .map(|buffered| (entity.entity_id(), *buffered))
            })
            .collect()
    }

    /// Apply the snapshots picked by [`due_snapshots`](Self::due_snapshots),
    /// advance blends and return what to display, ordered by entity id.
    pub fn apply_due(
        &mut self,
        now: &GameInstant,
        due: &HashMap<EntityId, BufferedSnapshot>,
        peers: &HashMap<PeerId, PeerStatus>,
        events: &mut SyncEvents,
    ) -> Vec<EntityDisplay> {
        let policy = &self.policy;
        let fallback_margin = self.fallback_margin;
        let mut displays = Vec::with_capacity(self.entities.len());

        for entity in self.entities.values_mut() {
            if let Some(buffered) = due.get(&entity.entity_id()) {
                if entity.accepts(buffered) {
                    let margin = peers
                        .get(&entity.owner())
                        .map(|status| status.margin)
                        .unwrap_or(fallback_margin);
                    entity.apply(buffered, now, margin, policy, events);
                }
            }

            displays.push(entity.advance(now, policy.tolerance(), events));
        }

        displays.sort_by_key(|display| display.entity_id);
        displays
    }

    fn margin_for(&self, owner: Option<&PeerStatus>) -> Duration {
        owner
            .map(|status| status.margin)
            .unwrap_or(self.fallback_margin)
    }
}
