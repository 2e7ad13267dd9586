use std::{collections::HashMap, time::Duration};

use log::debug;

use kinesync_shared::{EntityId, GameInstant, MotionState, MovementSnapshot};

/// Authoritative motion state of every entity this host simulates.
#[derive(Default)]
pub struct AuthoritativeWorld {
    entities: HashMap<EntityId, MotionState>,
}

impl AuthoritativeWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Returns false if the entity already exists.
    pub fn spawn(&mut self, entity: EntityId, state: MotionState) -> bool {
        if self.entities.contains_key(&entity) {
            return false;
        }
        debug!("spawned {}", entity);
        self.entities.insert(entity, state);
        true
    }

    pub fn despawn(&mut self, entity: &EntityId) -> Option<MotionState> {
        self.entities.remove(entity)
    }

    pub fn state(&self, entity: &EntityId) -> Option<&MotionState> {
        self.entities.get(entity)
    }

    /// Overwrite an entity's state, e.g. after a teleport or respawn.
    /// Returns false if the entity does not exist.
    pub fn set_state(&mut self, entity: &EntityId, state: MotionState) -> bool {
        match self.entities.get_mut(entity) {
            Some(current) => {
                *current = state;
                true
            }
            None => false,
        }
    }

    /// Integrate every entity forward by `elapsed` at its current velocity.
    pub fn step(&mut self, elapsed: Duration) {
        for state in self.entities.values_mut() {
            *state = state.extrapolate(elapsed);
        }
    }

    /// One snapshot per entity, stamped with `now`, ordered by entity id.
    pub fn snapshots(&self, now: &GameInstant) -> Vec<MovementSnapshot> {
        let mut snapshots: Vec<MovementSnapshot> = self
            .entities
            .iter()
            .map(|(entity, state)| MovementSnapshot::new(*entity, *now, *state))
            .collect();
        snapshots.sort_by_key(|snapshot| snapshot.entity_id);
        snapshots
    }
}
