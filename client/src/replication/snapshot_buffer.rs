use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use kinesync_shared::{EntityId, GameInstant, MovementSnapshot, SyncError};

use crate::connection::PeerStatus;

/// A received snapshot together with its source timestamp translated onto
/// the local timeline at the moment it was inserted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BufferedSnapshot {
    pub snapshot: MovementSnapshot,
    pub local_timestamp: GameInstant,
}

struct EntitySnapshots {
    margin_window: Duration,
    // ascending by source timestamp
    queue: VecDeque<BufferedSnapshot>,
}

impl EntitySnapshots {
    fn newest(&self) -> Option<&BufferedSnapshot> {
        self.queue.back()
    }

    /// Keep at most one snapshot older than `newest - margin_window`.
    fn trim_to_window(&mut self) {
        let Some(newest) = self.newest() else {
            return;
        };
        let bound = newest.snapshot.source_timestamp.sub_duration(&self.margin_window);
        while self.queue.len() >= 2 && self.queue[1].snapshot.source_timestamp < bound {
            self.queue.pop_front();
        }
    }
}

/// Most recent authoritative movement snapshots, per entity, ordered by
/// source timestamp.
#[derive(Default)]
pub struct SnapshotBuffer {
    entities: HashMap<EntityId, EntitySnapshots>,
}

impl SnapshotBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a snapshot from the peer described by `source`. Anything not
    /// strictly newer than what is already held for the entity is rejected
    /// and leaves the buffer untouched.
    pub fn insert(
        &mut self,
        snapshot: MovementSnapshot,
        source: &PeerStatus,
    ) -> Result<(), SyncError> {
        let entity = snapshot.entity_id;
        let snapshots = self.entities.entry(entity).or_insert_with(|| EntitySnapshots {
            margin_window: source.margin,
            queue: VecDeque::new(),
        });

        if let Some(newest) = snapshots.newest() {
            if !snapshot.is_newer_than(&newest.snapshot) {
                return Err(SyncError::StaleSnapshot {
                    entity,
                    timestamp: snapshot.source_timestamp,
                    newest: newest.snapshot.source_timestamp,
                });
            }
        }

        snapshots.margin_window = source.margin;
        snapshots.queue.push_back(BufferedSnapshot {
            local_timestamp: source.translate(&snapshot.source_timestamp),
            snapshot,
        });
        snapshots.trim_to_window();
        Ok(())
    }

    pub fn latest(&self, entity: &EntityId) -> Option<&MovementSnapshot> {
        self.latest_buffered(entity).map(|buffered| &buffered.snapshot)
    }

    pub fn latest_buffered(&self, entity: &EntityId) -> Option<&BufferedSnapshot> {
        self.entities
            .get(entity)
            .and_then(|snapshots| snapshots.newest())
    }

    /// Newest snapshot for `entity` that is at least `margin` old at `now`,
    /// that is, one whose local timestamp is no later than `now - margin`.
    /// Anything younger may still be overtaken by a delayed packet and is not
    /// trusted yet.
    pub fn trusted(
        &self,
        entity: &EntityId,
        now: &GameInstant,
        margin: Duration,
    ) -> Option<&BufferedSnapshot> {
        let horizon = now.sub_duration(&margin);
        self.entities.get(entity).and_then(|snapshots| {
            snapshots
                .queue
                .iter()
                .rev()
                .find(|buffered| buffered.local_timestamp <= horizon)
        })
    }

    /// Snapshots held for `entity`, oldest first.
    pub fn history(&self, entity: &EntityId) -> impl Iterator<Item = &BufferedSnapshot> {
        self.entities
            .get(entity)
            .into_iter()
            .flat_map(|snapshots| snapshots.queue.iter())
    }

    pub fn len(&self, entity: &EntityId) -> usize {
        self.entities
            .get(entity)
            .map(|snapshots| snapshots.queue.len())
            .unwrap_or(0)
    }

    /// Drop snapshots that can no longer be the trusted one at `cutoff`: a
    /// snapshot goes once the next one is itself at least its entity's margin
    /// window old. The newest snapshot of each entity is kept.
    pub fn evict_older_than(&mut self, cutoff: &GameInstant) -> usize {
        let mut evicted = 0;
        for snapshots in self.entities.values_mut() {
            let window = snapshots.margin_window;
            while snapshots.queue.len() >= 2 {
                let next = &snapshots.queue[1];
                if next.local_timestamp.add_duration(&window) > *cutoff {
                    break;
                }
                snapshots.queue.pop_front();
                evicted += 1;
            }
        }
        evicted
    }

    /// Forget every entity `keep` rejects whose newest snapshot is past its
    /// margin window at `cutoff`. Returns how many entities were dropped.
    pub fn evict_entities(
        &mut self,
        cutoff: &GameInstant,
        mut keep: impl FnMut(&EntityId) -> bool,
    ) -> usize {
        let before = self.entities.len();
        self.entities.retain(|entity, snapshots| {
            keep(entity)
                || snapshots.newest().map_or(false, |newest| {
                    newest.local_timestamp.add_duration(&snapshots.margin_window) > *cutoff
                })
        });
        before - self.entities.len()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn remove_entity(&mut self, entity: &EntityId) {
        self.entities.remove(entity);
    }
}

/// Cloneable handle to a [`SnapshotBuffer`] shared between the network
/// receive path and the simulation tick. Each call holds the lock only for
/// the duration of that call.
#[derive(Clone, Default)]
pub struct SharedSnapshotBuffer {
    inner: Arc<Mutex<SnapshotBuffer>>,
}

impl SharedSnapshotBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &self,
        snapshot: MovementSnapshot,
        source: &PeerStatus,
    ) -> Result<(), SyncError> {
        self.lock().insert(snapshot, source)
    }

    pub fn latest(&self, entity: &EntityId) -> Option<MovementSnapshot> {
        self.lock().latest(entity).copied()
    }

    pub fn evict_older_than(&self, cutoff: &GameInstant) -> usize {
        self.lock().evict_older_than(cutoff)
    }

    pub fn remove_entity(&self, entity: &EntityId) {
        self.lock().remove_entity(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.lock().entity_count()
    }

    /// Run `f` with exclusive access to the buffer.
    pub fn with<R>(&self, f: impl FnOnce(&mut SnapshotBuffer) -> R) -> R {
        f(&mut self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, SnapshotBuffer> {
        // a panic while holding the lock cannot leave the buffer half-written
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
