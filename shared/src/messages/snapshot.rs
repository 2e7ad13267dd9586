use crate::{EntityId, GameInstant, MotionState};

/// Authoritative physical state of one entity, stamped with the source
/// host's clock. Immutable once received.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MovementSnapshot {
    pub entity_id: EntityId,
    pub source_timestamp: GameInstant,
    pub state: MotionState,
}

impl MovementSnapshot {
    pub fn new(entity_id: EntityId, source_timestamp: GameInstant, state: MotionState) -> Self {
        Self {
            entity_id,
            source_timestamp,
            state,
        }
    }

    pub fn is_newer_than(&self, other: &MovementSnapshot) -> bool {
        self.source_timestamp.is_more_than(&other.source_timestamp)
    }
}
