use std::time::Duration;

use thiserror::Error;

use crate::{EntityId, GameInstant, PeerId};

/// Failures of the synchronization core. None of these are fatal: each one
/// resolves into a state transition or a dropped input, and is returned only
/// so callers can count or log it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    /// A probe got no reply within the timeout
    #[error("Probe to {peer} sent at {sent_at} got no reply within {timeout:?}")]
    ProbeTimeout {
        peer: PeerId,
        sent_at: GameInstant,
        timeout: Duration,
    },

    /// A reply arrived for a probe that is not in flight (timed out, discarded or duplicated)
    #[error("Reply from {peer} matches no in-flight probe (sent at {sent_at})")]
    UnsolicitedProbeReply { peer: PeerId, sent_at: GameInstant },

    /// A snapshot was not newer than the newest one already held for its entity
    #[error("Snapshot for {entity} at {timestamp} is not newer than {newest}")]
    StaleSnapshot {
        entity: EntityId,
        timestamp: GameInstant,
        newest: GameInstant,
    },

    /// A correction exceeded the hard snap ceiling
    #[error("Correction of {distance} units for {entity} exceeds snap ceiling of {ceiling}")]
    ExcessiveDrift {
        entity: EntityId,
        distance: f32,
        ceiling: f32,
    },

    /// A peer missed too many consecutive probes
    #[error("{peer} missed {missed} consecutive probes")]
    PeerOffline { peer: PeerId, missed: u32 },

    /// Operation referenced a peer that is not registered
    #[error("{peer} is not registered")]
    UnknownPeer { peer: PeerId },

    /// Operation referenced an entity that is not registered
    #[error("{entity} is not registered")]
    UnknownEntity { entity: EntityId },
}
