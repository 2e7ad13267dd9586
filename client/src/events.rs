use std::{time::Duration, vec::IntoIter};

use kinesync_shared::{EntityId, GameInstant, PeerId};

use crate::connection::ConnectionState;

/// Observable outcome of a sampling, resync or reconciliation step. This is
/// how failures inside the core reach the collaborator layer.
#[derive(Clone, Debug, PartialEq)]
pub enum SyncEvent {
    PeerStateChanged {
        peer: PeerId,
        from: ConnectionState,
        to: ConnectionState,
    },
    ProbeTimedOut {
        peer: PeerId,
        sent_at: GameInstant,
    },
    ResyncWindowExpired {
        peer: PeerId,
        margin: Duration,
    },
    StaleSnapshotDropped {
        entity: EntityId,
        timestamp: GameInstant,
    },
    CorrectionStarted {
        entity: EntityId,
        distance: f32,
        window: Duration,
    },
    CorrectionFinished {
        entity: EntityId,
    },
    ExcessiveDrift {
        entity: EntityId,
        distance: f32,
    },
}

/// Running counters, kept for diagnostics only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncDiagnostics {
    pub probe_timeouts: u64,
    pub unsolicited_replies: u64,
    pub stale_snapshots: u64,
    pub unknown_entity_snapshots: u64,
    pub corrections_started: u64,
    pub excessive_drifts: u64,
}

pub struct SyncEvents {
    events: Vec<SyncEvent>,
    diagnostics: SyncDiagnostics,
    empty: bool,
}

impl Default for SyncEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncEvents {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            diagnostics: SyncDiagnostics::default(),
            empty: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn diagnostics(&self) -> &SyncDiagnostics {
        &self.diagnostics
    }

    pub fn push(&mut self, event: SyncEvent) {
        match &event {
            SyncEvent::ProbeTimedOut { .. } => self.diagnostics.probe_timeouts += 1,
            SyncEvent::StaleSnapshotDropped { .. } => self.diagnostics.stale_snapshots += 1,
            SyncEvent::CorrectionStarted { .. } => self.diagnostics.corrections_started += 1,
            SyncEvent::ExcessiveDrift { .. } => self.diagnostics.excessive_drifts += 1,
            _ => {}
        }
        self.events.push(event);
        self.empty = false;
    }

    pub(crate) fn count_unsolicited_reply(&mut self) {
        self.diagnostics.unsolicited_replies += 1;
    }

    pub(crate) fn count_unknown_entity_snapshot(&mut self) {
        self.diagnostics.unknown_entity_snapshots += 1;
    }

    /// Drain every event pushed since the last call.
    pub fn take(&mut self) -> IntoIter<SyncEvent> {
        self.empty = true;
        std::mem::take(&mut self.events).into_iter()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SyncEvent> {
        self.events.iter()
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.empty = true;
    }
}
