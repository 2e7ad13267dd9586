use std::time::Duration;

use log::{debug, warn};

use kinesync_shared::{
    EntityDisplay, EntityId, GameInstant, MotionState, PeerId, Quat, SyncError, Vec3,
};

use crate::{
    events::{SyncEvent, SyncEvents},
    replication::{
        reconciliation_policy::{Correction, ReconciliationPolicy},
        snapshot_buffer::BufferedSnapshot,
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReconciliationState {
    /// Extrapolating from the last applied snapshot
    Predicting,
    /// Blending the displayed state toward a newer snapshot
    Correcting,
}

#[derive(Clone, Copy, Debug)]
struct AppliedState {
    source_timestamp: Option<GameInstant>,
    local_timestamp: GameInstant,
    state: MotionState,
}

#[derive(Clone, Copy, Debug)]
struct Blend {
    started: GameInstant,
    window: Duration,
    position_offset: Vec3,
    rotation_offset: Quat,
}

impl Blend {
    fn progress(&self, now: &GameInstant) -> f32 {
        if self.window.is_zero() {
            return 1.0;
        }
        let elapsed = now.elapsed_since(&self.started);
        (elapsed.as_secs_f32() / self.window.as_secs_f32()).clamp(0.0, 1.0)
    }

    fn residual(&self, now: &GameInstant) -> Vec3 {
        self.position_offset * (1.0 - self.progress(now))
    }
}

/// Reconciliation state of one replicated entity.
pub struct ReplicatedEntity {
    entity_id: EntityId,
    owner: PeerId,
    applied: AppliedState,
    blend: Option<Blend>,
}

impl ReplicatedEntity {
    pub fn new(entity_id: EntityId, owner: PeerId, initial: MotionState, now: &GameInstant) -> Self {
        Self {
            entity_id,
            owner,
            applied: AppliedState {
                source_timestamp: None,
                local_timestamp: *now,
                state: initial,
            },
            blend: None,
        }
    }

    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    pub fn owner(&self) -> PeerId {
        self.owner
    }

    pub fn state(&self) -> ReconciliationState {
        if self.blend.is_some() {
            ReconciliationState::Correcting
        } else {
            ReconciliationState::Predicting
        }
    }

    /// Source timestamp of the snapshot currently applied, if any.
    pub fn applied_timestamp(&self) -> Option<GameInstant> {
        self.applied.source_timestamp
    }

    /// The underlying prediction: last applied state carried forward by its
    /// velocity.
    pub fn extrapolated(&self, now: &GameInstant) -> MotionState {
        self.applied
            .state
            .extrapolate(now.elapsed_since(&self.applied.local_timestamp))
    }

    /// Outstanding visual correction still to be blended out.
    pub fn correction(&self, now: &GameInstant) -> Vec3 {
        self.blend
            .map(|blend| blend.residual(now))
            .unwrap_or(Vec3::ZERO)
    }

    pub fn displayed(&self, now: &GameInstant) -> EntityDisplay {
        let extrapolated = self.extrapolated(now);
        let (position, orientation) = match &self.blend {
            None => (extrapolated.position, extrapolated.orientation),
            Some(blend) => {
                let progress = blend.progress(now);
                let rotation = blend.rotation_offset.slerp(Quat::IDENTITY, progress);
                (
                    extrapolated.position + blend.residual(now),
                    (rotation * extrapolated.orientation).normalize(),
                )
            }
        };
        EntityDisplay {
            entity_id: self.entity_id,
            position,
            orientation,
        }
    }

    /// Whether `buffered` is strictly newer than the applied snapshot.
    pub fn accepts(&self, buffered: &BufferedSnapshot) -> bool {
        match self.applied.source_timestamp {
            None => true,
            Some(applied) => buffered.snapshot.source_timestamp.is_more_than(&applied),
        }
    }

    pub(crate) fn apply(
        &mut self,
        buffered: &BufferedSnapshot,
        now: &GameInstant,
        margin: Duration,
        policy: &ReconciliationPolicy,
        events: &mut SyncEvents,
    ) -> Correction {
        let before = self.displayed(now);
        let predicted = self.extrapolated(now);

        self.applied = AppliedState {
            source_timestamp: Some(buffered.snapshot.source_timestamp),
            local_timestamp: buffered.local_timestamp,
            state: buffered.snapshot.state,
        };
        let target = self.extrapolated(now);

        let correction = policy.decide(&predicted, &target, margin);
        match correction {
            Correction::Accept { distance } => {
                debug!("{}: accepted snapshot, delta {:.4}", self.entity_id, distance);
            }
            Correction::Blend { distance, window } => {
                debug!(
                    "{}: correcting {:.4} units over {:?}",
                    self.entity_id, distance, window
                );
                self.blend = Some(Blend {
                    started: *now,
                    window,
                    position_offset: before.position - target.position,
                    rotation_offset: (before.orientation * target.orientation.inverse())
                        .normalize(),
                });
                events.push(SyncEvent::CorrectionStarted {
                    entity: self.entity_id,
                    distance,
                    window,
                });
            }
            Correction::Snap { distance } => {
                let drift = SyncError::ExcessiveDrift {
                    entity: self.entity_id,
                    distance,
                    ceiling: policy.ceiling(),
                };
                warn!("{}, snapping", drift);
                self.blend = None;
                events.push(SyncEvent::ExcessiveDrift {
                    entity: self.entity_id,
                    distance,
                });
            }
        }
        correction
    }

    /// End the blend if its window has elapsed or what remains is within
    /// tolerance, then report what to display.
    pub(crate) fn advance(
        &mut self,
        now: &GameInstant,
        tolerance: f32,
        events: &mut SyncEvents,
    ) -> EntityDisplay {
        if let Some(blend) = &self.blend {
            let done = blend.progress(now) >= 1.0 || blend.residual(now).length() < tolerance;
            if done {
                self.blend = None;
                events.push(SyncEvent::CorrectionFinished {
                    entity: self.entity_id,
                });
            }
        }
        self.displayed(now)
    }
}
