//! Properties of the snapshot buffer and the movement replicator that must
//! hold for any arrival order or correction size.

use std::{collections::HashMap, time::Duration};

use proptest::prelude::*;

use kinesync_client::{
    BufferedSnapshot, ConnectionState, MovementReplicator, PeerStatus, ReconciliationPolicy,
    SnapshotBuffer, SyncEvents,
};
use kinesync_shared::{
    ClockOffset, EntityId, GameInstant, MotionState, MovementSnapshot, PeerId, Quat, Vec3,
};

const OWNER: PeerId = PeerId::new(1);
const ENTITY: EntityId = EntityId::new(1);
const TICK: Duration = Duration::from_millis(10);

fn status(margin: Duration) -> PeerStatus {
    PeerStatus {
        peer_id: OWNER,
        state: ConnectionState::Connected,
        rtt: margin * 2,
        jitter: Duration::ZERO,
        offset: ClockOffset::ZERO,
        margin,
        margin_widened: false,
        has_estimate: true,
    }
}

fn snapshot(at_ms: i64, state: MotionState) -> MovementSnapshot {
    MovementSnapshot::new(ENTITY, GameInstant::from_millis(at_ms), state)
}

fn at_rest(x: f32) -> MotionState {
    MotionState::at_rest(Vec3::new(x, 0.0, 0.0), Quat::IDENTITY)
}

fn history(buffer: &SnapshotBuffer) -> Vec<BufferedSnapshot> {
    buffer.history(&ENTITY).copied().collect()
}

proptest! {
    #[test]
    fn duplicate_deliveries_leave_no_trace(
        arrivals in prop::collection::vec((0i64..2000, any::<bool>()), 1..40),
    ) {
        let source = status(Duration::from_millis(50));
        let mut once = SnapshotBuffer::new();
        let mut duplicated = SnapshotBuffer::new();
        let mut once_replicator =
            MovementReplicator::new(ReconciliationPolicy::default(), source.margin);
        let mut duplicated_replicator =
            MovementReplicator::new(ReconciliationPolicy::default(), source.margin);
        once_replicator.register(ENTITY, OWNER, at_rest(0.0), &GameInstant::EPOCH);
        duplicated_replicator.register(ENTITY, OWNER, at_rest(0.0), &GameInstant::EPOCH);
        let peers = HashMap::from([(OWNER, source)]);
        let mut events = SyncEvents::new();

        for (index, (at_ms, repeat)) in arrivals.iter().enumerate() {
            let snapshot = snapshot(*at_ms, at_rest(*at_ms as f32 * 0.01));
            let _ = once.insert(snapshot, &source);
            let _ = duplicated.insert(snapshot, &source);
            if *repeat {
                prop_assert!(duplicated.insert(snapshot, &source).is_err());
            }

            let now = GameInstant::from_millis(2000 + index as i64 * 10);
            let expected = once_replicator.tick(&now, &once, &peers, &mut events);
            let actual = duplicated_replicator.tick(&now, &duplicated, &peers, &mut events);
            prop_assert_eq!(expected, actual);
        }

        prop_assert_eq!(history(&once), history(&duplicated));
    }

    #[test]
    fn buffer_only_ever_moves_forward(
        timestamps in prop::collection::vec(0i64..5000, 1..60),
    ) {
        let source = status(Duration::from_millis(50));
        let mut buffer = SnapshotBuffer::new();
        let mut newest: Option<i64> = None;

        for at_ms in timestamps {
            let accepted = buffer.insert(snapshot(at_ms, at_rest(0.0)), &source).is_ok();
            prop_assert_eq!(accepted, newest.map_or(true, |newest| at_ms > newest));
            if accepted {
                newest = Some(at_ms);
            }
            let held = buffer.latest(&ENTITY).map(|s| s.source_timestamp);
            prop_assert_eq!(held, newest.map(GameInstant::from_millis));
        }
    }

    #[test]
    fn blended_correction_never_jumps(
        delta in 0.2f32..4.9,
        velocity in -5.0f32..5.0,
        margin_ms in 20u64..400,
    ) {
        let margin = Duration::from_millis(margin_ms);
        let policy = ReconciliationPolicy::default();
        let window = policy.blend_window(margin);
        let tolerance = policy.tolerance();
        let mut replicator = MovementReplicator::new(policy, margin);
        let moving = MotionState {
            linear_velocity: Vec3::new(velocity, 0.0, 0.0),
            ..MotionState::default()
        };
        replicator.register(ENTITY, OWNER, moving, &GameInstant::EPOCH);

        let mut buffer = SnapshotBuffer::new();
        let corrected = MotionState {
            position: Vec3::new(velocity * 0.1 + delta, 0.0, 0.0),
            ..moving
        };
        buffer.insert(snapshot(100, corrected), &status(margin)).unwrap();

        let peers = HashMap::from([(OWNER, status(margin))]);
        let mut events = SyncEvents::new();
        let empty = SnapshotBuffer::new();
        let mut now = GameInstant::from_millis(90);
        let mut previous = replicator.tick(&now, &empty, &peers, &mut events)[0].position.x;

        let step = TICK.as_secs_f32();
        let bound = (delta * step / window.as_secs_f32()).max(tolerance) + 1e-3;
        for _ in 0..(margin_ms / 10 + 10) {
            now = now.add_duration(&TICK);
            let x = replicator.tick(&now, &buffer, &peers, &mut events)[0].position.x;
            let jump = (x - previous - velocity * step).abs();
            prop_assert!(jump <= bound, "jump {} exceeds {}", jump, bound);
            previous = x;
        }

        prop_assert_eq!(events.diagnostics().corrections_started, 1);
    }
}
