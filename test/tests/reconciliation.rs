//! Movement reconciliation end to end: the host moves an entity
//! authoritatively and the observer's displayed state follows it without
//! visible jumps, except when the drift is too large to hide.

use std::time::Duration;

use kinesync_client::{ConnectionState, ReconciliationState, SyncEvent};
use kinesync_shared::{ClockOffset, EntityId, MotionState, MovementSnapshot, Quat, Vec3};
use kinesync_test::{init_logging, LinkProfile, SyncSession};

const TICK: Duration = Duration::from_millis(10);
const ENTITY: EntityId = EntityId::new(42);

fn at_rest(x: f32) -> MotionState {
    MotionState::at_rest(Vec3::new(x, 0.0, 0.0), Quat::IDENTITY)
}

/// A connected session with one entity resting at the origin.
fn settled_session() -> SyncSession {
    init_logging();
    let mut session = SyncSession::new(
        LinkProfile::steady(Duration::from_millis(100), ClockOffset::from_millis(250)),
        21,
    );
    session.spawn(ENTITY, at_rest(0.0));
    session
        .run_until(Duration::from_secs(5), TICK, |session| {
            session.status().map(|status| status.state) == Some(ConnectionState::Connected)
        })
        .unwrap();
    session.run_for(Duration::from_millis(300), TICK);
    session.client.take_events();
    session
}

fn displayed_x(session: &mut SyncSession) -> f32 {
    session.tick(TICK)[0].position.x
}

#[test]
fn moving_entity_is_tracked_without_corrections() {
    init_logging();
    let mut session = SyncSession::new(
        LinkProfile::steady(Duration::from_millis(60), ClockOffset::from_millis(-800)),
        8,
    );
    session.spawn(
        ENTITY,
        MotionState {
            linear_velocity: Vec3::new(3.0, 0.0, 0.0),
            ..MotionState::default()
        },
    );

    let frames = session.run_for(Duration::from_secs(2), TICK);

    let last = frames.last().unwrap()[0].position.x;
    assert!((last - 6.0).abs() < 0.01, "displayed x {}", last);
    assert_eq!(session.client.diagnostics().corrections_started, 0);
}

#[test]
fn small_drift_is_accepted_silently() {
    let mut session = settled_session();
    session.server.world_mut().set_state(&ENTITY, at_rest(0.05));

    let frames = session.run_for(Duration::from_millis(200), TICK);

    assert!((frames.last().unwrap()[0].position.x - 0.05).abs() < 1e-6);
    assert_eq!(session.client.entity_state(&ENTITY), Some(ReconciliationState::Predicting));
    assert_eq!(session.client.diagnostics().corrections_started, 0);
}

#[test]
fn medium_drift_is_blended_over_the_margin() {
    let mut session = settled_session();
    session.server.world_mut().set_state(&ENTITY, at_rest(2.0));

    let mut previous = displayed_x(&mut session);
    let mut saw_correcting = false;
    for _ in 0..30 {
        let x = displayed_x(&mut session);
        // 2 units over a 50ms window, 10ms per tick
        assert!((x - previous).abs() <= 0.4 + 1e-4, "jumped {} -> {}", previous, x);
        saw_correcting |=
            session.client.entity_state(&ENTITY) == Some(ReconciliationState::Correcting);
        previous = x;
    }

    assert!(saw_correcting);
    assert_eq!(previous, 2.0);
    assert_eq!(session.client.entity_state(&ENTITY), Some(ReconciliationState::Predicting));
    let events: Vec<SyncEvent> = session.client.take_events().collect();
    assert!(events.iter().any(|event| matches!(
        event,
        SyncEvent::CorrectionStarted { window, .. } if *window == Duration::from_millis(50)
    )));
    assert!(events
        .iter()
        .any(|event| matches!(event, SyncEvent::CorrectionFinished { .. })));
}

#[test]
fn teleport_snaps_in_a_single_tick() {
    let mut session = settled_session();
    session.server.world_mut().set_state(&ENTITY, at_rest(50.0));

    let frames = session.run_for(Duration::from_millis(200), TICK);

    let xs: Vec<f32> = frames.iter().map(|frame| frame[0].position.x).collect();
    assert!(xs.iter().all(|x| *x == 0.0 || *x == 50.0), "{:?}", xs);
    assert_eq!(*xs.last().unwrap(), 50.0);
    assert_eq!(session.client.diagnostics().excessive_drifts, 1);
    assert_eq!(session.client.entity_state(&ENTITY), Some(ReconciliationState::Predicting));
}

#[test]
fn unregistered_entity_is_no_longer_displayed() {
    let mut session = settled_session();

    session.client.unregister_entity(&ENTITY).unwrap();

    assert!(session.tick(TICK).is_empty());
    assert!(session.client.snapshot_buffer().latest(&ENTITY).is_none());

    // the host keeps sending it, and none of that is held on to
    session.run_for(Duration::from_millis(500), TICK);
    assert_eq!(session.client.snapshot_buffer().entity_count(), 0);
    assert!(session.client.diagnostics().unknown_entity_snapshots > 0);
}

#[test]
fn snapshots_from_unknown_entities_do_not_pile_up() {
    let mut session = settled_session();
    let buffer = session.client.snapshot_buffer();
    let status = session.status().unwrap();
    let now = session.now();
    for id in 0..100 {
        let stray = MovementSnapshot::new(EntityId::new(5000 + id), now, at_rest(1.0));
        let _ = session.client.receive_snapshot(&SyncSession::HOST, stray);
        let _ = buffer.insert(stray, &status);
    }

    session.run_for(Duration::from_secs(2), TICK);

    // only the registered entity is left
    assert_eq!(buffer.entity_count(), 1);
    assert_eq!(session.client.diagnostics().unknown_entity_snapshots, 100);
}
