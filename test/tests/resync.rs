//! Losing and regaining a peer: estimates are discarded and rebuilt from
//! fresh samples only, within the offline clock-sync window.

use std::time::Duration;

use kinesync_client::{ClientConfig, ConnectionState, SyncEvent};
use kinesync_server::ServerConfig;
use kinesync_shared::{ClockOffset, SyncOption};
use kinesync_test::{init_logging, LinkProfile, SyncSession};

const TICK: Duration = Duration::from_millis(10);

fn state(session: &SyncSession) -> Option<ConnectionState> {
    session.status().map(|status| status.state)
}

fn connected(session: &SyncSession) -> bool {
    state(session) == Some(ConnectionState::Connected)
}

#[test]
fn reconnect_replaces_estimate_instead_of_smoothing() {
    init_logging();
    let mut session = SyncSession::new(
        LinkProfile::steady(Duration::from_millis(100), ClockOffset::from_millis(200)),
        11,
    );
    session
        .run_until(Duration::from_secs(5), TICK, connected)
        .unwrap();

    // the host restarted: its clock now reads very differently
    session.link.set_host_offset(ClockOffset::from_millis(-3000));
    session.reconnect();

    let status = session.status().unwrap();
    assert_eq!(status.state, ConnectionState::Resyncing);
    assert!(!status.has_estimate);

    session
        .run_until(Duration::from_secs(5), TICK, connected)
        .unwrap();

    // no trace of the old 200ms offset survives
    assert_eq!(
        session.status().unwrap().offset,
        ClockOffset::from_millis(-3000)
    );
}

#[test]
fn reply_to_probe_sent_before_disconnect_is_ignored() {
    init_logging();
    let mut session = SyncSession::new(LinkProfile::default(), 2);
    session.tick(TICK);
    session.reconnect();

    session.run_for(Duration::from_millis(200), TICK);

    assert_eq!(session.client.diagnostics().unsolicited_replies, 1);
    assert!(session.status().unwrap().has_estimate);
}

#[test]
fn lost_link_goes_offline_then_recovers_on_its_own() {
    init_logging();
    let mut config = ClientConfig::default();
    config
        .sync
        .set(SyncOption::LatencyUpdatePeriod, 1.0)
        .unwrap();
    let mut session =
        SyncSession::with_config(config, ServerConfig::default(), LinkProfile::default(), 4);
    session
        .run_until(Duration::from_secs(5), TICK, connected)
        .unwrap();
    session.client.take_events();

    session.link.set_down(true);
    let offline = session.run_until(Duration::from_secs(10), TICK, |session| {
        state(session) == Some(ConnectionState::Offline)
    });
    assert!(offline.is_some());
    assert!(!session.status().unwrap().has_estimate);
    assert!(session.client.diagnostics().probe_timeouts >= 3);

    session.link.set_down(false);
    session
        .run_until(Duration::from_secs(10), TICK, connected)
        .unwrap();

    let transitions: Vec<ConnectionState> = session
        .client
        .take_events()
        .filter_map(|event| match event {
            SyncEvent::PeerStateChanged { to, .. } => Some(to),
            _ => None,
        })
        .collect();
    assert_eq!(
        transitions,
        vec![
            ConnectionState::Offline,
            ConnectionState::Resyncing,
            ConnectionState::Connected
        ]
    );
}

#[test]
fn unstable_peer_keeps_resyncing_with_widened_margin() {
    init_logging();
    let mut config = ClientConfig::default();
    config.sync.stable_sample_count = 10;
    config.sync.stable_offset_variance = 1.0e-9;
    let profile = LinkProfile {
        base_delay: Duration::from_millis(40),
        jitter: Duration::from_millis(30),
        host_offset: ClockOffset::from_millis(75),
    };
    let mut session = SyncSession::with_config(config, ServerConfig::default(), profile, 99);

    session.run_for(Duration::from_millis(5200), TICK);

    let status = session.status().unwrap();
    assert_eq!(status.state, ConnectionState::Resyncing);
    assert!(status.margin_widened);
    assert!(status.margin >= Duration::from_millis(100));
    assert!(session
        .client
        .take_events()
        .any(|event| matches!(event, SyncEvent::ResyncWindowExpired { .. })));
}
