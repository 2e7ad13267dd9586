//! Clock estimation end to end: an observer sampling a host over a simulated
//! link should recover the host's clock offset and round trip.

use std::time::Duration;

use proptest::prelude::*;

use kinesync_client::{ClockSample, ConnectionState, PeerClock, ReconciliationPolicy};
use kinesync_shared::{ClockOffset, GameInstant, PeerId, SyncConfig};
use kinesync_test::{init_logging, LinkProfile, SyncSession};

const TICK: Duration = Duration::from_millis(10);

fn connected(session: &SyncSession) -> bool {
    session.status().map(|status| status.state) == Some(ConnectionState::Connected)
}

#[test]
fn steady_link_connects_with_half_round_trip_margin() {
    init_logging();
    let offset = ClockOffset::from_millis(1500);
    let mut session = SyncSession::new(
        LinkProfile::steady(Duration::from_millis(100), offset),
        7,
    );

    let took = session.run_until(Duration::from_secs(5), TICK, connected);

    assert!(took.is_some(), "peer should stabilize within the resync window");
    let status = session.status().unwrap();
    assert_eq!(status.rtt, Duration::from_millis(100));
    assert_eq!(status.offset, offset);
    assert_eq!(status.margin, Duration::from_millis(50));
    assert!(!status.margin_widened);
    assert_eq!(
        ReconciliationPolicy::default().blend_window(status.margin),
        Duration::from_millis(50)
    );
}

#[test]
fn connected_peer_probes_at_normal_period() {
    init_logging();
    let mut session = SyncSession::new(LinkProfile::default(), 3);
    session
        .run_until(Duration::from_secs(5), TICK, connected)
        .unwrap();
    let answered = session.server.probes_answered();

    session.run_for(Duration::from_millis(9000), TICK);

    // one probe per 10s once connected, and the next is not yet due
    assert_eq!(session.server.probes_answered(), answered);
    session.run_for(Duration::from_millis(1500), TICK);
    assert_eq!(session.server.probes_answered(), answered + 1);
}

#[test]
fn unanswered_probes_raise_timeouts() {
    init_logging();
    let mut session = SyncSession::new(LinkProfile::default(), 5);
    session.link.set_down(true);

    session.run_for(Duration::from_secs(2), TICK);

    // accelerated probes every 250ms, each timing out after 750ms
    let diagnostics = session.client.diagnostics();
    assert!(diagnostics.probe_timeouts >= 3);
    assert!(session.link.dropped() >= 6);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn offset_estimate_stays_within_half_the_jitter(
        base_ms in 5u64..120,
        jitter_ms in 0u64..40,
        offset_ms in -5000i64..5000,
        seed in any::<u64>(),
    ) {
        let profile = LinkProfile {
            base_delay: Duration::from_millis(base_ms),
            jitter: Duration::from_millis(jitter_ms),
            host_offset: ClockOffset::from_millis(offset_ms),
        };
        let mut session = SyncSession::new(profile, seed);

        session.run_for(Duration::from_secs(3), TICK);

        let status = session.status().unwrap();
        prop_assert!(status.has_estimate);
        let error = (status.offset.as_micros() - offset_ms * 1000).abs();
        let bound = (jitter_ms * 1000 / 2) as i64 + 2;
        prop_assert!(error <= bound, "offset error {}us exceeds {}us", error, bound);
    }

    #[test]
    fn smoothed_offset_converges_after_a_bad_start(
        offset_ms in -5000i64..5000,
        initial_error_ms in -2000i64..2000,
        jitter_us in 0i64..40_000,
        delays in prop::collection::vec((0.0f64..=1.0, 0.0f64..=1.0), 40..200),
    ) {
        let config = SyncConfig::default();
        let mut clock = PeerClock::new(&config);
        let peer_id = PeerId::new(1);
        let offset = ClockOffset::from_millis(offset_ms);

        // a replacement estimate that is badly off, then back to smoothing
        clock.begin_replacing();
        clock.update(&ClockSample {
            peer_id,
            send_time: GameInstant::EPOCH,
            receive_time: GameInstant::from_millis(100),
            remote_time: GameInstant::from_millis(50)
                + ClockOffset::from_millis(offset_ms + initial_error_ms),
        });
        clock.finish_replacing();

        let mut send_time = GameInstant::from_secs_f64(10.0);
        for (outbound, inbound) in &delays {
            let outbound = 20_000 + (outbound * jitter_us as f64) as i64;
            let inbound = 20_000 + (inbound * jitter_us as f64) as i64;
            clock.update(&ClockSample {
                peer_id,
                send_time,
                receive_time: send_time + ClockOffset::from_micros(outbound + inbound),
                remote_time: send_time + ClockOffset::from_micros(outbound) + offset,
            });
            send_time = send_time + ClockOffset::from_millis(10_000);
        }

        // each sample is off by at most half the jitter; what is left of the
        // bad start shrinks by (1 - weight) per sample
        let decay = (1.0 - config.smoothing_factor).powi(delays.len() as i32);
        let bound = decay * (initial_error_ms.abs() * 1000) as f64 + (jitter_us / 2) as f64 + 3.0;
        let error = (clock.offset().as_micros() - offset.as_micros()).abs() as f64;
        prop_assert!(error <= bound, "offset error {}us exceeds {}us", error, bound);
    }
}
