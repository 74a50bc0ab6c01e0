//! Coordinator behaviour against mock adapters on simulated time.
//!
//! Timeline reference for a default node A that sees an object on its
//! first cycle: the cycle's receive times out at 200 ms, the reading is
//! taken at 200, the detect colour holds until 2200 when `A_trigger` goes
//! out, and the ack window closes at 7200.

use crosstrigger::adapters::wifi::{LinkState, WifiLink};
use crosstrigger::app::events::{AppEvent, Episode, Origin, Outcome};
use crosstrigger::app::ports::{ClockPort, Colour, LinkPort, MotorDirection};
use crosstrigger::app::service::{Coordinator, CycleReport};
use crosstrigger::config::NodeConfig;
use crosstrigger::fsm::StateId;
use crosstrigger::protocol::Role;

use crate::mock_hw::{AutoReply, MockNode, RecordingSink, SimTime, mock_node};

fn setup(config: NodeConfig) -> (Coordinator, MockNode, SimTime, RecordingSink) {
    let (mut node, time) = mock_node(&config);
    let mut sink = RecordingSink::default();
    let mut coordinator = Coordinator::new(config);
    coordinator.start(&mut node, &mut sink);
    node.actuators.clear();
    (coordinator, node, time, sink)
}

/// One poll cycle followed by the cycle-period sleep, as the firmware loop does.
fn cycle(c: &mut Coordinator, node: &mut MockNode, sink: &mut RecordingSink) -> CycleReport {
    let report = c.run_cycle(node, sink);
    let period = c.config().cycle_period_ms;
    node.clock.delay_ms(period);
    report
}

fn ack_after(ms: u64) -> AutoReply {
    AutoReply {
        on_send: b"A_trigger",
        reply: b"B_ack",
        after_ms: ms,
    }
}

const LOCAL_ACKED: Episode = Episode {
    origin: Origin::Local,
    outcome: Outcome::Acked,
};
const LOCAL_TIMED_OUT: Episode = Episode {
    origin: Origin::Local,
    outcome: Outcome::TimedOut,
};

// ── Start-up ──────────────────────────────────────────────────

#[test]
fn start_parks_outputs_and_reports_idle() {
    let config = NodeConfig::default();
    let (mut node, _) = mock_node(&config);
    let mut sink = RecordingSink::default();
    let mut c = Coordinator::new(config);
    c.start(&mut node, &mut sink);

    assert_eq!(node.actuators.motor_calls(), vec![(0, MotorDirection::Stop)]);
    assert_eq!(node.actuators.colours(), vec![(0, Colour::OFF)]);
    assert_eq!(node.actuators.last_disabled_led(), Some(false));
    assert_eq!(
        sink.events,
        vec![AppEvent::Started {
            role: Role::A,
            state: StateId::Idle
        }]
    );
}

// ── Local episode ─────────────────────────────────────────────

#[test]
fn near_reading_broadcasts_exactly_one_trigger() {
    let (mut c, mut node, _, mut sink) = setup(NodeConfig::default());
    node.sensor.push(Some(30.0));

    let report = cycle(&mut c, &mut node, &mut sink);

    assert_eq!(report.local, Some(LOCAL_TIMED_OUT));
    assert_eq!(node.transport.sent_payloads(), vec![b"A_trigger".as_slice()]);
    assert_eq!(c.stats().triggers_sent, 1);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::DistanceTriggered { .. })),
        1
    );
}

#[test]
fn far_or_missing_reading_does_nothing() {
    let (mut c, mut node, _, mut sink) = setup(NodeConfig::default());
    node.sensor.push(Some(50.0));
    node.sensor.push(None);
    node.sensor.push(Some(400.0));

    for _ in 0..3 {
        let report = cycle(&mut c, &mut node, &mut sink);
        assert_eq!(report.local, None);
    }
    assert_eq!(node.sensor.samples, 3);
    assert!(node.transport.sent.is_empty());
    assert_eq!(node.actuators.actuations(), 0);
    assert_eq!(c.last_trigger_ms(), None);
}

#[test]
fn actuation_precedes_trigger_and_detect_colour_holds() {
    let (mut c, mut node, _, mut sink) = setup(NodeConfig::default());
    node.sensor.push(Some(30.0));
    cycle(&mut c, &mut node, &mut sink);

    assert_eq!(
        node.actuators.motor_calls(),
        vec![
            (200, MotorDirection::Reverse),
            (1_000, MotorDirection::Forward),
            (1_100, MotorDirection::Stop),
        ]
    );
    let colours = node.actuators.colours();
    assert_eq!(colours[0], (200, Colour::DETECTING));
    assert_eq!(colours[1], (2_200, Colour::OFF));
    assert_eq!(node.transport.sent_at(b"A_trigger"), Some(2_200));
}

#[test]
fn ack_within_window_succeeds() {
    let (mut c, mut node, time, mut sink) = setup(NodeConfig::default());
    node.transport.auto_reply = Some(ack_after(1_000));
    node.sensor.push(Some(30.0));

    let report = cycle(&mut c, &mut node, &mut sink);

    assert_eq!(report.local, Some(LOCAL_ACKED));
    assert!(sink.events.contains(&AppEvent::AckReceived { after_ms: 1_000 }));
    assert_eq!(c.stats().acks_received, 1);
    assert_eq!(c.stats().ack_timeouts, 0);

    // Green from the ack until the hold runs out, then off.
    let colours = node.actuators.colours();
    let n = colours.len();
    assert_eq!(colours[n - 2], (3_200, Colour::SUCCESS));
    assert_eq!(colours[n - 1], (5_200, Colour::OFF));

    // Cooldown runs from the end of the episode.
    assert_eq!(c.last_trigger_ms(), Some(5_200));
    assert_eq!(c.state(), StateId::Idle);
    assert_eq!(time.now(), 5_300);
}

#[test]
fn missing_ack_times_out_within_bound() {
    let config = NodeConfig::default();
    let bound = u64::from(config.ack_timeout_ms + config.recv_timeout_ms);
    let (mut c, mut node, _, mut sink) = setup(config);
    node.sensor.push(Some(30.0));

    let report = cycle(&mut c, &mut node, &mut sink);
    assert_eq!(report.local, Some(LOCAL_TIMED_OUT));

    let waited = sink
        .events
        .iter()
        .find_map(|e| match e {
            AppEvent::AckTimedOut { waited_ms } => Some(*waited_ms),
            _ => None,
        })
        .unwrap();
    assert!(waited >= 5_000 && waited <= bound, "waited {waited} ms");

    let sent = node.transport.sent_at(b"A_trigger").unwrap();
    let (red_at, _) = node
        .actuators
        .colours()
        .into_iter()
        .find(|(_, c)| *c == Colour::FAILURE)
        .unwrap();
    assert!(red_at - sent <= bound);
    assert_eq!(c.stats().ack_timeouts, 1);
    assert_eq!(c.last_trigger_ms(), Some(red_at + 2_000));
}

#[test]
fn ack_just_past_the_window_is_a_timeout() {
    let (mut c, mut node, _, mut sink) = setup(NodeConfig::default());
    node.transport.auto_reply = Some(ack_after(5_200));
    node.sensor.push(Some(30.0));

    let report = cycle(&mut c, &mut node, &mut sink);
    assert_eq!(report.local, Some(LOCAL_TIMED_OUT));
    assert_eq!(c.stats().acks_received, 0);

    // The late ack surfaces on the next cycle and is dropped as stale.
    let report = cycle(&mut c, &mut node, &mut sink);
    assert_eq!(report.remote, None);
    assert_eq!(c.stats().stale_acks_dropped, 1);
    assert_eq!(sink.count(|e| *e == AppEvent::StaleAckDropped), 1);
}

// ── Cooldown ──────────────────────────────────────────────────

#[test]
fn cooldown_suppresses_sensing_until_strictly_elapsed() {
    let (mut c, mut node, time, mut sink) = setup(NodeConfig::default());
    node.transport.auto_reply = Some(ack_after(1_000));
    node.sensor.fallback = Some(30.0);

    cycle(&mut c, &mut node, &mut sink);
    let finished = c.last_trigger_ms().unwrap();
    assert_eq!(node.sensor.samples, 1);

    // Every FSM tick of these cycles lands at or before finished + cooldown.
    while time.now() + 200 <= finished + 5_000 {
        let report = cycle(&mut c, &mut node, &mut sink);
        assert_eq!(report.local, None);
    }
    assert_eq!(node.sensor.samples, 1);
    assert_eq!(node.transport.count_sent(b"A_trigger"), 1);

    let mut second = None;
    for _ in 0..3 {
        if let Some(ep) = cycle(&mut c, &mut node, &mut sink).local {
            second = Some(ep);
            break;
        }
    }
    assert_eq!(second, Some(LOCAL_ACKED));
    assert_eq!(node.transport.count_sent(b"A_trigger"), 2);

    let resent = node.transport.sent[1].0;
    assert!(resent - 2_000 > finished + 5_000);
}

#[test]
fn timed_out_episode_also_starts_cooldown() {
    let (mut c, mut node, _, mut sink) = setup(NodeConfig::default());
    node.sensor.fallback = Some(30.0);

    cycle(&mut c, &mut node, &mut sink);
    let finished = c.last_trigger_ms().unwrap();
    let report = cycle(&mut c, &mut node, &mut sink);

    assert_eq!(report.local, None);
    assert_eq!(c.last_trigger_ms(), Some(finished));
    assert_eq!(node.sensor.samples, 1);
}

// ── Self echo ─────────────────────────────────────────────────

#[test]
fn own_tags_never_cause_a_response() {
    let (mut c, mut node, _, mut sink) = setup(NodeConfig::default());
    node.transport.deliver(b"A_trigger");
    node.transport.deliver(b"A_ack");

    for _ in 0..2 {
        let report = cycle(&mut c, &mut node, &mut sink);
        assert_eq!(report.remote, None);
    }

    assert_eq!(node.actuators.actuations(), 0);
    assert!(node.transport.sent.is_empty());
    assert_eq!(c.stats().self_echoes_dropped, 2);
}

#[test]
fn looped_back_trigger_is_not_mistaken_for_ack() {
    let (mut c, mut node, _, mut sink) = setup(NodeConfig::default());
    node.transport.loopback = true;
    node.sensor.push(Some(30.0));

    let report = cycle(&mut c, &mut node, &mut sink);

    assert_eq!(report.local, Some(LOCAL_TIMED_OUT));
    assert_eq!(node.actuators.actuations(), 1);
    assert_eq!(node.transport.count_sent(b"A_ack"), 0);
    assert_eq!(c.stats().self_echoes_dropped, 1);
}

#[test]
fn unknown_payloads_are_counted_and_ignored() {
    let (mut c, mut node, _, mut sink) = setup(NodeConfig::default());
    node.transport.deliver(b"hello");
    node.transport.deliver(b"B_trigger\n");

    cycle(&mut c, &mut node, &mut sink);
    cycle(&mut c, &mut node, &mut sink);

    assert_eq!(c.stats().unknown_dropped, 2);
    assert_eq!(node.actuators.actuations(), 0);
    assert!(node.transport.sent.is_empty());
}

// ── Peer triggers ─────────────────────────────────────────────

#[test]
fn peer_trigger_actuates_then_acks() {
    let (mut c, mut node, _, mut sink) = setup(NodeConfig::default());
    node.transport.deliver(b"B_trigger");

    let report = cycle(&mut c, &mut node, &mut sink);

    assert_eq!(
        report.remote,
        Some(Episode {
            origin: Origin::Remote,
            outcome: Outcome::Acked
        })
    );
    assert_eq!(
        node.actuators.motor_calls(),
        vec![
            (0, MotorDirection::Reverse),
            (800, MotorDirection::Forward),
            (900, MotorDirection::Stop),
        ]
    );
    assert_eq!(node.transport.sent_payloads(), vec![b"A_ack".as_slice()]);
    assert_eq!(node.transport.sent_at(b"A_ack"), Some(900));

    let colours = node.actuators.colours();
    assert_eq!(colours[0], (0, Colour::remote(Role::A)));
    assert_eq!(colours[1], (2_900, Colour::OFF));
    assert_eq!(c.stats().remote_served, 1);

    // Serving the peer does not touch our own cooldown.
    assert_eq!(c.last_trigger_ms(), None);
}

#[test]
fn node_b_answers_with_its_own_tags() {
    let (mut c, mut node, _, mut sink) = setup(NodeConfig::for_role(Role::B));
    node.transport.deliver(b"A_trigger");

    cycle(&mut c, &mut node, &mut sink);

    assert_eq!(node.transport.sent_payloads(), vec![b"B_ack".as_slice()]);
    assert_eq!(node.actuators.colours()[0].1, Colour::remote(Role::B));
}

#[test]
fn each_peer_trigger_gets_one_ack() {
    let (mut c, mut node, _, mut sink) = setup(NodeConfig::default());
    for at in [0, 5_000, 10_000] {
        node.transport.deliver_at(at, b"B_trigger");
    }

    while node.transport.pending() > 0 {
        cycle(&mut c, &mut node, &mut sink);
    }

    assert_eq!(node.transport.count_sent(b"A_ack"), 3);
    assert_eq!(node.actuators.actuations(), 3);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::PeerTriggerServed { during_ack_wait: false })),
        3
    );
}

// ── Override ──────────────────────────────────────────────────

#[test]
fn disabled_node_ignores_peer_trigger() {
    let (mut c, mut node, _, mut sink) = setup(NodeConfig::default());
    node.override_input.pressed = true;
    node.transport.deliver(b"B_trigger");

    let report = cycle(&mut c, &mut node, &mut sink);

    assert!(!report.enabled);
    assert_eq!(
        report.remote,
        Some(Episode {
            origin: Origin::Remote,
            outcome: Outcome::IgnoredDisabled
        })
    );
    assert_eq!(node.actuators.motor_calls(), vec![]);
    assert!(node.transport.sent.is_empty());
    assert_eq!(c.stats().remote_ignored, 1);
    assert_eq!(sink.count(|e| *e == AppEvent::PeerTriggerIgnored), 1);
}

#[test]
fn disabled_node_does_not_sense() {
    let (mut c, mut node, _, mut sink) = setup(NodeConfig::default());
    node.override_input.pressed = true;
    node.sensor.fallback = Some(10.0);

    for _ in 0..5 {
        cycle(&mut c, &mut node, &mut sink);
    }

    assert_eq!(node.sensor.samples, 0);
    assert!(node.transport.sent.is_empty());
    assert_eq!(node.actuators.last_disabled_led(), Some(true));
}

#[test]
fn enable_changes_are_reported_on_edges_only() {
    let (mut c, mut node, _, mut sink) = setup(NodeConfig::default());

    cycle(&mut c, &mut node, &mut sink);
    node.override_input.pressed = true;
    for _ in 0..3 {
        cycle(&mut c, &mut node, &mut sink);
    }
    assert!(!c.is_enabled());
    node.override_input.pressed = false;
    for _ in 0..3 {
        cycle(&mut c, &mut node, &mut sink);
    }

    let changes: Vec<_> = sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::EnableChanged { .. }))
        .cloned()
        .collect();
    assert_eq!(
        changes,
        vec![
            AppEvent::EnableChanged { enabled: false },
            AppEvent::EnableChanged { enabled: true },
        ]
    );
    assert!(c.is_enabled());
    assert_eq!(node.actuators.last_disabled_led(), Some(false));
}

#[test]
fn release_resumes_sensing() {
    let (mut c, mut node, _, mut sink) = setup(NodeConfig::default());
    node.override_input.pressed = true;
    node.sensor.fallback = Some(10.0);
    cycle(&mut c, &mut node, &mut sink);

    node.override_input.pressed = false;
    let report = cycle(&mut c, &mut node, &mut sink);

    assert!(report.enabled);
    assert_eq!(report.local, Some(LOCAL_TIMED_OUT));
    assert_eq!(node.sensor.samples, 1);
}

/// Station link upkeep runs after the cycle, so it acts on the enable
/// state sampled in that same cycle.
#[test]
fn station_link_follows_override_in_the_same_cycle() {
    let config = NodeConfig::for_role(Role::B);
    let mut link = WifiLink::new(Role::B, config.link.clone()).unwrap();
    let (mut c, mut node, _, mut sink) = setup(config);

    let report = cycle(&mut c, &mut node, &mut sink);
    link.maintain(c.is_enabled()).unwrap();
    assert!(report.enabled);
    assert_eq!(link.state(), LinkState::Connected);

    node.override_input.pressed = true;
    let report = cycle(&mut c, &mut node, &mut sink);
    link.maintain(c.is_enabled()).unwrap();
    assert!(!report.enabled);
    assert_eq!(link.state(), LinkState::Down);
    assert_eq!(link.local_ip(), None);

    node.override_input.pressed = false;
    cycle(&mut c, &mut node, &mut sink);
    link.maintain(c.is_enabled()).unwrap();
    assert_eq!(link.state(), LinkState::Connected);
}

// ── Ack-wait arrivals ─────────────────────────────────────────

#[test]
fn peer_trigger_during_ack_wait_is_dropped_by_default() {
    let (mut c, mut node, _, mut sink) = setup(NodeConfig::default());
    node.sensor.push(Some(30.0));
    node.transport.deliver_at(3_000, b"B_trigger");

    let report = cycle(&mut c, &mut node, &mut sink);

    assert_eq!(report.local, Some(LOCAL_TIMED_OUT));
    assert_eq!(report.served_during_ack_wait, 0);
    assert_eq!(node.actuators.actuations(), 1);
    assert_eq!(node.transport.count_sent(b"A_ack"), 0);
    assert_eq!(c.stats().triggers_dropped_in_ack_wait, 1);
}

#[test]
fn peer_trigger_during_ack_wait_can_be_served_inline() {
    let mut config = NodeConfig::default();
    config.service_peer_during_ack_wait = true;
    let (mut c, mut node, _, mut sink) = setup(config);
    node.sensor.push(Some(30.0));
    node.transport.auto_reply = Some(ack_after(2_000));
    node.transport.deliver_at(3_000, b"B_trigger");

    let report = cycle(&mut c, &mut node, &mut sink);

    assert_eq!(report.local, Some(LOCAL_ACKED));
    assert_eq!(report.served_during_ack_wait, 1);
    assert_eq!(node.actuators.actuations(), 2);
    assert_eq!(node.transport.sent_at(b"A_ack"), Some(3_900));
    assert!(
        node.actuators
            .colours()
            .iter()
            .all(|(_, colour)| *colour != Colour::remote(Role::A)),
        "inline service shows no remote colour"
    );
    assert!(sink.events.contains(&AppEvent::PeerTriggerServed {
        during_ack_wait: true
    }));
}

#[test]
fn stale_ack_while_idle_is_dropped() {
    let (mut c, mut node, _, mut sink) = setup(NodeConfig::default());
    node.transport.deliver(b"B_ack");

    let report = cycle(&mut c, &mut node, &mut sink);

    assert_eq!(report.remote, None);
    assert_eq!(report.local, None);
    assert_eq!(c.stats().stale_acks_dropped, 1);
    assert_eq!(node.actuators.actuations(), 0);
}

// ── Failures and telemetry ────────────────────────────────────

#[test]
fn send_failure_is_counted_and_episode_still_completes() {
    let (mut c, mut node, _, mut sink) = setup(NodeConfig::default());
    node.transport.fail_sends = true;
    node.sensor.push(Some(30.0));

    let report = cycle(&mut c, &mut node, &mut sink);

    assert_eq!(report.local, Some(LOCAL_TIMED_OUT));
    assert_eq!(c.stats().send_failures, 1);
    assert_eq!(c.stats().triggers_sent, 0);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::SendFailed { .. })),
        1
    );
    assert!(c.last_trigger_ms().is_some());
}

#[test]
fn telemetry_is_emitted_once_per_interval() {
    let (mut c, mut node, time, mut sink) = setup(NodeConfig::default());

    while time.now() < 125_000 {
        cycle(&mut c, &mut node, &mut sink);
    }

    let reports: Vec<_> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::Telemetry(t) => Some(*t),
            _ => None,
        })
        .collect();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].uptime_secs, 60);
    assert_eq!(reports[1].uptime_secs, 120);
    assert!(reports[1].stats.cycles > reports[0].stats.cycles);
    assert_eq!(reports[1].role, Role::A);
}

#[test]
fn every_cycle_returns_to_idle() {
    let (mut c, mut node, _, mut sink) = setup(NodeConfig::default());
    node.sensor.fallback = Some(20.0);
    node.transport.auto_reply = Some(ack_after(500));
    node.transport.deliver_at(9_000, b"B_trigger");

    for _ in 0..40 {
        cycle(&mut c, &mut node, &mut sink);
        assert_eq!(c.state(), StateId::Idle);
    }
    assert_eq!(c.stats().cycles, 40);
}
