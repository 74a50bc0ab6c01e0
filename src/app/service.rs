//! Node coordinator, the hexagonal core.
//!
//! [`Coordinator`] owns the trigger FSM, the enabled flag, the cooldown
//! clock, and the counters.  All I/O flows through the port traits bundled
//! in a [`Node`], passed in by `&mut` on every call, so the whole protocol
//! is testable with mock adapters on simulated time.
//!
//! ```text
//!  SensorPort    ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!  OverridePort  ──▶ │       Coordinator         │
//!  TransportPort ◀─▶ │  enable · dispatch · FSM  │ ──▶ ActuatorPort
//!  ClockPort     ──▶ └──────────────────────────┘
//! ```
//!
//! One call to [`Coordinator::run_cycle`] is one poll cycle:
//!
//! 1. sample the override and update the enabled state;
//! 2. drain at most one datagram and react to it;
//! 3. run the local trigger FSM until it is back in `Idle`.
//!
//! The caller sleeps the cycle period between calls.

use log::{debug, info, trace, warn};

use crate::config::NodeConfig;
use crate::fsm::context::{Action, FsmContext};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::protocol::{Inbound, Message, Role, RoleTags};

use super::events::{AppEvent, Episode, NodeStats, Origin, Outcome, TelemetryData};
use super::ports::{
    ActuatorPort, ClockPort, Colour, EventSink, MotorDirection, Node, OverridePort, SensorPort,
    TransportPort,
};

// ───────────────────────────────────────────────────────────────
// Cycle report
// ───────────────────────────────────────────────────────────────

/// What one poll cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Enabled state after the override sample.
    pub enabled: bool,
    /// Peer-initiated episode handled by this cycle's single receive.
    pub remote: Option<Episode>,
    /// Locally-initiated episode run to completion this cycle.
    pub local: Option<Episode>,
    /// Peer triggers served inline while we waited for our own ack.
    pub served_during_ack_wait: u32,
}

// ───────────────────────────────────────────────────────────────
// Actuation sequence
// ───────────────────────────────────────────────────────────────

/// Fixed motor pulse: reverse, then forward, then stop.  Not interruptible.
pub fn run_actuation(
    config: &NodeConfig,
    actuators: &mut impl ActuatorPort,
    clock: &mut impl ClockPort,
) {
    let duty = config.actuation_duty_percent;
    actuators.run_motor(duty, MotorDirection::Reverse);
    clock.delay_ms(config.reverse_pulse_ms);
    actuators.run_motor(duty, MotorDirection::Forward);
    clock.delay_ms(config.forward_pulse_ms);
    actuators.run_motor(0, MotorDirection::Stop);
}

// ───────────────────────────────────────────────────────────────
// Coordinator
// ───────────────────────────────────────────────────────────────

/// Per-node protocol engine.  One instance serves either role.
pub struct Coordinator {
    fsm: Fsm,
    ctx: FsmContext,
    tags: RoleTags,
    remote_colour: Colour,
    enabled: bool,
    stats: NodeStats,
    started_at_ms: u64,
    last_telemetry_ms: u64,
    served_in_wait: u32,
}

impl Coordinator {
    /// Construct the coordinator for `config.role`.
    ///
    /// Does **not** touch hardware; call [`start`](Self::start) next.
    pub fn new(config: NodeConfig) -> Self {
        let tags = RoleTags::for_role(config.role);
        let remote_colour = Colour::remote(config.role);
        Self {
            fsm: Fsm::new(build_state_table(), StateId::Idle),
            ctx: FsmContext::new(config),
            tags,
            remote_colour,
            enabled: true,
            stats: NodeStats::default(),
            started_at_ms: 0,
            last_telemetry_ms: 0,
            served_in_wait: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Put every output in its idle state and start the FSM.
    pub fn start(
        &mut self,
        node: &mut Node<
            impl SensorPort,
            impl ActuatorPort,
            impl OverridePort,
            impl TransportPort,
            impl ClockPort,
        >,
        sink: &mut impl EventSink,
    ) {
        node.actuators.run_motor(0, MotorDirection::Stop);
        node.actuators.indicate(Colour::OFF);
        node.actuators.set_disabled_indicator(false);

        let now = node.clock.now_ms();
        self.started_at_ms = now;
        self.last_telemetry_ms = now;
        self.ctx.now_ms = now;
        self.fsm.start(&mut self.ctx);

        sink.emit(&AppEvent::Started {
            role: self.tags.own,
            state: self.fsm.current_state(),
        });
        info!(
            "Coordinator started: node {} (peer {}), port {}",
            self.tags.own,
            self.tags.peer,
            self.ctx.config.udp_port
        );
    }

    // ── Per-cycle orchestration ───────────────────────────────

    /// Run one full poll cycle: override → one inbound datagram → local
    /// protocol.  Returns what happened.
    pub fn run_cycle(
        &mut self,
        node: &mut Node<
            impl SensorPort,
            impl ActuatorPort,
            impl OverridePort,
            impl TransportPort,
            impl ClockPort,
        >,
        sink: &mut impl EventSink,
    ) -> CycleReport {
        self.stats.cycles += 1;
        self.served_in_wait = 0;

        self.update_enablement(node, sink);
        let remote = self.dispatch_inbound(node, sink);
        let local = self.run_local_protocol(node, sink);
        self.maybe_emit_telemetry(node.clock.now_ms(), sink);

        CycleReport {
            enabled: self.enabled,
            remote,
            local,
            served_during_ack_wait: self.served_in_wait,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn role(&self) -> Role {
        self.tags.own
    }

    /// Override not asserted at the last sample.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current FSM state (always `Idle` between cycles).
    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    /// Completion time of the last local episode.
    pub fn last_trigger_ms(&self) -> Option<u64> {
        self.ctx.last_trigger_ms
    }

    pub fn stats(&self) -> &NodeStats {
        &self.stats
    }

    pub fn config(&self) -> &NodeConfig {
        &self.ctx.config
    }

    /// Build a telemetry snapshot as of `now_ms`.
    pub fn build_telemetry(&self, now_ms: u64) -> TelemetryData {
        TelemetryData {
            role: self.tags.own,
            uptime_secs: now_ms.saturating_sub(self.started_at_ms) / 1_000,
            enabled: self.enabled,
            stats: self.stats,
        }
    }

    // ── Internal: enablement ──────────────────────────────────

    fn update_enablement(
        &mut self,
        node: &mut Node<
            impl SensorPort,
            impl ActuatorPort,
            impl OverridePort,
            impl TransportPort,
            impl ClockPort,
        >,
        sink: &mut impl EventSink,
    ) {
        let overridden = node.override_input.is_overridden();
        node.actuators.set_disabled_indicator(overridden);

        let enabled = !overridden;
        if enabled != self.enabled {
            self.enabled = enabled;
            if enabled {
                info!("Override released: node {} enabled", self.tags.own);
            } else {
                info!("Override asserted: node {} disabled", self.tags.own);
            }
            sink.emit(&AppEvent::EnableChanged { enabled });
        }
    }

    // ── Internal: inbound dispatch ────────────────────────────

    fn dispatch_inbound(
        &mut self,
        node: &mut Node<
            impl SensorPort,
            impl ActuatorPort,
            impl OverridePort,
            impl TransportPort,
            impl ClockPort,
        >,
        sink: &mut impl EventSink,
    ) -> Option<Episode> {
        let payload = node.transport.recv()?;
        match self.tags.classify(&payload) {
            Inbound::PeerTrigger => Some(self.serve_peer_trigger(node, sink, false)),
            other => {
                self.drop_inbound(other, &payload, sink);
                None
            }
        }
    }

    /// Account for a datagram the current phase does not act on.
    fn drop_inbound(&mut self, inbound: Inbound, payload: &[u8], sink: &mut impl EventSink) {
        match inbound {
            Inbound::SelfEcho(msg) => {
                self.stats.self_echoes_dropped += 1;
                trace!("RX | dropped self echo {}", msg);
            }
            Inbound::PeerAck => {
                self.stats.stale_acks_dropped += 1;
                debug!("RX | {} outside ack window, dropped", self.tags.peer_ack());
                sink.emit(&AppEvent::StaleAckDropped);
            }
            Inbound::PeerTrigger => {
                self.stats.triggers_dropped_in_ack_wait += 1;
                debug!("RX | peer trigger during ack wait, dropped");
            }
            Inbound::Unknown => {
                self.stats.unknown_dropped += 1;
                trace!("RX | dropped {} unrecognised bytes", payload.len());
            }
        }
    }

    /// Peer asked us to actuate.
    ///
    /// Inline service during our own ack wait skips the colour and the
    /// hold so the ack deadline keeps its meaning.
    fn serve_peer_trigger(
        &mut self,
        node: &mut Node<
            impl SensorPort,
            impl ActuatorPort,
            impl OverridePort,
            impl TransportPort,
            impl ClockPort,
        >,
        sink: &mut impl EventSink,
        during_ack_wait: bool,
    ) -> Episode {
        if !self.enabled {
            self.stats.remote_ignored += 1;
            info!("RX | peer trigger ignored, node {} disabled", self.tags.own);
            sink.emit(&AppEvent::PeerTriggerIgnored);
            return self.finish_episode(Origin::Remote, Outcome::IgnoredDisabled, sink);
        }

        info!("RX | peer trigger, actuating");
        if !during_ack_wait {
            node.actuators.indicate(self.remote_colour);
        }
        run_actuation(&self.ctx.config, &mut node.actuators, &mut node.clock);

        // The ack goes out only after the motor has stopped.
        let ack = self.tags.own_ack();
        if self.send(&mut node.transport, ack, sink) {
            sink.emit(&AppEvent::AckSent(ack));
        }
        self.stats.remote_served += 1;
        sink.emit(&AppEvent::PeerTriggerServed { during_ack_wait });

        if during_ack_wait {
            self.served_in_wait += 1;
        } else {
            node.clock.delay_ms(self.ctx.config.indicator_hold_ms);
            node.actuators.indicate(Colour::OFF);
        }
        self.finish_episode(Origin::Remote, Outcome::Acked, sink)
    }

    // ── Internal: local protocol ──────────────────────────────

    /// Tick the FSM from `Idle`, performing each requested action, until
    /// it is back in `Idle`.
    fn run_local_protocol(
        &mut self,
        node: &mut Node<
            impl SensorPort,
            impl ActuatorPort,
            impl OverridePort,
            impl TransportPort,
            impl ClockPort,
        >,
        sink: &mut impl EventSink,
    ) -> Option<Episode> {
        self.ctx.enabled = self.enabled;
        self.step(node.clock.now_ms(), sink);

        while self.fsm.current_state() != StateId::Idle {
            match self.ctx.action {
                Action::Measure => {
                    self.ctx.distance_cm = node.sensor.measure();
                    if self.ctx.object_in_range() {
                        let distance_cm = self.ctx.distance_cm.unwrap_or_default();
                        sink.emit(&AppEvent::DistanceTriggered { distance_cm });
                    }
                }
                Action::ActuateAndBroadcast => self.detect_and_broadcast(node, sink),
                Action::PollAck => self.poll_ack(node, sink),
                Action::ShowOutcome => {
                    node.actuators.indicate(self.ctx.indicator);
                    node.clock.delay_ms(self.ctx.config.indicator_hold_ms);
                    node.actuators.indicate(Colour::OFF);
                }
                Action::None => {}
            }
            self.step(node.clock.now_ms(), sink);
        }

        let outcome = self.ctx.outcome.take()?;
        Some(self.finish_episode(Origin::Local, outcome, sink))
    }

    /// One FSM tick at `now_ms`, reporting any transition.
    fn step(&mut self, now_ms: u64, sink: &mut impl EventSink) {
        self.ctx.now_ms = now_ms;
        let from = self.fsm.current_state();
        self.fsm.tick(&mut self.ctx);
        let to = self.fsm.current_state();
        if from == to {
            return;
        }

        sink.emit(&AppEvent::StateChanged { from, to });
        match to {
            StateId::Success => {
                self.stats.acks_received += 1;
                sink.emit(&AppEvent::AckReceived {
                    after_ms: self.ctx.ack_wait_elapsed_ms(),
                });
            }
            StateId::Timeout => {
                self.stats.ack_timeouts += 1;
                sink.emit(&AppEvent::AckTimedOut {
                    waited_ms: self.ctx.ack_wait_elapsed_ms(),
                });
            }
            _ => {}
        }
    }

    /// Detect colour, actuate, hold out the rest of the detect time, clear,
    /// then broadcast our trigger.
    fn detect_and_broadcast(
        &mut self,
        node: &mut Node<
            impl SensorPort,
            impl ActuatorPort,
            impl OverridePort,
            impl TransportPort,
            impl ClockPort,
        >,
        sink: &mut impl EventSink,
    ) {
        let shown_at = node.clock.now_ms();
        node.actuators.indicate(self.ctx.indicator);
        run_actuation(&self.ctx.config, &mut node.actuators, &mut node.clock);

        let elapsed = node.clock.now_ms().saturating_sub(shown_at);
        let hold = u64::from(self.ctx.config.indicator_hold_ms);
        if elapsed < hold {
            node.clock.delay_ms((hold - elapsed) as u32);
        }
        node.actuators.indicate(Colour::OFF);

        let trigger = self.tags.own_trigger();
        if self.send(&mut node.transport, trigger, sink) {
            self.stats.triggers_sent += 1;
            info!("TX | {} broadcast, awaiting {}", trigger, self.tags.peer_ack());
            sink.emit(&AppEvent::TriggerSent(trigger));
        }
    }

    /// One bounded receive inside the ack window.
    fn poll_ack(
        &mut self,
        node: &mut Node<
            impl SensorPort,
            impl ActuatorPort,
            impl OverridePort,
            impl TransportPort,
            impl ClockPort,
        >,
        sink: &mut impl EventSink,
    ) {
        let Some(payload) = node.transport.recv() else {
            return;
        };
        match self.tags.classify(&payload) {
            Inbound::PeerAck => self.ctx.ack_received = true,
            Inbound::PeerTrigger if self.ctx.config.service_peer_during_ack_wait => {
                self.serve_peer_trigger(node, sink, true);
            }
            other => self.drop_inbound(other, &payload, sink),
        }
    }

    // ── Internal: helpers ─────────────────────────────────────

    /// Broadcast `msg`; failures are counted and reported, never fatal.
    fn send(
        &mut self,
        transport: &mut impl TransportPort,
        msg: Message,
        sink: &mut impl EventSink,
    ) -> bool {
        match transport.send(msg.as_bytes()) {
            Ok(()) => true,
            Err(error) => {
                self.stats.send_failures += 1;
                warn!("TX | {} failed: {}", msg, error);
                sink.emit(&AppEvent::SendFailed {
                    message: msg,
                    error,
                });
                false
            }
        }
    }

    fn finish_episode(
        &mut self,
        origin: Origin,
        outcome: Outcome,
        sink: &mut impl EventSink,
    ) -> Episode {
        let episode = Episode { origin, outcome };
        sink.emit(&AppEvent::EpisodeFinished(episode));
        episode
    }

    fn maybe_emit_telemetry(&mut self, now_ms: u64, sink: &mut impl EventSink) {
        let interval = u64::from(self.ctx.config.telemetry_interval_secs) * 1_000;
        if now_ms.saturating_sub(self.last_telemetry_ms) >= interval {
            self.last_telemetry_ms = now_ms;
            sink.emit(&AppEvent::Telemetry(self.build_telemetry(now_ms)));
        }
    }
}
