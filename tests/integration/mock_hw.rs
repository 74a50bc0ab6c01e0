//! Mock adapters on simulated time.
//!
//! Every mock shares one [`SimTime`]; delays and empty receives advance it,
//! so a full episode (seconds of wall time on hardware) runs instantly.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use crosstrigger::app::events::AppEvent;
use crosstrigger::app::ports::{
    ActuatorPort, ClockPort, Colour, EventSink, MotorDirection, Node, OverridePort, Payload,
    SensorPort, TransportPort,
};
use crosstrigger::config::NodeConfig;
use crosstrigger::error::CommsError;

// ── Simulated time ────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct SimTime(Rc<Cell<u64>>);

impl SimTime {
    pub fn now(&self) -> u64 {
        self.0.get()
    }

    pub fn advance(&self, ms: u64) {
        self.0.set(self.0.get() + ms);
    }

    pub fn set(&self, ms: u64) {
        self.0.set(ms);
    }
}

pub struct SimClock {
    time: SimTime,
}

impl ClockPort for SimClock {
    fn now_ms(&self) -> u64 {
        self.time.now()
    }

    fn delay_ms(&mut self, ms: u32) {
        self.time.advance(u64::from(ms));
    }
}

// ── Actuators ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    Motor { duty: u8, direction: MotorDirection },
    Indicate(Colour),
    DisabledLed(bool),
}

/// Records every actuator command with the simulated time it was issued.
pub struct MockActuators {
    time: SimTime,
    pub calls: Vec<(u64, ActuatorCall)>,
}

impl MockActuators {
    pub fn motor_calls(&self) -> Vec<(u64, MotorDirection)> {
        self.calls
            .iter()
            .filter_map(|(t, c)| match c {
                ActuatorCall::Motor { direction, .. } => Some((*t, *direction)),
                _ => None,
            })
            .collect()
    }

    /// Number of reverse pulses, i.e. actuation sequences started.
    pub fn actuations(&self) -> usize {
        self.motor_calls()
            .iter()
            .filter(|(_, d)| *d == MotorDirection::Reverse)
            .count()
    }

    pub fn colours(&self) -> Vec<(u64, Colour)> {
        self.calls
            .iter()
            .filter_map(|(t, c)| match c {
                ActuatorCall::Indicate(colour) => Some((*t, *colour)),
                _ => None,
            })
            .collect()
    }

    pub fn last_disabled_led(&self) -> Option<bool> {
        self.calls.iter().rev().find_map(|(_, c)| match c {
            ActuatorCall::DisabledLed(on) => Some(*on),
            _ => None,
        })
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl ActuatorPort for MockActuators {
    fn run_motor(&mut self, duty: u8, direction: MotorDirection) {
        self.calls
            .push((self.time.now(), ActuatorCall::Motor { duty, direction }));
    }

    fn indicate(&mut self, colour: Colour) {
        self.calls.push((self.time.now(), ActuatorCall::Indicate(colour)));
    }

    fn set_disabled_indicator(&mut self, on: bool) {
        self.calls.push((self.time.now(), ActuatorCall::DisabledLed(on)));
    }
}

// ── Sensor ────────────────────────────────────────────────────

/// Pops scripted readings, then repeats `fallback`.
pub struct ScriptedSensor {
    pub readings: VecDeque<Option<f32>>,
    pub fallback: Option<f32>,
    pub samples: usize,
}

impl ScriptedSensor {
    pub fn push(&mut self, reading: Option<f32>) {
        self.readings.push_back(reading);
    }
}

impl SensorPort for ScriptedSensor {
    fn measure(&mut self) -> Option<f32> {
        self.samples += 1;
        self.readings.pop_front().unwrap_or(self.fallback)
    }
}

// ── Override ──────────────────────────────────────────────────

#[derive(Default)]
pub struct MockOverride {
    pub pressed: bool,
}

impl OverridePort for MockOverride {
    fn is_overridden(&mut self) -> bool {
        self.pressed
    }
}

// ── Transport ─────────────────────────────────────────────────

/// Peer behaviour attached to the transport: when `on_send` goes out,
/// `reply` is delivered `after_ms` later.
pub struct AutoReply {
    pub on_send: &'static [u8],
    pub reply: &'static [u8],
    pub after_ms: u64,
}

/// In-memory broadcast medium seen from one node.
///
/// `recv` delivers the earliest due datagram; if none is due within one
/// receive timeout it advances time by that timeout and returns `None`.
pub struct MockTransport {
    time: SimTime,
    recv_timeout_ms: u64,
    inbox: VecDeque<(u64, Vec<u8>)>,
    pub sent: Vec<(u64, Vec<u8>)>,
    pub loopback: bool,
    pub fail_sends: bool,
    pub auto_reply: Option<AutoReply>,
    pub recv_calls: usize,
}

impl MockTransport {
    /// Queue `payload` for delivery at absolute time `at_ms`.
    pub fn deliver_at(&mut self, at_ms: u64, payload: &[u8]) {
        let idx = self.inbox.partition_point(|(t, _)| *t <= at_ms);
        self.inbox.insert(idx, (at_ms, payload.to_vec()));
    }

    /// Queue `payload` for immediate delivery.
    pub fn deliver(&mut self, payload: &[u8]) {
        let now = self.time.now();
        self.deliver_at(now, payload);
    }

    pub fn sent_payloads(&self) -> Vec<&[u8]> {
        self.sent.iter().map(|(_, p)| p.as_slice()).collect()
    }

    pub fn count_sent(&self, payload: &[u8]) -> usize {
        self.sent.iter().filter(|(_, p)| p == payload).count()
    }

    pub fn sent_at(&self, payload: &[u8]) -> Option<u64> {
        self.sent.iter().find(|(_, p)| p == payload).map(|(t, _)| *t)
    }

    pub fn pending(&self) -> usize {
        self.inbox.len()
    }
}

impl TransportPort for MockTransport {
    fn send(&mut self, payload: &[u8]) -> Result<(), CommsError> {
        if self.fail_sends {
            return Err(CommsError::SendFailed);
        }
        let now = self.time.now();
        self.sent.push((now, payload.to_vec()));
        if self.loopback {
            self.deliver_at(now, payload);
        }
        let due = self
            .auto_reply
            .as_ref()
            .filter(|r| r.on_send == payload)
            .map(|r| (now + r.after_ms, r.reply));
        if let Some((at, bytes)) = due {
            self.deliver_at(at, bytes);
        }
        Ok(())
    }

    fn recv(&mut self) -> Option<Payload> {
        self.recv_calls += 1;
        let now = self.time.now();
        let deadline = now + self.recv_timeout_ms;
        match self.inbox.front() {
            Some((at, _)) if *at <= deadline => {
                if *at > now {
                    self.time.set(*at);
                }
                let (_, bytes) = self.inbox.pop_front()?;
                Payload::from_slice(&bytes).ok()
            }
            _ => {
                self.time.set(deadline);
                None
            }
        }
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Assembly ──────────────────────────────────────────────────

pub type MockNode = Node<ScriptedSensor, MockActuators, MockOverride, MockTransport, SimClock>;

/// A node at time zero with nothing in range and an empty medium.
pub fn mock_node(config: &NodeConfig) -> (MockNode, SimTime) {
    let time = SimTime::default();
    let node = Node::new(
        ScriptedSensor {
            readings: VecDeque::new(),
            fallback: None,
            samples: 0,
        },
        MockActuators {
            time: time.clone(),
            calls: Vec::new(),
        },
        MockOverride::default(),
        MockTransport {
            time: time.clone(),
            recv_timeout_ms: u64::from(config.recv_timeout_ms),
            inbox: VecDeque::new(),
            sent: Vec::new(),
            loopback: false,
            fail_sends: false,
            auto_reply: None,
            recv_calls: 0,
        },
        SimClock { time: time.clone() },
    );
    (node, time)
}
