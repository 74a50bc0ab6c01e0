//! Port traits: the hexagonal boundary between the trigger core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Coordinator (domain)
//! ```
//!
//! Driven adapters (ultrasonic sensor, motor + LEDs, override button,
//! UDP broadcast socket, clock, event sinks) implement these traits.  The
//! [`Coordinator`](super::service::Coordinator) consumes them via
//! generics, so the protocol core never touches hardware directly.
//!
//! Every port the core calls is infallible from its point of view.
//! Adapters fold their own failures into the port's "nothing happened"
//! value (no reading, no datagram) and log them; only `send` reports an
//! error, because the core counts send failures.

use core::net::Ipv4Addr;

use crate::error::CommsError;
use crate::protocol::Role;

use super::events::AppEvent;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: one distance measurement on demand.
pub trait SensorPort {
    /// Distance to the nearest object in centimetres, or `None` when the
    /// sensor produced no usable reading.  May block for a bounded time.
    fn measure(&mut self) -> Option<f32>;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Motor drive direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorDirection {
    Forward,
    Reverse,
    Stop,
}

/// On/off state of the three indicator channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Colour {
    pub red: bool,
    pub green: bool,
    pub blue: bool,
}

impl Colour {
    pub const OFF: Self = Self::rgb(false, false, false);
    /// Neutral "detecting" colour shown while a local episode actuates.
    pub const DETECTING: Self = Self::rgb(true, true, true);
    pub const SUCCESS: Self = Self::rgb(false, true, false);
    pub const FAILURE: Self = Self::rgb(true, false, false);

    pub const fn rgb(red: bool, green: bool, blue: bool) -> Self {
        Self { red, green, blue }
    }

    /// Colour a node shows while actuating for its peer.
    pub const fn remote(role: Role) -> Self {
        match role {
            Role::A => Self::rgb(false, false, true),
            Role::B => Self::rgb(true, false, true),
        }
    }
}

/// Write-side port: the domain calls this to command actuators.
pub trait ActuatorPort {
    /// Drive the motor at `duty` (0-100) in `direction`.  `Stop` ignores
    /// the duty.
    fn run_motor(&mut self, duty: u8, direction: MotorDirection);

    /// Set the episode indicator colour.
    fn indicate(&mut self, colour: Colour);

    /// Steady "node disabled" LED.
    fn set_disabled_indicator(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Override input port
// ───────────────────────────────────────────────────────────────

/// Manual override switch.
pub trait OverridePort {
    /// `true` while the override is asserted (node disabled).
    fn is_overridden(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Broadcast transport port
// ───────────────────────────────────────────────────────────────

/// Receive buffer size.  Longer datagrams are truncated and never match a
/// protocol tag.
pub const MAX_PAYLOAD: usize = 32;

/// One received datagram payload.
pub type Payload = heapless::Vec<u8, MAX_PAYLOAD>;

/// Datagram transport to the local broadcast address.
pub trait TransportPort {
    /// Broadcast one payload.
    fn send(&mut self, payload: &[u8]) -> Result<(), CommsError>;

    /// Wait up to the transport's receive timeout for one datagram.
    /// Timeouts and receive errors are `None`.
    fn recv(&mut self) -> Option<Payload>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time and blocking delay.
pub trait ClockPort {
    /// Milliseconds since an arbitrary fixed origin; never decreases.
    fn now_ms(&self) -> u64;

    /// Block the calling task for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`]s through this port.  Adapters
/// decide where they go (serial log, test recorder, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Radio link port (driven by the main loop, not the core)
// ───────────────────────────────────────────────────────────────

/// The network link the broadcast transport rides on.
pub trait LinkPort {
    /// Bring the link up or down to follow the node's enabled state.
    /// Called once per cycle; implementations act only on changes.
    fn maintain(&mut self, enabled: bool) -> Result<(), CommsError>;

    /// Currently assigned IPv4 address, if any.
    fn local_ip(&self) -> Option<Ipv4Addr>;
}

// ───────────────────────────────────────────────────────────────
// Node: the owned bundle of hardware handles
// ───────────────────────────────────────────────────────────────

/// Every driven adapter one node owns.  Built once at startup and passed
/// by `&mut` into the [`Coordinator`](super::service::Coordinator).
pub struct Node<S, A, O, T, C> {
    pub sensor: S,
    pub actuators: A,
    pub override_input: O,
    pub transport: T,
    pub clock: C,
}

impl<S, A, O, T, C> Node<S, A, O, T, C>
where
    S: SensorPort,
    A: ActuatorPort,
    O: OverridePort,
    T: TransportPort,
    C: ClockPort,
{
    pub fn new(sensor: S, actuators: A, override_input: O, transport: T, clock: C) -> Self {
        Self {
            sensor,
            actuators,
            override_input,
            transport,
            clock,
        }
    }
}
