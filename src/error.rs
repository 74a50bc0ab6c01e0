//! Unified error types for the CrossTrigger firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping
//! `main()`'s boot-time error handling uniform.  All variants are `Copy`
//! so drivers can hand them up through port adapters without allocation.
//!
//! The trigger/ack core itself has no error class: every failure it can
//! observe resolves back to `Idle` in bounded time.  These types exist for
//! the adapters underneath it.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible adapter operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The distance sensor could not produce a reading.
    Sensor(SensorError),
    /// A motor or indicator command failed.
    Actuator(ActuatorError),
    /// The radio link or the broadcast socket failed.
    Comms(CommsError),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// Echo line never went high after the trigger pulse.
    NoEcho,
    /// Echo line stayed high past the deadline (out of range or stuck).
    EchoTooLong,
    /// A GPIO read or write returned an error.
    GpioFailed,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoEcho => write!(f, "no echo within deadline"),
            Self::EchoTooLong => write!(f, "echo pulse exceeded deadline"),
            Self::GpioFailed => write!(f, "GPIO access failed"),
        }
    }
}

impl core::error::Error for SensorError {}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// PWM duty-cycle write failed.
    PwmWriteFailed,
    /// GPIO set failed.
    GpioWriteFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PwmWriteFailed => write!(f, "PWM write failed"),
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
        }
    }
}

impl core::error::Error for ActuatorError {}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    /// The UDP socket could not be bound or configured.
    BindFailed,
    /// A datagram could not be sent.
    SendFailed,
    /// Wi-Fi credentials failed validation.
    InvalidCredentials,
    /// Access point / station bring-up failed.
    LinkFailed,
    /// No address assigned yet (station not associated).
    NoAddress,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BindFailed => write!(f, "UDP bind failed"),
            Self::SendFailed => write!(f, "UDP send failed"),
            Self::InvalidCredentials => write!(f, "invalid Wi-Fi credentials"),
            Self::LinkFailed => write!(f, "Wi-Fi link bring-up failed"),
            Self::NoAddress => write!(f, "no IPv4 address assigned"),
        }
    }
}

impl core::error::Error for CommsError {}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
