//! Hardware adapter: bridges the actuator drivers to [`ActuatorPort`].
//!
//! Owns the H-bridge motor and the status indicator.  Driver failures are
//! logged and otherwise ignored: the protocol treats actuation as
//! fire-and-forget, and a stuck GPIO must not wedge the poll loop.

use log::warn;

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;

use crate::app::ports::{ActuatorPort, Colour, MotorDirection};
use crate::drivers::indicator::StatusIndicator;
use crate::drivers::motor::HBridgeMotor;

/// Concrete adapter that combines all output hardware behind the port.
pub struct HardwareActuators<IN1, IN2, EN, R, G, B, L> {
    motor: HBridgeMotor<IN1, IN2, EN>,
    indicator: StatusIndicator<R, G, B, L>,
}

impl<IN1, IN2, EN, R, G, B, L> HardwareActuators<IN1, IN2, EN, R, G, B, L> {
    pub fn new(motor: HBridgeMotor<IN1, IN2, EN>, indicator: StatusIndicator<R, G, B, L>) -> Self {
        Self { motor, indicator }
    }

    pub fn motor(&self) -> &HBridgeMotor<IN1, IN2, EN> {
        &self.motor
    }

    pub fn indicator(&self) -> &StatusIndicator<R, G, B, L> {
        &self.indicator
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<IN1, IN2, EN, R, G, B, L> ActuatorPort for HardwareActuators<IN1, IN2, EN, R, G, B, L>
where
    IN1: OutputPin,
    IN2: OutputPin,
    EN: SetDutyCycle,
    R: OutputPin,
    G: OutputPin,
    B: OutputPin,
    L: OutputPin,
{
    fn run_motor(&mut self, duty: u8, direction: MotorDirection) {
        if let Err(e) = self.motor.drive(duty, direction) {
            warn!("Motor: {:?} at {}% failed: {}", direction, duty, e);
        }
    }

    fn indicate(&mut self, colour: Colour) {
        if let Err(e) = self.indicator.show(colour) {
            warn!("Indicator: {:?} failed: {}", colour, e);
        }
    }

    fn set_disabled_indicator(&mut self, on: bool) {
        if let Err(e) = self.indicator.set_disabled(on) {
            warn!("Disabled LED: write failed: {}", e);
        }
    }
}
