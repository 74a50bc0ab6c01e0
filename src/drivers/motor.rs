//! DC motor driver (L298N-style H-bridge).
//!
//! Two direction inputs plus a PWM enable line:
//!
//! | Direction | IN1  | IN2  | EN        |
//! |-----------|------|------|-----------|
//! | Forward   | LOW  | HIGH | duty %    |
//! | Reverse   | HIGH | LOW  | duty %    |
//! | Stop      | LOW  | LOW  | fully off |
//!
//! The driver is a dumb actuator: pulse timing belongs to the caller.

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;

use crate::app::ports::MotorDirection;
use crate::error::ActuatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorState {
    Stopped,
    Running { duty: u8, direction: MotorDirection },
}

pub struct HBridgeMotor<IN1, IN2, EN> {
    in1: IN1,
    in2: IN2,
    en: EN,
    state: MotorState,
}

impl<IN1, IN2, EN> HBridgeMotor<IN1, IN2, EN>
where
    IN1: OutputPin,
    IN2: OutputPin,
    EN: SetDutyCycle,
{
    pub fn new(in1: IN1, in2: IN2, en: EN) -> Self {
        Self {
            in1,
            in2,
            en,
            state: MotorState::Stopped,
        }
    }

    /// Drive at `duty` percent (clamped to 100).  Zero duty or `Stop`
    /// stops the motor.
    pub fn drive(&mut self, duty: u8, direction: MotorDirection) -> Result<(), ActuatorError> {
        let duty = duty.min(100);
        let (in1_high, in2_high) = match direction {
            _ if duty == 0 => return self.stop(),
            MotorDirection::Stop => return self.stop(),
            MotorDirection::Forward => (false, true),
            MotorDirection::Reverse => (true, false),
        };

        self.set_direction_hw(in1_high, in2_high)?;
        self.en
            .set_duty_cycle_percent(duty)
            .map_err(|_| ActuatorError::PwmWriteFailed)?;

        self.state = MotorState::Running { duty, direction };
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), ActuatorError> {
        self.state = MotorState::Stopped;
        self.en
            .set_duty_cycle_fully_off()
            .map_err(|_| ActuatorError::PwmWriteFailed)?;
        self.set_direction_hw(false, false)
    }

    fn set_direction_hw(&mut self, in1_high: bool, in2_high: bool) -> Result<(), ActuatorError> {
        self.in1
            .set_state(in1_high.into())
            .map_err(|_| ActuatorError::GpioWriteFailed)?;
        self.in2
            .set_state(in2_high.into())
            .map_err(|_| ActuatorError::GpioWriteFailed)
    }

    pub fn state(&self) -> MotorState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        !matches!(self.state, MotorState::Stopped)
    }
}
