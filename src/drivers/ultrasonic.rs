//! HC-SR04 ultrasonic distance sensor driver.
//!
//! ## Hardware
//!
//! TRIG is a digital output, ECHO a digital input.  A 10 µs pulse on TRIG
//! starts a ranging burst; the sensor then holds ECHO high for the round
//! trip time of the sound.
//!
//! ```text
//!   TRIG  ──┐  ┌───────────────────────────────────────────
//!           └──┘ 10 µs
//!   ECHO  ────────────┐                   ┌────────────────
//!                     └───── width ───────┘   (inverted view: HIGH during width)
//! ```
//!
//! distance_cm = width_us × 0.0343 / 2
//!
//! ## Bounded wait
//!
//! Each edge wait has its own deadline (`echo_timeout_us`).  A missing
//! rise is [`SensorError::NoEcho`]; a missing fall is
//! [`SensorError::EchoTooLong`].  Either way the port reports "no
//! reading" and the caller carries on.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::debug;

use crate::app::ports::SensorPort;
use crate::error::SensorError;

/// Speed of sound at ~20 °C in centimetres per microsecond.
pub const SPEED_OF_SOUND_CM_PER_US: f32 = 0.0343;

const SETTLE_US: u32 = 2;
const TRIGGER_PULSE_US: u32 = 10;

/// Microsecond timestamp source for pulse timing.
pub trait MicrosClock {
    /// Microseconds since an arbitrary fixed origin; never decreases.
    fn now_us(&self) -> u64;
}

/// Convert a round-trip echo width to a one-way distance.
pub fn pulse_to_cm(width_us: u64) -> f32 {
    width_us as f32 * SPEED_OF_SOUND_CM_PER_US / 2.0
}

pub struct Ultrasonic<TRIG, ECHO, D, C> {
    trig: TRIG,
    echo: ECHO,
    delay: D,
    clock: C,
    echo_timeout_us: u32,
}

impl<TRIG, ECHO, D, C> Ultrasonic<TRIG, ECHO, D, C>
where
    TRIG: OutputPin,
    ECHO: InputPin,
    D: DelayNs,
    C: MicrosClock,
{
    pub fn new(trig: TRIG, echo: ECHO, delay: D, clock: C, echo_timeout_us: u32) -> Self {
        Self {
            trig,
            echo,
            delay,
            clock,
            echo_timeout_us,
        }
    }

    /// Fire one ranging burst and time the echo.
    pub fn read_cm(&mut self) -> Result<f32, SensorError> {
        self.trig.set_low().map_err(|_| SensorError::GpioFailed)?;
        self.delay.delay_us(SETTLE_US);
        self.trig.set_high().map_err(|_| SensorError::GpioFailed)?;
        self.delay.delay_us(TRIGGER_PULSE_US);
        self.trig.set_low().map_err(|_| SensorError::GpioFailed)?;

        let rise = self.wait_for_level(true, SensorError::NoEcho)?;
        let fall = self.wait_for_level(false, SensorError::EchoTooLong)?;
        Ok(pulse_to_cm(fall.saturating_sub(rise)))
    }

    /// Spin until ECHO reads `high`, returning the time it was seen.
    fn wait_for_level(&mut self, high: bool, on_timeout: SensorError) -> Result<u64, SensorError> {
        let deadline = self
            .clock
            .now_us()
            .saturating_add(u64::from(self.echo_timeout_us));
        loop {
            let level = self.echo.is_high().map_err(|_| SensorError::GpioFailed)?;
            let now = self.clock.now_us();
            if level == high {
                return Ok(now);
            }
            if now >= deadline {
                return Err(on_timeout);
            }
        }
    }
}

impl<TRIG, ECHO, D, C> SensorPort for Ultrasonic<TRIG, ECHO, D, C>
where
    TRIG: OutputPin,
    ECHO: InputPin,
    D: DelayNs,
    C: MicrosClock,
{
    fn measure(&mut self) -> Option<f32> {
        match self.read_cm() {
            Ok(cm) => Some(cm),
            Err(e) => {
                debug!("Ultrasonic: {}", e);
                None
            }
        }
    }
}
