//! RGB episode indicator and "disabled" LED.
//!
//! Three plain on/off GPIO channels drive discrete R/G/B LEDs (or a
//! common-cathode RGB LED); a fourth GPIO lights the red "disabled" LED
//! while the override is asserted.

use embedded_hal::digital::OutputPin;

use crate::app::ports::Colour;
use crate::error::ActuatorError;

fn gpio_failed<E>(_: E) -> ActuatorError {
    ActuatorError::GpioWriteFailed
}

pub struct StatusIndicator<R, G, B, L> {
    red: R,
    green: G,
    blue: B,
    disabled_led: L,
    current: Colour,
    disabled_on: bool,
}

impl<R, G, B, L> StatusIndicator<R, G, B, L>
where
    R: OutputPin,
    G: OutputPin,
    B: OutputPin,
    L: OutputPin,
{
    pub fn new(red: R, green: G, blue: B, disabled_led: L) -> Self {
        Self {
            red,
            green,
            blue,
            disabled_led,
            current: Colour::OFF,
            disabled_on: false,
        }
    }

    pub fn show(&mut self, colour: Colour) -> Result<(), ActuatorError> {
        self.red.set_state(colour.red.into()).map_err(gpio_failed)?;
        self.green.set_state(colour.green.into()).map_err(gpio_failed)?;
        self.blue.set_state(colour.blue.into()).map_err(gpio_failed)?;
        self.current = colour;
        Ok(())
    }

    pub fn set_disabled(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.disabled_led
            .set_state(on.into())
            .map_err(gpio_failed)?;
        self.disabled_on = on;
        Ok(())
    }

    pub fn current_colour(&self) -> Colour {
        self.current
    }

    pub fn is_disabled_lit(&self) -> bool {
        self.disabled_on
    }
}
