//! Manual override button.
//!
//! ## Hardware
//!
//! Active-low momentary switch with the internal pull-up enabled: the pin
//! reads LOW while the button is held.  The node is disabled for as long
//! as the button is held; there is no latching and no debounce.
//!
//! A failed pin read keeps the last known state.

use embedded_hal::digital::InputPin;
use log::warn;

use crate::app::ports::OverridePort;

pub struct OverrideButton<P> {
    pin: P,
    pressed: bool,
}

impl<P: InputPin> OverrideButton<P> {
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            pressed: false,
        }
    }

    /// Last sampled state without touching the pin.
    pub fn was_pressed(&self) -> bool {
        self.pressed
    }
}

impl<P: InputPin> OverridePort for OverrideButton<P> {
    fn is_overridden(&mut self) -> bool {
        match self.pin.is_low() {
            Ok(low) => self.pressed = low,
            Err(_) => warn!(
                "Override: pin read failed, keeping {}",
                if self.pressed { "pressed" } else { "released" }
            ),
        }
        self.pressed
    }
}
