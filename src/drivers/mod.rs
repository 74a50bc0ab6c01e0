//! Peripheral drivers built on `embedded-hal` 1.0 traits.

pub mod indicator;
pub mod motor;
pub mod override_button;
pub mod ultrasonic;
pub mod watchdog;
