//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the protocol rules for a CrossTrigger node:
//! override handling, inbound dispatch, and the local trigger FSM.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real peripherals.

pub mod events;
pub mod ports;
pub mod service;
