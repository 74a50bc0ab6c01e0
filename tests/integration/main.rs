//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises the coordinator against
//! mock adapters on simulated time.  All tests run on the host (x86_64)
//! with no real hardware required.

#![cfg(not(target_os = "espidf"))]

mod coordinator_tests;
mod mock_hw;
