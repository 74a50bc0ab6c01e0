//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter         | Implements    | Connects to                     |
//! |-----------------|---------------|---------------------------------|
//! | `hardware`      | ActuatorPort  | H-bridge motor, RGB + disabled LEDs |
//! | `log_sink`      | EventSink     | Serial log output               |
//! | `time`          | ClockPort     | ESP32 system timer              |
//! |                 | MicrosClock   |                                 |
//! | `udp_transport` | TransportPort | UDP broadcast socket            |
//! | `wifi`          | LinkPort      | ESP-IDF Wi-Fi AP / STA          |
//!
//! The sensor and override ports are implemented directly by their
//! drivers (`drivers::ultrasonic`, `drivers::override_button`).

pub mod hardware;
pub mod log_sink;
pub mod time;
pub mod udp_transport;
pub mod wifi;
