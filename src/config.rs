//! Node configuration parameters
//!
//! All tunable parameters for one CrossTrigger node.  The timing values
//! must match the peer's exactly; the defaults are the values an
//! unmodified peer uses.  Configuration is compile-time only (the role
//! comes from the `node-b` feature) and nothing is persisted.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::protocol::Role;

/// Interval at which a station join polls for association (milliseconds).
pub const JOIN_POLL_MS: u32 = 100;

/// Radio link parameters shared by both roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Access point SSID (node A hosts it, node B joins it)
    pub ssid: heapless::String<32>,
    /// WPA2 passphrase; empty = open network
    pub password: heapless::String<64>,
    /// Static address of the access point (node A)
    pub ap_address: [u8; 4],
    /// Upper bound on one station association attempt (seconds)
    pub connect_timeout_secs: u16,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            ssid: heapless::String::try_from("Pico-Wlan").unwrap_or_default(),
            password: heapless::String::try_from("12345678").unwrap_or_default(),
            ap_address: [192, 168, 4, 1],
            connect_timeout_secs: 10,
        }
    }
}

impl LinkConfig {
    /// SSID: 1-32 printable ASCII bytes.  Password: empty (open) or 8-64 bytes.
    pub fn validate(&self) -> Result<(), Error> {
        validate_ssid(&self.ssid)?;
        validate_password(&self.password)?;
        if self.connect_timeout_secs == 0 {
            return Err(Error::Config("connect_timeout_secs must be non-zero"));
        }
        Ok(())
    }
}

pub(crate) fn validate_ssid(ssid: &str) -> Result<(), Error> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(Error::Config("SSID must be 1-32 printable ASCII bytes"));
    }
    Ok(())
}

pub(crate) fn validate_password(password: &str) -> Result<(), Error> {
    if !password.is_empty() && !(8..=64).contains(&password.len()) {
        return Err(Error::Config("password must be empty or 8-64 bytes"));
    }
    Ok(())
}

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// Core node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    // --- Identity ---
    /// Which of the two nodes this is
    pub role: Role,

    // --- Transport ---
    /// UDP port for both bind and broadcast target
    pub udp_port: u16,
    /// Bounded wait of one receive attempt (milliseconds)
    pub recv_timeout_ms: u32,

    // --- Trigger protocol ---
    /// A reading strictly below this distance triggers an episode (cm)
    pub distance_threshold_cm: f32,
    /// Minimum gap between two local episodes (milliseconds)
    pub cooldown_ms: u32,
    /// How long a local episode waits for the peer's ack (milliseconds)
    pub ack_timeout_ms: u32,
    /// Answer peer triggers that arrive while awaiting our own ack
    pub service_peer_during_ack_wait: bool,

    // --- Actuation ---
    /// Motor duty for both pulses (0-100%)
    pub actuation_duty_percent: u8,
    /// Reverse pulse length (milliseconds)
    pub reverse_pulse_ms: u32,
    /// Forward pulse length (milliseconds)
    pub forward_pulse_ms: u32,
    /// Detect / outcome / remote indicator hold (milliseconds)
    pub indicator_hold_ms: u32,

    // --- Sensor ---
    /// Deadline for each echo edge of the ultrasonic sensor (microseconds)
    pub echo_timeout_us: u32,

    // --- Timing ---
    /// Poll cycle period (milliseconds)
    pub cycle_period_ms: u32,
    /// Telemetry report interval (seconds)
    pub telemetry_interval_secs: u32,
    /// Task watchdog timeout (milliseconds)
    pub watchdog_timeout_ms: u32,

    // --- Radio ---
    pub link: LinkConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::for_role(Role::A)
    }
}

impl NodeConfig {
    /// Defaults for the given role.
    pub fn for_role(role: Role) -> Self {
        Self {
            role,

            // Transport
            udp_port: 1234,
            recv_timeout_ms: 200,

            // Trigger protocol
            distance_threshold_cm: 50.0,
            cooldown_ms: 5_000,
            ack_timeout_ms: 5_000,
            service_peer_during_ack_wait: false,

            // Actuation
            actuation_duty_percent: 100,
            reverse_pulse_ms: 800,
            forward_pulse_ms: 100,
            indicator_hold_ms: 2_000,

            // Sensor
            echo_timeout_us: 30_000, // ~5 m round trip

            // Timing
            cycle_period_ms: 100,        // 10 Hz
            telemetry_interval_secs: 60, // 1/min
            watchdog_timeout_ms: 15_000,

            link: LinkConfig::default(),
        }
    }

    /// Total length of the fixed actuation sequence.
    pub fn actuation_ms(&self) -> u32 {
        self.reverse_pulse_ms.saturating_add(self.forward_pulse_ms)
    }

    /// Longest time one local episode can hold the poll loop.
    pub fn worst_case_episode_ms(&self) -> u32 {
        let mut ack_wait = self.ack_timeout_ms.saturating_add(self.recv_timeout_ms);
        if self.service_peer_during_ack_wait {
            // A peer trigger served on the last poll extends the wait by one actuation.
            ack_wait = ack_wait.saturating_add(self.actuation_ms());
        }
        self.indicator_hold_ms
            .max(self.actuation_ms())
            .saturating_add(ack_wait)
            .saturating_add(self.indicator_hold_ms)
    }

    /// Longest a station join can hold the poll loop: the association
    /// deadline plus one status poll.
    pub fn worst_case_join_ms(&self) -> u32 {
        u32::from(self.link.connect_timeout_secs)
            .saturating_mul(1_000)
            .saturating_add(JOIN_POLL_MS)
    }

    /// Longest gap between two watchdog feeds in the poll loop.  The loop
    /// feeds after the coordinator cycle and again after link upkeep, so
    /// an episode and a join never stack.
    pub fn worst_case_feed_gap_ms(&self) -> u32 {
        self.worst_case_episode_ms()
            .max(self.worst_case_join_ms())
            .saturating_add(self.cycle_period_ms)
    }

    /// Reject values that would break the protocol's timing guarantees.
    pub fn validate(&self) -> Result<(), Error> {
        let timings = [
            (self.recv_timeout_ms, "recv_timeout_ms must be non-zero"),
            (self.cooldown_ms, "cooldown_ms must be non-zero"),
            (self.ack_timeout_ms, "ack_timeout_ms must be non-zero"),
            (self.reverse_pulse_ms, "reverse_pulse_ms must be non-zero"),
            (self.forward_pulse_ms, "forward_pulse_ms must be non-zero"),
            (self.indicator_hold_ms, "indicator_hold_ms must be non-zero"),
            (self.echo_timeout_us, "echo_timeout_us must be non-zero"),
            (self.cycle_period_ms, "cycle_period_ms must be non-zero"),
            (self.telemetry_interval_secs, "telemetry_interval_secs must be non-zero"),
        ];
        if let Some((_, msg)) = timings.into_iter().find(|(v, _)| *v == 0) {
            return Err(Error::Config(msg));
        }
        if self.udp_port == 0 {
            return Err(Error::Config("udp_port must be non-zero"));
        }
        if !(1..=100).contains(&self.actuation_duty_percent) {
            return Err(Error::Config("actuation_duty_percent must be 1-100"));
        }
        if !self.distance_threshold_cm.is_finite() || self.distance_threshold_cm <= 0.0 {
            return Err(Error::Config("distance_threshold_cm must be positive"));
        }
        self.link.validate()?;
        if self.watchdog_timeout_ms <= self.worst_case_feed_gap_ms() {
            return Err(Error::Config(
                "watchdog_timeout_ms must exceed the longest gap between feeds",
            ));
        }
        Ok(())
    }
}
