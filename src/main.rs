//! CrossTrigger firmware entry point
//!
//! Hexagonal architecture with a fixed-period poll loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  Ultrasonic       HardwareActuators   OverrideButton           │
//! │  (SensorPort)     (ActuatorPort)      (OverridePort)           │
//! │  UdpBroadcast     Esp32Clock          LogEventSink   WifiLink  │
//! │  (TransportPort)  (ClockPort)         (EventSink)    (LinkPort)│
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              Coordinator (pure logic)                  │    │
//! │  │  enable · dispatch · trigger FSM                       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The role is chosen at build time: the default image is node A (Wi-Fi
//! access point); `--features node-b` builds node B (station).
#![deny(unused_must_use)]

use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::Ets;
use esp_idf_svc::hal::gpio::{AnyIOPin, AnyInputPin, AnyOutputPin, Input, Output, PinDriver, Pull};
use esp_idf_svc::hal::ledc::{LedcDriver, LedcTimerDriver, config::TimerConfig};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::prelude::*;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use crosstrigger::adapters::hardware::HardwareActuators;
use crosstrigger::adapters::log_sink::LogEventSink;
use crosstrigger::adapters::time::Esp32Clock;
use crosstrigger::adapters::udp_transport::UdpBroadcastTransport;
use crosstrigger::adapters::wifi::WifiLink;
use crosstrigger::app::ports::{ClockPort, LinkPort, Node};
use crosstrigger::app::service::Coordinator;
use crosstrigger::config::NodeConfig;
use crosstrigger::drivers::indicator::StatusIndicator;
use crosstrigger::drivers::motor::HBridgeMotor;
use crosstrigger::drivers::override_button::OverrideButton;
use crosstrigger::drivers::ultrasonic::Ultrasonic;
use crosstrigger::drivers::watchdog::Watchdog;
use crosstrigger::error::Error;
use crosstrigger::pins;
use crosstrigger::protocol::Role;

#[cfg(not(feature = "node-b"))]
const ROLE: Role = Role::A;
#[cfg(feature = "node-b")]
const ROLE: Role = Role::B;

// ── Pin helpers ───────────────────────────────────────────────
//
// `pins.rs` holds plain GPIO numbers; each is claimed exactly once here.

fn output_pin(gpio: i32) -> Result<PinDriver<'static, AnyOutputPin, Output>> {
    // SAFETY: every GPIO number in `pins` is distinct and claimed once.
    let pin = unsafe { AnyOutputPin::new(gpio) };
    PinDriver::output(pin).with_context(|| format!("GPIO{gpio} as output"))
}

fn input_pin(gpio: i32, pull: Pull) -> Result<PinDriver<'static, AnyInputPin, Input>> {
    // SAFETY: as above.
    let pin = unsafe { AnyInputPin::new(gpio) };
    let mut driver = PinDriver::input(pin).with_context(|| format!("GPIO{gpio} as input"))?;
    driver.set_pull(pull).with_context(|| format!("GPIO{gpio} pull"))?;
    Ok(driver)
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("CrossTrigger v{}, node {}", env!("CARGO_PKG_VERSION"), ROLE);

    // ── 2. Configuration ──────────────────────────────────────
    let config = NodeConfig::for_role(ROLE);
    config.validate().context("invalid node configuration")?;
    let watchdog = Watchdog::new(config.watchdog_timeout_ms);

    // ── 3. Peripherals ────────────────────────────────────────
    let peripherals = Peripherals::take().context("peripherals already taken")?;
    let sysloop = EspSystemEventLoop::take().context("system event loop")?;
    let nvs = EspDefaultNvsPartition::take().context("default NVS partition")?;

    let motor_timer = LedcTimerDriver::new(
        peripherals.ledc.timer0,
        &TimerConfig::new().frequency(pins::MOTOR_PWM_FREQ_HZ.Hz().into()),
    )
    .context("LEDC timer")?;
    // SAFETY: MOTOR_ENA_GPIO is claimed only here.
    let ena = unsafe { AnyIOPin::new(pins::MOTOR_ENA_GPIO) };
    let motor_pwm =
        LedcDriver::new(peripherals.ledc.channel0, &motor_timer, ena).context("LEDC channel")?;

    let motor = HBridgeMotor::new(
        output_pin(pins::MOTOR_IN1_GPIO)?,
        output_pin(pins::MOTOR_IN2_GPIO)?,
        motor_pwm,
    );
    let indicator = StatusIndicator::new(
        output_pin(pins::RGB_RED_GPIO)?,
        output_pin(pins::RGB_GREEN_GPIO)?,
        output_pin(pins::RGB_BLUE_GPIO)?,
        output_pin(pins::DISABLED_LED_GPIO)?,
    );

    let clock = Esp32Clock::new();
    let sensor = Ultrasonic::new(
        output_pin(pins::ULTRASONIC_TRIG_GPIO)?,
        input_pin(pins::ULTRASONIC_ECHO_GPIO, Pull::Floating)?,
        Ets,
        clock,
        config.echo_timeout_us,
    );
    let button = OverrideButton::new(input_pin(pins::OVERRIDE_BUTTON_GPIO, Pull::Up)?);

    // ── 4. Radio link + transport ─────────────────────────────
    let mut link = WifiLink::new(
        ROLE,
        config.link.clone(),
        peripherals.modem,
        sysloop,
        Some(nvs),
    )
    .map_err(Error::from)
    .context("Wi-Fi init")?;
    watchdog.feed();
    if let Err(e) = link.maintain(true) {
        warn!("Initial link bring-up failed: {} (will retry)", e);
    }

    let transport = UdpBroadcastTransport::bind(
        config.udp_port,
        Duration::from_millis(u64::from(config.recv_timeout_ms)),
    )
    .map_err(Error::from)
    .context("UDP bind")?;

    // ── 5. Node + coordinator ─────────────────────────────────
    let mut node = Node::new(
        sensor,
        HardwareActuators::new(motor, indicator),
        button,
        transport,
        clock,
    );
    let mut sink = LogEventSink::new();
    let mut coordinator = Coordinator::new(config.clone());
    coordinator.start(&mut node, &mut sink);

    // ── 6. Poll loop ──────────────────────────────────────────
    // An episode and a station join each get their own feed; see
    // `NodeConfig::worst_case_feed_gap_ms`.
    let mut last_ip = None;
    loop {
        watchdog.feed();
        coordinator.run_cycle(&mut node, &mut sink);

        // Link upkeep follows the enable state this cycle just sampled.
        watchdog.feed();
        if let Err(e) = link.maintain(coordinator.is_enabled()) {
            warn!("Link: {}", e);
        }
        let ip = link.local_ip();
        if ip != last_ip {
            if let Some(ip) = ip {
                node.transport.retarget(ip);
            }
            last_ip = ip;
        }

        node.clock.delay_ms(config.cycle_period_ms);
    }
}
