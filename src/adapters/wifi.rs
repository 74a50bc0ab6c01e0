//! Wi-Fi link adapter.
//!
//! Implements [`LinkPort`], the hexagonal boundary for the radio link the
//! broadcast transport rides on.
//!
//! | Role | Mode         | Follows the enabled state?                    |
//! |------|--------------|-----------------------------------------------|
//! | A    | Access point | No: the AP comes up once and stays up         |
//! | B    | Station      | Yes: joins while enabled, leaves while disabled |
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF Wi-Fi driver calls via
//!   `esp_idf_svc::wifi::BlockingWifi`.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## Reconnection policy
//!
//! A failed station join waits an exponential backoff (2 s → 4 s → 8 s
//! … capped at 60 s) before the next attempt, so an absent access point
//! does not stall every poll cycle for the full join timeout.

use core::net::Ipv4Addr;
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::app::ports::LinkPort;
use crate::config::{LinkConfig, validate_password, validate_ssid};
use crate::error::CommsError;
use crate::protocol::Role;

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::modem::Modem,
    nvs::EspDefaultNvsPartition,
    wifi::{
        AccessPointConfiguration, AuthMethod, BlockingWifi, ClientConfiguration, Configuration,
        EspWifi,
    },
};
#[cfg(target_os = "espidf")]
use crate::config::JOIN_POLL_MS;

// ───────────────────────────────────────────────────────────────
// Link state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Radio idle (station not associated, AP not started).
    Down,
    /// Role A: access point running.
    AccessPoint,
    /// Role B: associated and addressed.
    Connected,
    /// Last bring-up failed; waiting out the backoff.
    Backoff { attempt: u32 },
}

const INITIAL_BACKOFF_SECS: u32 = 2;
const MAX_BACKOFF_SECS: u32 = 60;

#[cfg(not(target_os = "espidf"))]
const SIM_STATION_ADDRESS: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 2);

// ───────────────────────────────────────────────────────────────
// Wi-Fi link
// ───────────────────────────────────────────────────────────────

pub struct WifiLink {
    role: Role,
    config: LinkConfig,
    state: LinkState,
    backoff_secs: u32,
    retry_at: Option<Instant>,
    address: Option<Ipv4Addr>,
    #[cfg(target_os = "espidf")]
    wifi: BlockingWifi<EspWifi<'static>>,
    /// Simulation: whether the access point is reachable.
    #[cfg(not(target_os = "espidf"))]
    sim_ap_present: bool,
    /// Simulation: counts platform bring-up calls.
    #[cfg(not(target_os = "espidf"))]
    sim_attempts: u32,
}

impl WifiLink {
    #[cfg(target_os = "espidf")]
    pub fn new(
        role: Role,
        config: LinkConfig,
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
    ) -> Result<Self, CommsError> {
        Self::check_credentials(&config)?;
        let driver = EspWifi::new(modem, sysloop.clone(), nvs).map_err(|e| {
            warn!("WiFi: driver init failed: {}", e);
            CommsError::LinkFailed
        })?;
        let wifi = BlockingWifi::wrap(driver, sysloop).map_err(|e| {
            warn!("WiFi: event loop wrap failed: {}", e);
            CommsError::LinkFailed
        })?;
        Ok(Self {
            role,
            config,
            state: LinkState::Down,
            backoff_secs: INITIAL_BACKOFF_SECS,
            retry_at: None,
            address: None,
            wifi,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(role: Role, config: LinkConfig) -> Result<Self, CommsError> {
        Self::check_credentials(&config)?;
        Ok(Self {
            role,
            config,
            state: LinkState::Down,
            backoff_secs: INITIAL_BACKOFF_SECS,
            retry_at: None,
            address: None,
            sim_ap_present: true,
            sim_attempts: 0,
        })
    }

    fn check_credentials(config: &LinkConfig) -> Result<(), CommsError> {
        validate_ssid(&config.ssid)
            .and_then(|()| validate_password(&config.password))
            .map_err(|e| {
                warn!("WiFi: {}", e);
                CommsError::InvalidCredentials
            })
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn role(&self) -> Role {
        self.role
    }

    // ── Shared bring-up / teardown ────────────────────────────

    fn bring_up(&mut self) -> Result<(), CommsError> {
        if let Some(at) = self.retry_at {
            if Instant::now() < at {
                return Ok(());
            }
        }

        let result = match self.role {
            Role::A => self.platform_start_ap(),
            Role::B => self.platform_join(),
        };

        match result {
            Ok(ip) => {
                self.address = Some(ip);
                self.state = match self.role {
                    Role::A => LinkState::AccessPoint,
                    Role::B => LinkState::Connected,
                };
                self.backoff_secs = INITIAL_BACKOFF_SECS;
                self.retry_at = None;
                info!("WiFi: {:?} up, address {}", self.state, ip);
                Ok(())
            }
            Err(e) => {
                let attempt = match self.state {
                    LinkState::Backoff { attempt } => attempt + 1,
                    _ => 0,
                };
                warn!(
                    "WiFi: bring-up failed ({}), retry in {}s",
                    e, self.backoff_secs
                );
                self.state = LinkState::Backoff { attempt };
                self.retry_at =
                    Some(Instant::now() + Duration::from_secs(u64::from(self.backoff_secs)));
                self.backoff_secs = (self.backoff_secs * 2).min(MAX_BACKOFF_SECS);
                Err(e)
            }
        }
    }

    fn tear_down(&mut self) {
        self.platform_leave();
        self.state = LinkState::Down;
        self.address = None;
        self.retry_at = None;
        self.backoff_secs = INITIAL_BACKOFF_SECS;
        info!("WiFi: left '{}'", self.config.ssid);
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_start_ap(&mut self) -> Result<Ipv4Addr, CommsError> {
        let auth_method = if self.config.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let ap = AccessPointConfiguration {
            ssid: self
                .config
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| CommsError::InvalidCredentials)?,
            password: self
                .config
                .password
                .as_str()
                .try_into()
                .map_err(|_| CommsError::InvalidCredentials)?,
            auth_method,
            channel: 1,
            ..Default::default()
        };
        let fail = |e: esp_idf_svc::sys::EspError| {
            warn!("WiFi(AP): {}", e);
            CommsError::LinkFailed
        };
        self.wifi
            .set_configuration(&Configuration::AccessPoint(ap))
            .map_err(fail)?;
        self.wifi.start().map_err(fail)?;
        self.wifi.wait_netif_up().map_err(fail)?;

        let ip = self
            .wifi
            .wifi()
            .ap_netif()
            .get_ip_info()
            .map_err(fail)?
            .ip;
        let expected = Ipv4Addr::from(self.config.ap_address);
        if ip != expected {
            warn!("WiFi(AP): netif address {} differs from configured {}", ip, expected);
        }
        info!("WiFi(AP): '{}' started at {}", self.config.ssid, ip);
        Ok(ip)
    }

    #[cfg(target_os = "espidf")]
    fn platform_join(&mut self) -> Result<Ipv4Addr, CommsError> {
        let auth_method = if self.config.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let client = ClientConfiguration {
            ssid: self
                .config
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| CommsError::InvalidCredentials)?,
            password: self
                .config
                .password
                .as_str()
                .try_into()
                .map_err(|_| CommsError::InvalidCredentials)?,
            auth_method,
            ..Default::default()
        };
        let fail = |e: esp_idf_svc::sys::EspError| {
            warn!("WiFi(STA): {}", e);
            CommsError::LinkFailed
        };
        self.wifi
            .set_configuration(&Configuration::Client(client))
            .map_err(fail)?;
        if !self.wifi.is_started().map_err(fail)? {
            self.wifi.start().map_err(fail)?;
        }

        info!("WiFi(STA): joining '{}'", self.config.ssid);
        self.wifi.wifi_mut().connect().map_err(fail)?;
        let deadline =
            Instant::now() + Duration::from_secs(u64::from(self.config.connect_timeout_secs));
        // Association and DHCP share one deadline.
        while !self.wifi.is_up().map_err(fail)? {
            if Instant::now() >= deadline {
                let _ = self.wifi.wifi_mut().disconnect();
                return Err(CommsError::LinkFailed);
            }
            esp_idf_svc::hal::delay::FreeRtos::delay_ms(JOIN_POLL_MS);
        }

        let ip = self
            .wifi
            .wifi()
            .sta_netif()
            .get_ip_info()
            .map_err(fail)?
            .ip;
        if ip.is_unspecified() {
            return Err(CommsError::NoAddress);
        }
        Ok(ip)
    }

    #[cfg(target_os = "espidf")]
    fn platform_leave(&mut self) {
        if let Err(e) = self.wifi.disconnect() {
            warn!("WiFi(STA): disconnect failed: {}", e);
        }
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_up(&self) -> bool {
        match self.role {
            Role::A => self.wifi.is_started().unwrap_or(false),
            Role::B => self.wifi.is_connected().unwrap_or(false),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start_ap(&mut self) -> Result<Ipv4Addr, CommsError> {
        self.sim_attempts += 1;
        info!("WiFi(sim): AP '{}' started", self.config.ssid);
        Ok(Ipv4Addr::from(self.config.ap_address))
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_join(&mut self) -> Result<Ipv4Addr, CommsError> {
        self.sim_attempts += 1;
        if !self.sim_ap_present {
            warn!("WiFi(sim): '{}' not found", self.config.ssid);
            return Err(CommsError::LinkFailed);
        }
        info!("WiFi(sim): joined '{}'", self.config.ssid);
        Ok(SIM_STATION_ADDRESS)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_leave(&mut self) {
        info!("WiFi(sim): disconnected");
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_up(&self) -> bool {
        self.sim_ap_present || self.role == Role::A
    }

    /// Simulation: make the access point (dis)appear.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_ap_present(&mut self, present: bool) {
        self.sim_ap_present = present;
    }

    /// Simulation: number of bring-up attempts so far.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_attempts(&self) -> u32 {
        self.sim_attempts
    }

    /// Simulation: skip the remaining backoff.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_expire_backoff(&mut self) {
        self.retry_at = None;
    }
}

// ───────────────────────────────────────────────────────────────
// LinkPort
// ───────────────────────────────────────────────────────────────

impl LinkPort for WifiLink {
    fn maintain(&mut self, enabled: bool) -> Result<(), CommsError> {
        match (self.role, self.state) {
            (Role::A, LinkState::AccessPoint) => Ok(()),
            (Role::A, _) => self.bring_up(),
            (Role::B, LinkState::Connected) if !enabled => {
                self.tear_down();
                Ok(())
            }
            (Role::B, LinkState::Connected) => {
                if !self.platform_is_up() {
                    warn!("WiFi: connection lost, rejoining");
                    self.state = LinkState::Down;
                    self.address = None;
                }
                Ok(())
            }
            (Role::B, _) if enabled => self.bring_up(),
            (Role::B, LinkState::Backoff { .. }) => {
                self.state = LinkState::Down;
                self.retry_at = None;
                self.backoff_secs = INITIAL_BACKOFF_SECS;
                Ok(())
            }
            (Role::B, _) => Ok(()),
        }
    }

    fn local_ip(&self) -> Option<Ipv4Addr> {
        self.address
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
