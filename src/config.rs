//! Node configuration parameters
//!
//! Every timing constant and fixed identity the firmware depends on lives
//! here, so tests can shrink timeouts and the device build can override
//! the broker at compile time (`HYGRONODE_BROKER_URL`).

use core::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

pub const AP_SSID_CAP: usize = 32;
pub const AP_PASSPHRASE_CAP: usize = 64;
pub const BROKER_URL_CAP: usize = 96;
pub const TOPIC_PREFIX_CAP: usize = 24;

/// Minimum WPA2-PSK passphrase length; shorter passphrases open the AP.
pub const WPA2_MIN_PASSPHRASE: usize = 8;

const DEFAULT_BROKER_URL: &str = "mqtts://broker.local:8883";

/// Configuration of the fallback access point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPointConfig {
    pub ssid: heapless::String<AP_SSID_CAP>,
    pub passphrase: heapless::String<AP_PASSPHRASE_CAP>,
    pub channel: u8,
    pub max_connections: u16,
}

impl Default for AccessPointConfig {
    fn default() -> Self {
        Self {
            ssid: heapless::String::try_from("ESP32-AP").unwrap_or_default(),
            passphrase: heapless::String::try_from("12345678").unwrap_or_default(),
            channel: 1,
            max_connections: 4,
        }
    }
}

/// Core node configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    // --- Connectivity ---
    /// How long a STA attempt may wait for an address before AP fallback.
    pub connect_timeout_ms: u64,
    /// Delay between a provisioning acknowledgement and the restart.
    pub restart_grace_ms: u64,
    /// Supervisor wait when no connection deadline is pending.
    pub supervisor_idle_ms: u64,
    pub access_point: AccessPointConfig,

    // --- Reset button ---
    /// Continuous hold needed to trigger a factory reset.
    pub reset_hold_ms: u64,
    pub reset_poll_interval_ms: u64,

    // --- Telemetry ---
    pub telemetry_interval_ms: u64,
    pub broker_url: heapless::String<BROKER_URL_CAP>,
    pub topic_prefix: heapless::String<TOPIC_PREFIX_CAP>,

    // --- Indicators ---
    pub indicator_pulse_ms: u32,
    pub indicator_tick_ms: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let url = broker_url(option_env!("HYGRONODE_BROKER_URL"));

        Self {
            // Connectivity
            connect_timeout_ms: 10_000,
            restart_grace_ms: 1_000,
            supervisor_idle_ms: 1_000,
            access_point: AccessPointConfig::default(),

            // Reset button
            reset_hold_ms: 3_000,
            reset_poll_interval_ms: 10,

            // Telemetry
            telemetry_interval_ms: 3_000,
            broker_url: heapless::String::try_from(url).unwrap_or_default(),
            topic_prefix: heapless::String::try_from("sensors").unwrap_or_default(),

            // Indicators
            indicator_pulse_ms: 300,
            indicator_tick_ms: 50,
        }
    }
}

/// The compile-time broker override, or the default when it is unset or
/// does not fit [`BROKER_URL_CAP`].
pub fn broker_url(override_url: Option<&'static str>) -> &'static str {
    match override_url {
        None => DEFAULT_BROKER_URL,
        Some(url) if url.is_empty() || url.len() > BROKER_URL_CAP => {
            warn!(
                "Config: HYGRONODE_BROKER_URL rejected ({} bytes, max {}), using {}",
                url.len(),
                BROKER_URL_CAP,
                DEFAULT_BROKER_URL
            );
            DEFAULT_BROKER_URL
        }
        Some(url) => url,
    }
}

impl NodeConfig {
    /// Reject configurations the firmware cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("connect_timeout_ms must be > 0"));
        }
        if self.reset_poll_interval_ms == 0 || self.reset_poll_interval_ms >= self.reset_hold_ms {
            return Err(ConfigError::ValidationFailed(
                "reset_poll_interval_ms must be > 0 and below reset_hold_ms",
            ));
        }
        if self.telemetry_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("telemetry_interval_ms must be > 0"));
        }
        if self.indicator_tick_ms == 0 || self.indicator_pulse_ms < self.indicator_tick_ms {
            return Err(ConfigError::ValidationFailed(
                "indicator_pulse_ms must cover at least one indicator tick",
            ));
        }
        if self.access_point.ssid.is_empty() {
            return Err(ConfigError::ValidationFailed("access_point.ssid must not be empty"));
        }
        if !(1..=13).contains(&self.access_point.channel) {
            return Err(ConfigError::ValidationFailed("access_point.channel must be 1-13"));
        }
        if !(1..=10).contains(&self.access_point.max_connections) {
            return Err(ConfigError::ValidationFailed(
                "access_point.max_connections must be 1-10",
            ));
        }
        if self.broker_url.is_empty() {
            return Err(ConfigError::ValidationFailed("broker_url must not be empty"));
        }
        if self.topic_prefix.is_empty() || self.topic_prefix.contains(['#', '+']) {
            return Err(ConfigError::ValidationFailed(
                "topic_prefix must be non-empty and free of MQTT wildcards",
            ));
        }
        Ok(())
    }
}

/// Errors from [`NodeConfig::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed range validation; the message names it.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}
