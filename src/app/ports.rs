//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ConnectivityController / TelemetryPublisher / intake
//! ```
//!
//! Driven adapters (WiFi, NVS, MQTT, sensor, LEDs, restart) implement these
//! traits.  The domain consumes them via generics, so the core never
//! touches ESP-IDF directly and every flow runs on the host against mocks.

use core::fmt;
use core::time::Duration;

use crate::config::{AccessPointConfig, WPA2_MIN_PASSPHRASE};
use crate::error::{ConnectError, PublishError, ReadError};

// ───────────────────────────────────────────────────────────────
// Network port (domain → link layer)
// ───────────────────────────────────────────────────────────────

/// Authentication used by the setup access point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApAuth {
    Open,
    Wpa2Personal,
}

/// Access-point parameters handed to [`NetworkPort::bring_up_access_point`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApSettings {
    pub ssid: heapless::String<32>,
    /// Empty when `auth` is [`ApAuth::Open`].
    pub passphrase: heapless::String<64>,
    pub channel: u8,
    pub max_connections: u16,
    pub auth: ApAuth,
}

impl ApSettings {
    /// A passphrase shorter than the WPA2-PSK minimum yields an open AP.
    pub fn from_config(cfg: &AccessPointConfig) -> Self {
        let wpa2 = cfg.passphrase.chars().count() >= WPA2_MIN_PASSPHRASE;
        Self {
            ssid: cfg.ssid.clone(),
            passphrase: if wpa2 {
                cfg.passphrase.clone()
            } else {
                heapless::String::new()
            },
            channel: cfg.channel,
            max_connections: cfg.max_connections,
            auth: if wpa2 { ApAuth::Wpa2Personal } else { ApAuth::Open },
        }
    }
}

/// Commands the controller issues to the link layer.  Results arrive
/// asynchronously as [`NetworkEvent`](super::events::NetworkEvent)s.
pub trait NetworkPort {
    /// Configure and start the station interface.
    fn bring_up_client(&mut self, ssid: &str, password: &str) -> Result<(), ConnectError>;

    /// Begin (or retry) association with the configured network.
    fn connect(&mut self) -> Result<(), ConnectError>;

    /// Stop the station interface and disable it.
    fn tear_down(&mut self) -> Result<(), ConnectError>;

    /// Configure and start the setup access point.
    fn bring_up_access_point(&mut self, settings: &ApSettings) -> Result<(), ConnectError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value string storage.
///
/// Every call opens the namespace, performs the operation, and closes it
/// again.  Writes become durable on [`commit`](Self::commit).
pub trait StoragePort {
    /// Read a string into `buf`.  Returns the byte length, or `None` if the
    /// key does not exist.  A value longer than `buf` is
    /// [`StorageError::TooLarge`], never a truncated read.
    fn get_str(
        &self,
        namespace: &str,
        key: &str,
        buf: &mut [u8],
    ) -> Result<Option<usize>, StorageError>;

    fn set_str(&mut self, namespace: &str, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key.  Returns `Ok(())` even if the key didn't exist.
    fn remove(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    fn commit(&mut self, namespace: &str) -> Result<(), StorageError>;

    /// Remove every key in the namespace.
    fn erase_namespace(&mut self, namespace: &str) -> Result<(), StorageError>;
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// The namespace handle could not be opened.
    Unavailable,
    /// Stored value larger than the caller's buffer.
    TooLarge,
    /// Stored bytes are not a valid string.
    Corrupted,
    /// Partition full.
    Full,
    /// Any other backend error code.
    Io(i32),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "namespace unavailable"),
            Self::TooLarge => write!(f, "value larger than buffer"),
            Self::Corrupted => write!(f, "stored value corrupted"),
            Self::Full => write!(f, "storage full"),
            Self::Io(rc) => write!(f, "I/O error (rc={})", rc),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Messaging port (domain → MQTT)
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QoS {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

pub trait MessagingPort {
    /// Whether a broker session is currently established.
    fn is_connected(&self) -> bool;

    /// Hand one message to the client.  Fire-and-forget: `Ok` means the
    /// message was enqueued, not that the broker acknowledged it.
    fn publish(
        &mut self,
        topic: &str,
        payload: &str,
        qos: QoS,
        retain: bool,
    ) -> Result<(), PublishError>;
}

// ───────────────────────────────────────────────────────────────
// Sensor port (hardware → domain)
// ───────────────────────────────────────────────────────────────

/// One humidity/temperature measurement as returned by the sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Relative humidity, %RH.
    pub humidity: f32,
    /// Temperature, °C.
    pub temperature: f32,
}

/// On-demand sensor read.  Implementations keep no state across calls.
pub trait SensorPort {
    fn read(&mut self) -> Result<Measurement, ReadError>;
}

// ───────────────────────────────────────────────────────────────
// GPIO ports
// ───────────────────────────────────────────────────────────────

/// The four indicator lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum IndicatorLine {
    Config = 0,
    Temperature = 1,
    Humidity = 2,
    Error = 3,
}

impl IndicatorLine {
    pub const COUNT: usize = 4;
    pub const ALL: [Self; Self::COUNT] = [Self::Config, Self::Temperature, Self::Humidity, Self::Error];
}

/// Request a short pulse on an indicator line.  Callable from any task;
/// never blocks.
pub trait IndicatorPort {
    fn pulse(&self, line: IndicatorLine);
}

/// The reset button, already translated from the active-low level.
pub trait ButtonPort {
    fn is_pressed(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Platform ports
// ───────────────────────────────────────────────────────────────

/// Monotonic milliseconds since boot.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

pub trait RestartPort {
    /// Restart immediately.  On the device this does not return.
    fn restart_now(&mut self);

    /// Restart once `grace` has elapsed, without blocking the caller.
    fn restart_after(&mut self, grace: Duration);
}

/// Starts the long-running services the controller brings up on mode
/// entry.  Implementations must tolerate repeated calls.
pub trait ServiceLauncher {
    fn start_telemetry(&mut self) -> crate::error::Result<()>;
    fn start_provisioning_portal(&mut self) -> crate::error::Result<()>;
}

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
