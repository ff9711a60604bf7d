//! Inbound and outbound application events.
//!
//! Collaborator callbacks are translated into these tagged unions at the
//! adapter boundary, and the domain dispatches on them with an exhaustive
//! `match`.  [`AppEvent`]s flow the other way, out through the
//! [`EventSink`](super::ports::EventSink) port.

use core::fmt;
use core::net::Ipv4Addr;

use super::mode::DeviceMode;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Formats a MAC as `aa:bb:cc:dd:ee:ff`.
pub struct MacDisplay<'a>(pub &'a MacAddress);

impl fmt::Display for MacDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            m[0], m[1], m[2], m[3], m[4], m[5]
        )
    }
}

// ───────────────────────────────────────────────────────────────
// Network collaborator → controller
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkEvent {
    /// The station interface finished starting.
    ClientStarted,
    /// DHCP assigned the station an address.
    AddressAcquired { ip: Ipv4Addr },
    /// The station lost (or never got) its association.
    Disconnected { reason: u16 },
    /// A client joined the setup access point.
    PeerAssociated { mac: MacAddress, aid: u16 },
    /// A client left the setup access point.
    PeerLeft { mac: MacAddress, aid: u16, reason: u16 },
}

/// Everything the controller supervisor can be woken by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerInput {
    Network(NetworkEvent),
    /// The provisioning intake persisted new credentials.
    ProvisioningAccepted,
}

impl From<NetworkEvent> for ControllerInput {
    fn from(e: NetworkEvent) -> Self {
        Self::Network(e)
    }
}

// ───────────────────────────────────────────────────────────────
// MQTT collaborator → messaging session
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MqttEvent {
    BeforeConnect,
    Connected,
    Disconnected,
    Published { id: u32 },
    Error,
    /// Subscriptions, inbound data, and other events this node ignores.
    Other,
}

// ───────────────────────────────────────────────────────────────
// Domain → event sink
// ───────────────────────────────────────────────────────────────

/// A metric published by the telemetry task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Humidity,
    Temperature,
}

impl Metric {
    /// Final topic segment.
    pub fn topic_suffix(self) -> &'static str {
        match self {
            Self::Humidity => "humidity",
            Self::Temperature => "temperature",
        }
    }
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppEvent {
    /// Boot sequencing finished reading credentials.
    Booted { provisioned: bool },
    /// The controller changed mode.
    ModeChanged { from: DeviceMode, to: DeviceMode },
    /// New credentials were persisted; a restart is scheduled.
    ProvisioningAccepted,
    /// The reset button was held long enough; erase and restart follow.
    ResetRequested,
    /// A changed metric reached the broker session.
    MetricPublished { metric: Metric, value: f32 },
    /// The sensor could not be read this cycle.
    SensorFault,
}
