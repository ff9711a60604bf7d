//! WiFi adapter for station and access-point modes.
//!
//! Implements [`NetworkPort`].  Every call returns as soon as the driver
//! has accepted the request.  Progress (interface started, address
//! assigned, link lost, stations joining the setup AP) is reported back
//! as [`NetworkEvent`]s on the controller's input channel.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `EspWifi` plus system event loop
//!   subscriptions.
//! - **all other targets**: a simulated link that records every call and
//!   replays the events a real driver would raise.

use std::sync::mpsc::Sender;

use log::{info, warn};

use crate::app::events::{ControllerInput, NetworkEvent};
use crate::app::ports::{ApAuth, ApSettings, NetworkPort};
use crate::error::ConnectError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::{EspSubscription, EspSystemEventLoop, System},
    hal::modem::Modem,
    netif::IpEvent,
    nvs::EspDefaultNvsPartition,
    wifi::{
        AccessPointConfiguration, AuthMethod, ClientConfiguration, Configuration, EspWifi,
        WifiEvent,
    },
};

/// Forward one event to the supervisor.  A closed channel means the
/// supervisor is gone and the event has nowhere to go.
fn forward(events: &Sender<ControllerInput>, event: NetworkEvent) {
    if events.send(event.into()).is_err() {
        warn!("WiFi: controller channel closed, dropped {:?}", event);
    }
}

/// Station auth derived from the password: empty means an open network.
pub fn client_auth_is_open(password: &str) -> bool {
    password.is_empty()
}

// ───────────────────────────────────────────────────────────────
// Device backend
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct WifiAdapter {
    wifi: EspWifi<'static>,
    _wifi_events: EspSubscription<'static, System>,
    _ip_events: EspSubscription<'static, System>,
}

#[cfg(target_os = "espidf")]
fn driver_err(e: esp_idf_svc::sys::EspError) -> ConnectError {
    ConnectError::Driver(e.code())
}

#[cfg(target_os = "espidf")]
impl WifiAdapter {
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
        hostname: &str,
        events: Sender<ControllerInput>,
    ) -> Result<Self, esp_idf_svc::sys::EspError> {
        let mut wifi = EspWifi::new(modem, sysloop.clone(), nvs)?;
        if let Err(e) = wifi.sta_netif_mut().set_hostname(hostname) {
            warn!("WiFi: could not set hostname '{}': {:?}", hostname, e);
        }

        let tx = events.clone();
        let wifi_events = sysloop.subscribe::<WifiEvent, _>(move |event| match event {
            WifiEvent::StaStarted => forward(&tx, NetworkEvent::ClientStarted),
            WifiEvent::StaDisconnected(d) => {
                forward(&tx, NetworkEvent::Disconnected { reason: d.reason() });
            }
            WifiEvent::ApStaConnected(c) => forward(
                &tx,
                NetworkEvent::PeerAssociated {
                    mac: c.mac(),
                    aid: c.aid(),
                },
            ),
            WifiEvent::ApStaDisconnected(d) => forward(
                &tx,
                NetworkEvent::PeerLeft {
                    mac: d.mac(),
                    aid: d.aid(),
                    reason: d.reason(),
                },
            ),
            _ => {}
        })?;

        let tx = events;
        let ip_events = sysloop.subscribe::<IpEvent, _>(move |event| {
            if let IpEvent::DhcpIpAssigned(assignment) = event {
                let ip = core::net::Ipv4Addr::from(assignment.ip_settings.ip.octets());
                forward(&tx, NetworkEvent::AddressAcquired { ip });
            }
        })?;

        info!("WiFi: driver ready (hostname '{}')", hostname);
        Ok(Self {
            wifi,
            _wifi_events: wifi_events,
            _ip_events: ip_events,
        })
    }
}

#[cfg(target_os = "espidf")]
impl NetworkPort for WifiAdapter {
    fn bring_up_client(&mut self, ssid: &str, password: &str) -> Result<(), ConnectError> {
        let auth_method = if client_auth_is_open(password) {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let config = Configuration::Client(ClientConfiguration {
            ssid: ssid.try_into().map_err(|_| ConnectError::InvalidCredentials)?,
            password: password
                .try_into()
                .map_err(|_| ConnectError::InvalidCredentials)?,
            auth_method,
            ..Default::default()
        });
        self.wifi.set_configuration(&config).map_err(driver_err)?;
        self.wifi.start().map_err(driver_err)?;
        info!("WiFi: station starting for '{}'", ssid);
        Ok(())
    }

    fn connect(&mut self) -> Result<(), ConnectError> {
        self.wifi.connect().map_err(driver_err)?;
        info!("WiFi: association requested");
        Ok(())
    }

    fn tear_down(&mut self) -> Result<(), ConnectError> {
        if let Err(e) = self.wifi.disconnect() {
            warn!("WiFi: disconnect before stop failed: {:?}", e);
        }
        self.wifi.stop().map_err(driver_err)?;
        info!("WiFi: station stopped");
        Ok(())
    }

    fn bring_up_access_point(&mut self, settings: &ApSettings) -> Result<(), ConnectError> {
        let auth_method = match settings.auth {
            ApAuth::Open => AuthMethod::None,
            ApAuth::Wpa2Personal => AuthMethod::WPA2Personal,
        };
        let config = Configuration::AccessPoint(AccessPointConfiguration {
            ssid: settings
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| ConnectError::InvalidCredentials)?,
            password: settings
                .passphrase
                .as_str()
                .try_into()
                .map_err(|_| ConnectError::InvalidCredentials)?,
            auth_method,
            channel: settings.channel,
            max_connections: settings.max_connections,
            ..Default::default()
        });
        self.wifi.set_configuration(&config).map_err(driver_err)?;
        self.wifi.start().map_err(driver_err)?;
        info!(
            "WiFi: access point '{}' up on channel {} ({:?})",
            settings.ssid, settings.channel, settings.auth
        );
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Simulation backend
// ───────────────────────────────────────────────────────────────

/// One call the simulated link received.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimCall {
    BringUpClient { ssid: String, open: bool },
    Connect,
    TearDown,
    BringUpAccessPoint { ssid: String, auth: ApAuth },
}

#[cfg(not(target_os = "espidf"))]
pub struct WifiAdapter {
    events: Sender<ControllerInput>,
    /// Address handed out on `connect()`; `None` simulates an unreachable network.
    lease: Option<core::net::Ipv4Addr>,
    calls: Vec<SimCall>,
}

#[cfg(not(target_os = "espidf"))]
impl WifiAdapter {
    pub fn new(events: Sender<ControllerInput>) -> Self {
        info!("WiFi(sim): simulated link");
        Self {
            events,
            lease: None,
            calls: Vec::new(),
        }
    }

    /// Make the next `connect()` acquire `ip`.
    pub fn set_lease(&mut self, ip: Option<core::net::Ipv4Addr>) {
        self.lease = ip;
    }

    pub fn calls(&self) -> &[SimCall] {
        &self.calls
    }
}

#[cfg(not(target_os = "espidf"))]
impl NetworkPort for WifiAdapter {
    fn bring_up_client(&mut self, ssid: &str, password: &str) -> Result<(), ConnectError> {
        if ssid.is_empty() || ssid.len() > 32 || password.len() > 64 {
            return Err(ConnectError::InvalidCredentials);
        }
        info!("WiFi(sim): station starting for '{}'", ssid);
        self.calls.push(SimCall::BringUpClient {
            ssid: ssid.to_owned(),
            open: client_auth_is_open(password),
        });
        forward(&self.events, NetworkEvent::ClientStarted);
        Ok(())
    }

    fn connect(&mut self) -> Result<(), ConnectError> {
        self.calls.push(SimCall::Connect);
        match self.lease {
            Some(ip) => {
                info!("WiFi(sim): associated, lease {}", ip);
                forward(&self.events, NetworkEvent::AddressAcquired { ip });
            }
            None => info!("WiFi(sim): association pending, no lease"),
        }
        Ok(())
    }

    fn tear_down(&mut self) -> Result<(), ConnectError> {
        info!("WiFi(sim): station stopped");
        self.calls.push(SimCall::TearDown);
        Ok(())
    }

    fn bring_up_access_point(&mut self, settings: &ApSettings) -> Result<(), ConnectError> {
        info!("WiFi(sim): access point '{}' ({:?})", settings.ssid, settings.auth);
        self.calls.push(SimCall::BringUpAccessPoint {
            ssid: settings.ssid.as_str().to_owned(),
            auth: settings.auth,
        });
        Ok(())
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;
    use crate::config::AccessPointConfig;
    use std::sync::mpsc;

    #[test]
    fn client_bring_up_reports_started() {
        let (tx, rx) = mpsc::channel();
        let mut wifi = WifiAdapter::new(tx);
        wifi.bring_up_client("Home", "secret12").unwrap();
        assert_eq!(
            rx.try_recv(),
            Ok(ControllerInput::Network(NetworkEvent::ClientStarted))
        );
        assert_eq!(
            wifi.calls(),
            &[SimCall::BringUpClient {
                ssid: "Home".into(),
                open: false
            }]
        );
    }

    #[test]
    fn connect_without_lease_stays_silent() {
        let (tx, rx) = mpsc::channel();
        let mut wifi = WifiAdapter::new(tx);
        wifi.connect().unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn connect_with_lease_reports_address() {
        let (tx, rx) = mpsc::channel();
        let mut wifi = WifiAdapter::new(tx);
        let ip = core::net::Ipv4Addr::new(192, 168, 1, 40);
        wifi.set_lease(Some(ip));
        wifi.connect().unwrap();
        assert_eq!(
            rx.try_recv(),
            Ok(ControllerInput::Network(NetworkEvent::AddressAcquired { ip }))
        );
    }

    #[test]
    fn oversized_ssid_rejected() {
        let (tx, _rx) = mpsc::channel();
        let mut wifi = WifiAdapter::new(tx);
        let long = "x".repeat(33);
        assert_eq!(
            wifi.bring_up_client(&long, ""),
            Err(ConnectError::InvalidCredentials)
        );
    }

    #[test]
    fn access_point_records_auth() {
        let (tx, _rx) = mpsc::channel();
        let mut wifi = WifiAdapter::new(tx);
        let settings = ApSettings::from_config(&AccessPointConfig::default());
        wifi.bring_up_access_point(&settings).unwrap();
        assert_eq!(
            wifi.calls(),
            &[SimCall::BringUpAccessPoint {
                ssid: "ESP32-AP".into(),
                auth: ApAuth::Wpa2Personal
            }]
        );
    }

    #[test]
    fn open_network_detected() {
        assert!(client_auth_is_open(""));
        assert!(!client_auth_is_open("secret12"));
    }
}
