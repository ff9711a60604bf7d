//! MQTT messaging adapter.
//!
//! [`MqttSession`] tracks whether the broker session is up.  It is driven
//! only by [`MqttEvent`] dispatch from the connection pump.
//! [`MqttMessaging`] implements [`MessagingPort`] on top of it.
//!
//! - **`target_os = "espidf"`**: `EspMqttClient` over TLS with the
//!   certificate bundle.  The pump thread drains `EspMqttConnection`.
//! - **all other targets**: publishes are recorded in memory.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::app::events::MqttEvent;
use crate::app::ports::{MessagingPort, QoS};
use crate::error::PublishError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{
    EspMqttClient, EspMqttConnection, EventPayload, MqttClientConfiguration, QoS as EspQoS,
};

/// Shared broker-session flag.
#[derive(Clone, Default)]
pub struct MqttSession {
    connected: Arc<AtomicBool>,
}

impl MqttSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn on_event(&self, event: MqttEvent) {
        match event {
            MqttEvent::Connected => {
                info!("MQTT: session up");
                self.connected.store(true, Ordering::Release);
            }
            MqttEvent::Disconnected => {
                warn!("MQTT: session lost");
                self.connected.store(false, Ordering::Release);
            }
            MqttEvent::BeforeConnect => debug!("MQTT: connecting"),
            MqttEvent::Published { id } => debug!("MQTT: message {} acknowledged", id),
            MqttEvent::Error => warn!("MQTT: client reported an error"),
            MqttEvent::Other => {}
        }
    }
}

#[cfg(target_os = "espidf")]
fn classify(payload: &EventPayload<'_, esp_idf_svc::sys::EspError>) -> MqttEvent {
    match payload {
        EventPayload::BeforeConnect => MqttEvent::BeforeConnect,
        EventPayload::Connected(_) => MqttEvent::Connected,
        EventPayload::Disconnected => MqttEvent::Disconnected,
        EventPayload::Published(id) => MqttEvent::Published { id: *id },
        EventPayload::Error(_) => MqttEvent::Error,
        _ => MqttEvent::Other,
    }
}

// ───────────────────────────────────────────────────────────────
// Device backend
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct MqttMessaging {
    client: EspMqttClient<'static>,
    session: MqttSession,
}

#[cfg(target_os = "espidf")]
impl MqttMessaging {
    /// Create the client and spawn the connection pump that feeds
    /// `session`.
    pub fn connect(
        broker_url: &str,
        client_id: &str,
        session: MqttSession,
    ) -> Result<Self, esp_idf_svc::sys::EspError> {
        let conf = MqttClientConfiguration {
            client_id: Some(client_id),
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        };
        let (client, conn) = EspMqttClient::new(broker_url, &conf)?;
        spawn_pump(conn, session.clone());
        info!("MQTT: client created for {}", broker_url);
        Ok(Self { client, session })
    }
}

#[cfg(target_os = "espidf")]
fn spawn_pump(mut conn: EspMqttConnection, session: MqttSession) {
    let spawned = std::thread::Builder::new()
        .name("mqtt-pump".into())
        .stack_size(6 * 1024)
        .spawn(move || {
            while let Ok(event) = conn.next() {
                session.on_event(classify(&event.payload()));
            }
            session.on_event(MqttEvent::Disconnected);
            info!("MQTT: connection closed, pump exiting");
        });
    if let Err(e) = spawned {
        log::error!("MQTT: failed to spawn pump thread: {}", e);
    }
}

#[cfg(target_os = "espidf")]
impl MessagingPort for MqttMessaging {
    fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    fn publish(&mut self, topic: &str, payload: &str, qos: QoS, retain: bool) -> Result<(), PublishError> {
        if !self.session.is_connected() {
            return Err(PublishError::NotConnected);
        }
        let qos = match qos {
            QoS::AtMostOnce => EspQoS::AtMostOnce,
            QoS::AtLeastOnce => EspQoS::AtLeastOnce,
            QoS::ExactlyOnce => EspQoS::ExactlyOnce,
        };
        self.client
            .enqueue(topic, qos, retain, payload.as_bytes())
            .map(|_| ())
            .map_err(|e| PublishError::Transport(e.code()))
    }
}

// ───────────────────────────────────────────────────────────────
// Simulation backend
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimMessage {
    pub topic: String,
    pub payload: String,
    pub qos: QoS,
    pub retain: bool,
}

#[cfg(not(target_os = "espidf"))]
pub struct MqttMessaging {
    session: MqttSession,
    sent: Vec<SimMessage>,
}

#[cfg(not(target_os = "espidf"))]
impl MqttMessaging {
    pub fn connect(broker_url: &str, client_id: &str, session: MqttSession) -> Result<Self, PublishError> {
        info!("MQTT(sim): client '{}' for {}", client_id, broker_url);
        Ok(Self {
            session,
            sent: Vec::new(),
        })
    }

    pub fn sent(&self) -> &[SimMessage] {
        &self.sent
    }
}

#[cfg(not(target_os = "espidf"))]
impl MessagingPort for MqttMessaging {
    fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    fn publish(&mut self, topic: &str, payload: &str, qos: QoS, retain: bool) -> Result<(), PublishError> {
        if !self.session.is_connected() {
            return Err(PublishError::NotConnected);
        }
        debug!("MQTT(sim): {} <- {}", topic, payload);
        self.sent.push(SimMessage {
            topic: topic.to_owned(),
            payload: payload.to_owned(),
            qos,
            retain,
        });
        Ok(())
    }
}
