//! Mock adapters for integration tests.
//!
//! Records every port call so tests can assert on the full command
//! history without touching the radio, flash, or broker.  Storage,
//! restart, indicators and the sensor use the crate's own host backends.

use hygronode::adapters::nvs::NvsAdapter;
use hygronode::adapters::restart::SystemRestart;
use hygronode::app::controller::ConnectivityController;
use hygronode::app::credentials::{CredentialStore, StoredCredentials};
use hygronode::app::events::AppEvent;
use hygronode::app::mode::{ModeWatch, mode_channel};
use hygronode::app::ports::{
    ApSettings, EventSink, IndicatorLine, MessagingPort, NetworkPort, QoS, ServiceLauncher,
};
use hygronode::config::NodeConfig;
use hygronode::drivers::status_led::PulseQueue;
use hygronode::error::{ConnectError, Error, PublishError};

// ── Network call record ───────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetCall {
    BringUpClient { ssid: String, password: String },
    Connect,
    TearDown,
    BringUpAccessPoint(ApSettings),
}

#[derive(Default)]
pub struct MockNetwork {
    pub calls: Vec<NetCall>,
    pub fail_connect: bool,
}

#[allow(dead_code)]
impl MockNetwork {
    pub fn count(&self, pred: impl Fn(&NetCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    pub fn access_point_count(&self) -> usize {
        self.count(|c| matches!(c, NetCall::BringUpAccessPoint(_)))
    }

    pub fn client_count(&self) -> usize {
        self.count(|c| matches!(c, NetCall::BringUpClient { .. }))
    }

    pub fn connect_count(&self) -> usize {
        self.count(|c| *c == NetCall::Connect)
    }
}

impl NetworkPort for MockNetwork {
    fn bring_up_client(&mut self, ssid: &str, password: &str) -> Result<(), ConnectError> {
        self.calls.push(NetCall::BringUpClient {
            ssid: ssid.into(),
            password: password.into(),
        });
        Ok(())
    }

    fn connect(&mut self) -> Result<(), ConnectError> {
        self.calls.push(NetCall::Connect);
        if self.fail_connect {
            return Err(ConnectError::Driver(-1));
        }
        Ok(())
    }

    fn tear_down(&mut self) -> Result<(), ConnectError> {
        self.calls.push(NetCall::TearDown);
        Ok(())
    }

    fn bring_up_access_point(&mut self, settings: &ApSettings) -> Result<(), ConnectError> {
        self.calls.push(NetCall::BringUpAccessPoint(settings.clone()));
        Ok(())
    }
}

// ── Service launcher ──────────────────────────────────────────

#[derive(Default)]
pub struct MockLauncher {
    pub telemetry_starts: u32,
    pub portal_starts: u32,
    pub fail_portal: bool,
}

impl ServiceLauncher for MockLauncher {
    fn start_telemetry(&mut self) -> hygronode::error::Result<()> {
        self.telemetry_starts += 1;
        Ok(())
    }

    fn start_provisioning_portal(&mut self) -> hygronode::error::Result<()> {
        self.portal_starts += 1;
        if self.fail_portal {
            return Err(Error::Launch("portal"));
        }
        Ok(())
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(*event);
    }
}

// ── Messaging ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockMessaging {
    pub connected: bool,
    pub published: Vec<(String, String)>,
    pub fail_with: Option<PublishError>,
}

#[allow(dead_code)]
impl MockMessaging {
    pub fn online() -> Self {
        Self {
            connected: true,
            ..Self::default()
        }
    }
}

impl MessagingPort for MockMessaging {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn publish(&mut self, topic: &str, payload: &str, _qos: QoS, _retain: bool) -> Result<(), PublishError> {
        if let Some(e) = self.fail_with {
            return Err(e);
        }
        self.published.push((topic.into(), payload.into()));
        Ok(())
    }
}

// ── Rig ───────────────────────────────────────────────────────

pub type TestController =
    ConnectivityController<MockNetwork, MockLauncher, PulseQueue, RecordingSink, SystemRestart>;

#[allow(dead_code)]
pub fn test_config() -> NodeConfig {
    NodeConfig::default()
}

/// A controller on mocks, not yet booted.
#[allow(dead_code)]
pub fn controller() -> (TestController, ModeWatch, PulseQueue) {
    controller_with(MockNetwork::default(), MockLauncher::default())
}

#[allow(dead_code)]
pub fn controller_with(network: MockNetwork, launcher: MockLauncher) -> (TestController, ModeWatch, PulseQueue) {
    let (writer, watch) = mode_channel();
    let pulses = PulseQueue::new();
    let ctl = ConnectivityController::new(
        test_config(),
        writer,
        network,
        launcher,
        pulses.clone(),
        RecordingSink::default(),
        SystemRestart::new(),
    );
    (ctl, watch, pulses)
}

/// A controller booted from what `nvs` holds.
#[allow(dead_code)]
pub fn booted_from(nvs: &NvsAdapter, now_ms: u64) -> (TestController, ModeWatch, PulseQueue) {
    let (mut ctl, watch, pulses) = controller();
    ctl.boot(CredentialStore::new(nvs.clone()).load(), now_ms);
    (ctl, watch, pulses)
}

#[allow(dead_code)]
pub fn provisioned_store(ssid: &str, password: &str) -> NvsAdapter {
    let nvs = NvsAdapter::new_in_memory();
    CredentialStore::new(nvs.clone())
        .save(ssid, password)
        .expect("seed store");
    nvs
}

#[allow(dead_code)]
pub fn creds(ssid: &str, password: &str) -> StoredCredentials {
    StoredCredentials::new(ssid, password).expect("valid credentials")
}

/// Every pulse queued so far.
#[allow(dead_code)]
pub fn drain(pulses: &PulseQueue) -> Vec<IndicatorLine> {
    std::iter::from_fn(|| pulses.try_next()).collect()
}
