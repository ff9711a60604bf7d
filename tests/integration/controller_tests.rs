//! Connectivity controller scenarios: boot decision, STA attempt with
//! deadline, AP fallback, and the provisioning restart edge.

use core::net::Ipv4Addr;
use core::time::Duration;

use hygronode::adapters::nvs::NvsAdapter;
use hygronode::adapters::restart::RestartRequest;
use hygronode::app::events::{AppEvent, ControllerInput, NetworkEvent};
use hygronode::app::mode::DeviceMode;
use hygronode::app::ports::{ApAuth, IndicatorLine};
use hygronode::app::credentials::StoredCredentials;
use hygronode::error::StoreError;

use crate::mock_hw::{
    MockLauncher, MockNetwork, NetCall, booted_from, controller, controller_with, creds, drain,
    provisioned_store,
};

const LEASE: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 23);

#[test]
fn empty_store_goes_straight_to_access_point() {
    let nvs = NvsAdapter::new_in_memory();
    let (ctl, watch, _) = booted_from(&nvs, 0);

    assert_eq!(ctl.mode(), DeviceMode::AccessPointFallback);
    assert_eq!(watch.get(), DeviceMode::AccessPointFallback);
    assert_eq!(ctl.network().client_count(), 0);
    assert!(!ctl.network().calls.contains(&NetCall::TearDown));
    assert_eq!(ctl.network().access_point_count(), 1);
    assert_eq!(ctl.services().portal_starts, 1);
    assert!(
        !ctl.sink()
            .events
            .iter()
            .any(|e| matches!(e, AppEvent::ModeChanged { to: DeviceMode::ConnectingClient, .. }))
    );
}

#[test]
fn access_point_uses_configured_identity() {
    let nvs = NvsAdapter::new_in_memory();
    let (ctl, _, _) = booted_from(&nvs, 0);
    let Some(NetCall::BringUpAccessPoint(ap)) = ctl.network().calls.last() else {
        panic!("access point not brought up: {:?}", ctl.network().calls);
    };
    assert_eq!(ap.ssid.as_str(), "ESP32-AP");
    assert_eq!(ap.auth, ApAuth::Wpa2Personal);
    assert_eq!(ap.channel, 1);
    assert_eq!(ap.max_connections, 4);
}

#[test]
fn stored_credentials_start_station() {
    let nvs = provisioned_store("Home", "secret12");
    let (ctl, _, _) = booted_from(&nvs, 0);

    assert_eq!(ctl.mode(), DeviceMode::ConnectingClient);
    assert_eq!(
        ctl.network().calls,
        vec![NetCall::BringUpClient {
            ssid: "Home".into(),
            password: "secret12".into()
        }]
    );
    let attempt = ctl.attempt().expect("attempt armed");
    assert_eq!(attempt.deadline_ms, 10_000);
    assert_eq!(
        ctl.sink().events.first(),
        Some(&AppEvent::Booted { provisioned: true })
    );
}

#[test]
fn address_within_timeout_connects() {
    let nvs = provisioned_store("Home", "secret12");
    let (mut ctl, watch, _) = booted_from(&nvs, 0);

    ctl.handle_network_event(NetworkEvent::ClientStarted, 50);
    assert_eq!(ctl.network().connect_count(), 1);

    ctl.handle_network_event(NetworkEvent::AddressAcquired { ip: LEASE }, 4_000);
    assert_eq!(ctl.mode(), DeviceMode::ConnectedClient);
    assert_eq!(watch.get(), DeviceMode::ConnectedClient);
    assert_eq!(ctl.acquired_ip(), Some(LEASE));
    assert_eq!(ctl.services().telemetry_starts, 1);
    assert!(ctl.attempt().is_none());

    // The old deadline must not fire any more.
    ctl.poll(20_000);
    assert_eq!(ctl.mode(), DeviceMode::ConnectedClient);
    assert_eq!(ctl.network().access_point_count(), 0);
}

#[test]
fn silent_network_falls_back_exactly_once() {
    let nvs = provisioned_store("Home", "secret12");
    let (mut ctl, _, _) = booted_from(&nvs, 0);
    ctl.handle_network_event(NetworkEvent::ClientStarted, 10);

    ctl.poll(9_999);
    assert_eq!(ctl.mode(), DeviceMode::ConnectingClient);

    ctl.poll(10_000);
    assert_eq!(ctl.mode(), DeviceMode::AccessPointFallback);
    assert_eq!(ctl.last_timeout().map(|t| t.waited_ms), Some(10_000));

    for t in [10_500, 15_000, 60_000] {
        ctl.poll(t);
    }
    assert_eq!(ctl.network().access_point_count(), 1);
    assert_eq!(ctl.services().portal_starts, 1);

    let calls = &ctl.network().calls;
    let teardown = calls.iter().position(|c| *c == NetCall::TearDown).expect("teardown");
    let ap = calls
        .iter()
        .position(|c| matches!(c, NetCall::BringUpAccessPoint(_)))
        .expect("ap");
    assert!(teardown < ap, "station must be torn down before the AP starts");
}

#[test]
fn late_address_loses_to_deadline() {
    let nvs = provisioned_store("Home", "secret12");
    let (mut ctl, _, _) = booted_from(&nvs, 0);
    ctl.handle_network_event(NetworkEvent::AddressAcquired { ip: LEASE }, 10_000);
    assert_eq!(ctl.mode(), DeviceMode::AccessPointFallback);
    assert_eq!(ctl.acquired_ip(), None);
}

#[test]
fn disconnect_while_connected_reconnects_in_place() {
    let nvs = provisioned_store("Home", "secret12");
    let (mut ctl, watch, _) = booted_from(&nvs, 0);
    ctl.handle_network_event(NetworkEvent::AddressAcquired { ip: LEASE }, 1_000);
    let version = watch.version();
    let connects = ctl.network().connect_count();

    ctl.handle_network_event(NetworkEvent::Disconnected { reason: 8 }, 30_000);
    assert_eq!(ctl.mode(), DeviceMode::ConnectedClient);
    assert_eq!(watch.version(), version);
    assert_eq!(ctl.network().connect_count(), connects + 1);
}

#[test]
fn disconnect_while_connecting_retries_before_deadline() {
    let nvs = provisioned_store("Home", "secret12");
    let (mut ctl, _, _) = booted_from(&nvs, 0);
    ctl.handle_network_event(NetworkEvent::ClientStarted, 10);
    ctl.handle_network_event(NetworkEvent::Disconnected { reason: 201 }, 3_000);
    assert_eq!(ctl.mode(), DeviceMode::ConnectingClient);
    assert_eq!(ctl.network().connect_count(), 2);
}

#[test]
fn connect_failure_pulses_error_and_keeps_waiting() {
    let network = MockNetwork {
        fail_connect: true,
        ..MockNetwork::default()
    };
    let (mut ctl, _, pulses) = controller_with(network, MockLauncher::default());
    ctl.boot(Ok(creds("Home", "secret12")), 0);
    assert!(drain(&pulses).is_empty());

    ctl.handle_network_event(NetworkEvent::ClientStarted, 5);
    assert_eq!(ctl.mode(), DeviceMode::ConnectingClient);
    assert_eq!(drain(&pulses), vec![IndicatorLine::Error]);

    // The deadline still decides.
    ctl.poll(10_000);
    assert_eq!(ctl.mode(), DeviceMode::AccessPointFallback);
}

#[test]
fn load_error_pulses_error_and_opens_access_point() {
    let (mut ctl, _, pulses) = controller();
    ctl.boot(Err(StoreError::Unavailable), 0);
    assert_eq!(ctl.mode(), DeviceMode::AccessPointFallback);
    assert_eq!(drain(&pulses), vec![IndicatorLine::Error]);
    assert_eq!(
        ctl.sink().events.first(),
        Some(&AppEvent::Booted { provisioned: false })
    );
}

#[test]
fn portal_failure_pulses_error() {
    let launcher = MockLauncher {
        fail_portal: true,
        ..MockLauncher::default()
    };
    let (mut ctl, _, pulses) = controller_with(MockNetwork::default(), launcher);
    ctl.boot(Ok(StoredCredentials::empty()), 0);
    assert_eq!(ctl.mode(), DeviceMode::AccessPointFallback);
    assert_eq!(ctl.services().portal_starts, 1);
    assert_eq!(drain(&pulses), vec![IndicatorLine::Error]);
}

#[test]
fn provisioning_accepted_schedules_one_restart() {
    let nvs = NvsAdapter::new_in_memory();
    let (mut ctl, _, _) = booted_from(&nvs, 0);

    ctl.handle_input(ControllerInput::ProvisioningAccepted, 100);
    ctl.handle_input(ControllerInput::ProvisioningAccepted, 200);

    assert!(ctl.restart_pending());
    assert_eq!(
        ctl.restart().requests(),
        &[RestartRequest::After(Duration::from_millis(1_000))]
    );
    assert_eq!(
        ctl.sink().count(|e| *e == AppEvent::ProvisioningAccepted),
        1
    );
}

#[test]
fn provisioning_accepted_ignored_outside_access_point() {
    let nvs = provisioned_store("Home", "secret12");
    let (mut ctl, _, _) = booted_from(&nvs, 0);
    ctl.handle_input(ControllerInput::ProvisioningAccepted, 100);
    assert!(!ctl.restart_pending());
    assert!(ctl.restart().requests().is_empty());
}

#[test]
fn wait_budget_shrinks_toward_deadline() {
    let nvs = provisioned_store("Home", "secret12");
    let (ctl, _, _) = booted_from(&nvs, 0);
    assert_eq!(ctl.wait_budget(0), Duration::from_millis(1_000));
    assert_eq!(ctl.wait_budget(9_600), Duration::from_millis(400));
    assert_eq!(ctl.wait_budget(12_000), Duration::ZERO);
}

#[test]
fn peer_events_do_not_change_mode() {
    let nvs = NvsAdapter::new_in_memory();
    let (mut ctl, watch, _) = booted_from(&nvs, 0);
    let version = watch.version();
    let mac = [0x02, 0, 0, 0, 0, 1];
    ctl.handle_network_event(NetworkEvent::PeerAssociated { mac, aid: 1 }, 500);
    ctl.handle_network_event(NetworkEvent::PeerLeft { mac, aid: 1, reason: 3 }, 900);
    assert_eq!(ctl.mode(), DeviceMode::AccessPointFallback);
    assert_eq!(watch.version(), version);
}
