//! End-to-end provisioning: AP mode, a submission through the intake,
//! persistence in NVS, and the restart edge on the controller.

use std::sync::mpsc;

use hygronode::adapters::http_portal::serve_submission;
use hygronode::adapters::nvs::NvsAdapter;
use hygronode::adapters::restart::RestartRequest;
use hygronode::app::credentials::{CredentialStore, NAMESPACE, PASSWORD_KEY, SSID_KEY};
use hygronode::app::events::{AppEvent, ControllerInput};
use hygronode::app::mode::DeviceMode;
use hygronode::app::ports::IndicatorLine;
use hygronode::app::provisioning::{IntakeReply, ProvisioningIntake, REPLY_SAVED};
use hygronode::drivers::status_led::PulseQueue;

use crate::mock_hw::{TestController, booted_from, drain, provisioned_store};

struct Portal {
    controller: TestController,
    intake: ProvisioningIntake<NvsAdapter, PulseQueue>,
    inbox: mpsc::Receiver<ControllerInput>,
    nvs: NvsAdapter,
    pulses: PulseQueue,
}

impl Portal {
    fn from_store(nvs: NvsAdapter) -> Self {
        let (controller, watch, _) = booted_from(&nvs, 0);
        let (tx, inbox) = mpsc::channel();
        let pulses = PulseQueue::new();
        let intake = ProvisioningIntake::new(CredentialStore::new(nvs.clone()), watch, tx, pulses.clone());
        Self {
            controller,
            intake,
            inbox,
            nvs,
            pulses,
        }
    }

    fn in_setup_mode() -> Self {
        let portal = Self::from_store(NvsAdapter::new_in_memory());
        assert_eq!(portal.controller.mode(), DeviceMode::AccessPointFallback);
        portal
    }

    /// What the HTTP handler does: read, submit, reply, hand over.
    fn post(&mut self, body: &[u8]) -> IntakeReply {
        let mut pos = 0;
        let reply = serve_submission(&mut self.intake, Some(body.len()), |buf: &mut [u8]| {
            let n = buf.len().min(body.len() - pos);
            buf[..n].copy_from_slice(&body[pos..pos + n]);
            pos += n;
            Ok::<usize, ()>(n)
        });
        if reply.accepted {
            self.intake.hand_over();
        }
        while let Ok(input) = self.inbox.try_recv() {
            self.controller.handle_input(input, 1_000);
        }
        reply
    }

    fn stored(&self) -> (Option<String>, Option<String>) {
        (self.nvs.peek(NAMESPACE, SSID_KEY), self.nvs.peek(NAMESPACE, PASSWORD_KEY))
    }
}

#[test]
fn json_submission_is_persisted_and_restarts() {
    let mut portal = Portal::in_setup_mode();
    let reply = portal.post(br#"{"ssid":"Home","password":"secret12"}"#);

    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, REPLY_SAVED);
    assert_eq!(portal.stored(), (Some("Home".into()), Some("secret12".into())));
    assert_eq!(
        portal.controller.restart().requests(),
        &[RestartRequest::After(core::time::Duration::from_millis(1_000))]
    );
    assert_eq!(
        portal.controller.sink().count(|e| *e == AppEvent::ProvisioningAccepted),
        1
    );
}

#[test]
fn form_submission_is_persisted_and_restarts() {
    let mut portal = Portal::in_setup_mode();
    let reply = portal.post(b"ssid=Home&password=secret12");

    assert_eq!(reply.status, 200);
    assert_eq!(portal.stored(), (Some("Home".into()), Some("secret12".into())));
    assert!(portal.controller.restart_pending());
}

#[test]
fn percent_encoded_form_is_decoded_before_saving() {
    let mut portal = Portal::in_setup_mode();
    let reply = portal.post(b"ssid=My+Home%21&password=p%40ss%26word");
    assert_eq!(reply.status, 200);
    assert_eq!(
        portal.stored(),
        (Some("My Home!".into()), Some("p@ss&word".into()))
    );
}

#[test]
fn empty_ssid_is_rejected_without_side_effects() {
    let mut portal = Portal::in_setup_mode();
    let reply = portal.post(br#"{"ssid":"","password":"secret12"}"#);

    assert_eq!(reply.status, 400);
    assert!(reply.body.starts_with("Bad request"));
    assert_eq!(portal.stored(), (None, None));
    assert!(!portal.controller.restart_pending());
    assert!(portal.controller.restart().requests().is_empty());
}

#[test]
fn ssid_only_is_rejected_without_side_effects() {
    let mut portal = Portal::in_setup_mode();
    let reply = portal.post(b"ssid=Home");

    assert_eq!(reply.status, 400);
    assert_eq!(portal.stored(), (None, None));
    assert!(!portal.controller.restart_pending());
}

#[test]
fn oversized_fields_are_rejected() {
    let mut portal = Portal::in_setup_mode();
    let body = format!(r#"{{"ssid":"{}","password":"secret12"}}"#, "s".repeat(32));
    let reply = portal.post(body.as_bytes());
    assert_eq!(reply.status, 400);
    assert_eq!(portal.stored(), (None, None));
}

#[test]
fn storage_failure_is_500_and_pulses_error() {
    let mut portal = Portal::in_setup_mode();
    portal.nvs.set_unavailable(true);
    let reply = portal.post(b"ssid=Home&password=secret12");
    portal.nvs.heal();

    assert_eq!(reply.status, 500);
    assert!(!reply.accepted);
    assert_eq!(drain(&portal.pulses), vec![IndicatorLine::Error]);
    assert!(!portal.controller.restart_pending());
}

#[test]
fn submission_outside_setup_mode_is_refused() {
    let mut portal = Portal::from_store(provisioned_store("Old", "oldpass1"));
    assert_eq!(portal.controller.mode(), DeviceMode::ConnectingClient);

    let reply = portal.post(b"ssid=Home&password=secret12");
    assert_eq!(reply.status, 409);
    assert_eq!(portal.stored(), (Some("Old".into()), Some("oldpass1".into())));
}

#[test]
fn saved_credentials_drive_the_next_boot() {
    let mut portal = Portal::in_setup_mode();
    portal.post(b"ssid=Home&password=secret12");

    let (next_boot, _, _) = booted_from(&portal.nvs, 0);
    assert_eq!(next_boot.mode(), DeviceMode::ConnectingClient);
}
