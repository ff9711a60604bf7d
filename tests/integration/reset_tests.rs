//! Hold-to-reset: detection thresholds and the erase-then-restart reaction.

use hygronode::adapters::restart::{RestartRequest, SystemRestart};
use hygronode::app::controller::factory_reset;
use hygronode::app::credentials::{CredentialStore, StoredCredentials};
use hygronode::app::events::AppEvent;
use hygronode::app::ports::IndicatorLine;
use hygronode::drivers::button::{ResetDetector, ResetEvent};
use hygronode::drivers::status_led::PulseQueue;

use crate::mock_hw::{RecordingSink, drain, provisioned_store};

const HOLD_MS: u64 = 3_000;
const POLL_MS: u64 = 10;

/// Feed a pressed level from `0` up to (excluding) `release_at`, then
/// released samples for another second.  Returns every event.
fn hold_until(release_at: u64) -> Vec<ResetEvent> {
    let mut detector = ResetDetector::new(HOLD_MS);
    let mut events = Vec::new();
    let mut t = 0;
    while t < release_at + 1_000 {
        if let Some(e) = detector.poll(t < release_at, t) {
            events.push(e);
        }
        t += POLL_MS;
    }
    events
}

#[test]
fn continuous_hold_fires_exactly_once() {
    let events = hold_until(8_000);
    assert_eq!(events, vec![ResetEvent::HoldElapsed { held_ms: HOLD_MS }]);
}

#[test]
fn release_just_before_threshold_never_fires() {
    assert!(hold_until(HOLD_MS - POLL_MS).is_empty());
}

#[test]
fn interrupted_hold_restarts_the_timer() {
    let mut detector = ResetDetector::new(HOLD_MS);
    let mut fired = 0;
    for t in (0..6_000).step_by(POLL_MS as usize) {
        // A single released sample at 2.5 s.
        let pressed = t != 2_500;
        if detector.poll(pressed, t).is_some() {
            fired += 1;
            assert!(t >= 2_510 + HOLD_MS);
        }
    }
    assert_eq!(fired, 1);
}

#[test]
fn reset_erases_credentials_then_restarts() {
    let nvs = provisioned_store("Home", "secret12");
    let mut store = CredentialStore::new(nvs.clone());
    let mut restart = SystemRestart::new();
    let pulses = PulseQueue::new();
    let mut sink = RecordingSink::default();

    factory_reset(&mut store, &mut restart, &pulses, &mut sink);

    assert_eq!(store.load(), Ok(StoredCredentials::empty()));
    assert_eq!(restart.requests(), &[RestartRequest::Now]);
    assert_eq!(sink.events, vec![AppEvent::ResetRequested]);
    assert!(drain(&pulses).is_empty());
}

#[test]
fn erase_failure_still_restarts() {
    let nvs = provisioned_store("Home", "secret12");
    let mut store = CredentialStore::new(nvs.clone());
    let mut restart = SystemRestart::new();
    let pulses = PulseQueue::new();
    let mut sink = RecordingSink::default();

    nvs.fail_writes_after(0);
    factory_reset(&mut store, &mut restart, &pulses, &mut sink);

    assert_eq!(restart.requests(), &[RestartRequest::Now]);
    assert_eq!(drain(&pulses), vec![IndicatorLine::Error]);
}
