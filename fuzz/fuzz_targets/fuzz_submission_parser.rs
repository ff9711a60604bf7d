//! Fuzz target: `parse_submission`
//!
//! Feeds arbitrary request bodies (JSON, form-encoded, or garbage) to the
//! parser and asserts that anything it accepts satisfies the field limits.
//!
//! cargo fuzz run fuzz_submission_parser

#![no_main]

use hygronode::app::provisioning::{PASSWORD_MAX, SSID_MAX, parse_submission};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(sub) = parse_submission(data) {
        assert!(!sub.ssid.is_empty(), "accepted an empty ssid");
        assert!(!sub.password.is_empty(), "accepted an empty password");
        assert!(sub.ssid.len() <= SSID_MAX, "ssid exceeds limit");
        assert!(sub.password.len() <= PASSWORD_MAX, "password exceeds limit");
    }
});
