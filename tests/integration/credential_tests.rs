//! Credential store over the NVS adapter, including injected failures.

use hygronode::adapters::nvs::NvsAdapter;
use hygronode::app::credentials::{CredentialStore, NAMESPACE, PASSWORD_KEY, SSID_KEY, StoredCredentials};
use hygronode::app::ports::StoragePort;
use hygronode::error::StoreError;

use crate::mock_hw::{creds, provisioned_store};

#[test]
fn round_trip() {
    let nvs = NvsAdapter::new_in_memory();
    let mut store = CredentialStore::new(nvs);
    store.save("Home", "secret12").unwrap();
    assert_eq!(store.load(), Ok(creds("Home", "secret12")));
}

#[test]
fn nothing_stored_is_empty() {
    let store = CredentialStore::new(NvsAdapter::new_in_memory());
    let loaded = store.load().unwrap();
    assert!(!loaded.is_provisioned());
}

#[test]
fn partial_record_loads_as_empty() {
    let mut nvs = NvsAdapter::new_in_memory();
    nvs.set_str(NAMESPACE, SSID_KEY, "Home").unwrap();
    let store = CredentialStore::new(nvs);
    assert_eq!(store.load(), Ok(StoredCredentials::empty()));
}

#[test]
fn oversized_stored_value_is_invalid() {
    let mut nvs = NvsAdapter::new_in_memory();
    nvs.set_str(NAMESPACE, SSID_KEY, &"s".repeat(40)).unwrap();
    nvs.set_str(NAMESPACE, PASSWORD_KEY, "secret12").unwrap();
    let store = CredentialStore::new(nvs);
    assert_eq!(store.load(), Err(StoreError::Invalid));
}

#[test]
fn unavailable_partition_is_reported() {
    let nvs = NvsAdapter::new_in_memory();
    nvs.set_unavailable(true);
    assert_eq!(CredentialStore::new(nvs).load(), Err(StoreError::Unavailable));
}

#[test]
fn failed_save_keeps_the_previous_pair() {
    let old = creds("Old", "oldpass1");

    // A single write error at each mutating step of the save in turn.
    for budget in 0..4 {
        let nvs = provisioned_store(old.ssid(), old.password());
        let mut store = CredentialStore::new(nvs.clone());
        nvs.fail_writes_after(budget);
        assert!(store.save("Home", "secret12").is_err(), "budget {budget} should fail");
        nvs.heal();

        assert_eq!(store.load(), Ok(old.clone()), "budget {budget}");
    }
}

#[test]
fn persistent_write_failure_never_yields_a_mixed_pair() {
    let old = creds("Old", "oldpass1");
    let new = creds("Home", "secret12");

    // The write-back fails too, like a flash that has stopped accepting writes.
    for budget in 0..4 {
        let nvs = provisioned_store(old.ssid(), old.password());
        let mut store = CredentialStore::new(nvs.clone());
        nvs.fail_all_writes_after(budget);
        let saved = store.save(new.ssid(), new.password());
        nvs.heal();
        assert!(saved.is_err(), "budget {budget} should fail");

        let loaded = store.load().unwrap();
        assert!(
            loaded == old || loaded == new || loaded == StoredCredentials::empty(),
            "budget {budget}: mixed pair {:?}",
            loaded
        );
    }
}

#[test]
fn erase_removes_both_fields() {
    let nvs = provisioned_store("Home", "secret12");
    let mut store = CredentialStore::new(nvs.clone());
    store.erase().unwrap();
    assert_eq!(nvs.peek(NAMESPACE, SSID_KEY), None);
    assert_eq!(nvs.peek(NAMESPACE, PASSWORD_KEY), None);
}

#[test]
fn independent_handles_see_the_same_partition() {
    let nvs = NvsAdapter::new_in_memory();
    let mut writer = CredentialStore::new(nvs.clone());
    let reader = CredentialStore::new(nvs);
    writer.save("Home", "secret12").unwrap();
    assert!(reader.load().unwrap().is_provisioned());
}
