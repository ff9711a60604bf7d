//! Credential store: the typed {ssid, password} record on top of [`StoragePort`].
//!
//! The record lives under namespace `storage` as two NVS strings, `ssid`
//! and `password`.  There is no schema version.
//!
//! A save removes the old password first, then writes ssid, then password,
//! then commits.  Whatever step an interruption hits, the record on flash is
//! either the complete new pair or has no password, and a record with only
//! one field loads as empty.  A new ssid can never be paired with a stale
//! password.
//!
//! When a step fails and `save` returns an error, the previous pair is
//! written back the same way before returning.  Only a second failure
//! during that rewrite (or a power cut) can leave the record empty.

use core::str;

use log::{error, info, warn};

use super::ports::{StorageError, StoragePort};
use crate::error::StoreError;

pub const NAMESPACE: &str = "storage";
pub const SSID_KEY: &str = "ssid";
pub const PASSWORD_KEY: &str = "password";

pub const MAX_SSID_LEN: usize = 32;
pub const MAX_PASSWORD_LEN: usize = 64;

/// Persisted WiFi credentials.  Both fields are empty, or both are set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredCredentials {
    ssid: heapless::String<MAX_SSID_LEN>,
    password: heapless::String<MAX_PASSWORD_LEN>,
}

impl StoredCredentials {
    /// The "nothing saved" value.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a complete pair.  Empty or oversized fields are rejected.
    pub fn new(ssid: &str, password: &str) -> Result<Self, StoreError> {
        if ssid.is_empty() || password.is_empty() {
            return Err(StoreError::Invalid);
        }
        Ok(Self {
            ssid: heapless::String::try_from(ssid).map_err(|_| StoreError::Invalid)?,
            password: heapless::String::try_from(password).map_err(|_| StoreError::Invalid)?,
        })
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// True when a full pair is present.
    pub fn is_provisioned(&self) -> bool {
        !self.ssid.is_empty()
    }
}

pub struct CredentialStore<S: StoragePort> {
    storage: S,
}

impl<S: StoragePort> CredentialStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Read the stored pair.  Nothing saved (or only half a pair) is the
    /// empty value, not an error.
    pub fn load(&self) -> Result<StoredCredentials, StoreError> {
        let mut ssid_buf = [0u8; MAX_SSID_LEN];
        let mut pass_buf = [0u8; MAX_PASSWORD_LEN];

        let ssid = self.read_field(SSID_KEY, &mut ssid_buf)?;
        let password = self.read_field(PASSWORD_KEY, &mut pass_buf)?;

        match (ssid, password) {
            (Some(s), Some(p)) => {
                let creds = StoredCredentials::new(s, p)?;
                info!("CredentialStore: loaded credentials for '{}'", creds.ssid());
                Ok(creds)
            }
            (None, None) => {
                info!("CredentialStore: no credentials stored");
                Ok(StoredCredentials::empty())
            }
            _ => {
                warn!("CredentialStore: partial record found, treating as unprovisioned");
                Ok(StoredCredentials::empty())
            }
        }
    }

    /// Persist a complete pair.
    pub fn save(&mut self, ssid: &str, password: &str) -> Result<(), StoreError> {
        let creds = StoredCredentials::new(ssid, password)?;
        let previous = self.load().ok().filter(StoredCredentials::is_provisioned);

        if let Err(e) = self.write_pair(&creds) {
            if let Some(old) = previous {
                self.restore(&old);
            }
            return Err(e);
        }

        info!("CredentialStore: saved credentials for '{}'", creds.ssid());
        Ok(())
    }

    fn write_pair(&mut self, creds: &StoredCredentials) -> Result<(), StoreError> {
        self.storage.remove(NAMESPACE, PASSWORD_KEY).map_err(store_error)?;
        self.storage
            .set_str(NAMESPACE, SSID_KEY, creds.ssid())
            .map_err(store_error)?;
        self.storage
            .set_str(NAMESPACE, PASSWORD_KEY, creds.password())
            .map_err(store_error)?;
        self.storage.commit(NAMESPACE).map_err(store_error)
    }

    fn restore(&mut self, old: &StoredCredentials) {
        match self.write_pair(old) {
            Ok(()) => warn!("CredentialStore: save failed, kept credentials for '{}'", old.ssid()),
            Err(e) => error!("CredentialStore: previous credentials lost: {}", e),
        }
    }

    /// Wipe both fields.
    pub fn erase(&mut self) -> Result<(), StoreError> {
        self.storage.erase_namespace(NAMESPACE).map_err(store_error)?;
        self.storage.commit(NAMESPACE).map_err(store_error)?;
        info!("CredentialStore: credentials erased");
        Ok(())
    }

    /// Access the underlying storage (tests, diagnostics).
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// A present-but-empty value counts as absent.
    fn read_field<'b>(&self, key: &str, buf: &'b mut [u8]) -> Result<Option<&'b str>, StoreError> {
        let Some(len) = self.storage.get_str(NAMESPACE, key, buf).map_err(store_error)? else {
            return Ok(None);
        };
        let value = str::from_utf8(&buf[..len]).map_err(|_| StoreError::Invalid)?;
        Ok((!value.is_empty()).then_some(value))
    }
}

fn store_error(e: StorageError) -> StoreError {
    match e {
        StorageError::TooLarge | StorageError::Corrupted => StoreError::Invalid,
        StorageError::Unavailable | StorageError::Full | StorageError::Io(_) => {
            warn!("CredentialStore: storage error: {}", e);
            StoreError::Unavailable
        }
    }
}
