//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`StoragePort`] with NVS strings.
//!
//! - Every call opens the namespace, runs, and closes it again, so any
//!   number of `NvsAdapter` handles may coexist.
//! - A read-only open of a namespace that was never written reports
//!   "not found", which maps to an absent key rather than an error.
//! - Values longer than the caller's buffer are `TooLarge`, never a
//!   truncated read.
//!
//! The simulation backend keeps a shared in-memory map.  Clones see the
//! same data, and tests can inject failures.

use crate::app::ports::{StorageError, StoragePort};
use log::info;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;
#[cfg(not(target_os = "espidf"))]
use std::sync::{Arc, Mutex};

/// Longest string the device backend will read.
#[cfg(target_os = "espidf")]
const MAX_VALUE_LEN: usize = 128;
/// NVS limits namespace and key names to 15 characters.
#[cfg(target_os = "espidf")]
const MAX_NAME_LEN: usize = 15;

/// Initialise the default NVS partition.  On `NO_FREE_PAGES` or
/// `NEW_VERSION_FOUND` the partition is erased and initialised once more.
#[cfg(target_os = "espidf")]
pub fn init_flash() -> Result<(), StorageError> {
    // SAFETY: called once from main() before any NvsAdapter is used.
    let ret = unsafe { nvs_flash_init() };
    if ret == ESP_ERR_NVS_NO_FREE_PAGES as i32 || ret == ESP_ERR_NVS_NEW_VERSION_FOUND as i32 {
        log::warn!("NVS: erasing and re-initialising flash partition");
        let ret = unsafe { nvs_flash_erase() };
        if ret != ESP_OK as i32 {
            return Err(StorageError::Io(ret));
        }
        let ret = unsafe { nvs_flash_init() };
        if ret != ESP_OK as i32 {
            return Err(StorageError::Io(ret));
        }
    } else if ret != ESP_OK as i32 {
        return Err(StorageError::Io(ret));
    }
    info!("NVS: flash initialised");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_flash() -> Result<(), StorageError> {
    info!("NVS(sim): flash init skipped");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
#[derive(Default)]
struct SimStore {
    values: HashMap<String, String>,
    commits: usize,
    /// Mutating calls still allowed before the next one fails.
    write_budget: Option<usize>,
    /// Keep failing every write once the budget is spent.
    fail_persistently: bool,
    unavailable: bool,
}

#[derive(Clone)]
pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    sim: Arc<Mutex<SimStore>>,
}

impl NvsAdapter {
    /// Handle to the default partition.  [`init_flash`] must have succeeded.
    #[cfg(target_os = "espidf")]
    pub fn new() -> Self {
        Self {}
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self::new_in_memory()
    }

    /// Empty simulation store.
    #[cfg(not(target_os = "espidf"))]
    pub fn new_in_memory() -> Self {
        info!("NvsAdapter: simulation backend");
        Self {
            sim: Arc::new(Mutex::new(SimStore::default())),
        }
    }

    /// Open a namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let ns = c_name(namespace);
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        // SAFETY: `ns` is NUL-terminated and outlives the call.
        let ret = unsafe { nvs_open(ns.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK as i32 {
            return Err(ret);
        }

        let result = f(handle);
        // SAFETY: `handle` was opened above and is closed exactly once.
        unsafe {
            nvs_close(handle);
        }
        result
    }
}

impl Default for NvsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy a name into a NUL-terminated buffer, truncated to the NVS limit.
#[cfg(target_os = "espidf")]
fn c_name(name: &str) -> [u8; MAX_NAME_LEN + 1] {
    let mut buf = [0u8; MAX_NAME_LEN + 1];
    let bytes = name.as_bytes();
    let len = bytes.len().min(MAX_NAME_LEN);
    buf[..len].copy_from_slice(&bytes[..len]);
    buf
}

#[cfg(target_os = "espidf")]
fn map_err(rc: i32) -> StorageError {
    if rc == ESP_ERR_NVS_NOT_ENOUGH_SPACE as i32 {
        StorageError::Full
    } else if rc == ESP_ERR_NVS_INVALID_LENGTH as i32 {
        StorageError::TooLarge
    } else if rc == ESP_ERR_NVS_PART_NOT_FOUND as i32 || rc == ESP_ERR_NVS_NOT_INITIALIZED as i32 {
        StorageError::Unavailable
    } else {
        StorageError::Io(rc)
    }
}

#[cfg(target_os = "espidf")]
impl StoragePort for NvsAdapter {
    fn get_str(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<Option<usize>, StorageError> {
        let key = c_name(key);
        let result = Self::with_nvs_handle(namespace, false, |handle| {
            let mut size: usize = 0;
            // First call: size including the terminating NUL.
            let ret = unsafe {
                nvs_get_str(handle, key.as_ptr() as *const _, core::ptr::null_mut(), &mut size)
            };
            if ret != ESP_OK as i32 {
                return Err(ret);
            }
            let len = size.saturating_sub(1);
            if len > buf.len() || len > MAX_VALUE_LEN {
                return Err(ESP_ERR_NVS_INVALID_LENGTH as i32);
            }
            let mut tmp = [0u8; MAX_VALUE_LEN + 1];
            let ret = unsafe {
                nvs_get_str(handle, key.as_ptr() as *const _, tmp.as_mut_ptr() as *mut _, &mut size)
            };
            if ret != ESP_OK as i32 {
                return Err(ret);
            }
            buf[..len].copy_from_slice(&tmp[..len]);
            Ok(len)
        });
        match result {
            Ok(len) => Ok(Some(len)),
            Err(rc) if rc == ESP_ERR_NVS_NOT_FOUND as i32 => Ok(None),
            Err(rc) => Err(map_err(rc)),
        }
    }

    fn set_str(&mut self, namespace: &str, key: &str, value: &str) -> Result<(), StorageError> {
        let key = c_name(key);
        let mut cvalue = Vec::with_capacity(value.len() + 1);
        cvalue.extend_from_slice(value.as_bytes());
        cvalue.push(0);
        Self::with_nvs_handle(namespace, true, |handle| {
            let ret = unsafe {
                nvs_set_str(handle, key.as_ptr() as *const _, cvalue.as_ptr() as *const _)
            };
            if ret != ESP_OK as i32 {
                return Err(ret);
            }
            Ok(())
        })
        .map_err(map_err)
    }

    fn remove(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        let key = c_name(key);
        Self::with_nvs_handle(namespace, true, |handle| {
            let ret = unsafe { nvs_erase_key(handle, key.as_ptr() as *const _) };
            if ret != ESP_OK as i32 && ret != ESP_ERR_NVS_NOT_FOUND as i32 {
                return Err(ret);
            }
            Ok(())
        })
        .map_err(map_err)
    }

    fn commit(&mut self, namespace: &str) -> Result<(), StorageError> {
        Self::with_nvs_handle(namespace, true, |handle| {
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK as i32 {
                return Err(ret);
            }
            Ok(())
        })
        .map_err(map_err)
    }

    fn erase_namespace(&mut self, namespace: &str) -> Result<(), StorageError> {
        Self::with_nvs_handle(namespace, true, |handle| {
            let ret = unsafe { nvs_erase_all(handle) };
            if ret != ESP_OK as i32 {
                return Err(ret);
            }
            Ok(())
        })
        .map_err(map_err)
    }
}

// ── Simulation backend ─────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl NvsAdapter {
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, SimStore>, StorageError> {
        let guard = self.sim.lock().map_err(|_| StorageError::Unavailable)?;
        if guard.unavailable {
            return Err(StorageError::Unavailable);
        }
        Ok(guard)
    }

    fn lock_for_write(&self) -> Result<std::sync::MutexGuard<'_, SimStore>, StorageError> {
        let mut guard = self.lock()?;
        if let Some(n) = guard.write_budget {
            if n == 0 {
                if !guard.fail_persistently {
                    guard.write_budget = None;
                }
                return Err(StorageError::Io(-1));
            }
            guard.write_budget = Some(n - 1);
        }
        Ok(guard)
    }

    /// Allow `n` more mutating calls, then fail exactly one with `Io`.
    pub fn fail_writes_after(&self, n: usize) {
        if let Ok(mut s) = self.sim.lock() {
            s.write_budget = Some(n);
            s.fail_persistently = false;
        }
    }

    /// Allow `n` more mutating calls; every later one fails with `Io`.
    pub fn fail_all_writes_after(&self, n: usize) {
        if let Ok(mut s) = self.sim.lock() {
            s.write_budget = Some(n);
            s.fail_persistently = true;
        }
    }

    /// Make every call fail as if the namespace could not be opened.
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut s) = self.sim.lock() {
            s.unavailable = unavailable;
        }
    }

    /// Clear injected failures.
    pub fn heal(&self) {
        if let Ok(mut s) = self.sim.lock() {
            s.write_budget = None;
            s.fail_persistently = false;
            s.unavailable = false;
        }
    }

    pub fn commit_count(&self) -> usize {
        self.sim.lock().map(|s| s.commits).unwrap_or(0)
    }

    /// Raw view of a stored value.
    pub fn peek(&self, namespace: &str, key: &str) -> Option<String> {
        let composite = Self::composite_key(namespace, key);
        self.sim.lock().ok()?.values.get(&composite).cloned()
    }
}

#[cfg(not(target_os = "espidf"))]
impl StoragePort for NvsAdapter {
    fn get_str(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<Option<usize>, StorageError> {
        let composite = Self::composite_key(namespace, key);
        let store = self.lock()?;
        let Some(value) = store.values.get(&composite) else {
            return Ok(None);
        };
        if value.len() > buf.len() {
            return Err(StorageError::TooLarge);
        }
        buf[..value.len()].copy_from_slice(value.as_bytes());
        Ok(Some(value.len()))
    }

    fn set_str(&mut self, namespace: &str, key: &str, value: &str) -> Result<(), StorageError> {
        let composite = Self::composite_key(namespace, key);
        self.lock_for_write()?.values.insert(composite, value.to_owned());
        Ok(())
    }

    fn remove(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        let composite = Self::composite_key(namespace, key);
        self.lock_for_write()?.values.remove(&composite);
        Ok(())
    }

    fn commit(&mut self, _namespace: &str) -> Result<(), StorageError> {
        self.lock_for_write()?.commits += 1;
        Ok(())
    }

    fn erase_namespace(&mut self, namespace: &str) -> Result<(), StorageError> {
        let prefix = format!("{}::", namespace);
        self.lock_for_write()?
            .values
            .retain(|k, _| !k.starts_with(&prefix));
        Ok(())
    }
}
