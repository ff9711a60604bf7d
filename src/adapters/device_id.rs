//! Device identity derived from the ESP32 factory MAC address.
//!
//! Produces a stable device ID in the form `HN-XXYYZZ` (last 3 bytes of
//! the 6-byte MAC in uppercase hex). This ID is:
//! - Deterministic across reboots (factory-burned eFuse MAC)
//! - The middle segment of every telemetry topic
//! - The MQTT client id and the footer of the setup page
//!
//! The STA hostname is `hygronode-xxyyzz`.

use core::fmt::Write;

pub use crate::app::events::MacAddress;

/// "HN-XXYYZZ" (9 chars).
pub type DeviceIdString = heapless::String<16>;

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: the buffer is exactly the 6 bytes the call writes.
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0x24, 0x6F, 0x28, 0x1A, 0x2B, 0x3C]
}

/// Format: `HN-XXYYZZ` (e.g., `HN-1A2B3C`).
pub fn device_id(mac: &MacAddress) -> DeviceIdString {
    let mut id = DeviceIdString::new();
    let _ = write!(id, "HN-{:02X}{:02X}{:02X}", mac[3], mac[4], mac[5]);
    id
}

/// Format: `hygronode-xxyyzz` (lowercase, 16 chars).
pub fn hostname(mac: &MacAddress) -> heapless::String<24> {
    let mut name = heapless::String::<24>::new();
    let _ = write!(name, "hygronode-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    name
}
