//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements      | Connects to               |
//! |---------------|-----------------|---------------------------|
//! | `device_id`   | n/a             | eFuse factory MAC         |
//! | `http_portal` | n/a             | ESP-IDF httpd             |
//! | `log_sink`    | EventSink       | Serial log output         |
//! | `mqtt`        | MessagingPort   | ESP-MQTT client (TLS)     |
//! | `nvs`         | StoragePort     | NVS / in-memory store     |
//! | `restart`     | RestartPort     | `esp_restart()`           |
//! | `time`        | Clock           | ESP32 system timer        |
//! | `wifi`        | NetworkPort     | ESP-IDF WiFi STA + AP     |

pub mod device_id;
pub mod http_portal;
pub mod log_sink;
pub mod mqtt;
pub mod nvs;
pub mod restart;
pub mod time;
pub mod wifi;
