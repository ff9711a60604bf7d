//! GPIO pin assignments for the HygroNode board.
//!
//! Single source of truth; every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Indicator LEDs (active HIGH)
// ---------------------------------------------------------------------------

/// Lit while connecting, blinking while the setup AP is up.
pub const LED_CONFIG_GPIO: i32 = 14;
/// Pulsed after each temperature publish.
pub const LED_TEMPERATURE_GPIO: i32 = 27;
/// Pulsed after each humidity publish.
pub const LED_HUMIDITY_GPIO: i32 = 26;
/// Pulsed on sensor, storage, and network faults.
pub const LED_ERROR_GPIO: i32 = 25;

// ---------------------------------------------------------------------------
// Sensor
// ---------------------------------------------------------------------------

/// AM2301 (DHT21/DHT22 family) single-wire data line, open-drain with pull-up.
pub const SENSOR_DATA_GPIO: i32 = 33;

// ---------------------------------------------------------------------------
// User button (active-low with pull-up)
// ---------------------------------------------------------------------------

/// Hold to erase credentials and restart into setup mode.
pub const RESET_BUTTON_GPIO: i32 = 32;
