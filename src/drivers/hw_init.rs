//! One-shot GPIO initialization and raw pin access.
//!
//! Configures the four indicator outputs and the reset button input using
//! raw ESP-IDF sys calls. Called once from `main()` before any task is
//! spawned.  The sensor data line is owned by the AM2301 driver through
//! `esp-idf-hal` and is not touched here.
//!
//! On the host, outputs are recorded in an in-memory pin bank so driver
//! tests can observe them, and inputs read as released (high).

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use crate::pins;

// ── Error type ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
        }
    }
}

pub const OUTPUT_PINS: [i32; 4] = [
    pins::LED_CONFIG_GPIO,
    pins::LED_TEMPERATURE_GPIO,
    pins::LED_HUMIDITY_GPIO,
    pins::LED_ERROR_GPIO,
];

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before any task is spawned.
    unsafe {
        init_gpio_inputs()?;
        init_gpio_outputs()?;
    }
    log::info!("hw_init: GPIO configured (4 LEDs, reset button)");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    for pin in OUTPUT_PINS {
        gpio_write(pin, false);
    }
    Ok(())
}

// ── GPIO Inputs ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_inputs() -> Result<(), HwInitError> {
    // Polled, so no interrupt.
    let btn_cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::RESET_BUTTON_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&btn_cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: gpio_get_level is a read-only register access on an
    // already-configured input pin.
    (unsafe { gpio_get_level(pin) }) != 0
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_pin: i32) -> bool {
    true
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    for &pin in &OUTPUT_PINS {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
        unsafe { gpio_set_level(pin as gpio_num_t, 0) };
    }
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an output pin configured in
    // init_gpio_outputs(); only the indicator task calls this.
    unsafe {
        gpio_set_level(pin as gpio_num_t, if high { 1 } else { 0 });
    }
}

#[cfg(not(target_os = "espidf"))]
mod sim_bank {
    use core::sync::atomic::{AtomicU64, Ordering};

    static LEVELS: AtomicU64 = AtomicU64::new(0);

    pub fn write(pin: i32, high: bool) {
        let bit = 1u64 << (pin as u32 & 63);
        if high {
            LEVELS.fetch_or(bit, Ordering::AcqRel);
        } else {
            LEVELS.fetch_and(!bit, Ordering::AcqRel);
        }
    }

    pub fn read(pin: i32) -> bool {
        LEVELS.load(Ordering::Acquire) & (1u64 << (pin as u32 & 63)) != 0
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(pin: i32, high: bool) {
    sim_bank::write(pin, high);
}

/// Last level written to an output pin (host only).
#[cfg(not(target_os = "espidf"))]
pub fn sim_output_level(pin: i32) -> bool {
    sim_bank::read(pin)
}
