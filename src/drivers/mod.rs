//! Indicator drivers, the reset button, and GPIO initialisation.

pub mod button;
pub mod hw_init;
pub mod led_patterns;
pub mod status_led;
