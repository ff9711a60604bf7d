//! Polled hold-to-reset detector.
//!
//! ## Hardware
//!
//! Active-low momentary switch with pull-up on
//! [`RESET_BUTTON_GPIO`](crate::pins::RESET_BUTTON_GPIO).  The reset task
//! samples it every `reset_poll_interval_ms` and feeds the level into
//! [`ResetDetector::poll`].
//!
//! ## Detection
//!
//! | Input                                   | Result                  |
//! |-----------------------------------------|-------------------------|
//! | released → pressed                      | hold timer starts       |
//! | held continuously for `hold_ms`         | `HoldElapsed`, once     |
//! | released (any single sample)            | hold timer cleared      |
//! | still held after firing                 | nothing until release   |

use crate::app::ports::ButtonPort;
use crate::drivers::hw_init;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetEvent {
    /// The button has been held for the full hold duration.
    HoldElapsed { held_ms: u64 },
}

/// Start of the current contiguous press, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HoldTimer {
    pub pressed_since: Option<u64>,
}

pub struct ResetDetector {
    hold_ms: u64,
    timer: HoldTimer,
    fired: bool,
}

impl ResetDetector {
    pub fn new(hold_ms: u64) -> Self {
        Self {
            hold_ms,
            timer: HoldTimer::default(),
            fired: false,
        }
    }

    /// Feed one sample.  `pressed` is the debounced logical level.
    pub fn poll(&mut self, pressed: bool, now_ms: u64) -> Option<ResetEvent> {
        if !pressed {
            self.timer.pressed_since = None;
            self.fired = false;
            return None;
        }

        let since = *self.timer.pressed_since.get_or_insert(now_ms);
        if self.fired {
            return None;
        }

        let held_ms = now_ms.saturating_sub(since);
        if held_ms >= self.hold_ms {
            self.fired = true;
            return Some(ResetEvent::HoldElapsed { held_ms });
        }
        None
    }

    pub fn timer(&self) -> HoldTimer {
        self.timer
    }

    pub fn hold_ms(&self) -> u64 {
        self.hold_ms
    }
}

/// The physical reset button.
pub struct ResetButton {
    gpio: i32,
}

impl ResetButton {
    pub fn new(gpio: i32) -> Self {
        Self { gpio }
    }

    pub fn gpio(&self) -> i32 {
        self.gpio
    }
}

impl ButtonPort for ResetButton {
    fn is_pressed(&self) -> bool {
        // Active-low.
        !hw_init::gpio_read(self.gpio)
    }
}
