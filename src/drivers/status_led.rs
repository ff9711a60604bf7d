//! Four-line indicator LED driver and the pulse request queue.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the four GPIO outputs via hw_init.
//! On host/test: hw_init records levels in its sim pin bank.
//!
//! Any task may request a pulse through a [`PulseQueue`] clone; only the
//! indicator task drains it and owns the [`StatusLeds`].

use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use super::led_patterns::{IndicatorEngine, LineLevels};
use crate::app::mode::DeviceMode;
use crate::app::ports::{IndicatorLine, IndicatorPort};
use crate::drivers::hw_init;
use crate::pins;

/// Pending pulse requests; further requests are dropped when full.
pub const PULSE_QUEUE_DEPTH: usize = 16;

pub struct StatusLeds {
    current: LineLevels,
}

impl StatusLeds {
    pub fn new() -> Self {
        Self {
            current: [false; IndicatorLine::COUNT],
        }
    }

    pub fn gpio(line: IndicatorLine) -> i32 {
        match line {
            IndicatorLine::Config => pins::LED_CONFIG_GPIO,
            IndicatorLine::Temperature => pins::LED_TEMPERATURE_GPIO,
            IndicatorLine::Humidity => pins::LED_HUMIDITY_GPIO,
            IndicatorLine::Error => pins::LED_ERROR_GPIO,
        }
    }

    /// Write every line whose level changed.
    pub fn apply(&mut self, levels: LineLevels) {
        for line in IndicatorLine::ALL {
            let idx = line as usize;
            if levels[idx] != self.current[idx] {
                hw_init::gpio_write(Self::gpio(line), levels[idx]);
                self.current[idx] = levels[idx];
            }
        }
    }

    pub fn off(&mut self) {
        for line in IndicatorLine::ALL {
            hw_init::gpio_write(Self::gpio(line), false);
        }
        self.current = [false; IndicatorLine::COUNT];
    }

    pub fn current(&self) -> LineLevels {
        self.current
    }
}

impl Default for StatusLeds {
    fn default() -> Self {
        Self::new()
    }
}

type PulseChannel = Channel<CriticalSectionRawMutex, IndicatorLine, PULSE_QUEUE_DEPTH>;

/// Cloneable producer/consumer handle for pulse requests.
#[derive(Clone)]
pub struct PulseQueue {
    channel: Arc<PulseChannel>,
}

impl PulseQueue {
    pub fn new() -> Self {
        Self {
            channel: Arc::new(Channel::new()),
        }
    }

    /// Next pending request, if any.  Indicator task only.
    pub fn try_next(&self) -> Option<IndicatorLine> {
        self.channel.try_receive().ok()
    }

    pub fn pending(&self) -> usize {
        self.channel.len()
    }
}

impl Default for PulseQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl IndicatorPort for PulseQueue {
    fn pulse(&self, line: IndicatorLine) {
        if self.channel.try_send(line).is_err() {
            log::debug!("Indicator: pulse queue full, dropped {:?}", line);
        }
    }
}

/// One indicator-task iteration: drain pending pulses, then drive the lines.
pub fn indicator_step(
    queue: &PulseQueue,
    engine: &mut IndicatorEngine,
    leds: &mut StatusLeds,
    mode: DeviceMode,
    now_ms: u64,
) -> LineLevels {
    while let Some(line) = queue.try_next() {
        engine.pulse(line, now_ms);
    }
    let levels = engine.tick(now_ms, mode);
    leds.apply(levels);
    levels
}
