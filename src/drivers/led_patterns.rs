//! Indicator pattern engine.
//!
//! Computes the level of each of the four indicator lines.  The indicator
//! task calls `tick()` every `indicator_tick_ms` and feeds the result into
//! [`StatusLeds::apply`](super::status_led::StatusLeds::apply).
//!
//! ## Config line (follows the device mode)
//!
//! | Mode                | Pattern                    |
//! |---------------------|----------------------------|
//! | Unconfigured        | Off                        |
//! | ConnectingClient    | Solid                      |
//! | ConnectedClient     | Off                        |
//! | AccessPointFallback | Blink 300 ms on / 300 off  |
//!
//! ## Pulse lines
//!
//! Temperature, humidity and error are off except for a fixed-length pulse
//! after each request.  A request during a pulse extends it.

use crate::app::mode::DeviceMode;
use crate::app::ports::IndicatorLine;

pub const AP_BLINK_ON_MS: u64 = 300;
pub const AP_BLINK_OFF_MS: u64 = 300;

/// Levels of all four lines, indexed by `IndicatorLine as usize`.
pub type LineLevels = [bool; IndicatorLine::COUNT];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternId {
    Off,
    Solid,
    Blink { on_ms: u64, off_ms: u64 },
}

impl PatternId {
    pub fn for_mode(mode: DeviceMode) -> Self {
        match mode {
            DeviceMode::Unconfigured | DeviceMode::ConnectedClient => Self::Off,
            DeviceMode::ConnectingClient => Self::Solid,
            DeviceMode::AccessPointFallback => Self::Blink {
                on_ms: AP_BLINK_ON_MS,
                off_ms: AP_BLINK_OFF_MS,
            },
        }
    }

    fn level(self, phase_ms: u64) -> bool {
        match self {
            Self::Off => false,
            Self::Solid => true,
            Self::Blink { on_ms, off_ms } => {
                let period = on_ms + off_ms;
                period == 0 || phase_ms % period < on_ms
            }
        }
    }
}

/// Stack-allocated, no heap.
pub struct IndicatorEngine {
    pulse_ms: u64,
    pulse_until: [Option<u64>; IndicatorLine::COUNT],
    config_pattern: Option<PatternId>,
    phase_start_ms: u64,
}

impl IndicatorEngine {
    pub fn new(pulse_ms: u32) -> Self {
        Self {
            pulse_ms: u64::from(pulse_ms),
            pulse_until: [None; IndicatorLine::COUNT],
            config_pattern: None,
            phase_start_ms: 0,
        }
    }

    /// Start (or extend) a pulse on `line`.
    pub fn pulse(&mut self, line: IndicatorLine, now_ms: u64) {
        self.pulse_until[line as usize] = Some(now_ms.saturating_add(self.pulse_ms));
    }

    /// Compute line levels for `now_ms`.
    pub fn tick(&mut self, now_ms: u64, mode: DeviceMode) -> LineLevels {
        let pattern = PatternId::for_mode(mode);
        if self.config_pattern != Some(pattern) {
            self.config_pattern = Some(pattern);
            self.phase_start_ms = now_ms;
        }

        let mut levels = [false; IndicatorLine::COUNT];
        for line in IndicatorLine::ALL {
            let idx = line as usize;
            let pulsing = match self.pulse_until[idx] {
                Some(until) if now_ms < until => true,
                Some(_) => {
                    self.pulse_until[idx] = None;
                    false
                }
                None => false,
            };
            levels[idx] = pulsing;
        }

        let phase = now_ms.saturating_sub(self.phase_start_ms);
        levels[IndicatorLine::Config as usize] |= pattern.level(phase);
        levels
    }
}
