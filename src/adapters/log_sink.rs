//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink {
    emitted: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emitted(&self) -> u32 {
        self.emitted
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        self.emitted = self.emitted.wrapping_add(1);
        match event {
            AppEvent::Booted { provisioned } => {
                info!("BOOT  | credentials {}", if *provisioned { "present" } else { "absent" });
            }
            AppEvent::ModeChanged { from, to } => {
                info!("MODE  | {} -> {}", from, to);
            }
            AppEvent::ProvisioningAccepted => {
                info!("PROV  | credentials accepted, restart scheduled");
            }
            AppEvent::ResetRequested => {
                warn!("RESET | button held, erasing credentials");
            }
            AppEvent::MetricPublished { metric, value } => {
                info!("TELEM | {}={:.1}", metric.topic_suffix(), value);
            }
            AppEvent::SensorFault => {
                warn!("TELEM | sensor read failed");
            }
        }
    }
}
