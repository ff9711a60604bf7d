//! Change-gated telemetry publisher.
//!
//! One [`run_cycle`](TelemetryPublisher::run_cycle) per telemetry interval:
//! read the sensor once, then handle each metric on its own.  A metric is
//! published only when its value differs from the last one that reached
//! the messaging client (exact float equality, no hysteresis).
//!
//! ```text
//!  SensorPort ──▶ SensorReading ──▶ [changed?] ──▶ MessagingPort.publish
//!                                        │                │
//!                                        │                ├──▶ IndicatorPort.pulse(metric)
//!                                        ▼                └──▶ LastPublished updated
//!                                    Unchanged
//! ```

use core::fmt::Write as _;

use log::{debug, warn};

use super::events::{AppEvent, Metric};
use super::ports::{
    EventSink, IndicatorLine, IndicatorPort, MessagingPort, QoS, SensorPort,
};
use crate::error::PublishError;

pub const TOPIC_CAP: usize = 64;
pub const PAYLOAD_CAP: usize = 16;

pub type Topic = heapless::String<TOPIC_CAP>;

/// Last values handed to the messaging client.  Mutated only after a
/// successful publish.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LastPublished {
    pub humidity: Option<f32>,
    pub temperature: Option<f32>,
}

impl LastPublished {
    fn get(&self, metric: Metric) -> Option<f32> {
        match metric {
            Metric::Humidity => self.humidity,
            Metric::Temperature => self.temperature,
        }
    }

    fn set(&mut self, metric: Metric, value: f32) {
        match metric {
            Metric::Humidity => self.humidity = Some(value),
            Metric::Temperature => self.temperature = Some(value),
        }
    }
}

/// One successful sensor read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub humidity: f32,
    pub temperature: f32,
    pub sampled_at_ms: u64,
}

/// What happened to one metric in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricOutcome {
    Published,
    /// Same value as the last publish.
    Unchanged,
    /// Messaging not connected; skipped without queueing.
    Offline,
    Failed(PublishError),
    /// The cycle's sensor read failed.
    SensorFault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub humidity: MetricOutcome,
    pub temperature: MetricOutcome,
}

impl CycleReport {
    pub fn published_count(&self) -> usize {
        [self.humidity, self.temperature]
            .iter()
            .filter(|o| **o == MetricOutcome::Published)
            .count()
    }
}

pub struct TelemetryPublisher {
    humidity_topic: Topic,
    temperature_topic: Topic,
    last: LastPublished,
    last_reading: Option<SensorReading>,
}

impl TelemetryPublisher {
    /// Topics are `<prefix>/<device_id>/humidity|temperature`.
    pub fn new(prefix: &str, device_id: &str) -> Result<Self, PublishError> {
        Ok(Self {
            humidity_topic: build_topic(prefix, device_id, Metric::Humidity)?,
            temperature_topic: build_topic(prefix, device_id, Metric::Temperature)?,
            last: LastPublished::default(),
            last_reading: None,
        })
    }

    pub fn topic(&self, metric: Metric) -> &str {
        match metric {
            Metric::Humidity => &self.humidity_topic,
            Metric::Temperature => &self.temperature_topic,
        }
    }

    pub fn last_published(&self) -> LastPublished {
        self.last
    }

    pub fn last_reading(&self) -> Option<SensorReading> {
        self.last_reading
    }

    /// Read once and publish whichever metrics changed.
    pub fn run_cycle(
        &mut self,
        sensor: &mut impl SensorPort,
        messaging: &mut impl MessagingPort,
        indicator: &impl IndicatorPort,
        sink: &mut impl EventSink,
        now_ms: u64,
    ) -> CycleReport {
        let measurement = match sensor.read() {
            Ok(m) => m,
            Err(e) => {
                warn!("Telemetry: sensor read failed: {}", e);
                indicator.pulse(IndicatorLine::Error);
                sink.emit(&AppEvent::SensorFault);
                return CycleReport {
                    humidity: MetricOutcome::SensorFault,
                    temperature: MetricOutcome::SensorFault,
                };
            }
        };

        let reading = SensorReading {
            humidity: measurement.humidity,
            temperature: measurement.temperature,
            sampled_at_ms: now_ms,
        };
        self.last_reading = Some(reading);
        debug!(
            "Telemetry: {:.1} %RH, {:.1} C",
            reading.humidity, reading.temperature
        );

        CycleReport {
            humidity: self.handle_metric(Metric::Humidity, reading.humidity, messaging, indicator, sink),
            temperature: self.handle_metric(
                Metric::Temperature,
                reading.temperature,
                messaging,
                indicator,
                sink,
            ),
        }
    }

    fn handle_metric(
        &mut self,
        metric: Metric,
        value: f32,
        messaging: &mut impl MessagingPort,
        indicator: &impl IndicatorPort,
        sink: &mut impl EventSink,
    ) -> MetricOutcome {
        if self.last.get(metric) == Some(value) {
            return MetricOutcome::Unchanged;
        }
        if !messaging.is_connected() {
            return MetricOutcome::Offline;
        }

        let result = format_payload(value).and_then(|payload| {
            messaging.publish(self.topic(metric), &payload, QoS::AtLeastOnce, false)
        });

        match result {
            Ok(()) => {
                indicator.pulse(match metric {
                    Metric::Humidity => IndicatorLine::Humidity,
                    Metric::Temperature => IndicatorLine::Temperature,
                });
                self.last.set(metric, value);
                sink.emit(&AppEvent::MetricPublished { metric, value });
                MetricOutcome::Published
            }
            Err(e) => {
                warn!("Telemetry: publish to {} failed: {}", self.topic(metric), e);
                indicator.pulse(IndicatorLine::Error);
                MetricOutcome::Failed(e)
            }
        }
    }
}

pub fn build_topic(prefix: &str, device_id: &str, metric: Metric) -> Result<Topic, PublishError> {
    let mut topic = Topic::new();
    write!(topic, "{}/{}/{}", prefix, device_id, metric.topic_suffix())
        .map_err(|_| PublishError::Overflow)?;
    Ok(topic)
}

/// One decimal place, e.g. `55.0`.
pub fn format_payload(value: f32) -> Result<heapless::String<PAYLOAD_CAP>, PublishError> {
    let mut payload = heapless::String::new();
    write!(payload, "{:.1}", value).map_err(|_| PublishError::Overflow)?;
    Ok(payload)
}
