//! Change-gated telemetry against the host sensor and a mock broker.

use hygronode::app::events::{AppEvent, Metric};
use hygronode::app::ports::{IndicatorLine, Measurement};
use hygronode::app::telemetry::{LastPublished, MetricOutcome, TelemetryPublisher};
use hygronode::drivers::status_led::PulseQueue;
use hygronode::error::{PublishError, ReadError};
use hygronode::sensors::SimSensor;

use crate::mock_hw::{MockMessaging, RecordingSink, drain};

fn m(humidity: f32, temperature: f32) -> Measurement {
    Measurement {
        humidity,
        temperature,
    }
}

struct Rig {
    publisher: TelemetryPublisher,
    sensor: SimSensor,
    broker: MockMessaging,
    pulses: PulseQueue,
    sink: RecordingSink,
}

impl Rig {
    fn new(steady: Measurement) -> Self {
        Self {
            publisher: TelemetryPublisher::new("sensors", "HN-1A2B3C").unwrap(),
            sensor: SimSensor::new(steady),
            broker: MockMessaging::online(),
            pulses: PulseQueue::new(),
            sink: RecordingSink::default(),
        }
    }

    fn cycle(&mut self, now_ms: u64) -> hygronode::app::telemetry::CycleReport {
        self.publisher
            .run_cycle(&mut self.sensor, &mut self.broker, &self.pulses, &mut self.sink, now_ms)
    }
}

#[test]
fn only_changed_values_are_published() {
    let mut rig = Rig::new(m(55.0, 24.1));
    rig.sensor.push(Ok(m(55.0, 24.0))).push(Ok(m(55.0, 24.0)));

    let mut total = 0;
    for (i, now) in [0u64, 3_000, 6_000].into_iter().enumerate() {
        let report = rig.cycle(now);
        total += report.published_count();
        if i == 1 {
            assert_eq!(report.humidity, MetricOutcome::Unchanged);
            assert_eq!(report.temperature, MetricOutcome::Unchanged);
        }
    }

    assert_eq!(total, 3);
    assert_eq!(
        rig.broker.published,
        vec![
            ("sensors/HN-1A2B3C/humidity".to_string(), "55.0".to_string()),
            ("sensors/HN-1A2B3C/temperature".to_string(), "24.0".to_string()),
            ("sensors/HN-1A2B3C/temperature".to_string(), "24.1".to_string()),
        ]
    );
    assert_eq!(
        drain(&rig.pulses),
        vec![
            IndicatorLine::Humidity,
            IndicatorLine::Temperature,
            IndicatorLine::Temperature
        ]
    );
}

#[test]
fn offline_broker_leaves_last_published_untouched() {
    let mut rig = Rig::new(m(40.0, 21.5));
    rig.broker.connected = false;

    let report = rig.cycle(0);
    assert_eq!(report.humidity, MetricOutcome::Offline);
    assert_eq!(report.temperature, MetricOutcome::Offline);
    assert_eq!(rig.publisher.last_published(), LastPublished::default());
    assert!(drain(&rig.pulses).is_empty());

    // Coming back online publishes the same values once.
    rig.broker.connected = true;
    assert_eq!(rig.cycle(3_000).published_count(), 2);
    assert_eq!(rig.cycle(6_000).published_count(), 0);
}

#[test]
fn sensor_fault_pulses_error_and_skips_cycle() {
    let mut rig = Rig::new(m(50.0, 20.0));
    rig.sensor.push(Err(ReadError::Checksum));

    let report = rig.cycle(0);
    assert_eq!(report.humidity, MetricOutcome::SensorFault);
    assert_eq!(report.published_count(), 0);
    assert_eq!(drain(&rig.pulses), vec![IndicatorLine::Error]);
    assert!(rig.sink.events.contains(&AppEvent::SensorFault));

    // The cadence continues.
    assert_eq!(rig.cycle(3_000).published_count(), 2);
}

#[test]
fn publish_error_keeps_value_pending() {
    let mut rig = Rig::new(m(61.2, 19.9));
    rig.broker.fail_with = Some(PublishError::Transport(-1));

    let report = rig.cycle(0);
    assert_eq!(report.humidity, MetricOutcome::Failed(PublishError::Transport(-1)));
    assert_eq!(rig.publisher.last_published().humidity, None);
    assert_eq!(
        drain(&rig.pulses),
        vec![IndicatorLine::Error, IndicatorLine::Error]
    );

    rig.broker.fail_with = None;
    assert_eq!(rig.cycle(3_000).published_count(), 2);
}

#[test]
fn published_events_carry_values() {
    let mut rig = Rig::new(m(45.5, 22.0));
    rig.cycle(0);
    assert!(rig.sink.events.contains(&AppEvent::MetricPublished {
        metric: Metric::Humidity,
        value: 45.5
    }));
    assert!(rig.sink.events.contains(&AppEvent::MetricPublished {
        metric: Metric::Temperature,
        value: 22.0
    }));
}
