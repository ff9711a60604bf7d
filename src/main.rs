//! HygroNode Firmware: Main Entry Point
//!
//! Wires the adapters to the domain and starts the long-running tasks.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  WifiAdapter    NvsAdapter     MqttMessaging   Am2301          │
//! │  (Network)      (Storage)      (Messaging)     (Sensor)        │
//! │  PulseQueue     SystemRestart  LogEventSink    http_portal     │
//! │  (Indicator)    (Restart)      (EventSink)     (intake)        │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  Supervisor ▸ ConnectivityController (Fsm)             │    │
//! │  │  TelemetryPublisher · ProvisioningIntake · ResetDetector│   │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tasks: supervisor (this thread), reset button, indicator LEDs, and,
//! once the controller asks for them, telemetry and the HTTP portal.

#![deny(unused_must_use)]

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::Result;
use log::{error, info, warn};

use esp_idf_hal::delay::Ets;
use esp_idf_hal::gpio::{Gpio33, PinDriver, Pull};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::http::server::EspHttpServer;

use hygronode::adapters::device_id::{self, DeviceIdString};
use hygronode::adapters::http_portal::{self, SharedIntake};
use hygronode::adapters::log_sink::LogEventSink;
use hygronode::adapters::mqtt::{MqttMessaging, MqttSession};
use hygronode::adapters::nvs::{self, NvsAdapter};
use hygronode::adapters::restart::SystemRestart;
use hygronode::adapters::time::MonotonicClock;
use hygronode::adapters::wifi::WifiAdapter;
use hygronode::app::controller::{ConnectivityController, factory_reset};
use hygronode::app::credentials::CredentialStore;
use hygronode::app::mode::{DeviceMode, ModeWatch, mode_channel};
use hygronode::app::ports::{ButtonPort, Clock, ServiceLauncher};
use hygronode::app::provisioning::ProvisioningIntake;
use hygronode::app::supervisor::Supervisor;
use hygronode::app::telemetry::TelemetryPublisher;
use hygronode::config::NodeConfig;
use hygronode::drivers::button::{ResetButton, ResetDetector};
use hygronode::drivers::hw_init;
use hygronode::drivers::led_patterns::IndicatorEngine;
use hygronode::drivers::status_led::{PulseQueue, StatusLeds, indicator_step};
use hygronode::error::Error;
use hygronode::pins;
use hygronode::sensors::Am2301;

const RESET_STACK: usize = 4 * 1024;
const INDICATOR_STACK: usize = 3 * 1024;
const TELEMETRY_STACK: usize = 8 * 1024;

// ── Service launcher ──────────────────────────────────────────
//
// The controller calls these on mode entry.  Each service is started at
// most once per boot; later calls are no-ops.

struct DeviceServices {
    config: NodeConfig,
    device_id: DeviceIdString,
    mode: ModeWatch,
    pulses: PulseQueue,
    clock: MonotonicClock,
    sensor_pin: Option<Gpio33>,
    intake: SharedIntake,
    telemetry_running: bool,
    portal: Option<EspHttpServer<'static>>,
}

impl ServiceLauncher for DeviceServices {
    fn start_telemetry(&mut self) -> hygronode::error::Result<()> {
        if self.telemetry_running {
            return Ok(());
        }
        let pin = self.sensor_pin.take().ok_or(Error::Launch("sensor pin already taken"))?;
        let mut line = PinDriver::input_output_od(pin).map_err(|_| Error::Launch("sensor pin"))?;
        line.set_pull(Pull::Up).map_err(|_| Error::Launch("sensor pull-up"))?;
        let mut sensor = Am2301::new(line, Ets).map_err(|_| Error::Launch("sensor idle level"))?;

        let mut publisher = TelemetryPublisher::new(&self.config.topic_prefix, &self.device_id)?;
        let session = MqttSession::new();
        let mut messaging = MqttMessaging::connect(&self.config.broker_url, &self.device_id, session)
            .map_err(|_| Error::Launch("mqtt client"))?;

        let mode = self.mode.clone();
        let pulses = self.pulses.clone();
        let clock = self.clock;
        let interval = Duration::from_millis(self.config.telemetry_interval_ms);

        thread::Builder::new()
            .name("telemetry".into())
            .stack_size(TELEMETRY_STACK)
            .spawn(move || {
                let mut sink = LogEventSink::new();
                loop {
                    if mode.is(DeviceMode::ConnectedClient) {
                        publisher.run_cycle(&mut sensor, &mut messaging, &pulses, &mut sink, clock.now_ms());
                    }
                    thread::sleep(interval);
                }
            })
            .map_err(|_| Error::Launch("telemetry thread"))?;

        self.telemetry_running = true;
        info!("Telemetry: started, every {} ms", self.config.telemetry_interval_ms);
        Ok(())
    }

    fn start_provisioning_portal(&mut self) -> hygronode::error::Result<()> {
        if self.portal.is_some() {
            return Ok(());
        }
        let server = http_portal::start_portal(Arc::clone(&self.intake), &self.device_id)?;
        self.portal = Some(server);
        Ok(())
    }
}

// ── Background tasks ──────────────────────────────────────────

fn spawn_reset_task(config: &NodeConfig, pulses: PulseQueue, clock: MonotonicClock) -> Result<()> {
    let poll = Duration::from_millis(config.reset_poll_interval_ms);
    let mut detector = ResetDetector::new(config.reset_hold_ms);
    thread::Builder::new()
        .name("reset".into())
        .stack_size(RESET_STACK)
        .spawn(move || {
            let button = ResetButton::new(pins::RESET_BUTTON_GPIO);
            let mut store = CredentialStore::new(NvsAdapter::new());
            let mut restart = SystemRestart::new();
            let mut sink = LogEventSink::new();
            loop {
                if let Some(event) = detector.poll(button.is_pressed(), clock.now_ms()) {
                    info!("Reset: {:?}", event);
                    factory_reset(&mut store, &mut restart, &pulses, &mut sink);
                }
                thread::sleep(poll);
            }
        })?;
    Ok(())
}

fn spawn_indicator_task(config: &NodeConfig, pulses: PulseQueue, mode: ModeWatch, clock: MonotonicClock) -> Result<()> {
    let tick = Duration::from_millis(u64::from(config.indicator_tick_ms));
    let mut engine = IndicatorEngine::new(config.indicator_pulse_ms);
    thread::Builder::new()
        .name("indicator".into())
        .stack_size(INDICATOR_STACK)
        .spawn(move || {
            let mut leds = StatusLeds::new();
            leds.off();
            loop {
                indicator_step(&pulses, &mut engine, &mut leds, mode.get(), clock.now_ms());
                thread::sleep(tick);
            }
        })?;
    Ok(())
}

fn halt(reason: &str) -> ! {
    error!("{}, halting", reason);
    loop {
        thread::sleep(Duration::from_secs(60));
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  HygroNode v{}                    ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Storage and GPIO ───────────────────────────────────
    if let Err(e) = nvs::init_flash() {
        halt(&format!("NVS init failed after erase: {}", e));
    }
    if let Err(e) = hw_init::init_peripherals() {
        error!("GPIO init failed: {}, continuing without indicators", e);
    }

    let config = NodeConfig::default();
    if let Err(e) = config.validate() {
        error!("Built-in config failed validation: {}", e);
    }

    let mac = device_id::read_mac();
    let id = device_id::device_id(&mac);
    let hostname = device_id::hostname(&mac);
    info!("Device {} ({})", id, hostname);

    // ── 3. Shared handles ─────────────────────────────────────
    let clock = MonotonicClock::new();
    let pulses = PulseQueue::new();
    let (writer, watch) = mode_channel();
    let (tx, rx) = mpsc::channel();

    spawn_reset_task(&config, pulses.clone(), clock)?;
    spawn_indicator_task(&config, pulses.clone(), watch.clone(), clock)?;

    // ── 4. Network and services ───────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let wifi = WifiAdapter::new(peripherals.modem, sysloop, None, &hostname, tx.clone())?;

    let intake = Arc::new(Mutex::new(ProvisioningIntake::new(
        CredentialStore::new(NvsAdapter::new()),
        watch.clone(),
        tx,
        pulses.clone(),
    )));
    let services = DeviceServices {
        config: config.clone(),
        device_id: id,
        mode: watch,
        pulses: pulses.clone(),
        clock,
        sensor_pin: Some(peripherals.pins.gpio33),
        intake,
        telemetry_running: false,
        portal: None,
    };

    // ── 5. Boot decision and supervisor loop ──────────────────
    let loaded = CredentialStore::new(NvsAdapter::new()).load();
    let mut controller = ConnectivityController::new(
        config,
        writer,
        wifi,
        services,
        pulses,
        LogEventSink::new(),
        SystemRestart::new(),
    );
    controller.boot(loaded, clock.now_ms());

    let mut supervisor = Supervisor::new(controller, rx, clock);
    supervisor.run();

    warn!("Supervisor exited");
    Ok(())
}
