//! Connectivity controller: the hexagonal core.
//!
//! [`ConnectivityController`] owns the mode FSM, its context, and the
//! ports it drives.  Inputs arrive as [`ControllerInput`]s (network
//! events, provisioning acceptance) plus periodic [`poll`] calls from the
//! supervisor; outputs are port calls and [`AppEvent`]s.
//!
//! ```text
//!  NetworkEvent ──▶ ┌─────────────────────────────┐ ──▶ NetworkPort
//!                   │   ConnectivityController    │ ──▶ ServiceLauncher
//!   poll(now) ────▶ │   Fsm · FsmContext          │ ──▶ IndicatorPort / EventSink
//!                   └─────────────────────────────┘ ──▶ RestartPort
//! ```
//!
//! [`poll`]: ConnectivityController::poll

use core::net::Ipv4Addr;
use core::time::Duration;

use log::{error, info, warn};

use crate::config::NodeConfig;
use crate::error::{StoreError, TimeoutError};
use crate::fsm::context::{AddressSignal, ConnectionAttempt, FsmContext};
use crate::fsm::states::build_state_table;
use crate::fsm::{DeviceMode, Fsm};

use super::commands::ControllerCommand;
use super::credentials::{CredentialStore, StoredCredentials};
use super::events::{AppEvent, ControllerInput, MacDisplay, NetworkEvent};
use super::mode::ModeWriter;
use super::ports::{
    EventSink, IndicatorLine, IndicatorPort, NetworkPort, RestartPort, ServiceLauncher,
    StoragePort,
};

pub struct ConnectivityController<N, L, I, E, R>
where
    N: NetworkPort,
    L: ServiceLauncher,
    I: IndicatorPort,
    E: EventSink,
    R: RestartPort,
{
    fsm: Fsm,
    ctx: FsmContext,
    network: N,
    services: L,
    indicator: I,
    sink: E,
    restart: R,
    restart_pending: bool,
}

impl<N, L, I, E, R> ConnectivityController<N, L, I, E, R>
where
    N: NetworkPort,
    L: ServiceLauncher,
    I: IndicatorPort,
    E: EventSink,
    R: RestartPort,
{
    /// Construct the controller in [`DeviceMode::Unconfigured`].
    ///
    /// Does **not** decide a mode; call [`boot`](Self::boot) next.
    pub fn new(
        config: NodeConfig,
        writer: ModeWriter,
        network: N,
        services: L,
        indicator: I,
        sink: E,
        restart: R,
    ) -> Self {
        let fsm = Fsm::new(build_state_table(), DeviceMode::Unconfigured, writer);
        let ctx = FsmContext::new(config, StoredCredentials::empty());
        Self {
            fsm,
            ctx,
            network,
            services,
            indicator,
            sink,
            restart,
            restart_pending: false,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Take the boot decision from the result of the credential load.
    /// A load error is treated as "nothing stored".
    pub fn boot(&mut self, loaded: Result<StoredCredentials, StoreError>, now_ms: u64) {
        let credentials = match loaded {
            Ok(c) => c,
            Err(e) => {
                error!("Controller: credential load failed: {}", e);
                self.indicator.pulse(IndicatorLine::Error);
                StoredCredentials::empty()
            }
        };
        let provisioned = credentials.is_provisioned();
        self.ctx.credentials = credentials;
        self.ctx.now_ms = now_ms;

        self.fsm.start(&mut self.ctx);
        self.sink.emit(&AppEvent::Booted { provisioned });
        info!("Controller booted (provisioned={})", provisioned);

        self.step(now_ms);
    }

    // ── Inputs ────────────────────────────────────────────────

    pub fn handle_input(&mut self, input: ControllerInput, now_ms: u64) {
        match input {
            ControllerInput::Network(event) => self.handle_network_event(event, now_ms),
            ControllerInput::ProvisioningAccepted => self.on_provisioning_accepted(),
        }
    }

    /// Latch a link-layer event on the blackboard and run the FSM.
    pub fn handle_network_event(&mut self, event: NetworkEvent, now_ms: u64) {
        match event {
            NetworkEvent::ClientStarted => {
                info!("Controller: station started");
                self.ctx.client_started = true;
            }
            NetworkEvent::AddressAcquired { ip } => {
                self.ctx.address = Some(AddressSignal { ip, at_ms: now_ms });
            }
            NetworkEvent::Disconnected { reason } => {
                info!("Controller: station disconnected (reason={})", reason);
                self.ctx.link_dropped = true;
            }
            NetworkEvent::PeerAssociated { mac, aid } => {
                info!("Controller: station {} joined, AID={}", MacDisplay(&mac), aid);
            }
            NetworkEvent::PeerLeft { mac, aid, reason } => {
                info!(
                    "Controller: station {} left, AID={}, reason={}",
                    MacDisplay(&mac),
                    aid,
                    reason
                );
            }
        }
        self.step(now_ms);
    }

    /// Advance timers (the connection deadline) without a new event.
    pub fn poll(&mut self, now_ms: u64) {
        self.step(now_ms);
    }

    /// Restart edge after new credentials were persisted.  Only honoured
    /// in [`DeviceMode::AccessPointFallback`], and only once.
    pub fn on_provisioning_accepted(&mut self) {
        if self.fsm.current_state() != DeviceMode::AccessPointFallback {
            warn!(
                "Controller: provisioning accepted outside AP mode ({}), ignored",
                self.fsm.current_state()
            );
            return;
        }
        if self.restart_pending {
            return;
        }
        self.restart_pending = true;
        self.sink.emit(&AppEvent::ProvisioningAccepted);
        let grace = Duration::from_millis(self.ctx.config.restart_grace_ms);
        info!("Controller: credentials saved, restarting in {} ms", grace.as_millis());
        self.restart.restart_after(grace);
    }

    /// How long the supervisor may block before the next [`poll`](Self::poll).
    pub fn wait_budget(&self, now_ms: u64) -> Duration {
        let idle = self.ctx.config.supervisor_idle_ms;
        let ms = match self.ctx.attempt {
            Some(attempt) => attempt.remaining_ms(now_ms).min(idle),
            None => idle,
        };
        Duration::from_millis(ms)
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn mode(&self) -> DeviceMode {
        self.fsm.current_state()
    }

    pub fn attempt(&self) -> Option<ConnectionAttempt> {
        self.ctx.attempt
    }

    pub fn acquired_ip(&self) -> Option<Ipv4Addr> {
        self.ctx.acquired_ip
    }

    pub fn last_timeout(&self) -> Option<TimeoutError> {
        self.ctx.last_timeout
    }

    pub fn restart_pending(&self) -> bool {
        self.restart_pending
    }

    pub fn config(&self) -> &NodeConfig {
        &self.ctx.config
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn services(&self) -> &L {
        &self.services
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    pub fn sink(&self) -> &E {
        &self.sink
    }

    pub fn restart(&self) -> &R {
        &self.restart
    }

    // ── Internal ──────────────────────────────────────────────

    fn step(&mut self, now_ms: u64) {
        self.ctx.now_ms = now_ms;
        if let Some(from) = self.fsm.tick(&mut self.ctx) {
            let to = self.fsm.current_state();
            self.sink.emit(&AppEvent::ModeChanged { from, to });
        }
        self.apply_commands();
    }

    /// Translate queued FSM commands into port calls.
    fn apply_commands(&mut self) {
        let commands = core::mem::take(&mut self.ctx.commands);
        for cmd in commands {
            let result = match &cmd {
                ControllerCommand::BringUpClient(creds) => self
                    .network
                    .bring_up_client(creds.ssid(), creds.password())
                    .map_err(crate::error::Error::from),
                ControllerCommand::Connect => {
                    self.network.connect().map_err(crate::error::Error::from)
                }
                ControllerCommand::TearDownClient => {
                    self.network.tear_down().map_err(crate::error::Error::from)
                }
                ControllerCommand::BringUpAccessPoint(settings) => self
                    .network
                    .bring_up_access_point(settings)
                    .map_err(crate::error::Error::from),
                ControllerCommand::StartPortal => self.services.start_provisioning_portal(),
                ControllerCommand::StartTelemetry => self.services.start_telemetry(),
            };
            if let Err(e) = result {
                error!("Controller: {} failed: {}", command_name(&cmd), e);
                self.indicator.pulse(IndicatorLine::Error);
            }
        }
    }
}

fn command_name(cmd: &ControllerCommand) -> &'static str {
    match cmd {
        ControllerCommand::BringUpClient(_) => "bring_up_client",
        ControllerCommand::Connect => "connect",
        ControllerCommand::TearDownClient => "tear_down",
        ControllerCommand::BringUpAccessPoint(_) => "bring_up_access_point",
        ControllerCommand::StartPortal => "start_portal",
        ControllerCommand::StartTelemetry => "start_telemetry",
    }
}

// ───────────────────────────────────────────────────────────────
// Factory reset
// ───────────────────────────────────────────────────────────────

/// Erase stored credentials and restart.  The restart happens even when
/// the erase fails.
pub fn factory_reset<S: StoragePort>(
    store: &mut CredentialStore<S>,
    restart: &mut impl RestartPort,
    indicator: &impl IndicatorPort,
    sink: &mut impl EventSink,
) {
    sink.emit(&AppEvent::ResetRequested);
    if let Err(e) = store.erase() {
        error!("Factory reset: erase failed: {}", e);
        indicator.pulse(IndicatorLine::Error);
    }
    warn!("Factory reset: restarting now");
    restart.restart_now();
}

