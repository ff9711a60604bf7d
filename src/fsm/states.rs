//! Concrete mode handler functions and table builder.
//!
//! ```text
//!  UNCONFIGURED ──[credentials]──▶ CONNECTING_CLIENT ──[address < deadline]──▶ CONNECTED_CLIENT
//!        │                               │                                        │
//!        │                          [deadline]                         [link drop: reconnect]
//!        │                               ▼
//!        └──────[no credentials]──▶ ACCESS_POINT_FALLBACK  (terminal until restart)
//! ```

use super::context::{ConnectionAttempt, FsmContext};
use super::{DeviceMode, StateDescriptor};
use crate::app::commands::ControllerCommand;
use crate::app::ports::ApSettings;
use crate::error::TimeoutError;
use log::{info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static mode table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; DeviceMode::COUNT] {
    [
        StateDescriptor {
            id: DeviceMode::Unconfigured,
            name: "Unconfigured",
            on_enter: None,
            on_exit: None,
            on_update: unconfigured_update,
        },
        StateDescriptor {
            id: DeviceMode::ConnectingClient,
            name: "ConnectingClient",
            on_enter: Some(connecting_enter),
            on_exit: Some(connecting_exit),
            on_update: connecting_update,
        },
        StateDescriptor {
            id: DeviceMode::ConnectedClient,
            name: "ConnectedClient",
            on_enter: Some(connected_enter),
            on_exit: None,
            on_update: connected_update,
        },
        StateDescriptor {
            id: DeviceMode::AccessPointFallback,
            name: "AccessPointFallback",
            on_enter: Some(access_point_enter),
            on_exit: None,
            on_update: access_point_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  UNCONFIGURED: boot decision
// ═══════════════════════════════════════════════════════════════════════════

fn unconfigured_update(ctx: &mut FsmContext) -> Option<DeviceMode> {
    if ctx.credentials.is_provisioned() {
        Some(DeviceMode::ConnectingClient)
    } else {
        info!("UNCONFIGURED: no stored credentials, starting setup access point");
        Some(DeviceMode::AccessPointFallback)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  CONNECTING_CLIENT: one bounded attempt
// ═══════════════════════════════════════════════════════════════════════════

fn connecting_enter(ctx: &mut FsmContext) {
    ctx.clear_signals();
    ctx.last_timeout = None;
    ctx.attempt = Some(ConnectionAttempt::new(ctx.now_ms, ctx.config.connect_timeout_ms));
    info!(
        "CONNECTING: joining '{}', deadline in {} ms",
        ctx.credentials.ssid(),
        ctx.config.connect_timeout_ms
    );
    let creds = ctx.credentials.clone();
    ctx.push_command(ControllerCommand::BringUpClient(creds));
}

fn connecting_exit(ctx: &mut FsmContext) {
    ctx.attempt = None;
}

fn connecting_update(ctx: &mut FsmContext) -> Option<DeviceMode> {
    let Some(attempt) = ctx.attempt else {
        // Entered without an attempt: treat as immediately expired.
        return Some(DeviceMode::AccessPointFallback);
    };

    if let Some(signal) = ctx.address.take() {
        if attempt.accepts(signal.at_ms) {
            info!(
                "CONNECTING: got address {} after {} ms",
                signal.ip,
                signal.at_ms.saturating_sub(attempt.started_at_ms)
            );
            ctx.acquired_ip = Some(signal.ip);
            return Some(DeviceMode::ConnectedClient);
        }
        warn!("CONNECTING: address {} arrived after the deadline, ignored", signal.ip);
    }

    if attempt.expired(ctx.now_ms) {
        let err = TimeoutError {
            waited_ms: ctx.config.connect_timeout_ms,
        };
        warn!("CONNECTING: {}", err);
        ctx.last_timeout = Some(err);
        return Some(DeviceMode::AccessPointFallback);
    }

    if ctx.client_started || ctx.link_dropped {
        ctx.client_started = false;
        ctx.link_dropped = false;
        ctx.push_command(ControllerCommand::Connect);
    }

    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  CONNECTED_CLIENT: telemetry running
// ═══════════════════════════════════════════════════════════════════════════

fn connected_enter(ctx: &mut FsmContext) {
    ctx.clear_signals();
    ctx.push_command(ControllerCommand::StartTelemetry);
}

fn connected_update(ctx: &mut FsmContext) -> Option<DeviceMode> {
    if let Some(signal) = ctx.address.take() {
        info!("CONNECTED: address renewed: {}", signal.ip);
        ctx.acquired_ip = Some(signal.ip);
    }
    if ctx.client_started || ctx.link_dropped {
        if ctx.link_dropped {
            warn!("CONNECTED: link dropped, reconnecting");
        }
        ctx.client_started = false;
        ctx.link_dropped = false;
        ctx.push_command(ControllerCommand::Connect);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  ACCESS_POINT_FALLBACK: setup AP and portal
// ═══════════════════════════════════════════════════════════════════════════

fn access_point_enter(ctx: &mut FsmContext) {
    if ctx.entered_from == Some(DeviceMode::ConnectingClient) {
        ctx.push_command(ControllerCommand::TearDownClient);
    }
    let settings = ApSettings::from_config(&ctx.config.access_point);
    info!(
        "ACCESS_POINT: '{}' on channel {} ({:?})",
        settings.ssid, settings.channel, settings.auth
    );
    ctx.push_command(ControllerCommand::BringUpAccessPoint(settings));
    ctx.push_command(ControllerCommand::StartPortal);
}

fn access_point_update(ctx: &mut FsmContext) -> Option<DeviceMode> {
    ctx.clear_signals();
    None
}
