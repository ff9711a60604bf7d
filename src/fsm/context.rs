//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the blackboard state handlers read from and write to:
//! the clock, the credentials loaded at boot, the current connection
//! attempt, the network signals latched since the last tick, and the
//! queue of commands for the controller to execute.

use core::net::Ipv4Addr;

use crate::app::commands::ControllerCommand;
use crate::app::credentials::StoredCredentials;
use crate::config::NodeConfig;
use crate::error::TimeoutError;

use super::DeviceMode;

/// Most commands a single transition queues (teardown, AP, portal).
pub const COMMAND_QUEUE_DEPTH: usize = 8;

// ---------------------------------------------------------------------------
// Connection attempt
// ---------------------------------------------------------------------------

/// One station connection attempt.  Created on entry to
/// [`DeviceMode::ConnectingClient`] and dropped on exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionAttempt {
    pub started_at_ms: u64,
    pub deadline_ms: u64,
}

impl ConnectionAttempt {
    pub fn new(now_ms: u64, timeout_ms: u64) -> Self {
        Self {
            started_at_ms: now_ms,
            deadline_ms: now_ms.saturating_add(timeout_ms),
        }
    }

    pub fn expired(&self, now_ms: u64) -> bool {
        now_ms >= self.deadline_ms
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.deadline_ms.saturating_sub(now_ms)
    }

    /// True when an event at `at_ms` arrived strictly before the deadline.
    pub fn accepts(&self, at_ms: u64) -> bool {
        at_ms < self.deadline_ms
    }
}

/// A DHCP address report latched for the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressSignal {
    pub ip: Ipv4Addr,
    pub at_ms: u64,
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

pub struct FsmContext {
    // -- Timing --
    /// Monotonic milliseconds, set by the controller before each tick.
    pub now_ms: u64,

    // -- Inputs --
    pub config: NodeConfig,
    /// Loaded once at boot; never re-read.
    pub credentials: StoredCredentials,
    pub attempt: Option<ConnectionAttempt>,
    pub address: Option<AddressSignal>,
    /// The station interface reported it started.
    pub client_started: bool,
    /// The station reported a disconnect.
    pub link_dropped: bool,
    /// Mode we transitioned from, set before `on_enter` runs.
    pub entered_from: Option<DeviceMode>,

    // -- Outputs --
    pub last_timeout: Option<TimeoutError>,
    /// The address that completed the last successful attempt.
    pub acquired_ip: Option<Ipv4Addr>,
    pub commands: heapless::Vec<ControllerCommand, COMMAND_QUEUE_DEPTH>,
}

impl FsmContext {
    pub fn new(config: NodeConfig, credentials: StoredCredentials) -> Self {
        Self {
            now_ms: 0,
            config,
            credentials,
            attempt: None,
            address: None,
            client_started: false,
            link_dropped: false,
            entered_from: None,
            last_timeout: None,
            acquired_ip: None,
            commands: heapless::Vec::new(),
        }
    }

    /// Queue a command.  The queue is drained after every tick, so overflow
    /// means a handler bug.
    pub fn push_command(&mut self, cmd: ControllerCommand) {
        if self.commands.push(cmd).is_err() {
            debug_assert!(false, "controller command queue overflow");
            log::error!("FSM: command queue full, dropping command");
        }
    }

    /// Clear every latched network signal.
    pub fn clear_signals(&mut self) {
        self.address = None;
        self.client_started = false;
        self.link_dropped = false;
    }
}
