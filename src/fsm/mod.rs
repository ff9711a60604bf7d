//! Function-pointer finite state machine driving the connectivity mode.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  StateTable                                                       │
//! │  ┌─────────────────────┬──────────┬─────────┬───────────────────┐ │
//! │  │ DeviceMode          │ on_enter │ on_exit │ on_update         │ │
//! │  ├─────────────────────┼──────────┼─────────┼───────────────────┤ │
//! │  │ Unconfigured        │ -        │ -       │ fn(ctx)->Option<> │ │
//! │  │ ConnectingClient    │ fn(ctx)  │ fn(ctx) │ fn(ctx)->Option<> │ │
//! │  │ ConnectedClient     │ fn(ctx)  │ -       │ fn(ctx)->Option<> │ │
//! │  │ AccessPointFallback │ fn(ctx)  │ -       │ fn(ctx)->Option<> │ │
//! │  └─────────────────────┴──────────┴─────────┴───────────────────┘ │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the current mode.  If it
//! returns `Some(next)`, the engine runs `on_exit` for the current mode,
//! publishes the new mode through its [`ModeWriter`], then runs
//! `on_enter` for the next.  Handlers never touch hardware: they read the
//! [`FsmContext`] blackboard and queue [`ControllerCommand`]s on it.
//!
//! [`ControllerCommand`]: crate::app::commands::ControllerCommand

pub mod context;
pub mod states;

use context::FsmContext;
use log::info;

use crate::app::mode::ModeWriter;

// ---------------------------------------------------------------------------
// Mode identity
// ---------------------------------------------------------------------------

/// The node's connectivity mode.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DeviceMode {
    Unconfigured = 0,
    ConnectingClient = 1,
    ConnectedClient = 2,
    AccessPointFallback = 3,
}

impl DeviceMode {
    pub const COUNT: usize = 4;

    /// Convert an index back to `DeviceMode`.  Panics on out-of-range in
    /// debug builds; returns `Unconfigured` in release.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Unconfigured,
            1 => Self::ConnectingClient,
            2 => Self::ConnectedClient,
            3 => Self::AccessPointFallback,
            _ => {
                debug_assert!(false, "invalid mode index: {idx}");
                Self::Unconfigured
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Unconfigured => "Unconfigured",
            Self::ConnectingClient => "ConnectingClient",
            Self::ConnectedClient => "ConnectedClient",
            Self::AccessPointFallback => "AccessPointFallback",
        }
    }
}

impl core::fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut FsmContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut FsmContext) -> Option<DeviceMode>;

/// Static descriptor for a single mode.
pub struct StateDescriptor {
    pub id: DeviceMode,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct Fsm {
    /// Fixed-size table indexed by `DeviceMode as usize`.
    table: [StateDescriptor; DeviceMode::COUNT],
    current: usize,
    /// `ctx.now_ms` at the moment the current mode was entered.
    entered_at_ms: u64,
    writer: ModeWriter,
}

impl Fsm {
    /// Construct a new FSM starting in `initial`.  The initial mode is
    /// published immediately.
    pub fn new(table: [StateDescriptor; DeviceMode::COUNT], initial: DeviceMode, writer: ModeWriter) -> Self {
        writer.publish(initial);
        Self {
            table,
            current: initial as usize,
            entered_at_ms: 0,
            writer,
        }
    }

    /// Run the initial `on_enter` for the starting mode.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut FsmContext) {
        info!("FSM starting in mode: {}", self.table[self.current].name);
        self.entered_at_ms = ctx.now_ms;
        ctx.entered_from = None;
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Run `on_update` for the current mode against `ctx.now_ms` and apply
    /// the transition it asks for, if any.  Returns the previous mode when
    /// a transition happened.
    pub fn tick(&mut self, ctx: &mut FsmContext) -> Option<DeviceMode> {
        let next = (self.table[self.current].on_update)(ctx)?;
        if next as usize == self.current {
            return None;
        }
        Some(self.transition(next, ctx))
    }

    /// Immediate transition regardless of what `on_update` would return.
    /// No-op when already in `next`.
    #[cfg(test)]
    pub fn force_transition(&mut self, next: DeviceMode, ctx: &mut FsmContext) -> Option<DeviceMode> {
        if next as usize == self.current {
            return None;
        }
        Some(self.transition(next, ctx))
    }

    pub fn current_state(&self) -> DeviceMode {
        DeviceMode::from_index(self.current)
    }

    pub fn ms_in_current_state(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.entered_at_ms)
    }

    fn transition(&mut self, next: DeviceMode, ctx: &mut FsmContext) -> DeviceMode {
        let prev = self.current_state();
        let next_idx = next as usize;

        info!(
            "FSM transition: {} -> {} after {} ms",
            self.table[self.current].name,
            self.table[next_idx].name,
            self.ms_in_current_state(ctx.now_ms)
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.entered_at_ms = ctx.now_ms;
        ctx.entered_from = Some(prev);
        self.writer.publish(next);

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
        prev
    }
}
