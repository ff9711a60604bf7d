//! Controller supervisor: the loop that owns the controller.
//!
//! Blocks on the controller's input channel for at most
//! [`ConnectivityController::wait_budget`], then polls the controller so
//! the connection deadline fires even when the network goes silent.

use std::sync::mpsc::{Receiver, RecvTimeoutError};

use log::{debug, info};

use super::controller::ConnectivityController;
use super::events::ControllerInput;
use super::ports::{Clock, EventSink, IndicatorPort, NetworkPort, RestartPort, ServiceLauncher};

/// What one [`Supervisor::step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// An input arrived and was dispatched.
    Handled,
    /// The wait budget ran out; the controller was polled.
    TimedOut,
    /// Every sender is gone.
    Closed,
}

pub struct Supervisor<N, L, I, E, R, C>
where
    N: NetworkPort,
    L: ServiceLauncher,
    I: IndicatorPort,
    E: EventSink,
    R: RestartPort,
    C: Clock,
{
    controller: ConnectivityController<N, L, I, E, R>,
    inbox: Receiver<ControllerInput>,
    clock: C,
}

impl<N, L, I, E, R, C> Supervisor<N, L, I, E, R, C>
where
    N: NetworkPort,
    L: ServiceLauncher,
    I: IndicatorPort,
    E: EventSink,
    R: RestartPort,
    C: Clock,
{
    pub fn new(
        controller: ConnectivityController<N, L, I, E, R>,
        inbox: Receiver<ControllerInput>,
        clock: C,
    ) -> Self {
        Self {
            controller,
            inbox,
            clock,
        }
    }

    /// Wait for one input (bounded), dispatch it, then poll.
    pub fn step(&mut self) -> StepOutcome {
        let budget = self.controller.wait_budget(self.clock.now_ms());
        match self.inbox.recv_timeout(budget) {
            Ok(input) => {
                debug!("Supervisor: input {:?}", input);
                self.controller.handle_input(input, self.clock.now_ms());
                StepOutcome::Handled
            }
            Err(RecvTimeoutError::Timeout) => {
                self.controller.poll(self.clock.now_ms());
                StepOutcome::TimedOut
            }
            Err(RecvTimeoutError::Disconnected) => {
                // Deadlines still have to fire with no senders left.
                self.controller.poll(self.clock.now_ms());
                StepOutcome::Closed
            }
        }
    }

    /// Run until every sender has been dropped.  On the device the WiFi
    /// event subscription holds a sender for the program's lifetime, so
    /// this never returns there.
    pub fn run(&mut self) {
        info!("Supervisor running in {}", self.controller.mode());
        while self.step() != StepOutcome::Closed {}
        info!("Supervisor: input channel closed");
    }

    pub fn controller(&self) -> &ConnectivityController<N, L, I, E, R> {
        &self.controller
    }
}
