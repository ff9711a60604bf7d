//! Commands the FSM queues for the controller to execute.
//!
//! State handlers stay free of I/O: they push these onto
//! [`FsmContext::commands`](crate::fsm::context::FsmContext) and the
//! [`ConnectivityController`](super::controller::ConnectivityController)
//! drains the queue against its ports after every tick.

use super::credentials::StoredCredentials;
use super::ports::ApSettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerCommand {
    /// Configure the station with these credentials and start it.
    BringUpClient(StoredCredentials),
    /// Ask the started station to associate.
    Connect,
    /// Stop the failed station before switching to AP mode.
    TearDownClient,
    BringUpAccessPoint(ApSettings),
    /// Start the HTTP provisioning portal.
    StartPortal,
    /// Start the periodic telemetry task.
    StartTelemetry,
}
