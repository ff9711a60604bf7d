//! Application core: domain logic behind port traits.
//!
//! This module contains the rules of the sensor node: credential
//! persistence, the connectivity controller and its supervisor, the
//! provisioning intake, and change-gated telemetry.  All interaction with
//! hardware happens through **port traits** defined in [`ports`], keeping
//! this layer fully testable without real peripherals.

pub mod commands;
pub mod controller;
pub mod credentials;
pub mod events;
pub mod mode;
pub mod ports;
pub mod provisioning;
pub mod supervisor;
pub mod telemetry;
