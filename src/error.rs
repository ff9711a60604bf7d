//! Unified error types for the HygroNode firmware.
//!
//! Each subsystem owns a small `Copy` error enum; the top-level [`Error`]
//! wraps them so the service launcher and boot path can funnel every
//! failure through one type.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Credential persistence failed.
    Store(StoreError),
    /// The humidity/temperature sensor could not be read.
    Read(ReadError),
    /// The network collaborator rejected a command.
    Connect(ConnectError),
    /// A provisioning submission was malformed.
    Validation(ValidationError),
    /// A telemetry publish could not be handed to the broker session.
    Publish(PublishError),
    /// A background service (telemetry task, HTTP portal) failed to start.
    Launch(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(e) => write!(f, "store: {e}"),
            Self::Read(e) => write!(f, "sensor: {e}"),
            Self::Connect(e) => write!(f, "network: {e}"),
            Self::Validation(e) => write!(f, "provisioning: {e}"),
            Self::Publish(e) => write!(f, "publish: {e}"),
            Self::Launch(what) => write!(f, "launch: {what}"),
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;

// ---------------------------------------------------------------------------
// Credential store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// The persistence handle could not be opened or written.
    Unavailable,
    /// A stored or submitted value is empty, oversized, or not UTF-8.
    Invalid,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "credential storage unavailable"),
            Self::Invalid => write!(f, "stored credentials invalid"),
        }
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    /// The sensor never pulled the line low after the start signal.
    NoResponse,
    /// A bit or handshake phase exceeded its timing window.
    Timeout,
    /// The frame checksum did not match the payload.
    Checksum,
    /// The decoded value is outside the sensor's physical range.
    OutOfRange,
    /// The GPIO driver reported an error.
    Bus,
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoResponse => write!(f, "no response from sensor"),
            Self::Timeout => write!(f, "bus timing violated"),
            Self::Checksum => write!(f, "frame checksum mismatch"),
            Self::OutOfRange => write!(f, "reading out of range"),
            Self::Bus => write!(f, "GPIO bus error"),
        }
    }
}

impl From<ReadError> for Error {
    fn from(e: ReadError) -> Self {
        Self::Read(e)
    }
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// Link-layer failures.  The cause of a lost link is never distinguished;
/// it only surfaces as a `NetworkEvent::Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectError {
    /// SSID or passphrase could not be handed to the driver.
    InvalidCredentials,
    /// The driver returned an error code.
    Driver(i32),
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "credentials rejected by driver"),
            Self::Driver(rc) => write!(f, "driver error (rc={rc})"),
        }
    }
}

impl From<ConnectError> for Error {
    fn from(e: ConnectError) -> Self {
        Self::Connect(e)
    }
}

/// The STA connection deadline elapsed without an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutError {
    pub waited_ms: u64,
}

impl fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no address after {} ms", self.waited_ms)
    }
}

// ---------------------------------------------------------------------------
// Provisioning
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is absent from the submission.
    MissingField(&'static str),
    /// A required field is present but empty after decoding.
    EmptyField(&'static str),
    /// A field exceeds its maximum length.
    TooLong { field: &'static str, max: usize },
    /// Bad percent-escape or invalid UTF-8.
    Malformed,
    /// The request body is larger than the intake accepts.
    BodyTooLarge,
    /// The connection closed before the declared length arrived.
    Truncated,
    /// No Content-Length was declared.
    LengthRequired,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(name) => write!(f, "missing field '{name}'"),
            Self::EmptyField(name) => write!(f, "field '{name}' is empty"),
            Self::TooLong { field, max } => {
                write!(f, "field '{field}' longer than {max} characters")
            }
            Self::Malformed => write!(f, "malformed encoding"),
            Self::BodyTooLarge => write!(f, "request body too large"),
            Self::Truncated => write!(f, "request body truncated"),
            Self::LengthRequired => write!(f, "content length required"),
        }
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

// ---------------------------------------------------------------------------
// Messaging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishError {
    /// No broker session is established.
    NotConnected,
    /// Topic or payload did not fit its bounded buffer.
    Overflow,
    /// The MQTT client returned an error code.
    Transport(i32),
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "broker not connected"),
            Self::Overflow => write!(f, "topic or payload buffer overflow"),
            Self::Transport(rc) => write!(f, "transport error (rc={rc})"),
        }
    }
}

impl From<PublishError> for Error {
    fn from(e: PublishError) -> Self {
        Self::Publish(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_nests_subsystem_message() {
        let e: Error = StoreError::Invalid.into();
        assert_eq!(e.to_string(), "store: stored credentials invalid");
    }

    #[test]
    fn too_long_reports_limit() {
        let e = ValidationError::TooLong { field: "ssid", max: 31 };
        assert_eq!(e.to_string(), "field 'ssid' longer than 31 characters");
    }

    #[test]
    fn timeout_display() {
        assert_eq!(TimeoutError { waited_ms: 10_000 }.to_string(), "no address after 10000 ms");
    }
}
