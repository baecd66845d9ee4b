//! Error types for the device and command layers.
//!
//! Failures never cross the public command boundary as errors: device
//! operations return [`DeviceResult`], and commands fold that result into an
//! [`Outcome`](crate::command::Outcome) (success flag plus message). The
//! `Display` text of each variant is therefore the message a recipe runner
//! ends up logging, and is worded for operators rather than developers.
//!
//! ## Error Hierarchy
//!
//! - **`DeviceError`**: everything that can go wrong while talking to a
//!   device: precondition failures (port not open, device not initialized),
//!   handshake failures (missing ack, completion failure or timeout), and
//!   payload failures (a reply without the expected `key=value` field).
//! - **`CommandError`**: misuse of the composite command API, such as
//!   removing from an empty sequence.
//!
//! Configuration errors live next to the loader in [`crate::config`].

use thiserror::Error;

/// Convenience alias for results of device operations.
pub type DeviceResult<T> = std::result::Result<T, DeviceError>;

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Serial port {port} connection not open.")]
    ConnectionNotOpen { port: String },

    #[error("{0} is not initialized.")]
    NotInitialized(&'static str),

    #[error("{0} is not connected to the power supply.")]
    NotPowered(&'static str),

    #[error("Timed out after {timeout:?} waiting for acknowledgment of '{command}'.")]
    AckTimeout {
        command: String,
        timeout: std::time::Duration,
    },

    #[error("Invalid acknowledgment for '{command}': received '{received}'.")]
    InvalidAck { command: String, received: String },

    #[error("Timed out after {timeout:?} waiting for completion of '{command}'.")]
    CompletionTimeout {
        command: String,
        timeout: std::time::Duration,
    },

    #[error("Device reported failure for '{command}': {reason}")]
    DeviceFailure { command: String, reason: String },

    #[error("Unexpected response to '{command}': '{received}'.")]
    UnexpectedResponse { command: String, received: String },

    #[error("Timed out. Did not receive any response from command {command}.")]
    ResponseTimeout { command: String },

    #[error("Response missing field: message from device did not contain {field}.")]
    MissingField { field: &'static str },

    #[error("Response field {field} has invalid value '{value}'.")]
    InvalidField { field: &'static str, value: String },

    #[error("Command '{0}' contains non-ASCII characters.")]
    NonAsciiCommand(String),

    #[error("Serial I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Device {0} is unavailable: lock poisoned by an earlier panic.")]
    LockPoisoned(String),
}

/// Errors raised by the composite command API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Command index {index} out of range for sequence of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
}
