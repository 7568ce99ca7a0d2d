use std::fmt::Display;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::serial::error::LinkError;

/// Which half of a command/response exchange a timeout hit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Phase {
    /// Putting the command on the wire.
    Write,

    /// Waiting for the reply line.
    Read,
}

impl Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Write => write!(f, "write"),
            Phase::Read => write!(f, "read"),
        }
    }
}

/// Errors that may occur in this library.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum Error {
    /// The request path did not have exactly three segments.
    #[error("Invalid path format")]
    InvalidPath,

    /// The device number segment was not a non-negative integer.
    /// Holds the offending segment.
    #[error("Invalid device number")]
    InvalidDeviceNumber(String),

    /// No device registered under the requested key.
    #[error("Device not found")]
    DeviceNotFound {
        /// The requested device type, as given by the caller.
        device_type: String,

        /// The requested device number.
        device_number: u32,
    },

    /// The action segment is not one of the supported actions.
    /// Holds the offending segment.
    #[error("Unknown action")]
    UnknownAction(String),

    /// A device with the same key was registered before.
    #[error("Device {device_type} #{device_number} is already registered")]
    AlreadyRegistered {
        /// Device type of the rejected device.
        device_type: String,

        /// Device number of the rejected device.
        device_number: u32,
    },

    /// The device was shut down and no longer accepts actions.
    #[error("Device {device_type} #{device_number} is unavailable")]
    DeviceUnavailable {
        /// Device type of the unavailable device.
        device_type: String,

        /// Device number of the unavailable device.
        device_number: u32,
    },

    /// An exchange with the box did not complete in time.
    #[error("Serial {phase} timed out after {after_ms} ms")]
    Timeout {
        /// Which phase of the exchange expired.
        phase: Phase,

        /// The timeout that was exceeded, in milliseconds.
        after_ms: u64,
    },

    /// The box replied with something other than the acknowledgement.
    #[error("Unexpected response to `{command}`: `{response}`")]
    UnexpectedResponse {
        /// The command that was sent.
        command: String,

        /// The (trimmed) reply.
        response: String,
    },

    /// Initializing a device at startup failed.
    #[error("Initialization failed for {device_type} #{device_number}: {cause}")]
    InitializationFailed {
        /// Device type of the device.
        device_type: String,

        /// Device number of the device.
        device_number: u32,

        /// Why the handshake failed, if known.
        cause: String,
    },

    /// The serial link reached end of stream.
    #[error("Serial link closed")]
    LinkClosed,

    /// IO problems on the serial link.
    #[error("Serial link problem: {0}")]
    Link(String),

    /// The serial port could not be opened.
    #[error("Could not open serial port at {path}, problem: {problem}")]
    OpenPort {
        /// The serial port path.
        path: String,

        /// What went wrong.
        problem: String,
    },

    /// The HTTP listener could not be bound.
    #[error("Could not bind to {address}, problem: {problem}")]
    Bind {
        /// The address we tried to bind.
        address: String,

        /// What went wrong.
        problem: String,
    },

    /// Service advertisement problems.
    #[error("Discovery problem: {0}")]
    Discovery(String),

    /// The configuration is not valid.
    #[error("Bad configuration: {0}")]
    BadConfig(String),
}

impl Error {
    /// The HTTP status code a caller sees for this error.
    ///
    /// Malformed requests are a 400, unknown devices and actions a 404.
    /// Anything else went wrong on our side of the request.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidPath | Error::InvalidDeviceNumber(_) => StatusCode::BAD_REQUEST,
            Error::DeviceNotFound { .. } | Error::UnknownAction(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True if the error was caused by the caller's request.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Get the message of a bad configuration, if that is what this error is.
    pub fn try_into_bad_config(self) -> Option<String> {
        if let Self::BadConfig(v) = self {
            Some(v)
        } else {
            None
        }
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e.to_string())
    }
}
