//! Error types for the cable, the protocol and the link underneath.
use alloc::string::String;

use thiserror::Error;

use crate::cable::SessionState;
use crate::protocol::Status;

/// The primary error type of this crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("could not connect to the cable")]
    Connect(#[source] TransportError),

    #[error("could not allocate the command buffer")]
    OutOfMemory,

    /// The firmware only talks at one fixed rate, so this is never retried.
    #[error("the link could not be set to {baud} baud")]
    LinkSpeed {
        baud: u32,
        #[source]
        source: TransportError,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("{0} is not supported by the Arduiggler")]
    Unsupported(&'static str),

    #[error("the cable is {current}, it has to be {required}")]
    InvalidState {
        current: SessionState,
        required: SessionState,
    },
}

/// Failures of the byte pipe between host and adapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("the cable was not found. Is it plugged in?")]
    NotFound,

    #[error("the link is not open")]
    NotOpen,

    #[error("the link could not be opened: {0}")]
    Open(String),

    #[error("{0} baud is not accepted by the link")]
    Speed(u32),

    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    #[error("timed out waiting for the cable")]
    Timeout,

    #[error("I/O error: {0}")]
    Io(String),
}

/// The adapter answered, but not with what the protocol allows.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("the cable answered {0}")]
    Status(Status),

    #[error("firmware version {0:02x?} is not printable text")]
    MalformedVersion([u8; 4]),

    #[error("only {completed} of {requested} clock pulses were acknowledged")]
    Truncated { requested: u32, completed: u32 },
}
