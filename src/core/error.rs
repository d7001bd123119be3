//! Error types for the wire engine

use std::io;
use thiserror::Error;

/// Result type used throughout the crate
pub type RespResult<T> = Result<T, RespError>;

/// Errors surfaced by the codec and the connection engine
#[derive(Error, Debug)]
pub enum RespError {
    /// IO error during network operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Malformed RESP3 data; fatal for the connection
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Unknown RESP3 type marker; fatal for the connection
    #[error("Unsupported type marker: {0:?}")]
    UnsupportedType(char),

    /// Reply shape disagrees with the chosen adapter; scoped to one reply
    #[error("Type conversion error: {0}")]
    Type(String),

    /// Connection setup or teardown failure
    #[error("Connection error: {0}")]
    Connection(String),

    /// Operation timed out
    #[error("Operation timed out")]
    Timeout,

    /// The connection was cancelled; pending submissions receive this
    #[error("Connection cancelled")]
    Cancelled,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl RespError {
    /// Whether this error terminates the connection.
    ///
    /// Adapter conversion errors apply to a single reply; everything else
    /// closes the connection.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::Type(_))
    }
}
