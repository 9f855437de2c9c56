//! Protocol Error Types

use thiserror::Error;

/// Protocol errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Message was not valid JSON or did not match the expected shape
    #[error("Malformed control message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A required field was absent
    #[error("Control message is missing required field `{0}`")]
    MissingField(&'static str),

    /// Hello named a transport this client cannot carry audio over
    #[error("Unsupported transport: {0:?}")]
    UnsupportedTransport(String),

    /// Strict hex decoding rejected the input
    #[error("Invalid hex string: {0}")]
    InvalidHex(String),
}

/// Result type for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;
