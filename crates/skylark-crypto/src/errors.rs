//! Crypto Error Types

use thiserror::Error;

/// Crypto errors
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Session key was not 128 bits
    #[error("Invalid key length: got {got} bytes, need 16")]
    InvalidKeyLength { got: usize },

    /// Nonce base was not 16 bytes
    #[error("Invalid nonce length: got {got} bytes, need 16")]
    InvalidNonceLength { got: usize },

    /// Datagram shorter than the frame header
    #[error("Frame too short: got {got} bytes, need at least {min}")]
    FrameTooShort { got: usize, min: usize },

    /// Header length field disagrees with the actual payload size
    #[error("Frame length mismatch: header says {declared}, datagram carries {actual}")]
    FrameLengthMismatch { declared: usize, actual: usize },

    /// Payload larger than the header length field can express
    #[error("Frame too large: {got} bytes (max {max})")]
    FrameTooLarge { got: usize, max: usize },
}

/// Result type for crypto operations
pub type CryptoResult<T> = Result<T, CryptoError>;
