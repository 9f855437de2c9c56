//! Client Errors
//!
//! Error types for the voice-session client.

use thiserror::Error;

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    /// A required configuration value was empty
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(&'static str),

    /// Signaling channel could not be brought up
    #[error("Failed to connect signaling channel: {0}")]
    ConnectFailure(String),

    /// Publishing a control message failed
    #[error("Failed to publish control message: {0}")]
    PublishFailure(String),

    /// Subscribing to the control topic failed
    #[error("Failed to subscribe to control topic: {0}")]
    SubscribeFailure(String),

    /// No hello reply arrived within the handshake deadline
    #[error("Handshake timed out")]
    HandshakeTimeout,

    /// Handshake reply was signaled but left no usable session state
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// The audio channel is not open
    #[error("Audio channel is closed")]
    ChannelClosed,

    /// Protocol error
    #[error("Protocol error: {0}")]
    Protocol(#[from] skylark_protocol::ProtocolError),

    /// Crypto error
    #[error("Crypto error: {0}")]
    Crypto(#[from] skylark_crypto::CryptoError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
