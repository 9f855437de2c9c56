//! Client Events
//!
//! Events delivered to the application over the controller's event stream.

use serde_json::Value;

/// Client events
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Audio channel established after a successful handshake
    ChannelOpened {
        /// Server-assigned session id (may be empty)
        session_id: String,
    },

    /// Audio channel torn down (caller- or peer-initiated)
    ChannelClosed,

    /// Decrypted audio frame received on the datagram channel
    AudioFrame {
        /// Frame sequence number
        sequence: u32,
        /// Decrypted payload
        payload: Vec<u8>,
    },

    /// Control message of a type the controller does not handle itself,
    /// forwarded in parsed form
    ControlMessage {
        /// Parsed message
        message: Value,
    },
}

impl ClientEvent {
    /// Whether this event marks an audio-channel lifecycle change
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            ClientEvent::ChannelOpened { .. } | ClientEvent::ChannelClosed
        )
    }

    /// Get event name for logging
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::ChannelOpened { .. } => "ChannelOpened",
            ClientEvent::ChannelClosed => "ChannelClosed",
            ClientEvent::AudioFrame { .. } => "AudioFrame",
            ClientEvent::ControlMessage { .. } => "ControlMessage",
        }
    }
}

impl std::fmt::Display for ClientEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientEvent::ChannelOpened { session_id } => {
                write!(f, "Audio channel opened (session {:?})", session_id)
            }
            ClientEvent::ChannelClosed => write!(f, "Audio channel closed"),
            ClientEvent::AudioFrame { sequence, payload } => {
                write!(f, "Audio frame #{} ({} bytes)", sequence, payload.len())
            }
            ClientEvent::ControlMessage { message } => {
                write!(
                    f,
                    "Control message {:?}",
                    message.get("type").and_then(|t| t.as_str()).unwrap_or("?")
                )
            }
        }
    }
}
