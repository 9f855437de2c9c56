//! Protocol Constants
//!
//! Version numbers, fixed ports, audio defaults, and timeout windows.

/// Control protocol version carried in the client hello
pub const PROTOCOL_VERSION: u32 = 3;

/// Fixed signaling server port
pub const SIGNALING_PORT: u16 = 9501;

/// Transport kind negotiated for the audio channel
pub const TRANSPORT_UDP: &str = "udp";

/// Audio codec announced in the client hello
pub const AUDIO_FORMAT: &str = "opus";

/// Audio sample rate in Hz
pub const SAMPLE_RATE: u32 = 16_000;

/// Audio channel count (mono)
pub const CHANNELS: u32 = 1;

/// Default audio frame duration in milliseconds
pub const FRAME_DURATION_MS: u32 = 60;

/// How long an open call waits for the server hello
pub const HANDSHAKE_TIMEOUT_MS: u64 = 10_000;

/// Liveness window: the audio channel counts as open only while the most
/// recent parsed signaling message is younger than this
pub const LIVENESS_TIMEOUT_MS: u64 = 120_000;

/// Control message type values
pub const MESSAGE_TYPE_HELLO: &str = "hello";
pub const MESSAGE_TYPE_GOODBYE: &str = "goodbye";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_windows_are_distinct() {
        // The handshake deadline is a one-shot wait; the liveness window is
        // continuously evaluated. They must not be conflated.
        assert!(LIVENESS_TIMEOUT_MS > HANDSHAKE_TIMEOUT_MS);
    }
}
