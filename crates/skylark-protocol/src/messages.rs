//! Control Messages
//!
//! Typed shapes for the JSON control messages exchanged over the signaling
//! channel. Outbound messages serialize to exactly the wire shape; inbound
//! messages tolerate unknown fields, and unknown message types are passed
//! through to the application as raw [`serde_json::Value`]s.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::*;
use crate::errors::{ProtocolError, ProtocolResult};

/// Read the `type` discriminator out of a parsed control message.
pub fn message_kind(value: &Value) -> Option<&str> {
    value.get("type")?.as_str()
}

/// Client hello: opens the handshake.
///
/// Wire shape:
/// `{"type":"hello","version":3,"transport":"udp",
///   "audio_params":{"format":"opus","sample_rate":16000,"channels":1,"frame_duration":60}}`
#[derive(Debug, Clone, Serialize)]
pub struct ClientHello {
    #[serde(rename = "type")]
    pub message_type: String,
    pub version: u32,
    pub transport: String,
    pub audio_params: ClientAudioParams,
}

/// Audio parameters announced by the client
#[derive(Debug, Clone, Serialize)]
pub struct ClientAudioParams {
    pub format: String,
    pub sample_rate: u32,
    pub channels: u32,
    pub frame_duration: u32,
}

impl ClientHello {
    /// Create a hello for the given frame duration, with all other
    /// parameters fixed by the protocol.
    pub fn new(frame_duration_ms: u32) -> Self {
        Self {
            message_type: MESSAGE_TYPE_HELLO.to_string(),
            version: PROTOCOL_VERSION,
            transport: TRANSPORT_UDP.to_string(),
            audio_params: ClientAudioParams {
                format: AUDIO_FORMAT.to_string(),
                sample_rate: SAMPLE_RATE,
                channels: CHANNELS,
                frame_duration: frame_duration_ms,
            },
        }
    }

    /// Serialize to the wire payload
    pub fn to_json(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Server hello: the handshake reply.
///
/// Everything except the `udp` section is optional on the wire; a missing
/// `session_id` leaves the session anonymous rather than failing the
/// handshake.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerHello {
    pub transport: Option<String>,
    pub session_id: Option<String>,
    pub audio_params: Option<ServerAudioParams>,
    pub udp: Option<UdpParams>,
}

/// Audio parameters assigned by the server
#[derive(Debug, Clone, Deserialize)]
pub struct ServerAudioParams {
    pub sample_rate: Option<u32>,
    pub frame_duration: Option<u32>,
}

/// Datagram endpoint and session key material
#[derive(Debug, Clone, Deserialize)]
pub struct UdpParams {
    pub server: String,
    pub port: u16,
    pub key: String,
    pub nonce: String,
}

impl ServerHello {
    /// Parse from an already-decoded control message
    pub fn from_value(value: &Value) -> ProtocolResult<Self> {
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Whether the hello names the expected transport kind
    pub fn is_udp(&self) -> bool {
        self.transport.as_deref() == Some(TRANSPORT_UDP)
    }

    /// The datagram section, required for a session to be established
    pub fn udp(&self) -> ProtocolResult<&UdpParams> {
        self.udp.as_ref().ok_or(ProtocolError::MissingField("udp"))
    }
}

/// Goodbye: ends a session.
///
/// Inbound goodbyes may omit `session_id`, which addresses whatever session
/// is currently active. Outbound goodbyes always carry the current id,
/// even when it is empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goodbye {
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl Goodbye {
    /// Build an outbound goodbye for the given session id
    pub fn for_session(session_id: impl Into<String>) -> Self {
        Self {
            message_type: MESSAGE_TYPE_GOODBYE.to_string(),
            session_id: Some(session_id.into()),
        }
    }

    /// Parse from an already-decoded control message
    pub fn from_value(value: &Value) -> ProtocolResult<Self> {
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Serialize to the wire payload
    pub fn to_json(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Whether this goodbye addresses the session with the given id.
    ///
    /// A goodbye without a `session_id` addresses any session.
    pub fn addresses(&self, session_id: &str) -> bool {
        match &self.session_id {
            Some(id) => id == session_id,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_hello_wire_shape() {
        let hello = ClientHello::new(60);
        let value: Value = serde_json::from_str(&hello.to_json().unwrap()).unwrap();

        assert_eq!(value["type"], "hello");
        assert_eq!(value["version"], 3);
        assert_eq!(value["transport"], "udp");
        assert_eq!(value["audio_params"]["format"], "opus");
        assert_eq!(value["audio_params"]["sample_rate"], 16_000);
        assert_eq!(value["audio_params"]["channels"], 1);
        assert_eq!(value["audio_params"]["frame_duration"], 60);
    }

    #[test]
    fn test_server_hello_full() {
        let value: Value = serde_json::from_str(
            r#"{"type":"hello","transport":"udp","session_id":"abc123",
                "audio_params":{"sample_rate":24000,"frame_duration":20},
                "udp":{"server":"10.0.0.1","port":8884,
                       "key":"000102030405060708090a0b0c0d0e0f",
                       "nonce":"0f0e0d0c0b0a09080706050403020100"}}"#,
        )
        .unwrap();

        let hello = ServerHello::from_value(&value).unwrap();
        assert!(hello.is_udp());
        assert_eq!(hello.session_id.as_deref(), Some("abc123"));
        assert_eq!(hello.audio_params.as_ref().unwrap().sample_rate, Some(24_000));

        let udp = hello.udp().unwrap();
        assert_eq!(udp.server, "10.0.0.1");
        assert_eq!(udp.port, 8884);
    }

    #[test]
    fn test_server_hello_missing_session_id_tolerated() {
        let value: Value =
            serde_json::from_str(r#"{"type":"hello","transport":"udp"}"#).unwrap();
        let hello = ServerHello::from_value(&value).unwrap();

        assert!(hello.is_udp());
        assert!(hello.session_id.is_none());
        assert!(hello.udp().is_err());
    }

    #[test]
    fn test_server_hello_wrong_transport() {
        let value: Value =
            serde_json::from_str(r#"{"type":"hello","transport":"tcp"}"#).unwrap();
        let hello = ServerHello::from_value(&value).unwrap();
        assert!(!hello.is_udp());
    }

    #[test]
    fn test_goodbye_addressing() {
        let anonymous = Goodbye {
            message_type: MESSAGE_TYPE_GOODBYE.to_string(),
            session_id: None,
        };
        assert!(anonymous.addresses("abc"));

        let addressed = Goodbye::for_session("abc");
        assert!(addressed.addresses("abc"));
        assert!(!addressed.addresses("other"));
    }

    #[test]
    fn test_goodbye_wire_shape() {
        let goodbye = Goodbye::for_session("s-1");
        let value: Value = serde_json::from_str(&goodbye.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "goodbye");
        assert_eq!(value["session_id"], "s-1");
    }

    #[test]
    fn test_message_kind() {
        let value: Value = serde_json::from_str(r#"{"type":"tts","text":"hi"}"#).unwrap();
        assert_eq!(message_kind(&value), Some("tts"));

        let untyped: Value = serde_json::from_str(r#"{"text":"hi"}"#).unwrap();
        assert_eq!(message_kind(&untyped), None);
    }
}
