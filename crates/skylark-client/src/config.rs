//! Client Configuration
//!
//! Configuration types and defaults for the voice-session client.

use serde::{Deserialize, Serialize};
use skylark_protocol::{
    FRAME_DURATION_MS, HANDSHAKE_TIMEOUT_MS, LIVENESS_TIMEOUT_MS, SIGNALING_PORT,
};

use crate::errors::ClientError;

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Signaling server host
    pub endpoint: String,

    /// Signaling server port
    pub signaling_port: u16,

    /// Client identifier presented to the signaling server
    pub client_id: String,

    /// Topic the client subscribes to and publishes on
    pub publish_topic: String,

    /// Optional suffix appended to the topic for outgoing publishes.
    ///
    /// Deployments differ on whether replies go to the bare topic or a
    /// suffixed variant, so this is a configuration choice rather than a
    /// constant. `None` publishes to the bare topic.
    pub publish_suffix: Option<String>,

    /// Audio frame duration announced in the hello, in milliseconds
    pub frame_duration_ms: u32,

    /// How long an open call waits for the server hello, in milliseconds
    pub handshake_timeout_ms: u64,

    /// Liveness window for the open predicate, in milliseconds
    pub liveness_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            signaling_port: SIGNALING_PORT,
            client_id: String::new(),
            publish_topic: String::new(),
            publish_suffix: None,
            frame_duration_ms: FRAME_DURATION_MS,
            handshake_timeout_ms: HANDSHAKE_TIMEOUT_MS,
            liveness_timeout_ms: LIVENESS_TIMEOUT_MS,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Topic that outgoing publishes target
    pub fn publish_target(&self) -> String {
        match &self.publish_suffix {
            Some(suffix) => format!("{}{}", self.publish_topic, suffix),
            None => self.publish_topic.clone(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.endpoint.is_empty() {
            return Err(ClientError::ConfigurationMissing("endpoint"));
        }
        if self.publish_topic.is_empty() {
            return Err(ClientError::ConfigurationMissing("publish_topic"));
        }
        Ok(())
    }
}

/// Configuration builder
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set signaling server host
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Set signaling server port
    pub fn signaling_port(mut self, port: u16) -> Self {
        self.config.signaling_port = port;
        self
    }

    /// Set client identifier
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.config.client_id = client_id.into();
        self
    }

    /// Set control topic
    pub fn publish_topic(mut self, topic: impl Into<String>) -> Self {
        self.config.publish_topic = topic.into();
        self
    }

    /// Set outgoing publish topic suffix
    pub fn publish_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.publish_suffix = Some(suffix.into());
        self
    }

    /// Set audio frame duration in milliseconds
    pub fn frame_duration_ms(mut self, ms: u32) -> Self {
        self.config.frame_duration_ms = ms;
        self
    }

    /// Set handshake deadline in milliseconds
    pub fn handshake_timeout_ms(mut self, ms: u64) -> Self {
        self.config.handshake_timeout_ms = ms;
        self
    }

    /// Set liveness window in milliseconds
    pub fn liveness_timeout_ms(mut self, ms: u64) -> Self {
        self.config.liveness_timeout_ms = ms;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ClientConfig, ClientError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
