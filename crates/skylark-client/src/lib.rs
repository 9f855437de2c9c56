//! # Skylark Voice Client
//!
//! Session controller for a real-time voice client that coordinates two
//! heterogeneous channels: a publish/subscribe **signaling channel**
//! carrying the JSON handshake and control messages, and a connectionless
//! **datagram channel** carrying AES-encrypted audio once the handshake
//! completes.
//!
//! ## Quick Start
//!
//! ```ignore
//! use skylark_client::{ClientConfig, SessionController, UdpTransportFactory};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), skylark_client::ClientError> {
//!     let config = ClientConfig::builder()
//!         .endpoint("signal.example.com")
//!         .client_id("device-42")
//!         .publish_topic("voice")
//!         .build()?;
//!
//!     let signaling = /* injected SignalingTransport implementation */
//! #   unimplemented!();
//!     let (controller, mut events) =
//!         SessionController::new(config, signaling, Arc::new(UdpTransportFactory));
//!
//!     controller.open_audio_channel().await?;
//!     controller.send_audio(b"opus frame").await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod errors;
pub mod events;
pub mod sync;
pub mod transport;

pub use config::*;
pub use errors::*;
pub use events::*;
pub use sync::*;
pub use transport::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::*;
    pub use crate::errors::*;
    pub use crate::events::*;
    pub use crate::sync::*;
    pub use crate::transport::*;
    pub use crate::SessionController;
}

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use skylark_crypto::FrameCipher;
use skylark_protocol::{
    message_kind, ClientHello, Goodbye, ServerHello, MESSAGE_TYPE_GOODBYE, MESSAGE_TYPE_HELLO,
};

/// Lock a mutex, recovering the guard if a panicking holder poisoned it
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The live datagram channel and the crypto material bound to it.
///
/// Torn down as one unit: dropping the channel aborts the receive loop and
/// zeroizes the cipher, so session keys are never readable after teardown.
struct AudioChannel {
    transport: Arc<dyn DatagramTransport>,
    cipher: FrameCipher,
    recv_task: JoinHandle<()>,
}

impl Drop for AudioChannel {
    fn drop(&mut self) {
        self.recv_task.abort();
    }
}

/// Session fields populated by the handshake reply
#[derive(Default)]
struct SessionState {
    /// Server-assigned session id; empty means no active session
    session_id: String,
    /// Datagram endpoint assigned by the server
    audio_endpoint: Option<(String, u16)>,
    /// Negotiated sample rate, if the server overrode the default
    sample_rate: Option<u32>,
    /// Negotiated frame duration, if the server overrode the default
    frame_duration_ms: Option<u32>,
    /// Cipher built from the hello's key material, consumed when the
    /// datagram channel is installed
    pending_cipher: Option<FrameCipher>,
}

/// Deferred work enqueued onto the controller's command context.
///
/// Peer-initiated teardown arrives on the signaling delivery context and
/// must never run inline there.
enum ControllerCommand {
    CloseChannel,
}

/// Session controller.
///
/// Owns session identity and parameters, drives the handshake, owns the
/// datagram channel's lifetime, dispatches inbound control messages, and
/// answers liveness queries.
pub struct SessionController {
    config: ClientConfig,
    signaling: Arc<dyn SignalingTransport>,
    factory: Arc<dyn TransportFactory>,

    /// Handshake synchronizer: cleared at open, fired by the hello handler
    gate: HandshakeGate,
    /// The one piece of shared mutable state; held only for handle swaps
    channel: Mutex<Option<AudioChannel>>,
    /// Session fields from the handshake reply
    session: Mutex<SessionState>,
    /// Signaling dispatch task, replaced on reconnect
    dispatch: Mutex<Option<JoinHandle<()>>>,

    // Lock-free inputs to the open predicate
    channel_present: AtomicBool,
    error_occurred: AtomicBool,
    busy_sending_audio: AtomicBool,
    local_sequence: AtomicU32,
    remote_sequence: AtomicU32,
    /// Milliseconds since `epoch` of the last successfully parsed
    /// signaling message
    last_incoming_ms: AtomicU64,
    epoch: Instant,

    events: mpsc::UnboundedSender<ClientEvent>,
    commands: mpsc::UnboundedSender<ControllerCommand>,
}

impl SessionController {
    /// Create a controller and its event stream.
    ///
    /// Spawns the command task that executes deferred teardown, so this
    /// must be called from within a tokio runtime.
    pub fn new(
        config: ClientConfig,
        signaling: Arc<dyn SignalingTransport>,
        factory: Arc<dyn TransportFactory>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<ClientEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, mut command_rx) = mpsc::unbounded_channel();

        let controller = Arc::new(Self {
            config,
            signaling,
            factory,
            gate: HandshakeGate::new(),
            channel: Mutex::new(None),
            session: Mutex::new(SessionState::default()),
            dispatch: Mutex::new(None),
            channel_present: AtomicBool::new(false),
            error_occurred: AtomicBool::new(false),
            busy_sending_audio: AtomicBool::new(false),
            local_sequence: AtomicU32::new(0),
            remote_sequence: AtomicU32::new(0),
            last_incoming_ms: AtomicU64::new(0),
            epoch: Instant::now(),
            events: event_tx,
            commands: command_tx,
        });

        let weak: Weak<Self> = Arc::downgrade(&controller);
        tokio::spawn(async move {
            while let Some(command) = command_rx.recv().await {
                let Some(controller) = weak.upgrade() else { break };
                match command {
                    ControllerCommand::CloseChannel => controller.close_audio_channel().await,
                }
            }
        });

        (controller, event_rx)
    }

    /// Get the configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Best-effort signaling bring-up for passive startup.
    ///
    /// Failure is expected and acceptable here; it is logged and not
    /// surfaced. The next [`Self::open_audio_channel`] retries and does
    /// surface the error.
    pub async fn start(self: &Arc<Self>) {
        if let Err(e) = self.ensure_signaling().await {
            debug!("Signaling bring-up deferred: {}", e);
        }
    }

    /// Open the audio channel.
    ///
    /// Publishes a hello and blocks until the handshake reply has been
    /// processed or the configured deadline elapses. On success the
    /// datagram channel is live and [`Self::is_audio_channel_opened`]
    /// reports true.
    pub async fn open_audio_channel(self: &Arc<Self>) -> ClientResult<()> {
        self.ensure_signaling().await?;

        self.busy_sending_audio.store(false, Ordering::Relaxed);
        self.error_occurred.store(false, Ordering::Relaxed);
        lock(&self.session).session_id.clear();
        self.gate.clear();

        let hello = ClientHello::new(self.config.frame_duration_ms);
        self.publish(hello.to_json()?).await?;

        let deadline = Duration::from_millis(self.config.handshake_timeout_ms);
        if !self.gate.wait(deadline).await {
            debug!("No handshake reply within {:?}", deadline);
            return Err(ClientError::HandshakeTimeout);
        }

        // The hello handler has installed session state before signaling.
        let (host, port, cipher, session_id) = {
            let mut session = lock(&self.session);
            let (host, port) = session
                .audio_endpoint
                .clone()
                .ok_or_else(|| ClientError::Handshake("no audio endpoint".into()))?;
            let cipher = session
                .pending_cipher
                .take()
                .ok_or_else(|| ClientError::Handshake("no session key material".into()))?;
            (host, port, cipher, session.session_id.clone())
        };

        let transport = self.factory.open_datagram(&host, port).await?;
        let recv_task = self.spawn_receive_loop(transport.clone(), cipher.clone());
        {
            let mut guard = lock(&self.channel);
            self.channel_present.store(true, Ordering::Release);
            *guard = Some(AudioChannel {
                transport,
                cipher,
                recv_task,
            });
        }

        info!("Audio channel opened to {}:{}", host, port);
        self.emit(ClientEvent::ChannelOpened { session_id });
        Ok(())
    }

    /// Close the audio channel. Idempotent.
    ///
    /// Drops the datagram handle under the channel lock, then publishes a
    /// goodbye for the current session id (possibly empty) and emits the
    /// closed event outside the lock, regardless of whether a handle
    /// existed.
    pub async fn close_audio_channel(&self) {
        let channel = {
            let mut guard = lock(&self.channel);
            self.channel_present.store(false, Ordering::Release);
            guard.take()
        };
        drop(channel);

        let session_id = lock(&self.session).session_id.clone();
        match Goodbye::for_session(session_id).to_json() {
            Ok(payload) => {
                if let Err(e) = self.publish(payload).await {
                    warn!("Failed to publish goodbye: {}", e);
                }
            }
            Err(e) => warn!("Failed to encode goodbye: {}", e),
        }

        {
            let mut session = lock(&self.session);
            session.session_id.clear();
            session.audio_endpoint = None;
            session.pending_cipher = None;
        }

        self.emit(ClientEvent::ChannelClosed);
    }

    /// Whether audio may currently flow.
    ///
    /// Lock-free: true iff a datagram handle is present, no error has
    /// occurred, and a signaling message was parsed within the liveness
    /// window.
    pub fn is_audio_channel_opened(&self) -> bool {
        self.channel_present.load(Ordering::Acquire)
            && !self.error_occurred.load(Ordering::Relaxed)
            && self.millis_since_last_incoming() <= self.config.liveness_timeout_ms
    }

    /// Encrypt one audio frame and send it over the datagram channel.
    ///
    /// Advances the local sequence counter; the frame header composes the
    /// session nonce with that sequence into the cipher IV.
    pub async fn send_audio(&self, data: &[u8]) -> ClientResult<()> {
        let (transport, cipher) = {
            let guard = lock(&self.channel);
            match guard.as_ref() {
                Some(channel) => (channel.transport.clone(), channel.cipher.clone()),
                None => return Err(ClientError::ChannelClosed),
            }
        };

        let sequence = self.local_sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let datagram = cipher.encrypt_frame(data, sequence)?;

        self.busy_sending_audio.store(true, Ordering::Relaxed);
        let result = transport.send(&datagram).await;
        self.busy_sending_audio.store(false, Ordering::Relaxed);
        result
    }

    /// Sequence number of the last frame sent this session
    pub fn local_sequence(&self) -> u32 {
        self.local_sequence.load(Ordering::Relaxed)
    }

    /// Sequence number of the last accepted incoming frame
    pub fn remote_sequence(&self) -> u32 {
        self.remote_sequence.load(Ordering::Relaxed)
    }

    /// Current session id; empty when no session is active
    pub fn session_id(&self) -> String {
        lock(&self.session).session_id.clone()
    }

    /// Sample rate assigned by the server, if it overrode the default
    pub fn negotiated_sample_rate(&self) -> Option<u32> {
        lock(&self.session).sample_rate
    }

    /// Frame duration assigned by the server, if it overrode the default
    pub fn negotiated_frame_duration_ms(&self) -> Option<u32> {
        lock(&self.session).frame_duration_ms
    }

    /// Whether an audio send is currently in flight
    pub fn is_busy_sending_audio(&self) -> bool {
        self.busy_sending_audio.load(Ordering::Relaxed)
    }

    // ---- signaling path ----------------------------------------------------

    /// Connect and subscribe if needed. Errors surface to the caller; there
    /// is no internal retry.
    async fn ensure_signaling(self: &Arc<Self>) -> ClientResult<()> {
        if self.signaling.is_connected() {
            let dispatch_alive = lock(&self.dispatch)
                .as_ref()
                .map(|task| !task.is_finished())
                .unwrap_or(false);
            if dispatch_alive {
                return Ok(());
            }
        }

        self.config.validate()?;
        debug!(
            "Connecting signaling channel to {}:{}",
            self.config.endpoint, self.config.signaling_port
        );
        self.signaling.connect().await?;
        let inbound = self.signaling.subscribe(&self.config.publish_topic).await?;

        let task = self.spawn_dispatch(inbound);
        if let Some(old) = lock(&self.dispatch).replace(task) {
            old.abort();
        }
        Ok(())
    }

    async fn publish(&self, payload: String) -> ClientResult<()> {
        let topic = self.config.publish_target();
        self.signaling.publish(&topic, payload).await
    }

    fn spawn_dispatch(
        self: &Arc<Self>,
        mut inbound: mpsc::UnboundedReceiver<String>,
    ) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(payload) = inbound.recv().await {
                let Some(controller) = weak.upgrade() else { break };
                controller.handle_signaling_message(&payload);
            }
            debug!("Signaling delivery stream ended");
        })
    }

    /// Inbound dispatch. Runs on the dispatch task, never on a caller's
    /// context, and never tears the channel down inline.
    fn handle_signaling_message(&self, payload: &str) {
        let value: Value = match serde_json::from_str(payload) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to parse signaling message: {}", e);
                return;
            }
        };
        let kind = match message_kind(&value) {
            Some(kind) => kind.to_owned(),
            None => {
                warn!("Signaling message has no type field");
                return;
            }
        };

        match kind.as_str() {
            MESSAGE_TYPE_HELLO => self.parse_server_hello(&value),
            MESSAGE_TYPE_GOODBYE => self.handle_goodbye(&value),
            _ => self.emit(ClientEvent::ControlMessage { message: value }),
        }

        self.touch_last_incoming();
    }

    /// Process the handshake reply. On success, installs session state and
    /// fires the handshake gate exactly once. Any failure aborts silently
    /// (logged only), leaving the pending open call to time out and the
    /// existing session state untouched.
    fn parse_server_hello(&self, value: &Value) {
        let hello = match ServerHello::from_value(value) {
            Ok(hello) => hello,
            Err(e) => {
                warn!("Malformed server hello: {}", e);
                return;
            }
        };

        if !hello.is_udp() {
            warn!(
                "Unsupported transport in server hello: {:?}",
                hello.transport.as_deref().unwrap_or("<missing>")
            );
            return;
        }

        let udp = match hello.udp() {
            Ok(udp) => udp.clone(),
            Err(e) => {
                warn!("Server hello rejected: {}", e);
                return;
            }
        };

        let key = skylark_protocol::decode_hex_lenient(&udp.key);
        let nonce = skylark_protocol::decode_hex_lenient(&udp.nonce);
        let cipher = match FrameCipher::from_slices(&key, &nonce) {
            Ok(cipher) => cipher,
            Err(e) => {
                warn!("Server hello carried unusable key material: {}", e);
                return;
            }
        };

        {
            let mut session = lock(&self.session);
            session.session_id = hello.session_id.unwrap_or_default();
            session.audio_endpoint = Some((udp.server.clone(), udp.port));
            if let Some(params) = &hello.audio_params {
                session.sample_rate = params.sample_rate;
                session.frame_duration_ms = params.frame_duration;
            }
            session.pending_cipher = Some(cipher);
        }

        self.local_sequence.store(0, Ordering::Relaxed);
        self.remote_sequence.store(0, Ordering::Relaxed);

        debug!("Server hello accepted; releasing handshake wait");
        self.gate.signal();
    }

    /// A goodbye addressed to the active session (or to any session)
    /// enqueues a deferred close onto the command context.
    fn handle_goodbye(&self, value: &Value) {
        let goodbye = match Goodbye::from_value(value) {
            Ok(goodbye) => goodbye,
            Err(e) => {
                warn!("Malformed goodbye: {}", e);
                return;
            }
        };

        let current = lock(&self.session).session_id.clone();
        if goodbye.addresses(&current) {
            info!("Peer goodbye received for session {:?}", current);
            let _ = self.commands.send(ControllerCommand::CloseChannel);
        } else {
            debug!(
                "Ignoring goodbye for other session {:?}",
                goodbye.session_id
            );
        }
    }

    // ---- datagram path -----------------------------------------------------

    /// Receive loop for the datagram channel. Rejects frames whose
    /// sequence does not advance, decrypts the rest, and forwards them to
    /// the event stream.
    fn spawn_receive_loop(
        self: &Arc<Self>,
        transport: Arc<dyn DatagramTransport>,
        cipher: FrameCipher,
    ) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                let datagram = match transport.recv().await {
                    Ok(datagram) => datagram,
                    Err(e) => {
                        if let Some(controller) = weak.upgrade() {
                            warn!("Datagram receive failed: {}", e);
                            controller.error_occurred.store(true, Ordering::Relaxed);
                        }
                        break;
                    }
                };
                let Some(controller) = weak.upgrade() else { break };

                match cipher.decrypt_frame(&datagram) {
                    Ok((sequence, payload)) => {
                        let last = controller.remote_sequence.load(Ordering::Relaxed);
                        if sequence <= last {
                            warn!("Dropping stale audio frame #{} (last {})", sequence, last);
                            continue;
                        }
                        controller.remote_sequence.store(sequence, Ordering::Relaxed);
                        controller.emit(ClientEvent::AudioFrame { sequence, payload });
                    }
                    Err(e) => warn!("Dropping undecryptable datagram: {}", e),
                }
            }
        })
    }

    // ---- helpers -----------------------------------------------------------

    fn emit(&self, event: ClientEvent) {
        let _ = self.events.send(event);
    }

    fn touch_last_incoming(&self) {
        let elapsed = self.epoch.elapsed().as_millis() as u64;
        self.last_incoming_ms.store(elapsed, Ordering::Relaxed);
    }

    fn millis_since_last_incoming(&self) -> u64 {
        let now = self.epoch.elapsed().as_millis() as u64;
        now.saturating_sub(self.last_incoming_ms.load(Ordering::Relaxed))
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("endpoint", &self.config.endpoint)
            .field("channel_present", &self.channel_present)
            .field("error_occurred", &self.error_occurred)
            .field("local_sequence", &self.local_sequence)
            .field("remote_sequence", &self.remote_sequence)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct NullSignaling {
        published: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SignalingTransport for NullSignaling {
        fn is_connected(&self) -> bool {
            true
        }

        async fn connect(&self) -> ClientResult<()> {
            Ok(())
        }

        async fn publish(&self, _topic: &str, payload: String) -> ClientResult<()> {
            lock(&self.published).push(payload);
            Ok(())
        }

        async fn subscribe(&self, _topic: &str) -> ClientResult<mpsc::UnboundedReceiver<String>> {
            let (_tx, rx) = mpsc::unbounded_channel();
            Ok(rx)
        }
    }

    struct NullFactory;

    #[async_trait]
    impl TransportFactory for NullFactory {
        async fn open_datagram(
            &self,
            _host: &str,
            _port: u16,
        ) -> ClientResult<Arc<dyn DatagramTransport>> {
            Err(ClientError::ConnectFailure("no datagram in tests".into()))
        }
    }

    fn test_controller() -> (Arc<SessionController>, Arc<NullSignaling>) {
        let config = ClientConfig::builder()
            .endpoint("signal.test")
            .publish_topic("voice")
            .build()
            .unwrap();
        let signaling = Arc::new(NullSignaling {
            published: Mutex::new(Vec::new()),
        });
        let (controller, _events) =
            SessionController::new(config, signaling.clone(), Arc::new(NullFactory));
        (controller, signaling)
    }

    #[tokio::test]
    async fn test_controller_starts_closed() {
        let (controller, _signaling) = test_controller();
        assert!(!controller.is_audio_channel_opened());
        assert_eq!(controller.session_id(), "");
        assert_eq!(controller.local_sequence(), 0);
        assert_eq!(controller.remote_sequence(), 0);
    }

    #[tokio::test]
    async fn test_send_audio_without_channel() {
        let (controller, _signaling) = test_controller();
        let result = controller.send_audio(b"frame").await;
        assert!(matches!(result, Err(ClientError::ChannelClosed)));
    }

    #[tokio::test]
    async fn test_close_without_channel_still_says_goodbye() {
        let (controller, signaling) = test_controller();
        controller.close_audio_channel().await;
        let published = lock(&signaling.published).clone();
        assert_eq!(published.len(), 1);
        assert!(published[0].contains("goodbye"));
    }
}
