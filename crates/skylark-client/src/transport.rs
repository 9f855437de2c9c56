//! Transport Boundary
//!
//! Traits for the two channels the controller coordinates, plus the
//! production datagram implementation.
//!
//! The signaling channel is a publish/subscribe transport carrying JSON
//! control messages; its implementation lives outside this crate and is
//! injected at construction. The datagram channel carries encrypted audio
//! frames and is opened per session through a [`TransportFactory`].

use async_trait::async_trait;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use crate::errors::{ClientError, ClientResult};

/// Largest datagram the receive path will accept
pub const MAX_DATAGRAM_SIZE: usize = 1500;

/// Publish/subscribe signaling channel.
///
/// Failed operations surface an error to the immediate caller and are never
/// retried internally; reconnection happens only when the caller re-invokes
/// the operation that needed the channel.
#[async_trait]
pub trait SignalingTransport: Send + Sync {
    /// Whether the channel is currently connected
    fn is_connected(&self) -> bool;

    /// Connect (or reconnect) to the signaling server
    async fn connect(&self) -> ClientResult<()>;

    /// Publish a control payload to a topic
    async fn publish(&self, topic: &str, payload: String) -> ClientResult<()>;

    /// Subscribe to a topic, yielding the inbound payload stream.
    ///
    /// Payloads are delivered on the transport's own context; the
    /// controller moves them onto its dispatch task.
    async fn subscribe(&self, topic: &str) -> ClientResult<mpsc::UnboundedReceiver<String>>;
}

/// Connectionless datagram channel carrying encrypted audio
#[async_trait]
pub trait DatagramTransport: Send + Sync {
    /// Send one datagram
    async fn send(&self, payload: &[u8]) -> ClientResult<()>;

    /// Receive one datagram
    async fn recv(&self) -> ClientResult<Vec<u8>>;
}

/// Opens datagram channels toward the endpoint named in the handshake reply
#[async_trait]
pub trait TransportFactory: Send + Sync {
    /// Open a datagram channel to `host:port`
    async fn open_datagram(
        &self,
        host: &str,
        port: u16,
    ) -> ClientResult<Arc<dyn DatagramTransport>>;
}

/// UDP datagram channel over a connected tokio socket
pub struct UdpDatagram {
    socket: UdpSocket,
}

#[async_trait]
impl DatagramTransport for UdpDatagram {
    async fn send(&self, payload: &[u8]) -> ClientResult<()> {
        self.socket.send(payload).await?;
        Ok(())
    }

    async fn recv(&self) -> ClientResult<Vec<u8>> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let len = self.socket.recv(&mut buf).await?;
        buf.truncate(len);
        Ok(buf)
    }
}

/// Production factory backed by [`tokio::net::UdpSocket`]
#[derive(Debug, Default)]
pub struct UdpTransportFactory;

#[async_trait]
impl TransportFactory for UdpTransportFactory {
    async fn open_datagram(
        &self,
        host: &str,
        port: u16,
    ) -> ClientResult<Arc<dyn DatagramTransport>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket
            .connect((host, port))
            .await
            .map_err(|e| ClientError::ConnectFailure(e.to_string()))?;
        Ok(Arc::new(UdpDatagram { socket }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_udp_datagram_round_trip() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server.local_addr().unwrap();

        let factory = UdpTransportFactory;
        let channel = factory
            .open_datagram("127.0.0.1", server_addr.port())
            .await
            .unwrap();

        channel.send(b"ping").await.unwrap();

        let mut buf = [0u8; 16];
        let (len, peer) = server.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"ping");

        server.send_to(b"pong", peer).await.unwrap();
        let reply = channel.recv().await.unwrap();
        assert_eq!(reply, b"pong");
    }
}
