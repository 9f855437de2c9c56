//! Handshake Gate
//!
//! A resettable, single-shot signal with a bounded wait. An open call
//! clears the gate, publishes its hello, and blocks on [`HandshakeGate::wait`];
//! the signaling dispatch path fires [`HandshakeGate::signal`] once the
//! server hello has been parsed and session state installed.
//!
//! The design assumes at most one in-flight open call at a time; the gate
//! is not meant for multiple concurrent waiters.

use std::time::Duration;
use tokio::sync::watch;

/// Resettable single-shot signal
#[derive(Debug)]
pub struct HandshakeGate {
    tx: watch::Sender<bool>,
}

impl HandshakeGate {
    /// Create an unsignaled gate
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Reset the gate to unsignaled
    pub fn clear(&self) {
        self.tx.send_replace(false);
    }

    /// Fire the gate, releasing a pending or future wait
    pub fn signal(&self) {
        self.tx.send_replace(true);
    }

    /// Wait until the gate fires or the timeout elapses.
    ///
    /// Returns `true` if the gate was signaled. A signal that fired before
    /// the wait began still counts.
    pub async fn wait(&self, timeout: Duration) -> bool {
        let mut rx = self.tx.subscribe();
        let signaled = matches!(
            tokio::time::timeout(timeout, rx.wait_for(|signaled| *signaled)).await,
            Ok(Ok(_))
        );
        signaled
    }
}

impl Default for HandshakeGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wait_times_out_unsignaled() {
        let gate = HandshakeGate::new();
        assert!(!gate.wait(Duration::from_millis(20)).await);
    }

    #[tokio::test]
    async fn test_signal_before_wait() {
        let gate = HandshakeGate::new();
        gate.signal();
        assert!(gate.wait(Duration::from_millis(20)).await);
    }

    #[tokio::test]
    async fn test_signal_releases_pending_wait() {
        let gate = std::sync::Arc::new(HandshakeGate::new());
        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.wait(Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        gate.signal();
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_resets_signal() {
        let gate = HandshakeGate::new();
        gate.signal();
        gate.clear();
        assert!(!gate.wait(Duration::from_millis(20)).await);
    }
}
