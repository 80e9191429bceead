//! Transport abstraction
//!
//! A session talks to its client only through this trait. Disconnect
//! detection is not part of it: the caller hands [`ConnectionSession::run`]
//! a future that resolves when the peer goes away.
//!
//! [`ConnectionSession::run`]: super::ConnectionSession::run

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;

/// Transport failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The peer is gone
    #[error("transport closed")]
    Closed,

    /// A write did not finish in time
    #[error("send timed out after {0:?}")]
    Timeout(Duration),

    /// Underlying I/O or protocol error
    #[error("transport i/o error: {0}")]
    Io(String),

    /// The handshake was refused
    #[error("handshake rejected: {0}")]
    Rejected(String),
}

/// Outbound side of a client connection
pub trait Transport: Send + 'static {
    /// Acknowledge the transport-level handshake
    fn accept(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send {
        async { Ok(()) }
    }

    /// Write one serialized payload as a frame
    fn send(&mut self, frame: Bytes) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Release the transport; must tolerate an already-dead peer
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// In-process transport backed by an mpsc channel
///
/// Useful for bridging the feed into another task (SSE, a test, a relay).
/// Dropping the receiver looks like a disconnected peer.
pub struct ChannelTransport {
    tx: Option<mpsc::Sender<Bytes>>,
}

impl ChannelTransport {
    /// Create a transport and the receiver for its frames
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx: Some(tx) }, rx)
    }
}

impl Transport for ChannelTransport {
    async fn send(&mut self, frame: Bytes) -> Result<(), TransportError> {
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        tx.send(frame).await.map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self) {
        // Dropping the sender ends the receiver's stream
        self.tx.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_transport_send() {
        let (mut transport, mut rx) = ChannelTransport::new(4);

        transport.accept().await.unwrap();
        transport.send(Bytes::from_static(b"hello")).await.unwrap();

        assert_eq!(rx.recv().await, Some(Bytes::from_static(b"hello")));
    }

    #[tokio::test]
    async fn test_channel_transport_peer_gone() {
        let (mut transport, rx) = ChannelTransport::new(4);
        drop(rx);

        let result = transport.send(Bytes::from_static(b"x")).await;
        assert_eq!(result, Err(TransportError::Closed));
    }

    #[tokio::test]
    async fn test_channel_transport_close_ends_stream() {
        let (mut transport, mut rx) = ChannelTransport::new(4);

        transport.close().await;
        assert_eq!(rx.recv().await, None);
        assert_eq!(
            transport.send(Bytes::from_static(b"x")).await,
            Err(TransportError::Closed)
        );
    }

    #[test]
    fn test_error_display() {
        let err = TransportError::Timeout(Duration::from_secs(2));
        assert_eq!(err.to_string(), "send timed out after 2s");
    }
}
