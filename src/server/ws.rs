//! WebSocket transport
//!
//! Splits an upgraded socket: the sink becomes the session's [`Transport`],
//! the stream is drained only to notice the peer going away.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tracing::debug;

use crate::registry::{GroupName, GroupRegistry};
use crate::session::{CloseReason, ConnectionSession, FeedConfig, SessionId, Transport, TransportError};

/// Upper bound on the close handshake with a peer that may be gone
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Outbound half of a WebSocket; each payload becomes one text frame
pub struct WsTransport {
    sink: SplitSink<WebSocket, Message>,
}

impl WsTransport {
    pub fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self { sink }
    }
}

/// Wrap a payload as a text frame, sharing its buffer
fn text_frame(frame: Bytes) -> Result<Message, TransportError> {
    Utf8Bytes::try_from(frame)
        .map(Message::Text)
        .map_err(|e| TransportError::Io(format!("payload is not utf-8: {e}")))
}

impl Transport for WsTransport {
    async fn send(&mut self, frame: Bytes) -> Result<(), TransportError> {
        let message = text_frame(frame)?;

        self.sink
            .send(message)
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    async fn close(&mut self) {
        let sink = &mut self.sink;
        let result = tokio::time::timeout(CLOSE_TIMEOUT, async move {
            let _ = sink.send(Message::Close(None)).await;
            sink.close().await
        })
        .await;

        if let Ok(Err(e)) = result {
            debug!(error = %e, "WebSocket close failed");
        }
    }
}

/// Resolves when the peer sends a close frame or the stream errors
///
/// Inbound data frames carry no meaning on the feed and are discarded.
pub async fn drain_inbound(mut stream: SplitStream<WebSocket>) {
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }
}

/// Run one feed session over an upgraded socket
pub async fn serve_socket(
    socket: WebSocket,
    session_id: SessionId,
    registry: Arc<GroupRegistry>,
    config: FeedConfig,
    group: GroupName,
) -> CloseReason {
    let (sink, stream) = socket.split();
    let mut session = ConnectionSession::new(session_id, WsTransport::new(sink), registry, config);

    if let Err(e) = session.open(&group).await {
        return CloseReason::HandshakeFailed(e);
    }

    session.run(drain_inbound(stream)).await
}
