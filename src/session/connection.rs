//! Feed session lifecycle
//!
//! Drives a single connected client from handshake through disconnect:
//!
//! 1. `open` acknowledges the handshake and joins the feed group
//! 2. `run` waits on the outbox and writes each payload to the transport
//! 3. `close` removes the session from every group, then releases the
//!    transport
//!
//! Dropping a session that was never closed (an aborted task, a cancelled
//! `run` future) performs the synchronous part of `close`, so the registry
//! never keeps a handle whose task is gone.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use super::config::{FeedConfig, OverflowPolicy};
use super::handle::{SessionHandle, SessionId};
use super::state::SessionPhase;
use super::transport::{Transport, TransportError};
use crate::registry::{GroupName, GroupRegistry};

/// Why a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Close requested through the handle (shutdown, overflow, explicit close)
    Local,
    /// The peer disconnected
    PeerGone,
    /// The session fell behind its outbox under `OverflowPolicy::Disconnect`
    Overflow,
    /// A write failed or timed out
    TransportFailed(TransportError),
    /// The handshake could not be acknowledged
    HandshakeFailed(TransportError),
}

/// One live client connection subscribed to the feed
pub struct ConnectionSession<T: Transport> {
    handle: SessionHandle,
    outbox: broadcast::Receiver<Bytes>,
    transport: T,
    registry: Arc<GroupRegistry>,
    /// Local bookkeeping; the registry is authoritative
    groups: HashSet<GroupName>,
    config: FeedConfig,
}

impl<T: Transport> ConnectionSession<T> {
    /// Create a session in the `Connecting` phase
    pub fn new(id: SessionId, transport: T, registry: Arc<GroupRegistry>, config: FeedConfig) -> Self {
        let handle = SessionHandle::new(id, &config);
        let outbox = handle.take_receiver();

        Self {
            handle,
            outbox,
            transport,
            registry,
            groups: HashSet::new(),
            config,
        }
    }

    /// Session id
    pub fn id(&self) -> SessionId {
        self.handle.id()
    }

    /// Handle for delivery and close requests from other tasks
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Groups this session has joined
    pub fn groups(&self) -> impl Iterator<Item = &GroupName> {
        self.groups.iter()
    }

    /// Transition `Connecting → Open`
    ///
    /// Acknowledges the transport handshake, then joins `group`. If the
    /// handshake fails, or the registry has been shut down, the session is
    /// closed and the error returned.
    pub async fn open(&mut self, group: &GroupName) -> Result<(), TransportError> {
        if self.handle.phase() != SessionPhase::Connecting {
            return Err(TransportError::Closed);
        }

        if let Err(e) = self.transport.accept().await {
            warn!(session_id = self.id(), error = %e, "Handshake failed");
            self.close(CloseReason::HandshakeFailed(e.clone())).await;
            return Err(e);
        }

        if !self.handle.mark_open() {
            return Err(TransportError::Closed);
        }

        // A fresh session is never already a member, so a refusal here
        // means the registry is closed
        if !self.join(group) {
            warn!(session_id = self.id(), group = %group, "Feed is shutting down, session refused");
            self.close(CloseReason::Local).await;
            return Err(TransportError::Rejected("feed is shutting down".into()));
        }

        info!(session_id = self.id(), group = %group, "Feed session open");
        Ok(())
    }

    /// Join an additional group
    pub fn join(&mut self, group: &GroupName) -> bool {
        if self.registry.join(group, self.handle.clone()) {
            self.groups.insert(group.clone());
            true
        } else {
            false
        }
    }

    /// Leave a group
    pub fn leave(&mut self, group: &GroupName) -> bool {
        self.groups.remove(group);
        self.registry.leave(group, self.id())
    }

    /// Forward pushed payloads until the session ends
    ///
    /// `disconnected` resolves when the peer goes away (close frame, read
    /// error). The session is always closed when this returns.
    pub async fn run<F>(mut self, disconnected: F) -> CloseReason
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(disconnected);

        let session_id = self.id();
        let cancel = self.handle.cancel_token().clone();
        let send_timeout = self.config.send_timeout;

        let reason = loop {
            let received = tokio::select! {
                biased;
                _ = cancel.cancelled() => break CloseReason::Local,
                _ = &mut disconnected => break CloseReason::PeerGone,
                received = self.outbox.recv() => received,
            };

            let frame = match received {
                Ok(frame) => frame,
                Err(RecvError::Lagged(missed)) => {
                    self.handle.counters().record_dropped_many(missed);
                    if self.handle.policy() == OverflowPolicy::Disconnect {
                        warn!(session_id = session_id, lagged = missed, "Session fell behind, disconnecting");
                        break CloseReason::Overflow;
                    }
                    debug!(session_id = session_id, lagged = missed, "Session fell behind, oldest frames skipped");
                    continue;
                }
                // Outbox closed underneath us
                Err(RecvError::Closed) => break CloseReason::Local,
            };

            let len = frame.len();
            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.handle.counters().record_dropped();
                    break CloseReason::Local;
                }
                _ = &mut disconnected => {
                    self.handle.counters().record_dropped();
                    break CloseReason::PeerGone;
                }
                result = tokio::time::timeout(send_timeout, self.transport.send(frame)) => {
                    result.unwrap_or(Err(TransportError::Timeout(send_timeout)))
                }
            };

            match sent {
                Ok(()) => self.handle.counters().record_sent(len),
                Err(e) => {
                    self.handle.counters().record_dropped();
                    debug!(session_id = session_id, error = %e, "Frame delivery failed");
                    break CloseReason::TransportFailed(e);
                }
            }
        };

        self.close(reason.clone()).await;
        reason
    }

    /// Transition to `Closed`
    ///
    /// Idempotent. Group removal completes before the transport is released.
    pub async fn close(&mut self, reason: CloseReason) {
        if !self.handle.begin_close() {
            return;
        }

        let (removed, discarded) = self.detach();
        self.transport.close().await;
        self.handle.finish_close();

        let stats = self.handle.stats();
        info!(
            session_id = self.id(),
            reason = ?reason,
            groups_left = removed,
            discarded = discarded,
            frames_sent = stats.frames_sent,
            dropped = stats.dropped_frames,
            duration_ms = stats.duration.as_millis() as u64,
            "Feed session closed"
        );
    }

    /// Leave every group and stop the outbox
    ///
    /// Returns the number of groups left and of frames discarded.
    fn detach(&mut self) -> (usize, usize) {
        let removed = self.registry.remove_everywhere(self.id());
        self.groups.clear();

        self.handle.cancel_token().cancel();
        let discarded = self.handle.close_outbox();
        (removed, discarded)
    }
}

impl<T: Transport> Drop for ConnectionSession<T> {
    fn drop(&mut self) {
        if self.handle.phase() == SessionPhase::Closed {
            return;
        }

        // Closing here means an async close was cut short after detaching
        if self.handle.begin_close() {
            self.detach();
        }
        self.handle.finish_close();

        debug!(session_id = self.id(), "Feed session dropped before close completed");
    }
}
