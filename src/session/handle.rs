//! Registry-side view of a session
//!
//! A [`SessionHandle`] is what the group registry stores and what the
//! broadcast channel delivers to. It never touches the transport; it only
//! enqueues frames and requests cancellation.
//!
//! The outbox is a bounded `tokio::sync::broadcast` channel with a single
//! receiver held by the session task. When the receiver falls behind, the
//! channel overwrites the oldest frame and the receiver observes
//! `RecvError::Lagged`.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::config::{FeedConfig, OverflowPolicy, MAX_OUTBOX_CAPACITY};
use super::state::{SessionPhase, SessionState};
use crate::stats::{SessionCounters, SessionStats};

/// Unique session identifier
pub type SessionId = u64;

/// Result of handing a payload to a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Enqueued for the session task
    Queued,
    /// Enqueued, but the oldest pending frame was discarded
    DroppedOldest,
    /// Refused because the outbox is full; the session is being closed
    Overflow,
    /// The session is already closed; nothing was done
    Stale,
}

struct HandleInner {
    id: SessionId,
    /// Outbox sender; taken on close so later deliveries are stale
    tx: RwLock<Option<broadcast::Sender<Bytes>>>,
    /// Receiver created with the channel, parked until the session task
    /// claims it
    parked: Mutex<Option<broadcast::Receiver<Bytes>>>,
    capacity: usize,
    policy: OverflowPolicy,
    state: Mutex<SessionState>,
    /// Cancelled to request close; interrupts the session task
    cancel: CancellationToken,
    /// Cancelled once the close transition has fully completed
    closed: CancellationToken,
    counters: SessionCounters,
}

/// Cloneable handle to a live session
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<HandleInner>,
}

impl SessionHandle {
    /// Create a handle in the `Connecting` phase
    ///
    /// The outbox holds `outbox_capacity` frames rounded up to the next power
    /// of two.
    pub fn new(id: SessionId, config: &FeedConfig) -> Self {
        let capacity = config
            .outbox_capacity
            .clamp(1, MAX_OUTBOX_CAPACITY)
            .next_power_of_two();
        let (tx, rx) = broadcast::channel(capacity);

        Self {
            inner: Arc::new(HandleInner {
                id,
                tx: RwLock::new(Some(tx)),
                parked: Mutex::new(Some(rx)),
                capacity,
                policy: config.overflow_policy,
                state: Mutex::new(SessionState::new()),
                cancel: CancellationToken::new(),
                closed: CancellationToken::new(),
                counters: SessionCounters::default(),
            }),
        }
    }

    /// Session id
    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    /// Hand a payload to this session without blocking
    pub fn deliver(&self, payload: Bytes) -> DeliveryOutcome {
        let tx = self.inner.tx.read();
        let Some(tx) = tx.as_ref() else {
            return DeliveryOutcome::Stale;
        };

        let full = tx.len() >= self.inner.capacity;

        if full && self.inner.policy == OverflowPolicy::Disconnect {
            self.inner.counters.record_dropped();
            tracing::warn!(
                session_id = self.id(),
                capacity = self.inner.capacity,
                "Outbox overflow, disconnecting slow subscriber"
            );
            self.close();
            return DeliveryOutcome::Overflow;
        }

        // Fails only once every receiver is gone
        if tx.send(payload).is_err() {
            return DeliveryOutcome::Stale;
        }
        self.inner.counters.record_queued();

        if full {
            tracing::debug!(session_id = self.id(), "Outbox full, oldest frame overwritten");
            DeliveryOutcome::DroppedOldest
        } else {
            DeliveryOutcome::Queued
        }
    }

    /// Request the session to close
    ///
    /// Returns immediately; the session task performs the close. Safe to call
    /// any number of times, from any task.
    pub fn close(&self) {
        self.inner.cancel.cancel();
    }

    /// Wait until the close transition has completed
    pub async fn closed(&self) {
        self.inner.closed.cancelled().await;
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> SessionPhase {
        self.inner.state.lock().phase
    }

    pub fn is_open(&self) -> bool {
        self.inner.state.lock().is_open()
    }

    /// Whether close has begun (or finished)
    pub fn is_closing(&self) -> bool {
        self.inner.state.lock().is_closing()
    }

    /// Delivery statistics for this session
    pub fn stats(&self) -> SessionStats {
        let duration = self.inner.state.lock().duration();
        self.inner.counters.snapshot(duration)
    }

    /// Frames currently waiting in the outbox
    pub fn pending(&self) -> usize {
        self.inner.tx.read().as_ref().map_or(0, |tx| tx.len())
    }

    /// Effective outbox depth
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub(crate) fn policy(&self) -> OverflowPolicy {
        self.inner.policy
    }

    pub(crate) fn mark_open(&self) -> bool {
        self.inner.state.lock().mark_open()
    }

    pub(crate) fn begin_close(&self) -> bool {
        self.inner.state.lock().begin_close()
    }

    pub(crate) fn finish_close(&self) {
        self.inner.state.lock().finish_close();
        self.inner.closed.cancel();
    }

    /// Receiving half of the outbox for the session task
    ///
    /// The first call gets every frame delivered so far. Once the outbox is
    /// closed the returned receiver reports `Closed` immediately.
    pub(crate) fn take_receiver(&self) -> broadcast::Receiver<Bytes> {
        if let Some(rx) = self.inner.parked.lock().take() {
            return rx;
        }
        match self.inner.tx.read().as_ref() {
            Some(tx) => tx.subscribe(),
            None => broadcast::channel(1).1,
        }
    }

    /// Stop accepting frames; returns how many were still pending
    pub(crate) fn close_outbox(&self) -> usize {
        let discarded = self.inner.tx.write().take().map_or(0, |tx| tx.len());
        self.inner.parked.lock().take();
        discarded
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.inner.cancel
    }

    pub(crate) fn counters(&self) -> &SessionCounters {
        &self.inner.counters
    }

    /// Send bypassing the overflow policy, as racing publishers can
    #[cfg(test)]
    pub(crate) fn push_unchecked(&self, payload: Bytes) {
        if let Some(tx) = self.inner.tx.read().as_ref() {
            let _ = tx.send(payload);
        }
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.inner.id)
            .field("phase", &self.phase())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast::error::RecvError;
    use tokio_test::{assert_pending, assert_ready, task};

    use super::*;

    #[tokio::test]
    async fn test_deliver_queues() {
        let handle = SessionHandle::new(1, &FeedConfig::default());

        assert_eq!(handle.deliver(Bytes::from_static(b"{}")), DeliveryOutcome::Queued);
        assert_eq!(handle.pending(), 1);
        assert_eq!(handle.stats().frames_queued, 1);

        let mut rx = handle.take_receiver();
        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"{}"));
        assert_eq!(handle.pending(), 0);
    }

    #[test]
    fn test_capacity_rounds_to_power_of_two() {
        let handle = SessionHandle::new(1, &FeedConfig::default().outbox_capacity(3));
        assert_eq!(handle.capacity(), 4);

        let mut config = FeedConfig::default();
        config.outbox_capacity = 0;
        assert_eq!(SessionHandle::new(2, &config).capacity(), 1);
    }

    #[tokio::test]
    async fn test_drop_oldest_keeps_newest() {
        let config = FeedConfig::default().outbox_capacity(1);
        let handle = SessionHandle::new(1, &config);

        handle.deliver(Bytes::from_static(b"1"));
        assert_eq!(
            handle.deliver(Bytes::from_static(b"2")),
            DeliveryOutcome::DroppedOldest
        );
        assert_eq!(handle.pending(), 1);
        assert!(!handle.cancel_token().is_cancelled());

        let mut rx = handle.take_receiver();
        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(1))));
        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"2"));
    }

    #[test]
    fn test_overflow_requests_close() {
        let config = FeedConfig::default()
            .outbox_capacity(1)
            .overflow_policy(OverflowPolicy::Disconnect);
        let handle = SessionHandle::new(1, &config);

        handle.deliver(Bytes::from_static(b"1"));
        assert_eq!(handle.deliver(Bytes::from_static(b"2")), DeliveryOutcome::Overflow);
        assert!(handle.cancel_token().is_cancelled());
        assert_eq!(handle.stats().dropped_frames, 1);
        assert_eq!(handle.pending(), 1);
    }

    #[test]
    fn test_deliver_to_closed_outbox_is_stale() {
        let handle = SessionHandle::new(1, &FeedConfig::default());
        handle.deliver(Bytes::from_static(b"a"));

        assert_eq!(handle.close_outbox(), 1);
        assert_eq!(handle.close_outbox(), 0);
        assert_eq!(handle.deliver(Bytes::from_static(b"x")), DeliveryOutcome::Stale);
        assert_eq!(handle.stats().frames_queued, 1);
        assert_eq!(handle.pending(), 0);
    }

    #[test]
    fn test_receiver_wakes_on_deliver() {
        let handle = SessionHandle::new(1, &FeedConfig::default());
        let mut rx = handle.take_receiver();

        let mut recv = task::spawn(rx.recv());
        assert_pending!(recv.poll());

        handle.deliver(Bytes::from_static(b"tea"));
        assert!(recv.is_woken());
        assert_eq!(assert_ready!(recv.poll()).unwrap(), Bytes::from_static(b"tea"));
    }

    #[test]
    fn test_close_outbox_wakes_receiver() {
        let handle = SessionHandle::new(1, &FeedConfig::default());
        let mut rx = handle.take_receiver();

        let mut recv = task::spawn(rx.recv());
        assert_pending!(recv.poll());

        handle.close_outbox();
        assert!(matches!(assert_ready!(recv.poll()), Err(RecvError::Closed)));
    }

    #[tokio::test]
    async fn test_receiver_after_close_is_closed() {
        let handle = SessionHandle::new(1, &FeedConfig::default());
        handle.close_outbox();

        let mut rx = handle.take_receiver();
        assert!(matches!(rx.recv().await, Err(RecvError::Closed)));
    }

    #[tokio::test]
    async fn test_closed_resolves_after_finish() {
        let handle = SessionHandle::new(1, &FeedConfig::default());
        handle.mark_open();

        assert!(handle.begin_close());
        assert_eq!(handle.phase(), SessionPhase::Closing);
        handle.finish_close();

        handle.closed().await;
        assert_eq!(handle.phase(), SessionPhase::Closed);
    }

    #[test]
    fn test_close_is_idempotent() {
        let handle = SessionHandle::new(1, &FeedConfig::default());
        handle.close();
        handle.close();
        assert!(handle.cancel_token().is_cancelled());
    }
}
