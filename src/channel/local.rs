//! In-process broadcast channel
//!
//! Fans envelopes out to the sessions registered in a [`GroupRegistry`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{BroadcastChannel, ChangeEnvelope, PublishError, PublishReceipt};
use crate::registry::GroupRegistry;
use crate::session::DeliveryOutcome;
use crate::stats::{ChannelCounters, ChannelStats};

/// Broadcast channel for sessions held by this process
///
/// Publishing takes a membership snapshot and pushes the shared payload onto
/// each member's outbox. Pushes never block, so a slow or dead subscriber
/// cannot stall the others. Ordering per subscriber follows publish order
/// because each outbox is a bounded broadcast channel read by a single task.
pub struct LocalChannel {
    registry: Arc<GroupRegistry>,
    closed: AtomicBool,
    counters: ChannelCounters,
}

impl LocalChannel {
    /// Create a channel over the given registry
    pub fn new(registry: Arc<GroupRegistry>) -> Self {
        Self {
            registry,
            closed: AtomicBool::new(false),
            counters: ChannelCounters::default(),
        }
    }

    /// The registry this channel routes through
    pub fn registry(&self) -> &Arc<GroupRegistry> {
        &self.registry
    }

    /// Stop accepting envelopes and ask every session to close
    ///
    /// Also closes the registry, so sessions that open afterwards are
    /// refused. Returns the number of sessions asked to close.
    pub fn shutdown(&self) -> usize {
        if self.closed.swap(true, Ordering::AcqRel) {
            return 0;
        }

        let sessions = self.registry.close();
        for session in &sessions {
            session.close();
        }

        tracing::info!(sessions = sessions.len(), "Broadcast channel shut down");
        sessions.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Channel-wide delivery statistics
    pub fn stats(&self) -> ChannelStats {
        self.counters.snapshot()
    }
}

impl BroadcastChannel for LocalChannel {
    fn publish(&self, envelope: ChangeEnvelope) -> Result<PublishReceipt, PublishError> {
        if self.is_closed() {
            return Err(PublishError::ChannelClosed);
        }

        let members = self.registry.members_of(&envelope.group);
        let mut receipt = PublishReceipt {
            recipients: members.len(),
            ..PublishReceipt::default()
        };

        for member in &members {
            match member.deliver(envelope.payload.clone()) {
                DeliveryOutcome::Queued => receipt.delivered += 1,
                DeliveryOutcome::DroppedOldest => {
                    receipt.delivered += 1;
                    receipt.overflowed += 1;
                }
                DeliveryOutcome::Overflow => receipt.overflowed += 1,
                DeliveryOutcome::Stale => {
                    // Closed between snapshot and delivery; removal is already
                    // under way in its close path.
                    receipt.stale += 1;
                }
            }
        }

        self.counters
            .record_publish(receipt.delivered, receipt.overflowed, receipt.stale);

        tracing::debug!(
            group = %envelope.group,
            kind = %envelope.kind,
            bytes = envelope.len(),
            recipients = receipt.recipients,
            delivered = receipt.delivered,
            "Envelope published"
        );

        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::channel::ChangeKind;
    use crate::registry::GroupName;
    use crate::session::{FeedConfig, OverflowPolicy, SessionHandle};

    fn envelope(payload: &'static str) -> ChangeEnvelope {
        ChangeEnvelope::new(GroupName::products(), ChangeKind::Updated, payload)
    }

    fn setup(n: u64) -> (Arc<GroupRegistry>, LocalChannel, Vec<SessionHandle>) {
        let registry = Arc::new(GroupRegistry::new());
        let channel = LocalChannel::new(registry.clone());
        let handles: Vec<_> = (1..=n)
            .map(|id| {
                let handle = SessionHandle::new(id, &FeedConfig::default());
                registry.join(&GroupName::products(), handle.clone());
                handle
            })
            .collect();
        (registry, channel, handles)
    }

    #[tokio::test]
    async fn test_publish_reaches_every_member() {
        let (_registry, channel, handles) = setup(3);

        let receipt = channel.publish(envelope("{\"id\":1}")).unwrap();
        assert_eq!(receipt.recipients, 3);
        assert_eq!(receipt.delivered, 3);

        for handle in &handles {
            assert_eq!(handle.pending(), 1);
            assert_eq!(
                handle.take_receiver().recv().await.unwrap(),
                Bytes::from_static(b"{\"id\":1}")
            );
        }
    }

    #[test]
    fn test_publish_to_empty_group() {
        let registry = Arc::new(GroupRegistry::new());
        let channel = LocalChannel::new(registry);

        let receipt = channel.publish(envelope("{}")).unwrap();
        assert_eq!(receipt, PublishReceipt::default());
        assert_eq!(channel.stats().envelopes_published, 1);
    }

    #[test]
    fn test_other_groups_untouched() {
        let (registry, channel, handles) = setup(1);
        let other = SessionHandle::new(99, &FeedConfig::default());
        registry.join(&GroupName::new("orders_updates"), other.clone());

        channel.publish(envelope("{}")).unwrap();

        assert_eq!(handles[0].pending(), 1);
        assert_eq!(other.pending(), 0);
    }

    #[test]
    fn test_stale_member_is_skipped() {
        let (_registry, channel, handles) = setup(2);
        handles[0].close_outbox();

        let receipt = channel.publish(envelope("{}")).unwrap();
        assert_eq!(receipt.stale, 1);
        assert_eq!(receipt.delivered, 1);
        assert_eq!(handles[1].pending(), 1);
    }

    #[test]
    fn test_overflow_is_isolated() {
        let registry = Arc::new(GroupRegistry::new());
        let channel = LocalChannel::new(registry.clone());
        let strict = FeedConfig::default()
            .outbox_capacity(1)
            .overflow_policy(OverflowPolicy::Disconnect);
        let slow = SessionHandle::new(1, &strict);
        let fast = SessionHandle::new(2, &FeedConfig::default());
        registry.join(&GroupName::products(), slow.clone());
        registry.join(&GroupName::products(), fast.clone());

        channel.publish(envelope("1")).unwrap();
        let receipt = channel.publish(envelope("2")).unwrap();

        assert_eq!(receipt.overflowed, 1);
        assert_eq!(receipt.delivered, 1);
        assert_eq!(fast.pending(), 2);
        assert!(slow.cancel_token().is_cancelled());
    }

    #[test]
    fn test_shutdown_rejects_and_closes() {
        let (registry, channel, handles) = setup(2);

        assert_eq!(channel.shutdown(), 2);
        assert!(registry.is_closed());
        assert!(!registry.join(
            &GroupName::products(),
            SessionHandle::new(3, &FeedConfig::default())
        ));
        assert_eq!(channel.shutdown(), 0);
        assert!(handles.iter().all(|h| h.cancel_token().is_cancelled()));
        assert_eq!(
            channel.publish(envelope("{}")),
            Err(PublishError::ChannelClosed)
        );
    }
}
