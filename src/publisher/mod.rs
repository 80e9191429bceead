//! Change notifier
//!
//! Turns "entity persisted" events into envelopes on a broadcast group. The
//! notifier holds no state of its own and never fails the caller: a
//! notification is an auxiliary effect of a write, not part of it.

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::channel::{BroadcastChannel, ChangeEnvelope, ChangeKind, PublishReceipt};
use crate::registry::GroupName;

/// Hook the persistence layer calls after every successful create/update
pub trait PersistHook<E: ?Sized>: Send + Sync {
    /// Called synchronously with the fully materialized entity
    fn on_entity_persisted(&self, entity: &E, was_created: bool);
}

/// Publishes serialized entities to one broadcast group
pub struct ChangeNotifier {
    channel: Arc<dyn BroadcastChannel>,
    group: GroupName,
}

impl ChangeNotifier {
    /// Create a notifier publishing to `group`
    pub fn new(channel: Arc<dyn BroadcastChannel>, group: GroupName) -> Self {
        Self { channel, group }
    }

    /// Create a notifier for the product-updates group
    pub fn products(channel: Arc<dyn BroadcastChannel>) -> Self {
        Self::new(channel, GroupName::products())
    }

    /// Target group
    pub fn group(&self) -> &GroupName {
        &self.group
    }

    /// Serialize and publish `entity`
    ///
    /// Returns the hand-off receipt, or `None` if serialization or publishing
    /// failed. Failures are logged, never propagated.
    pub fn notify<E: Serialize + ?Sized>(&self, entity: &E, kind: ChangeKind) -> Option<PublishReceipt> {
        let envelope = match ChangeEnvelope::from_entity(self.group.clone(), kind, entity) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(group = %self.group, kind = %kind, error = %e, "Failed to serialize entity");
                return None;
            }
        };

        match self.channel.publish(envelope) {
            Ok(receipt) => Some(receipt),
            Err(e) => {
                warn!(group = %self.group, kind = %kind, error = %e, "Failed to publish change");
                None
            }
        }
    }
}

impl<E: Serialize + ?Sized> PersistHook<E> for ChangeNotifier {
    fn on_entity_persisted(&self, entity: &E, was_created: bool) {
        let _ = self.notify(entity, ChangeKind::from_created(was_created));
    }
}
