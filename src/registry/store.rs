//! Group registry implementation
//!
//! The central registry that tracks which sessions belong to which broadcast
//! group.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use super::entry::{GroupEntry, GroupStats};
use super::group::GroupName;
use crate::session::{SessionHandle, SessionId};

/// Process-wide mapping from group name to member sessions
///
/// Every operation is total: unknown groups behave as empty and are created
/// lazily on first join. The lock is never held across an await point, so
/// readers always see a whole membership set.
///
/// Once [`close`](Self::close) has run, every join is refused.
pub struct GroupRegistry {
    /// Map of group name to membership
    groups: RwLock<HashMap<GroupName, GroupEntry>>,
    /// Set under the write lock by `close`
    closed: AtomicBool,
}

impl GroupRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            groups: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Add a session to a group
    ///
    /// Idempotent. Returns `true` if the session was newly added. A session
    /// that has begun closing is refused, so a dead handle can never be
    /// re-inserted after `remove_everywhere` ran for it. Every join is
    /// refused once the registry is closed.
    pub fn join(&self, group: &GroupName, handle: SessionHandle) -> bool {
        let mut groups = self.groups.write();

        if self.closed.load(Ordering::Acquire) {
            tracing::debug!(
                group = %group,
                session_id = handle.id(),
                "Join refused, registry closed"
            );
            return false;
        }

        // Checked under the write lock: close marks the phase before it
        // takes this lock to remove the session.
        if handle.is_closing() {
            tracing::debug!(
                group = %group,
                session_id = handle.id(),
                "Join refused for closing session"
            );
            return false;
        }

        let entry = groups.entry(group.clone()).or_insert_with(GroupEntry::new);
        let session_id = handle.id();
        let added = entry.members.insert(session_id, handle).is_none();

        if added {
            tracing::info!(
                group = %group,
                session_id = session_id,
                members = entry.member_count(),
                "Session joined group"
            );
        }

        added
    }

    /// Remove a session from a group
    ///
    /// Idempotent. Returns `true` if the session was a member. Empty groups
    /// are dropped.
    pub fn leave(&self, group: &GroupName, session_id: SessionId) -> bool {
        let mut groups = self.groups.write();

        let Some(entry) = groups.get_mut(group) else {
            return false;
        };

        let removed = entry.members.remove(&session_id).is_some();
        if removed {
            tracing::debug!(
                group = %group,
                session_id = session_id,
                members = entry.member_count(),
                "Session left group"
            );
        }

        if entry.is_empty() {
            groups.remove(group);
        }

        removed
    }

    /// Snapshot of the current members of a group
    ///
    /// The returned handles are a copy; membership may change while the
    /// caller iterates.
    pub fn members_of(&self, group: &GroupName) -> Vec<SessionHandle> {
        self.groups
            .read()
            .get(group)
            .map(GroupEntry::snapshot)
            .unwrap_or_default()
    }

    /// Remove a session from every group it belongs to
    ///
    /// Returns the number of groups it was removed from.
    pub fn remove_everywhere(&self, session_id: SessionId) -> usize {
        let mut groups = self.groups.write();
        let mut removed = 0;

        groups.retain(|group, entry| {
            if entry.members.remove(&session_id).is_some() {
                removed += 1;
                tracing::debug!(group = %group, session_id = session_id, "Session removed");
            }
            !entry.is_empty()
        });

        removed
    }

    /// Check whether a session is a member of a group
    pub fn is_member(&self, group: &GroupName, session_id: SessionId) -> bool {
        self.groups
            .read()
            .get(group)
            .is_some_and(|entry| entry.contains(session_id))
    }

    /// Groups a session currently belongs to
    pub fn groups_of(&self, session_id: SessionId) -> Vec<GroupName> {
        self.groups
            .read()
            .iter()
            .filter(|(_, entry)| entry.contains(session_id))
            .map(|(group, _)| group.clone())
            .collect()
    }

    /// Number of members in a group
    pub fn member_count(&self, group: &GroupName) -> usize {
        self.groups
            .read()
            .get(group)
            .map_or(0, GroupEntry::member_count)
    }

    /// Number of distinct sessions across all groups
    pub fn session_count(&self) -> usize {
        let groups = self.groups.read();
        let mut ids: Vec<SessionId> = groups
            .values()
            .flat_map(|entry| entry.members.keys().copied())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }

    /// Number of non-empty groups
    pub fn group_count(&self) -> usize {
        self.groups.read().len()
    }

    /// Get group statistics
    pub fn group_stats(&self, group: &GroupName) -> Option<GroupStats> {
        self.groups.read().get(group).map(GroupEntry::stats)
    }

    /// Refuse all further joins
    ///
    /// Returns every current member handle, deduplicated by session id. A
    /// join racing with this call either lands in the returned set or is
    /// refused. Members are not removed; each leaves through its own close.
    pub fn close(&self) -> Vec<SessionHandle> {
        let groups = self.groups.write();
        self.closed.store(true, Ordering::Release);

        let mut seen = HashMap::new();
        for entry in groups.values() {
            for (id, handle) in &entry.members {
                seen.entry(*id).or_insert_with(|| handle.clone());
            }
        }
        seen.into_values().collect()
    }

    /// Whether `close` has run
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Default for GroupRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::FeedConfig;

    fn handle(id: SessionId) -> SessionHandle {
        SessionHandle::new(id, &FeedConfig::default())
    }

    #[test]
    fn test_join_and_members() {
        let registry = GroupRegistry::new();
        let group = GroupName::products();

        assert!(registry.join(&group, handle(1)));
        assert!(registry.join(&group, handle(2)));

        let mut ids: Vec<_> = registry.members_of(&group).iter().map(|h| h.id()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(registry.member_count(&group), 2);
    }

    #[test]
    fn test_join_is_idempotent() {
        let registry = GroupRegistry::new();
        let group = GroupName::products();
        let h = handle(1);

        assert!(registry.join(&group, h.clone()));
        assert!(!registry.join(&group, h));
        assert_eq!(registry.member_count(&group), 1);
    }

    #[test]
    fn test_join_twice_leave_once() {
        let registry = GroupRegistry::new();
        let group = GroupName::products();
        let h = handle(1);

        registry.join(&group, h.clone());
        registry.join(&group, h);
        assert!(registry.leave(&group, 1));

        assert!(registry.members_of(&group).is_empty());
        assert!(!registry.is_member(&group, 1));
    }

    #[test]
    fn test_leave_non_member_is_noop() {
        let registry = GroupRegistry::new();
        let group = GroupName::products();

        assert!(!registry.leave(&group, 42));

        registry.join(&group, handle(1));
        assert!(!registry.leave(&group, 42));
        assert_eq!(registry.member_count(&group), 1);
    }

    #[test]
    fn test_unknown_group_is_empty() {
        let registry = GroupRegistry::new();
        let group = GroupName::new("nobody_here");

        assert!(registry.members_of(&group).is_empty());
        assert_eq!(registry.member_count(&group), 0);
        assert!(registry.group_stats(&group).is_none());
    }

    #[test]
    fn test_empty_group_is_dropped() {
        let registry = GroupRegistry::new();
        let group = GroupName::products();

        registry.join(&group, handle(1));
        assert_eq!(registry.group_count(), 1);

        registry.leave(&group, 1);
        assert_eq!(registry.group_count(), 0);
    }

    #[test]
    fn test_remove_everywhere() {
        let registry = GroupRegistry::new();
        let products = GroupName::products();
        let orders = GroupName::new("orders_updates");
        let h = handle(7);

        registry.join(&products, h.clone());
        registry.join(&orders, h);
        registry.join(&products, handle(8));

        assert_eq!(registry.groups_of(7).len(), 2);
        assert_eq!(registry.remove_everywhere(7), 2);

        assert!(registry.groups_of(7).is_empty());
        assert!(!registry.is_member(&products, 7));
        assert!(registry.is_member(&products, 8));
        assert_eq!(registry.group_count(), 1);

        // Second removal is a no-op
        assert_eq!(registry.remove_everywhere(7), 0);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let registry = GroupRegistry::new();
        let group = GroupName::products();

        registry.join(&group, handle(1));
        let snapshot = registry.members_of(&group);

        registry.leave(&group, 1);
        assert_eq!(snapshot.len(), 1);
        assert!(registry.members_of(&group).is_empty());
    }

    #[test]
    fn test_join_refused_for_closing_session() {
        let registry = GroupRegistry::new();
        let group = GroupName::products();
        let h = handle(3);

        assert!(h.begin_close());
        assert!(!registry.join(&group, h));
        assert!(registry.members_of(&group).is_empty());
    }

    #[test]
    fn test_session_count_dedups() {
        let registry = GroupRegistry::new();
        let h = handle(1);

        registry.join(&GroupName::products(), h.clone());
        registry.join(&GroupName::new("orders_updates"), h);
        registry.join(&GroupName::products(), handle(2));

        assert_eq!(registry.session_count(), 2);
    }

    #[test]
    fn test_close_returns_members_and_refuses_joins() {
        let registry = GroupRegistry::new();
        let h = handle(1);

        registry.join(&GroupName::products(), h.clone());
        registry.join(&GroupName::new("orders_updates"), h);
        registry.join(&GroupName::products(), handle(2));

        let mut ids: Vec<_> = registry.close().iter().map(|h| h.id()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
        assert!(registry.is_closed());

        assert!(!registry.join(&GroupName::products(), handle(3)));
        assert!(!registry.is_member(&GroupName::products(), 3));

        // Existing members still leave normally
        assert_eq!(registry.remove_everywhere(1), 2);
        assert_eq!(registry.session_count(), 1);
    }

    #[test]
    fn test_group_stats() {
        let registry = GroupRegistry::new();
        let group = GroupName::products();

        registry.join(&group, handle(1));
        registry.join(&group, handle(2));

        let stats = registry.group_stats(&group).unwrap();
        assert_eq!(stats.member_count, 2);
    }
}
