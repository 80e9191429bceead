//! Group entry and statistics types
//!
//! This module defines the per-group membership stored in the registry.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::session::{SessionHandle, SessionId};

/// Membership of a single group
pub struct GroupEntry {
    /// Member sessions keyed by id
    pub(super) members: HashMap<SessionId, SessionHandle>,

    /// When the group was first joined
    pub created_at: Instant,
}

impl GroupEntry {
    pub(super) fn new() -> Self {
        Self {
            members: HashMap::new(),
            created_at: Instant::now(),
        }
    }

    /// Number of member sessions
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, session_id: SessionId) -> bool {
        self.members.contains_key(&session_id)
    }

    /// Copy out the current member handles
    pub(super) fn snapshot(&self) -> Vec<SessionHandle> {
        self.members.values().cloned().collect()
    }

    pub(super) fn stats(&self) -> GroupStats {
        GroupStats {
            member_count: self.members.len(),
            age: self.created_at.elapsed(),
        }
    }
}

/// Statistics for a group
#[derive(Debug, Clone)]
pub struct GroupStats {
    /// Number of member sessions
    pub member_count: usize,
    /// Time since the group was created
    pub age: Duration,
}
