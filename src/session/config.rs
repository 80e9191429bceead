//! Per-session delivery configuration

use std::time::Duration;

/// Default outbound queue depth per session
pub const DEFAULT_OUTBOX_CAPACITY: usize = 256;

/// Largest accepted outbound queue depth per session
pub const MAX_OUTBOX_CAPACITY: usize = 1 << 16;

/// Default bound on a single transport write
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// What to do when a session's outbound queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Overwrite the oldest queued frame to make room
    #[default]
    DropOldest,
    /// Refuse the frame and close the session
    Disconnect,
}

/// Delivery options applied to every feed session
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Maximum frames buffered per session, rounded up to a power of two
    pub outbox_capacity: usize,

    /// Behaviour when the outbox is full
    pub overflow_policy: OverflowPolicy,

    /// Maximum time a single frame write may take before the session closes
    pub send_timeout: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
            overflow_policy: OverflowPolicy::DropOldest,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

impl FeedConfig {
    /// Set outbox capacity (1 to [`MAX_OUTBOX_CAPACITY`])
    pub fn outbox_capacity(mut self, capacity: usize) -> Self {
        self.outbox_capacity = capacity.clamp(1, MAX_OUTBOX_CAPACITY);
        self
    }

    /// Set overflow policy
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    /// Set send timeout
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }
}
