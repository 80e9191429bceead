//! Statistics and metrics for feed sessions and the broadcast channel

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Session-level statistics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Frames handed to the outbox
    pub frames_queued: u64,
    /// Frames written to the transport
    pub frames_sent: u64,
    /// Total payload bytes written
    pub bytes_sent: u64,
    /// Frames discarded by the overflow policy or a failed send
    pub dropped_frames: u64,
    /// Connection duration
    pub duration: Duration,
}

impl SessionStats {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Fraction of queued frames that were dropped, in `0.0..=1.0`
    pub fn drop_ratio(&self) -> f64 {
        if self.frames_queued == 0 {
            0.0
        } else {
            (self.dropped_frames as f64 / self.frames_queued as f64).min(1.0)
        }
    }
}

/// Live counters owned by a session handle
#[derive(Debug, Default)]
pub struct SessionCounters {
    frames_queued: AtomicU64,
    frames_sent: AtomicU64,
    bytes_sent: AtomicU64,
    dropped_frames: AtomicU64,
}

impl SessionCounters {
    pub fn record_queued(&self) {
        self.frames_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sent(&self, bytes: usize) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.record_dropped_many(1);
    }

    /// Count frames the outbox overwrote before the session task read them
    pub fn record_dropped_many(&self, frames: u64) {
        self.dropped_frames.fetch_add(frames, Ordering::Relaxed);
    }

    /// Take a snapshot, stamping it with the given connection duration
    pub fn snapshot(&self, duration: Duration) -> SessionStats {
        SessionStats {
            frames_queued: self.frames_queued.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            dropped_frames: self.dropped_frames.load(Ordering::Relaxed),
            duration,
        }
    }
}

/// Channel-wide statistics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Envelopes accepted by `publish`
    pub envelopes_published: u64,
    /// Payloads enqueued on a session outbox
    pub deliveries: u64,
    /// Payloads that displaced or were refused by a full outbox
    pub overflows: u64,
    /// Members skipped because their session was already closed
    pub stale_members: u64,
}

/// Live counters owned by a channel
#[derive(Debug, Default)]
pub struct ChannelCounters {
    envelopes_published: AtomicU64,
    deliveries: AtomicU64,
    overflows: AtomicU64,
    stale_members: AtomicU64,
}

impl ChannelCounters {
    pub fn record_publish(&self, delivered: usize, overflowed: usize, stale: usize) {
        self.envelopes_published.fetch_add(1, Ordering::Relaxed);
        self.deliveries.fetch_add(delivered as u64, Ordering::Relaxed);
        self.overflows.fetch_add(overflowed as u64, Ordering::Relaxed);
        self.stale_members.fetch_add(stale as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ChannelStats {
        ChannelStats {
            envelopes_published: self.envelopes_published.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            overflows: self.overflows.load(Ordering::Relaxed),
            stale_members: self.stale_members.load(Ordering::Relaxed),
        }
    }
}
