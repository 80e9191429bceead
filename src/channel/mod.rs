//! Broadcast channel
//!
//! The pub/sub backbone between publishers and subscribed sessions.
//! `publish` returns once the envelope has been handed off to every current
//! member's outbox; it never waits for a client to receive it.

pub mod envelope;
pub mod local;

use thiserror::Error;

pub use envelope::{ChangeEnvelope, ChangeKind};
pub use local::LocalChannel;

/// Publish failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PublishError {
    /// The channel has been shut down
    #[error("broadcast channel closed")]
    ChannelClosed,

    /// The backbone could not be reached
    #[error("broadcast channel unavailable: {0}")]
    Unavailable(String),
}

/// Hand-off outcome of a single publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReceipt {
    /// Members of the group at publish time
    pub recipients: usize,
    /// Members that had the payload enqueued
    pub delivered: usize,
    /// Members whose outbox was full (oldest dropped, or disconnected)
    pub overflowed: usize,
    /// Members that had already closed
    pub stale: usize,
}

/// Fan-out backbone
///
/// Implementations must deliver envelopes for the same group to each
/// subscriber in publish order, and must isolate subscribers from each
/// other's failures.
pub trait BroadcastChannel: Send + Sync {
    /// Fan `envelope` out to every current member of its group
    fn publish(&self, envelope: ChangeEnvelope) -> Result<PublishReceipt, PublishError>;
}
