//! Server configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::session::{FeedConfig, OverflowPolicy};

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8000;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent feed connections (0 = unlimited)
    pub max_connections: usize,

    /// Per-session delivery settings
    pub feed: FeedConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            max_connections: 0, // Unlimited
            feed: FeedConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Replace the per-session settings
    pub fn feed(mut self, feed: FeedConfig) -> Self {
        self.feed = feed;
        self
    }

    /// Set outbox capacity
    pub fn outbox_capacity(mut self, capacity: usize) -> Self {
        self.feed = self.feed.outbox_capacity(capacity);
        self
    }

    /// Set the outbox overflow policy
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.feed = self.feed.overflow_policy(policy);
        self
    }

    /// Set the per-frame send timeout
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.feed = self.feed.send_timeout(timeout);
        self
    }
}
