//! Delivery statistics

pub mod metrics;

pub use metrics::{ChannelCounters, ChannelStats, SessionCounters, SessionStats};
