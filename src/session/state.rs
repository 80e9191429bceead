//! Session state machine
//!
//! Tracks a feed session from connection to disconnection.

use std::time::{Duration, Instant};

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Transport connected, handshake not yet acknowledged
    Connecting,
    /// Joined its group and receiving pushes
    Open,
    /// Close in progress: leaving groups and releasing the transport
    Closing,
    /// Session closed (terminal)
    Closed,
}

/// Lifecycle state of one session
#[derive(Debug)]
pub struct SessionState {
    /// Current phase
    pub phase: SessionPhase,

    /// Connection start time
    pub connected_at: Instant,

    /// Time the session became open
    pub opened_at: Option<Instant>,

    /// Time the close transition completed
    pub closed_at: Option<Instant>,
}

impl SessionState {
    /// Create a new session state
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Connecting,
            connected_at: Instant::now(),
            opened_at: None,
            closed_at: None,
        }
    }

    /// Move `Connecting → Open`
    ///
    /// Returns `false` if the session has already left `Connecting`.
    pub fn mark_open(&mut self) -> bool {
        if self.phase != SessionPhase::Connecting {
            return false;
        }
        self.phase = SessionPhase::Open;
        self.opened_at = Some(Instant::now());
        true
    }

    /// Start closing the session
    ///
    /// Returns `true` only for the call that performs the transition; any
    /// later call is a no-op.
    pub fn begin_close(&mut self) -> bool {
        match self.phase {
            SessionPhase::Closing | SessionPhase::Closed => false,
            SessionPhase::Connecting | SessionPhase::Open => {
                self.phase = SessionPhase::Closing;
                true
            }
        }
    }

    /// Complete the close transition
    pub fn finish_close(&mut self) {
        self.phase = SessionPhase::Closed;
        self.closed_at = Some(Instant::now());
    }

    /// Check if session is open
    pub fn is_open(&self) -> bool {
        self.phase == SessionPhase::Open
    }

    /// Check if session is closing or closed
    pub fn is_closing(&self) -> bool {
        matches!(self.phase, SessionPhase::Closing | SessionPhase::Closed)
    }

    /// Get session duration
    pub fn duration(&self) -> Duration {
        match self.closed_at {
            Some(closed_at) => closed_at.duration_since(self.connected_at),
            None => self.connected_at.elapsed(),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
