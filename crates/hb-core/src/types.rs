//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which of the two transport candidates a link belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Raw WebSocket to the daemon
    Primary,
    /// Managed socket to the daemon
    Fallback,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Primary => write!(f, "primary"),
            TransportKind::Fallback => write!(f, "fallback"),
        }
    }
}

/// Lifecycle state of a hardware session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Nothing attempted yet
    Idle,
    /// Candidates are racing to open
    Connecting,
    /// One transport is authoritative
    Connected,
    /// The authoritative transport went away
    Disconnected,
    /// Trial ceiling reached; waits for an explicit retry
    Failed,
    /// Closed by the application
    Closing,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Idle => write!(f, "idle"),
            SessionStatus::Connecting => write!(f, "connecting"),
            SessionStatus::Connected => write!(f, "connected"),
            SessionStatus::Disconnected => write!(f, "disconnected"),
            SessionStatus::Failed => write!(f, "failed"),
            SessionStatus::Closing => write!(f, "closing"),
        }
    }
}
