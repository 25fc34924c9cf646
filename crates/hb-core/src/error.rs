//! Core error types for the hardware bridge

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Top-level error type for the hardware bridge
#[derive(Error, Debug)]
pub enum HbError {
    /// Transport error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The daemon announced a device key with no registered profile
    #[error("Unknown device: {0}")]
    UnknownDevice(String),
}

/// Transport-related errors
#[derive(Error, Debug)]
pub enum TransportError {
    /// Endpoint refused the connection
    #[error("Connection refused: {0}")]
    Refused(String),

    /// Open attempt did not complete in time
    #[error("Open timed out after {0:?}")]
    Timeout(Duration),

    /// Handshake with the endpoint failed
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// Link is not open yet, or no longer open
    #[error("Link not ready")]
    NotReady,

    /// Outbound queue is full
    #[error("Outbound queue full")]
    Backpressure,

    /// Link has shut down
    #[error("Link closed")]
    Closed,

    /// Endpoint configuration cannot be used
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// No async runtime to drive the link
    #[error("No async runtime available")]
    NoRuntime,

    /// Socket-level failure while opening
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Whether a later attempt could succeed without changing anything
    ///
    /// Invalid endpoints and a missing runtime are programming or
    /// configuration mistakes; everything else is a condition of the
    /// daemon or the network.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidEndpoint(_) | Self::NoRuntime)
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(TransportError::Refused("127.0.0.1:23518".into()).is_recoverable());
        assert!(TransportError::Timeout(Duration::from_secs(5)).is_recoverable());
        assert!(TransportError::Handshake("bad status".into()).is_recoverable());
        assert!(!TransportError::InvalidEndpoint("http://x".into()).is_recoverable());
        assert!(!TransportError::NoRuntime.is_recoverable());
    }
}
