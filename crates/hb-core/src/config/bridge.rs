//! Bridge session configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::serde_utils::{duration_millis, duration_secs};
use crate::error::ConfigError;
use crate::types::TransportKind;

/// Consecutive connection attempts allowed before an explicit retry is needed
pub const TRIAL_LIMIT: u32 = 1;

/// Raw WebSocket endpoint of the daemon
pub const DEFAULT_PRIMARY_URL: &str = "ws://127.0.0.1:23518";

/// Socket.IO endpoint of the daemon
pub const DEFAULT_FALLBACK_URL: &str = "http://127.0.0.1:23517";

/// Configuration for a hardware session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HbConfig {
    /// Raw WebSocket transport
    pub primary: PrimaryConfig,

    /// Socket.IO transport
    pub fallback: FallbackConfig,

    /// Connection attempts before the session gives up until retried
    pub trial_limit: u32,

    /// How long a candidate may take to open before it counts as failed
    #[serde(with = "duration_secs")]
    pub open_timeout: Duration,

    /// Interval between output flushes
    #[serde(with = "duration_millis")]
    pub tick_interval: Duration,
}

impl Default for HbConfig {
    fn default() -> Self {
        Self {
            primary: PrimaryConfig::default(),
            fallback: FallbackConfig::default(),
            trial_limit: TRIAL_LIMIT,
            open_timeout: Duration::from_secs(5),
            tick_interval: Duration::from_millis(50),
        }
    }
}

impl HbConfig {
    /// Transport candidates opened on every connection attempt
    pub fn enabled_transports(&self) -> Vec<TransportKind> {
        let mut kinds = Vec::with_capacity(2);
        if self.primary.enabled {
            kinds.push(TransportKind::Primary);
        }
        if self.fallback.enabled {
            kinds.push(TransportKind::Fallback);
        }
        kinds
    }

    /// Reject configurations the session cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled_transports().is_empty() {
            return Err(ConfigError::Invalid(
                "at least one of primary or fallback must be enabled".to_string(),
            ));
        }
        if self.trial_limit == 0 {
            return Err(ConfigError::Invalid("trial_limit must be at least 1".to_string()));
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError::Invalid("tick_interval must be non-zero".to_string()));
        }
        if self.primary.enabled {
            check_ws_url(&self.primary.url).map_err(ConfigError::Invalid)?;
        }
        if self.fallback.enabled {
            check_socketio_url(&self.fallback.url).map_err(ConfigError::Invalid)?;
        }
        Ok(())
    }
}

/// Raw WebSocket transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimaryConfig {
    /// Open this candidate on connect
    pub enabled: bool,
    /// WebSocket URL of the daemon
    pub url: String,
}

impl Default for PrimaryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: DEFAULT_PRIMARY_URL.to_string(),
        }
    }
}

/// Socket.IO transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Open this candidate on connect
    pub enabled: bool,
    /// Socket.IO URL of the daemon
    pub url: String,
    /// Host cannot hold a WebSocket upgrade; stay on HTTP long-polling
    pub constrained_host: bool,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: DEFAULT_FALLBACK_URL.to_string(),
            constrained_host: false,
        }
    }
}

impl FallbackConfig {
    /// Whether links built from this configuration must stay on long-polling
    pub fn polling_only(&self) -> bool {
        self.constrained_host
    }
}

/// Check that `url` is a `ws://` or `wss://` URL with a host
pub fn check_ws_url(url: &str) -> Result<(), String> {
    let rest = url
        .strip_prefix("ws://")
        .or_else(|| url.strip_prefix("wss://"))
        .ok_or_else(|| format!("primary url must start with ws:// or wss://, got {:?}", url))?;

    if rest.split('/').next().unwrap_or_default().is_empty() {
        return Err(format!("primary url has no host: {:?}", url));
    }
    Ok(())
}

/// Check that `url` is an `http(s)://` or `ws(s)://` URL with a host
pub fn check_socketio_url(url: &str) -> Result<(), String> {
    let rest = ["http://", "https://", "ws://", "wss://"]
        .iter()
        .find_map(|scheme| url.strip_prefix(scheme))
        .ok_or_else(|| format!("fallback url must be http(s):// or ws(s)://, got {:?}", url))?;

    if rest.split('/').next().unwrap_or_default().is_empty() {
        return Err(format!("fallback url has no host: {:?}", url));
    }
    Ok(())
}
