//! Connector that spawns real transport tasks

use std::time::Duration;

use tokio::sync::mpsc;

use hb_core::config::{check_socketio_url, check_ws_url, HbConfig};
use hb_core::error::TransportError;
use hb_core::TransportKind;

use super::{fallback, primary, AttemptId, Connector, Link, LinkEvent, TaskLink};

/// Opens WebSocket and Socket.IO links to the daemon
pub struct BridgeConnector {
    candidates: Vec<TransportKind>,
    primary_url: String,
    fallback_url: String,
    polling_only: bool,
    open_timeout: Duration,
    events: mpsc::Sender<LinkEvent>,
}

impl BridgeConnector {
    /// Create a connector reporting into `events`
    ///
    /// Candidates and the fallback transport type are decided here, once.
    pub fn new(config: &HbConfig, events: mpsc::Sender<LinkEvent>) -> Self {
        Self {
            candidates: config.enabled_transports(),
            primary_url: config.primary.url.clone(),
            fallback_url: config.fallback.url.clone(),
            polling_only: config.fallback.polling_only(),
            open_timeout: config.open_timeout,
            events,
        }
    }
}

impl Connector for BridgeConnector {
    fn candidates(&self) -> Vec<TransportKind> {
        self.candidates.clone()
    }

    fn open(
        &self,
        kind: TransportKind,
        attempt: AttemptId,
    ) -> Result<Box<dyn Link>, TransportError> {
        if !self.candidates.contains(&kind) {
            return Err(TransportError::InvalidEndpoint(format!("{} disabled", kind)));
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| TransportError::NoRuntime)?;

        let (link, task) = TaskLink::pair(kind, attempt, self.events.clone());
        match kind {
            TransportKind::Primary => {
                check_ws_url(&self.primary_url).map_err(TransportError::InvalidEndpoint)?;
                runtime.spawn(primary::run(self.primary_url.clone(), self.open_timeout, task));
            }
            TransportKind::Fallback => {
                check_socketio_url(&self.fallback_url).map_err(TransportError::InvalidEndpoint)?;
                runtime.spawn(fallback::run(
                    self.fallback_url.clone(),
                    self.polling_only,
                    self.open_timeout,
                    task,
                ));
            }
        }
        Ok(Box::new(link))
    }
}
