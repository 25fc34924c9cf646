//! Driver task
//!
//! Runs a [`HwSession`] on the Tokio runtime: one task receives link
//! events and fires the tick timer, application calls go through the
//! [`Hardware`] handle. Both sides take the same lock, so every state
//! transition is applied by one owner at a time.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use hb_core::config::HbConfig;
use hb_core::error::TransportError;
use hb_core::{DeviceKind, DeviceProfile, HbError, SessionStatus, TransportKind};
use hb_protocol::PortId;

use crate::session::{Collaborator, HwSession};
use crate::transport::{
    BridgeConnector, Connector, LinkEvent, LINK_EVENT_CHANNEL_CAPACITY,
};

/// Handle to a running hardware session
pub struct Hardware<C: Connector + 'static = BridgeConnector> {
    session: Arc<Mutex<HwSession<C>>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Hardware<BridgeConnector> {
    /// Start a session against the daemon described by `config`
    ///
    /// Must be called from within a Tokio runtime. Does not connect; call
    /// [`Hardware::connect`] for that.
    pub fn spawn(config: &HbConfig, collaborator: Arc<dyn Collaborator>) -> Result<Self, HbError> {
        config.validate()?;
        tokio::runtime::Handle::try_current().map_err(|_| TransportError::NoRuntime)?;

        let (events_tx, events_rx) = mpsc::channel(LINK_EVENT_CHANNEL_CAPACITY);
        let connector = BridgeConnector::new(config, events_tx);
        let session = HwSession::new(connector, collaborator).with_trial_limit(config.trial_limit);

        Ok(Self::spawn_with(session, events_rx, config.tick_interval))
    }
}

impl<C: Connector + 'static> Hardware<C> {
    /// Drive an existing session from `events`
    pub fn spawn_with(
        session: HwSession<C>,
        events: mpsc::Receiver<LinkEvent>,
        tick_interval: Duration,
    ) -> Self {
        let session = Arc::new(Mutex::new(session));
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_driver(
            Arc::clone(&session),
            events,
            tick_interval,
            cancel.clone(),
        ));

        Self {
            session,
            cancel,
            task: Some(task),
        }
    }

    /// Start connecting; see [`HwSession::connect`]
    pub async fn connect(&self) {
        self.session.lock().await.connect();
    }

    /// Reset the trial counter and connect
    pub async fn retry(&self) {
        self.session.lock().await.retry();
    }

    /// Hold an output value
    pub async fn set_digital_port_value(&self, port: impl Into<PortId>, value: impl Into<Value>) {
        self.session
            .lock()
            .await
            .set_digital_port_value(port, value);
    }

    /// Analog reading, 0 while disconnected
    pub async fn get_analog_port_value(&self, port: impl Into<PortId>) -> f64 {
        self.session.lock().await.get_analog_port_value(port)
    }

    /// Digital reading, 0 while disconnected; requests the port on the next tick
    pub async fn get_digital_port_value(&self, port: impl Into<PortId>) -> f64 {
        self.session.lock().await.get_digital_port_value(port)
    }

    /// Stop signal: zero the device's outputs and flush them right away
    pub async fn stop(&self) {
        let mut session = self.session.lock().await;
        session.zero_all();
        if !session.tick() {
            tracing::debug!("Stop flush skipped, no ready link");
        }
    }

    /// Close every link; the session stays closed
    pub async fn close(&self) {
        self.session.lock().await.close();
    }

    /// Disable the blocks of every known device class
    pub async fn ban_device_blocks(&self) {
        self.session.lock().await.ban_device_blocks();
    }

    /// Current lifecycle state
    pub async fn status(&self) -> SessionStatus {
        self.session.lock().await.status()
    }

    /// Whether a link is authoritative
    pub async fn is_connected(&self) -> bool {
        self.session.lock().await.is_connected()
    }

    /// Kind of the authoritative link
    pub async fn active_transport(&self) -> Option<TransportKind> {
        self.session.lock().await.active_transport()
    }

    /// Profile of the identified device
    pub async fn selected_device(&self) -> Option<&'static DeviceProfile> {
        self.session.lock().await.selected_device()
    }

    /// Class of the identified device
    pub async fn device_kind(&self) -> Option<DeviceKind> {
        self.session.lock().await.device_kind()
    }

    /// Stop the driver: zero outputs, flush, close links and wait for the task
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("Driver task failed: {}", e);
            }
        }
    }
}

impl<C: Connector + 'static> Drop for Hardware<C> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Event loop: link events, ticks and shutdown
async fn run_driver<C: Connector>(
    session: Arc<Mutex<HwSession<C>>>,
    mut events: mpsc::Receiver<LinkEvent>,
    tick_interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let mut session = session.lock().await;
                session.zero_all();
                session.tick();
                session.close();
                tracing::debug!("Driver stopped");
                break;
            }

            event = events.recv() => {
                let Some(event) = event else {
                    tracing::debug!("Link event channel closed");
                    break;
                };
                session.lock().await.handle_event(event);
            }

            _ = ticker.tick() => {
                session.lock().await.tick();
            }
        }
    }
}
