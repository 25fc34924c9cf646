//! Hardware session manager
//!
//! Owns the connection state, the authoritative link and the port store.
//! All state transitions happen through `&mut self`, so whoever drives the
//! session (see [`crate::driver`]) serializes transport events, ticks and
//! application calls onto one logical owner.
//!
//! # Connection lifecycle
//!
//! ```text
//! Idle -> Connecting -> Connected -> Disconnected -> Connecting -> ...
//!             |                          |
//!             +-- all candidates fail ---+--> Failed (until retry)
//!
//! close() from any state -> Closing
//! ```
//!
//! Each connection attempt opens every candidate the connector offers.
//! The first candidate to report `Opened` becomes authoritative and the
//! others are closed. Events carry the attempt they were opened for, so
//! links from an abandoned attempt can never take over a newer one.

use serde_json::Value;
use std::sync::Arc;

use hb_core::config::TRIAL_LIMIT;
use hb_core::{
    DeviceKind, DeviceProfile, DeviceRegistry, HbError, PortStateStore, SessionStatus,
    TransportKind,
};
use hb_protocol::{InboundFrame, PortId};

use super::collaborator::Collaborator;
use crate::transport::{AttemptId, Connector, Link, LinkEvent, LinkEventKind};

/// Title used for all hardware notifications
pub const HW_TITLE: &str = "Hardware";

/// Shown when the trial ceiling is reached after the first failure
pub const CONNECT_FAIL_MESSAGE: &str =
    "Could not reach the hardware bridge. Make sure it is running, then retry.";

/// Outcome of device detection on one inbound frame
#[derive(Debug, Clone)]
pub enum Detection {
    /// Frame carried no identification
    Skipped,
    /// Same device as before
    Unchanged,
    /// A new device was selected
    Identified(&'static DeviceProfile),
    /// The announced key has no registered profile
    Unknown(String),
}

/// Session with the hardware-bridge daemon
pub struct HwSession<C> {
    connector: C,
    collaborator: Arc<dyn Collaborator>,
    registry: &'static DeviceRegistry,

    trial_limit: u32,
    trial_count: u32,
    /// Cleared the first time the trial ceiling is hit
    first_connect: bool,
    attempt: AttemptId,
    status: SessionStatus,

    /// Links of the current attempt still racing to open
    candidates: Vec<Box<dyn Link>>,
    pub(super) active: Option<Box<dyn Link>>,

    device_key: Option<String>,
    device: Option<&'static DeviceProfile>,
    pub(super) ports: PortStateStore,
}

impl<C: Connector> HwSession<C> {
    /// Create an idle session
    pub fn new(connector: C, collaborator: Arc<dyn Collaborator>) -> Self {
        Self {
            connector,
            collaborator,
            registry: DeviceRegistry::global(),
            trial_limit: TRIAL_LIMIT,
            trial_count: 0,
            first_connect: true,
            attempt: 0,
            status: SessionStatus::Idle,
            candidates: Vec::new(),
            active: None,
            device_key: None,
            device: None,
            ports: PortStateStore::new(),
        }
    }

    /// Override the number of attempts allowed before retry is required
    pub fn with_trial_limit(mut self, trial_limit: u32) -> Self {
        self.trial_limit = trial_limit.max(1);
        self
    }

    /// Current lifecycle state
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Whether a link is authoritative
    pub fn is_connected(&self) -> bool {
        self.status == SessionStatus::Connected && self.active.is_some()
    }

    /// Kind of the authoritative link
    pub fn active_transport(&self) -> Option<TransportKind> {
        self.active.as_ref().map(|link| link.kind())
    }

    /// Attempts made since the last successful open or retry
    pub fn trial_count(&self) -> u32 {
        self.trial_count
    }

    /// Identifier of the current connection attempt
    pub fn attempt(&self) -> AttemptId {
        self.attempt
    }

    /// Profile of the identified device
    pub fn selected_device(&self) -> Option<&'static DeviceProfile> {
        self.device
    }

    /// Class of the identified device; `Unknown` for unregistered keys
    pub fn device_kind(&self) -> Option<DeviceKind> {
        self.device_key
            .as_ref()
            .map(|_| self.device.map(|d| d.kind).unwrap_or(DeviceKind::Unknown))
    }

    /// Identification key of the last announced device
    pub fn device_key(&self) -> Option<&str> {
        self.device_key.as_deref()
    }

    /// Port state
    pub fn ports(&self) -> &PortStateStore {
        &self.ports
    }

    /// The connector this session opens links with
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Start a connection attempt unless one is running or the ceiling is hit
    ///
    /// Never fails: construction errors are logged and count as a failed
    /// candidate.
    pub fn connect(&mut self) {
        if self.status == SessionStatus::Connected || !self.candidates.is_empty() {
            tracing::trace!("connect() ignored while {}", self.status);
            return;
        }

        if self.trial_count >= self.trial_limit {
            if self.first_connect {
                tracing::debug!("First connection attempt failed, not notifying");
            } else {
                tracing::warn!(
                    "Hardware bridge unreachable after {} attempt(s)",
                    self.trial_count
                );
                self.collaborator
                    .notify_failure(HW_TITLE, CONNECT_FAIL_MESSAGE);
            }
            self.first_connect = false;
            self.status = SessionStatus::Failed;
            return;
        }

        self.trial_count += 1;
        self.attempt += 1;
        self.status = SessionStatus::Connecting;
        tracing::debug!(
            "Connection attempt {} (trial {}/{})",
            self.attempt,
            self.trial_count,
            self.trial_limit
        );

        for kind in self.connector.candidates() {
            match self.connector.open(kind, self.attempt) {
                Ok(link) => self.candidates.push(link),
                Err(e) if e.is_recoverable() => {
                    tracing::debug!("Could not start {} transport: {}", kind, e);
                }
                Err(e) => {
                    tracing::error!("Cannot build {} transport: {}", kind, e);
                }
            }
        }

        self.collaborator.hw_changed();

        if self.candidates.is_empty() {
            self.status = SessionStatus::Disconnected;
            self.connect();
        }
    }

    /// Reset the trial counter and connect again
    pub fn retry(&mut self) {
        tracing::info!("Retrying hardware bridge connection");
        self.trial_count = 0;
        self.connect();
    }

    /// Dispatch a lifecycle event from a link
    pub fn handle_event(&mut self, event: LinkEvent) {
        if event.attempt != self.attempt {
            tracing::trace!(
                "Ignoring {} event from superseded attempt {}",
                event.kind,
                event.attempt
            );
            return;
        }

        match event.event {
            LinkEventKind::Opened => self.on_transport_open(event.kind),
            LinkEventKind::Frame(frame) => {
                if self.active_transport() == Some(event.kind) {
                    self.on_inbound_frame(frame);
                } else {
                    tracing::trace!("Ignoring frame from inactive {} link", event.kind);
                }
            }
            LinkEventKind::Closed => self.on_transport_close(event.kind),
        }
    }

    /// A candidate finished opening; the first one wins
    pub fn on_transport_open(&mut self, kind: TransportKind) {
        if let Some(active) = self.active_transport() {
            tracing::debug!("{} opened after {} won, ignoring", kind, active);
            return;
        }

        let Some(index) = self.candidates.iter().position(|link| link.kind() == kind) else {
            tracing::trace!("Ignoring open from unknown {} link", kind);
            return;
        };

        let link = self.candidates.swap_remove(index);
        for mut loser in self.candidates.drain(..) {
            tracing::debug!("Discarding {} candidate", loser.kind());
            loser.close();
        }

        self.active = Some(link);
        self.status = SessionStatus::Connected;
        self.trial_count = 0;
        tracing::info!("Connected to hardware bridge over {} transport", kind);

        self.collaborator.hw_changed();
        self.collaborator.refresh_active_menu();
    }

    /// Inbound frame from the authoritative link
    pub fn on_inbound_frame(&mut self, frame: InboundFrame) {
        self.identify(&frame);
        self.ports.replace_inputs(frame.port_values());

        if self.device.is_some_and(|d| d.has_monitor()) {
            self.collaborator.update_monitor(self.ports.inputs());
        }
    }

    /// A link closed
    ///
    /// Losing the authoritative link triggers exactly one reconnect. A
    /// candidate of the running attempt closing before it opened is a
    /// failed open; once every candidate has failed, the attempt is over
    /// and `connect()` runs again under the trial ceiling. Anything else
    /// is ignored.
    pub fn on_transport_close(&mut self, kind: TransportKind) {
        if self.active_transport() == Some(kind) {
            if let Some(mut link) = self.active.take() {
                link.close();
            }
            self.status = SessionStatus::Disconnected;
            tracing::info!("Lost {} link to hardware bridge", kind);

            self.collaborator.hw_changed();
            self.connect();
            return;
        }

        if self.active.is_none() {
            if let Some(index) = self.candidates.iter().position(|link| link.kind() == kind) {
                let mut link = self.candidates.swap_remove(index);
                link.close();
                tracing::debug!("{} candidate failed to open", kind);

                if self.candidates.is_empty() {
                    self.status = SessionStatus::Disconnected;
                    self.connect();
                }
                return;
            }
        }

        tracing::trace!("Ignoring close from inactive {} link", kind);
    }

    /// Select a device profile from a frame's identification fields
    pub fn identify(&mut self, frame: &InboundFrame) -> Detection {
        let Some(key) = frame.device_key() else {
            return Detection::Skipped;
        };
        if self.device_key.as_deref() == Some(key.as_str()) {
            return Detection::Unchanged;
        }

        self.device_key = Some(key.clone());

        match self.registry.resolve(&key) {
            Some(profile) => {
                self.device = Some(profile);
                tracing::info!("Identified {} (key {})", profile.display_name, key);

                self.collaborator.hw_changed();
                self.collaborator.notify_success(
                    HW_TITLE,
                    &format!("{} connected", profile.display_name),
                );
                for view in profile.monitor_layout.views() {
                    self.collaborator.construct_monitor_view(profile, *view);
                }
                Detection::Identified(profile)
            }
            None => {
                self.device = None;
                tracing::warn!("{}", HbError::UnknownDevice(key.clone()));

                self.collaborator.hw_changed();
                Detection::Unknown(key)
            }
        }
    }

    /// Hold an output value; sent on every tick until overwritten
    pub fn set_digital_port_value(&mut self, port: impl Into<PortId>, value: impl Into<Value>) {
        self.ports.set_output(port, value);
    }

    /// Analog reading for `port` (`a` + port), 0 while disconnected
    pub fn get_analog_port_value(&self, port: impl Into<PortId>) -> f64 {
        if !self.is_connected() {
            return 0.0;
        }
        self.ports.input(&port.into().analog()).unwrap_or(0.0)
    }

    /// Digital reading for `port`, 0 while disconnected
    ///
    /// Also asks the daemon to keep reporting this port: the port is listed
    /// as readable in the next outbound frame.
    pub fn get_digital_port_value(&mut self, port: impl Into<PortId>) -> f64 {
        if !self.is_connected() {
            return 0.0;
        }
        let port = port.into();
        let value = self.ports.input(&port).unwrap_or(0.0);
        self.ports.mark_readable(port);
        value
    }

    /// Close the session and stop listening to every link it opened
    pub fn close(&mut self) {
        self.attempt += 1;

        for mut link in self.candidates.drain(..) {
            link.close();
        }
        if let Some(mut link) = self.active.take() {
            tracing::info!("Closing {} link", link.kind());
            link.close();
            self.collaborator.hw_changed();
        }

        self.status = SessionStatus::Closing;
    }

    /// Put the identified device's outputs into their resting state
    pub fn zero_all(&mut self) {
        if let Some(profile) = self.device {
            tracing::debug!("Zeroing outputs for {}", profile.display_name);
            profile.zero(&mut self.ports);
        }
    }

    /// Disable the blocks of every registered device class
    pub fn ban_device_blocks(&self) {
        for profile in self.registry.profiles() {
            self.collaborator.ban_block_class(profile.name);
        }
    }
}
