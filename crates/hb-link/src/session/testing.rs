//! In-memory connector and collaborator for session tests

use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use hb_core::error::TransportError;
use hb_core::{DeviceKind, DeviceProfile, MonitorView, PortInputs, TransportKind};
use hb_protocol::{InboundFrame, OutboundFrame};

use super::{Collaborator, HwSession};
use crate::transport::{AttemptId, Connector, Link, LinkEvent};

/// Observable state of one mock link
#[derive(Default)]
pub(crate) struct LinkState {
    pub ready: AtomicBool,
    pub closed: AtomicBool,
    /// Ready, but every send fails with backpressure
    pub reject_sends: AtomicBool,
    pub sent: Mutex<Vec<Bytes>>,
}

impl LinkState {
    /// Outbound frames handed to this link
    pub fn frames(&self) -> Vec<OutboundFrame> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|payload| OutboundFrame::parse(payload).unwrap())
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct MockLink {
    kind: TransportKind,
    state: Arc<LinkState>,
}

impl Link for MockLink {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    fn is_ready(&self) -> bool {
        self.state.ready.load(Ordering::SeqCst) && !self.state.is_closed()
    }

    fn send(&self, payload: Bytes) -> Result<(), TransportError> {
        if !self.is_ready() {
            return Err(TransportError::NotReady);
        }
        if self.state.reject_sends.load(Ordering::SeqCst) {
            return Err(TransportError::Backpressure);
        }
        self.state.sent.lock().unwrap().push(payload);
        Ok(())
    }

    fn close(&mut self) {
        self.state.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct ConnectorState {
    opened: Vec<(TransportKind, AttemptId, Arc<LinkState>)>,
    refuse: bool,
}

/// Connector whose links are driven by the test
#[derive(Clone)]
pub(crate) struct MockConnector {
    kinds: Vec<TransportKind>,
    state: Arc<Mutex<ConnectorState>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::with_candidates(vec![TransportKind::Primary, TransportKind::Fallback])
    }

    pub fn with_candidates(kinds: Vec<TransportKind>) -> Self {
        Self {
            kinds,
            state: Arc::new(Mutex::new(ConnectorState::default())),
        }
    }

    /// Make every later construction fail
    pub fn refuse(&self) {
        self.state.lock().unwrap().refuse = true;
    }

    /// Number of links constructed so far
    pub fn constructed(&self) -> usize {
        self.state.lock().unwrap().opened.len()
    }

    /// The most recent link of a kind
    pub fn link(&self, kind: TransportKind) -> Arc<LinkState> {
        self.state
            .lock()
            .unwrap()
            .opened
            .iter()
            .rev()
            .find(|(k, _, _)| *k == kind)
            .map(|(_, _, state)| Arc::clone(state))
            .unwrap()
    }
}

impl Connector for MockConnector {
    fn candidates(&self) -> Vec<TransportKind> {
        self.kinds.clone()
    }

    fn open(
        &self,
        kind: TransportKind,
        attempt: AttemptId,
    ) -> Result<Box<dyn Link>, TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.refuse {
            return Err(TransportError::Refused(kind.to_string()));
        }
        let link_state = Arc::new(LinkState::default());
        state.opened.push((kind, attempt, Arc::clone(&link_state)));
        Ok(Box::new(MockLink {
            kind,
            state: link_state,
        }))
    }
}

/// One recorded collaborator call
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    HwChanged,
    Success(String),
    Failure(String),
    Monitor(DeviceKind, MonitorView),
    UpdateMonitor(usize),
    RefreshMenu,
    Ban(String),
}

/// Collaborator that records every call
#[derive(Default)]
pub(crate) struct RecordingCollaborator {
    calls: Mutex<Vec<Call>>,
}

impl RecordingCollaborator {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn push(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Collaborator for RecordingCollaborator {
    fn hw_changed(&self) {
        self.push(Call::HwChanged);
    }

    fn notify_success(&self, _title: &str, message: &str) {
        self.push(Call::Success(message.to_string()));
    }

    fn notify_failure(&self, _title: &str, message: &str) {
        self.push(Call::Failure(message.to_string()));
    }

    fn construct_monitor_view(&self, profile: &DeviceProfile, view: MonitorView) {
        self.push(Call::Monitor(profile.kind, view));
    }

    fn update_monitor(&self, inputs: &PortInputs) {
        self.push(Call::UpdateMonitor(inputs.len()));
    }

    fn refresh_active_menu(&self) {
        self.push(Call::RefreshMenu);
    }

    fn ban_block_class(&self, device_name: &str) {
        self.push(Call::Ban(device_name.to_string()));
    }
}

/// Session wired to a mock connector and a recording collaborator
pub(crate) fn session() -> (
    HwSession<MockConnector>,
    MockConnector,
    Arc<RecordingCollaborator>,
) {
    let connector = MockConnector::new();
    let collaborator = Arc::new(RecordingCollaborator::default());
    let session = HwSession::new(connector.clone(), collaborator.clone());
    (session, connector, collaborator)
}

/// Mark the current attempt's link of `kind` open and deliver `Opened`
pub(crate) fn open(
    session: &mut HwSession<MockConnector>,
    connector: &MockConnector,
    kind: TransportKind,
) {
    connector.link(kind).ready.store(true, Ordering::SeqCst);
    session.handle_event(LinkEvent::opened(kind, session.attempt()));
}

/// Mark the link of `kind` closed and deliver `Closed`
pub(crate) fn close(
    session: &mut HwSession<MockConnector>,
    connector: &MockConnector,
    kind: TransportKind,
) {
    connector.link(kind).ready.store(false, Ordering::SeqCst);
    session.handle_event(LinkEvent::closed(kind, session.attempt()));
}

/// Deliver an inbound frame parsed from JSON
pub(crate) fn frame(session: &mut HwSession<MockConnector>, kind: TransportKind, json: &str) {
    let frame = InboundFrame::parse(json.as_bytes()).unwrap();
    session.handle_event(LinkEvent::frame(kind, session.attempt(), frame));
}
