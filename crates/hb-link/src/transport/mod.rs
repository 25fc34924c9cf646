//! Transports to the hardware-bridge daemon
//!
//! Two adapters reach the same daemon on different local ports:
//!
//! - **primary**: raw WebSocket
//! - **fallback**: Socket.IO with named events
//!
//! Each adapter runs as its own task and reports exactly three lifecycle
//! events into a shared channel: `Opened`, `Frame`, and finally `Closed`.
//! The session decides which link is authoritative; adapters never
//! reconnect on their own.

mod connector;
mod fallback;
mod primary;

pub use connector::BridgeConnector;

use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use hb_core::error::TransportError;
use hb_core::TransportKind;
use hb_protocol::InboundFrame;

/// Connection attempt a link belongs to
///
/// Every call that opens candidates starts a new attempt. Events carrying an
/// older attempt come from links the session has already given up on.
pub type AttemptId = u64;

/// Capacity of the shared lifecycle-event channel.
///
/// Frames arrive at the daemon's refresh rate and the session consumes
/// them on every loop iteration, so a small buffer suffices.
pub const LINK_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Capacity of each link's outbound queue.
///
/// Outbound state is re-sent every tick, so a full queue just means the
/// next tick carries the same data.
const OUTBOUND_CHANNEL_CAPACITY: usize = 8;

/// Lifecycle event reported by a link
#[derive(Debug)]
pub struct LinkEvent {
    /// Transport that produced the event
    pub kind: TransportKind,
    /// Attempt the transport was opened for
    pub attempt: AttemptId,
    /// What happened
    pub event: LinkEventKind,
}

/// The three lifecycle events of a link
#[derive(Debug)]
pub enum LinkEventKind {
    /// Link completed its open/handshake
    Opened,
    /// Inbound frame from the daemon
    Frame(InboundFrame),
    /// Link is gone; no further events follow
    Closed,
}

impl LinkEvent {
    /// `Opened` event
    pub fn opened(kind: TransportKind, attempt: AttemptId) -> Self {
        Self {
            kind,
            attempt,
            event: LinkEventKind::Opened,
        }
    }

    /// `Frame` event
    pub fn frame(kind: TransportKind, attempt: AttemptId, frame: InboundFrame) -> Self {
        Self {
            kind,
            attempt,
            event: LinkEventKind::Frame(frame),
        }
    }

    /// `Closed` event
    pub fn closed(kind: TransportKind, attempt: AttemptId) -> Self {
        Self {
            kind,
            attempt,
            event: LinkEventKind::Closed,
        }
    }
}

/// Handle to one physical link
pub trait Link: Send {
    /// Which candidate this link is
    fn kind(&self) -> TransportKind;

    /// Whether the link is open and can take a payload now
    fn is_ready(&self) -> bool;

    /// Hand a serialized outbound frame to the link
    ///
    /// Never queues behind a closed or unopened link: those sends fail with
    /// `TransportError::NotReady` and the payload is dropped.
    fn send(&self, payload: Bytes) -> Result<(), TransportError>;

    /// Notify the peer where the transport supports it, then shut down
    fn close(&mut self);
}

/// Builds transport candidates for a session
pub trait Connector: Send {
    /// Candidates to open on every attempt
    fn candidates(&self) -> Vec<TransportKind>;

    /// Start opening one candidate
    ///
    /// Returns as soon as the link exists; the outcome of the open arrives
    /// later as an `Opened` or `Closed` event for `attempt`.
    fn open(&self, kind: TransportKind, attempt: AttemptId)
        -> Result<Box<dyn Link>, TransportError>;
}

/// Link whose I/O runs in a spawned task
pub(crate) struct TaskLink {
    kind: TransportKind,
    ready: Arc<AtomicBool>,
    outbound: mpsc::Sender<Bytes>,
    cancel: CancellationToken,
}

/// State shared between a [`TaskLink`] and the task driving it
pub(crate) struct LinkTask {
    pub kind: TransportKind,
    pub attempt: AttemptId,
    pub ready: Arc<AtomicBool>,
    pub outbound: mpsc::Receiver<Bytes>,
    pub cancel: CancellationToken,
    pub events: mpsc::Sender<LinkEvent>,
}

impl TaskLink {
    /// Create a link handle and the task half that drives it
    pub(crate) fn pair(
        kind: TransportKind,
        attempt: AttemptId,
        events: mpsc::Sender<LinkEvent>,
    ) -> (Self, LinkTask) {
        let ready = Arc::new(AtomicBool::new(false));
        let cancel = CancellationToken::new();
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);

        let link = Self {
            kind,
            ready: Arc::clone(&ready),
            outbound: outbound_tx,
            cancel: cancel.clone(),
        };
        let task = LinkTask {
            kind,
            attempt,
            ready,
            outbound: outbound_rx,
            cancel,
            events,
        };
        (link, task)
    }
}

impl Link for TaskLink {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire) && !self.cancel.is_cancelled()
    }

    fn send(&self, payload: Bytes) -> Result<(), TransportError> {
        if !self.is_ready() {
            return Err(TransportError::NotReady);
        }
        self.outbound.try_send(payload).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TransportError::Backpressure,
            mpsc::error::TrySendError::Closed(_) => TransportError::Closed,
        })
    }

    fn close(&mut self) {
        self.ready.store(false, Ordering::Release);
        self.cancel.cancel();
    }
}

impl Drop for TaskLink {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl LinkTask {
    /// Mark the link open and report it
    pub(crate) async fn report_opened(&self) -> bool {
        self.ready.store(true, Ordering::Release);
        self.emit(LinkEventKind::Opened).await
    }

    /// Report an inbound frame
    pub(crate) async fn report_frame(&self, frame: InboundFrame) -> bool {
        self.emit(LinkEventKind::Frame(frame)).await
    }

    /// Mark the link closed and report it; always the last event
    pub(crate) async fn report_closed(&self) {
        self.ready.store(false, Ordering::Release);
        self.emit(LinkEventKind::Closed).await;
    }

    /// Returns false once the session has stopped listening
    async fn emit(&self, event: LinkEventKind) -> bool {
        self.events
            .send(LinkEvent {
                kind: self.kind,
                attempt: self.attempt,
                event,
            })
            .await
            .is_ok()
    }
}
