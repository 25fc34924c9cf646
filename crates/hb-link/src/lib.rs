//! hb-link: Session manager for the local hardware-bridge daemon
//!
//! The session races two transports to the daemon, keeps whichever opens
//! first, identifies the attached device from its handshake frames and
//! flushes held port outputs on a fixed tick.

pub mod driver;
pub mod session;
pub mod transport;

pub use driver::Hardware;
pub use session::{Collaborator, Detection, HwSession, TracingCollaborator};
pub use transport::{AttemptId, BridgeConnector, Connector, Link, LinkEvent, LinkEventKind};
