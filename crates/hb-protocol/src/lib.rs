//! hb-protocol: Wire format for the hardware bridge
//!
//! This crate defines the JSON frames exchanged with the local
//! hardware-bridge daemon. Both transports carry the same frames; only the
//! envelope differs (a WebSocket text message, or the argument of a
//! Socket.IO `message` event).

pub mod error;
pub mod message;
pub mod port;

pub use error::ProtocolError;
pub use message::{InboundFrame, OutboundFrame, READABLE_PORTS_FIELD};
pub use port::PortId;
