//! hb-core: Core abstractions and configuration for the hardware bridge
//!
//! This crate provides the device registry, the per-port state store,
//! configuration structures and the error taxonomy shared by the
//! session layer and the binary.

pub mod config;
pub mod device;
pub mod error;
pub mod ports;
pub mod types;

pub use device::{DeviceKind, DeviceProfile, DeviceRegistry, MonitorLayout, MonitorView};
pub use error::HbError;
pub use ports::{PortInputs, PortStateStore};
pub use types::{SessionStatus, TransportKind};
