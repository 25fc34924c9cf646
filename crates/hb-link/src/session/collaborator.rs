//! Callbacks into the surrounding application
//!
//! The session never renders anything itself. Notifications, monitor
//! panels, menus and the block palette belong to the host application,
//! which receives them through this trait. Every method has a no-op
//! default so hosts implement only what they display.

use hb_core::{DeviceProfile, MonitorView, PortInputs};

/// Receiver of session notifications
pub trait Collaborator: Send + Sync {
    /// Connection or device state changed; re-query the session
    fn hw_changed(&self) {}

    /// Positive user-facing notification
    fn notify_success(&self, _title: &str, _message: &str) {}

    /// Negative user-facing notification
    fn notify_failure(&self, _title: &str, _message: &str) {}

    /// Build one monitor view for a newly identified device
    fn construct_monitor_view(&self, _profile: &DeviceProfile, _view: MonitorView) {}

    /// Fresh input readings for an open monitor
    fn update_monitor(&self, _inputs: &PortInputs) {}

    /// A link was established; refresh whichever menu is active
    fn refresh_active_menu(&self) {}

    /// Disable the blocks belonging to a device class
    fn ban_block_class(&self, _device_name: &str) {}
}

/// Collaborator that reports everything through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingCollaborator;

impl Collaborator for TracingCollaborator {
    fn hw_changed(&self) {
        tracing::trace!("hwChanged");
    }

    fn notify_success(&self, title: &str, message: &str) {
        tracing::info!("{}: {}", title, message);
    }

    fn notify_failure(&self, title: &str, message: &str) {
        tracing::warn!("{}: {}", title, message);
    }

    fn construct_monitor_view(&self, profile: &DeviceProfile, view: MonitorView) {
        tracing::debug!("Monitor view {:?} for {}", view, profile.display_name);
    }

    fn ban_block_class(&self, device_name: &str) {
        tracing::debug!("Blocks for {} disabled", device_name);
    }
}
