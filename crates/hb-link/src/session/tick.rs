//! Periodic output flush

use super::HwSession;
use crate::transport::Connector;

impl<C: Connector> HwSession<C> {
    /// Send held outputs and readable-port requests over the active link
    ///
    /// Returns whether a frame was handed to the link. Without a ready link
    /// nothing happens. On a ready link the readable marks are consumed by
    /// the attempt, whether or not the send went through.
    pub fn tick(&mut self) -> bool {
        let Some(link) = self.active.as_ref() else {
            return false;
        };
        if !link.is_ready() {
            return false;
        }

        let sent = match self.ports.outbound_frame().to_bytes() {
            Ok(payload) => match link.send(payload) {
                Ok(()) => true,
                Err(e) => {
                    tracing::trace!("Dropping tick on {} link: {}", link.kind(), e);
                    false
                }
            },
            Err(e) => {
                tracing::error!("Failed to encode outbound frame: {}", e);
                false
            }
        };

        self.ports.clear_readable();
        sent
    }
}
