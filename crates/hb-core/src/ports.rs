//! Per-port input and output state

use hb_protocol::{OutboundFrame, PortId};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Last-known input readings keyed by port
pub type PortInputs = HashMap<PortId, f64>;

/// Input readings from the daemon and outputs waiting to be sent to it
///
/// Inputs are replaced wholesale by every inbound frame. Outputs are held
/// state: they stay in the store and go out on every tick until the
/// application overwrites them. The readable-port list is one-shot and is
/// emptied after each transmission.
#[derive(Debug, Default)]
pub struct PortStateStore {
    inputs: PortInputs,
    pending: BTreeMap<PortId, Value>,
    readable: Vec<PortId>,
}

impl PortStateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all input readings with those of a new frame
    pub fn replace_inputs(&mut self, inputs: PortInputs) {
        self.inputs = inputs;
    }

    /// All current input readings
    pub fn inputs(&self) -> &PortInputs {
        &self.inputs
    }

    /// Reading for one port, if the last frame carried it
    pub fn input(&self, port: &PortId) -> Option<f64> {
        self.inputs.get(port).copied()
    }

    /// Hold an output value for the given port
    pub fn set_output(&mut self, port: impl Into<PortId>, value: impl Into<Value>) {
        self.pending.insert(port.into(), value.into());
    }

    /// Currently held output for a port
    pub fn output(&self, port: &PortId) -> Option<&Value> {
        self.pending.get(port)
    }

    /// All held outputs
    pub fn outputs(&self) -> &BTreeMap<PortId, Value> {
        &self.pending
    }

    /// Ask for `port` to be refreshed in the next inbound frame
    pub fn mark_readable(&mut self, port: PortId) {
        if !self.readable.contains(&port) {
            self.readable.push(port);
        }
    }

    /// Ports marked readable since the last transmission
    pub fn readable_ports(&self) -> &[PortId] {
        &self.readable
    }

    /// Forget the readable-port marks
    pub fn clear_readable(&mut self) {
        self.readable.clear();
    }

    /// Snapshot of the outbound state for one tick
    pub fn outbound_frame(&self) -> OutboundFrame {
        OutboundFrame {
            outputs: self.pending.clone(),
            readable_ports: self.readable.clone(),
        }
    }
}
