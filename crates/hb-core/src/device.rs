//! Device registry
//!
//! The daemon identifies the attached hardware with two handshake fields,
//! `company` and `model`. Their concatenation is the registry key:
//!
//! | key  | device       | monitor |
//! |------|--------------|---------|
//! | `11` | Arduino      | list    |
//! | `12` | Sensor Board | list    |
//! | `24` | Hamster      | both    |
//! | `25` | Albert       | both    |
//! | `31` | Bitbrick     | general |
//! | `51` | Neobot       | general |
//!
//! The table is built once per process and never mutated.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use crate::ports::PortStateStore;

/// Resets a device's outputs to a safe resting state
pub type ZeroFn = fn(&mut PortStateStore);

/// Known device classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceKind {
    Arduino,
    SensorBoard,
    Hamster,
    Albert,
    Bitbrick,
    Neobot,
    /// Announced by the daemon but absent from the registry
    Unknown,
}

/// Which monitor layouts a device wants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorLayout {
    None,
    List,
    General,
    Both,
}

/// A single monitor view the collaborator is asked to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorView {
    List,
    General,
}

impl MonitorLayout {
    /// Views to construct, in order
    pub fn views(self) -> &'static [MonitorView] {
        match self {
            MonitorLayout::None => &[],
            MonitorLayout::List => &[MonitorView::List],
            MonitorLayout::General => &[MonitorView::General],
            MonitorLayout::Both => &[MonitorView::List, MonitorView::General],
        }
    }
}

/// Immutable descriptor of a device class
pub struct DeviceProfile {
    /// Device class
    pub kind: DeviceKind,
    /// Identification key (`company ++ model`)
    pub key: &'static str,
    /// Block-class name used by the block palette
    pub name: &'static str,
    /// Human-readable name
    pub display_name: &'static str,
    /// Monitor views to request on identification
    pub monitor_layout: MonitorLayout,
    zero: ZeroFn,
}

impl DeviceProfile {
    /// Whether the device has a monitor panel
    pub fn has_monitor(&self) -> bool {
        self.monitor_layout != MonitorLayout::None
    }

    /// Reset held outputs for this device
    pub fn zero(&self, store: &mut PortStateStore) {
        (self.zero)(store)
    }
}

impl fmt::Debug for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceProfile")
            .field("kind", &self.kind)
            .field("key", &self.key)
            .field("name", &self.name)
            .field("monitor_layout", &self.monitor_layout)
            .finish()
    }
}

/// Digital pins exposed by the Arduino-compatible boards
const DIGITAL_PINS: std::ops::RangeInclusive<u32> = 0..=13;

const HAMSTER_OUTPUTS: &[&str] = &[
    "leftWheel",
    "rightWheel",
    "buzzer",
    "outputA",
    "outputB",
    "leftLed",
    "rightLed",
    "note",
    "lineTracerMode",
    "lineTracerModeId",
    "lineTracerSpeed",
    "ioModeA",
    "ioModeB",
];

const ALBERT_OUTPUTS: &[&str] = &[
    "leftWheel",
    "rightWheel",
    "buzzer",
    "leftEye",
    "rightEye",
    "note",
    "bodyLed",
    "frontLed",
];

const BITBRICK_OUTPUTS: &[&str] = &["LEDR", "LEDG", "LEDB", "buzzer", "dc1", "dc2", "dc3", "dc4"];

const NEOBOT_OUTPUTS: &[&str] = &["LMOT", "RMOT", "CBX", "SND", "OUT1", "OUT2", "OUT3"];

fn zero_digital_pins(store: &mut PortStateStore) {
    store.clear_readable();
    for pin in DIGITAL_PINS {
        store.set_output(pin, 0);
    }
}

fn zero_named(store: &mut PortStateStore, outputs: &[&str]) {
    for output in outputs {
        store.set_output(*output, 0);
    }
}

fn zero_hamster(store: &mut PortStateStore) {
    zero_named(store, HAMSTER_OUTPUTS)
}

fn zero_albert(store: &mut PortStateStore) {
    zero_named(store, ALBERT_OUTPUTS)
}

fn zero_bitbrick(store: &mut PortStateStore) {
    zero_named(store, BITBRICK_OUTPUTS)
}

fn zero_neobot(store: &mut PortStateStore) {
    zero_named(store, NEOBOT_OUTPUTS)
}

static BUILTIN_PROFILES: [DeviceProfile; 6] = [
    DeviceProfile {
        kind: DeviceKind::Arduino,
        key: "11",
        name: "arduino",
        display_name: "Arduino",
        monitor_layout: MonitorLayout::List,
        zero: zero_digital_pins,
    },
    DeviceProfile {
        kind: DeviceKind::SensorBoard,
        key: "12",
        name: "sensorBoard",
        display_name: "Sensor Board",
        monitor_layout: MonitorLayout::List,
        zero: zero_digital_pins,
    },
    DeviceProfile {
        kind: DeviceKind::Hamster,
        key: "24",
        name: "hamster",
        display_name: "Hamster",
        monitor_layout: MonitorLayout::Both,
        zero: zero_hamster,
    },
    DeviceProfile {
        kind: DeviceKind::Albert,
        key: "25",
        name: "albert",
        display_name: "Albert",
        monitor_layout: MonitorLayout::Both,
        zero: zero_albert,
    },
    DeviceProfile {
        kind: DeviceKind::Bitbrick,
        key: "31",
        name: "bitbrick",
        display_name: "Bitbrick",
        monitor_layout: MonitorLayout::General,
        zero: zero_bitbrick,
    },
    DeviceProfile {
        kind: DeviceKind::Neobot,
        key: "51",
        name: "neobot",
        display_name: "Neobot",
        monitor_layout: MonitorLayout::General,
        zero: zero_neobot,
    },
];

/// Lookup table from identification key to device profile
#[derive(Debug)]
pub struct DeviceRegistry {
    profiles: HashMap<&'static str, &'static DeviceProfile>,
}

impl DeviceRegistry {
    fn builtin() -> Self {
        Self {
            profiles: BUILTIN_PROFILES.iter().map(|p| (p.key, p)).collect(),
        }
    }

    /// The process-wide registry
    pub fn global() -> &'static DeviceRegistry {
        static REGISTRY: OnceLock<DeviceRegistry> = OnceLock::new();
        REGISTRY.get_or_init(Self::builtin)
    }

    /// Resolve a profile by identification key
    pub fn resolve(&self, key: &str) -> Option<&'static DeviceProfile> {
        self.profiles.get(key).copied()
    }

    /// Device class for a key, `Unknown` when unregistered
    pub fn kind_of(&self, key: &str) -> DeviceKind {
        self.resolve(key)
            .map(|p| p.kind)
            .unwrap_or(DeviceKind::Unknown)
    }

    /// All profiles, ordered by key
    pub fn profiles(&self) -> Vec<&'static DeviceProfile> {
        let mut profiles: Vec<_> = self.profiles.values().copied().collect();
        profiles.sort_by_key(|p| p.key);
        profiles
    }

    /// Number of registered profiles
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hb_protocol::PortId;
    use serde_json::json;

    #[test]
    fn test_resolve_known_keys() {
        let registry = DeviceRegistry::global();
        assert_eq!(registry.len(), 6);
        assert_eq!(registry.resolve("24").map(|p| p.kind), Some(DeviceKind::Hamster));
        assert_eq!(registry.kind_of("11"), DeviceKind::Arduino);
    }

    #[test]
    fn test_unknown_key() {
        let registry = DeviceRegistry::global();
        assert!(registry.resolve("99").is_none());
        assert_eq!(registry.kind_of("99"), DeviceKind::Unknown);
    }

    #[test]
    fn test_profiles_sorted_by_key() {
        let keys: Vec<_> = DeviceRegistry::global()
            .profiles()
            .iter()
            .map(|p| p.key)
            .collect();
        assert_eq!(keys, vec!["11", "12", "24", "25", "31", "51"]);
    }

    #[test]
    fn test_monitor_views() {
        assert_eq!(
            MonitorLayout::Both.views(),
            &[MonitorView::List, MonitorView::General]
        );
        assert!(MonitorLayout::None.views().is_empty());
    }

    #[test]
    fn test_arduino_zero_drives_pins_low() {
        let mut store = PortStateStore::new();
        store.set_output(13u32, 1);
        store.mark_readable(PortId::from(2u32));

        let profile = DeviceRegistry::global().resolve("11").unwrap();
        profile.zero(&mut store);

        assert_eq!(store.output(&PortId::from(13u32)), Some(&json!(0)));
        assert_eq!(store.outputs().len(), 14);
        assert!(store.readable_ports().is_empty());
    }

    #[test]
    fn test_hamster_zero_stops_wheels() {
        let mut store = PortStateStore::new();
        store.set_output("leftWheel", 50);

        DeviceRegistry::global().resolve("24").unwrap().zero(&mut store);

        assert_eq!(store.output(&PortId::from("leftWheel")), Some(&json!(0)));
        assert_eq!(store.output(&PortId::from("rightWheel")), Some(&json!(0)));
    }
}
