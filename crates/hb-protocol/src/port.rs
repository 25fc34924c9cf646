//! Port identifiers
//!
//! Ports are opaque strings on the wire. Digital ports are plain numbers
//! (`"3"`), analog ports carry an `a` prefix (`"a3"`), and device-specific
//! outputs use names such as `"leftWheel"`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Prefix the daemon uses for analog input ports
pub const ANALOG_PREFIX: &str = "a";

/// Identifier of a single device port
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortId(String);

impl PortId {
    /// Create a port identifier from any string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The analog input key for this port (`3` -> `a3`)
    pub fn analog(&self) -> Self {
        Self(format!("{}{}", ANALOG_PREFIX, self.0))
    }

    /// Get the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value of the identifier, if it is a plain digital port number
    ///
    /// Only canonical spellings count: `"3"` is numeric, `"03"` and `"+3"`
    /// stay strings so they survive a round trip unchanged.
    pub fn as_number(&self) -> Option<u64> {
        let n: u64 = self.0.parse().ok()?;
        (n.to_string() == self.0).then_some(n)
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PortId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PortId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<&PortId> for PortId {
    fn from(p: &PortId) -> Self {
        p.clone()
    }
}

macro_rules! port_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for PortId {
                fn from(n: $t) -> Self {
                    Self(n.to_string())
                }
            }
        )*
    };
}

port_from_int!(u8, u16, u32, u64, usize, i32, i64);

// Numeric ports go out as JSON numbers so the daemon sees the same
// `readablePorts` entries it would from a browser client.
impl Serialize for PortId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.as_number() {
            Some(n) => serializer.serialize_u64(n),
            None => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for PortId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => Ok(Self(s)),
            serde_json::Value::Number(n) => Ok(Self(n.to_string())),
            other => Err(serde::de::Error::custom(format!(
                "invalid port identifier: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analog_prefix() {
        assert_eq!(PortId::from(3u32).analog().as_str(), "a3");
    }

    #[test]
    fn test_numeric_ports_serialize_as_numbers() {
        let ports = vec![PortId::from(3u32), PortId::from("leftWheel")];
        let json = serde_json::to_string(&ports).unwrap();
        assert_eq!(json, r#"[3,"leftWheel"]"#);
    }

    #[test]
    fn test_non_canonical_numbers_stay_strings() {
        assert_eq!(PortId::from("03").as_number(), None);
        assert_eq!(PortId::from("+3").as_number(), None);
        assert_eq!(PortId::from("3").as_number(), Some(3));

        let ports = vec![PortId::from("03"), PortId::from("+3")];
        let json = serde_json::to_string(&ports).unwrap();
        assert_eq!(json, r#"["03","+3"]"#);

        let back: Vec<PortId> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ports);
    }

    #[test]
    fn test_deserialize_number_or_string() {
        let ports: Vec<PortId> = serde_json::from_str(r#"[7,"a2"]"#).unwrap();
        assert_eq!(ports, vec![PortId::from(7u32), PortId::from("a2")]);
    }
}
