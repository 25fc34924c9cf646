//! Frames exchanged with the hardware-bridge daemon
//!
//! Both directions carry a single JSON object.
//!
//! Inbound (daemon -> client): optional `company` and `model` fields that
//! identify the attached device, plus an open set of port readings:
//!
//! ```text
//! {"company": 1, "model": 1, "0": 1, "3": 0, "a0": 512}
//! ```
//!
//! Outbound (client -> daemon): every held output value plus the list of
//! ports the client wants refreshed in the next inbound frame:
//!
//! ```text
//! {"5": 1, "9": 255, "readablePorts": [3]}
//! ```

use bytes::Bytes;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

use crate::error::ProtocolError;
use crate::port::PortId;

/// Field name of the readable-port list in outbound frames
pub const READABLE_PORTS_FIELD: &str = "readablePorts";

/// A frame received from the daemon
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InboundFrame {
    /// Vendor half of the device identification key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<Value>,

    /// Model half of the device identification key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<Value>,

    /// Everything else: port identifier -> reading
    #[serde(flatten)]
    pub ports: Map<String, Value>,
}

impl InboundFrame {
    /// Parse a frame from raw JSON bytes
    pub fn parse(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Build a frame from an already-decoded JSON value
    ///
    /// A string is treated as serialized JSON, which is how the daemon
    /// sends frames as event arguments.
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::String(text) => Self::parse(text.as_bytes()),
            Value::Object(_) => Ok(serde_json::from_value(value)?),
            other => Err(ProtocolError::NotAnObject(json_kind(&other))),
        }
    }

    /// Device identification key (`company ++ model`)
    ///
    /// Returns `None` when the frame carries no company field, meaning the
    /// frame does not announce a device.
    pub fn device_key(&self) -> Option<String> {
        let company = self.company.as_ref()?;
        let model = self.model.as_ref().map(key_part).unwrap_or_default();
        Some(format!("{}{}", key_part(company), model))
    }

    /// Numeric port readings carried by this frame
    ///
    /// Booleans read as 1/0; non-numeric entries are skipped.
    pub fn port_values(&self) -> HashMap<PortId, f64> {
        self.ports
            .iter()
            .filter_map(|(port, value)| {
                let reading = match value {
                    Value::Number(n) => n.as_f64()?,
                    Value::Bool(b) => f64::from(u8::from(*b)),
                    _ => return None,
                };
                Some((PortId::from(port.as_str()), reading))
            })
            .collect()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn key_part(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// A frame sent to the daemon on every tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutboundFrame {
    /// Held output values, re-sent until overwritten
    pub outputs: BTreeMap<PortId, Value>,
    /// Ports to include in the next inbound refresh
    pub readable_ports: Vec<PortId>,
}

impl OutboundFrame {
    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> Result<Bytes, ProtocolError> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    /// Parse an outbound frame (used by daemon-side tooling and tests)
    pub fn parse(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut object = match serde_json::from_slice::<Value>(bytes)? {
            Value::Object(object) => object,
            other => return Err(ProtocolError::NotAnObject(json_kind(&other))),
        };

        let readable_ports = match object.remove(READABLE_PORTS_FIELD) {
            Some(ports) => serde_json::from_value(ports)?,
            None => Vec::new(),
        };

        let outputs = object
            .into_iter()
            .map(|(port, value)| (PortId::from(port), value))
            .collect();

        Ok(Self {
            outputs,
            readable_ports,
        })
    }
}

impl Serialize for OutboundFrame {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.outputs.len() + 1))?;
        for (port, value) in &self.outputs {
            if port.as_str() == READABLE_PORTS_FIELD {
                continue;
            }
            map.serialize_entry(port.as_str(), value)?;
        }
        map.serialize_entry(READABLE_PORTS_FIELD, &self.readable_ports)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_device_key_concatenates_company_and_model() {
        let frame = InboundFrame::parse(br#"{"company":2,"model":4,"a0":12}"#).unwrap();
        assert_eq!(frame.device_key().as_deref(), Some("24"));
    }

    #[test]
    fn test_device_key_absent_without_company() {
        let frame = InboundFrame::parse(br#"{"model":4,"3":1}"#).unwrap();
        assert_eq!(frame.device_key(), None);
    }

    #[test]
    fn test_string_key_parts() {
        let frame = InboundFrame::parse(br#"{"company":"5","model":"1"}"#).unwrap();
        assert_eq!(frame.device_key().as_deref(), Some("51"));
    }

    #[test]
    fn test_port_values_skip_identification_and_non_numeric() {
        let frame = InboundFrame::parse(
            br#"{"company":1,"model":1,"3":1,"a0":512.5,"btn":true,"name":"x"}"#,
        )
        .unwrap();
        let values = frame.port_values();

        assert_eq!(values.len(), 3);
        assert_eq!(values[&PortId::from(3u32)], 1.0);
        assert_eq!(values[&PortId::from("a0")], 512.5);
        assert_eq!(values[&PortId::from("btn")], 1.0);
    }

    #[test]
    fn test_from_value_accepts_object_or_serialized_string() {
        let from_object = InboundFrame::from_value(json!({"company": 1, "model": 1, "3": 1})).unwrap();
        let from_string =
            InboundFrame::from_value(json!(r#"{"company":1,"model":1,"3":1}"#)).unwrap();

        assert_eq!(from_object, from_string);
        assert_eq!(from_object.device_key().as_deref(), Some("11"));
        assert!(matches!(
            InboundFrame::from_value(json!([1])),
            Err(ProtocolError::NotAnObject("array"))
        ));
    }

    #[test]
    fn test_outbound_shape() {
        let mut frame = OutboundFrame::default();
        frame.outputs.insert(PortId::from(5u32), json!(1));
        frame.readable_ports.push(PortId::from(3u32));

        let value: Value = serde_json::from_slice(&frame.to_bytes().unwrap()).unwrap();
        assert_eq!(value, json!({"5": 1, "readablePorts": [3]}));
    }

    #[test]
    fn test_outbound_parse() {
        let frame = OutboundFrame::parse(br#"{"9":255,"readablePorts":[2,"a1"]}"#).unwrap();
        assert_eq!(frame.outputs[&PortId::from(9u32)], json!(255));
        assert_eq!(
            frame.readable_ports,
            vec![PortId::from(2u32), PortId::from("a1")]
        );
    }

    #[test]
    fn test_outbound_parse_rejects_non_object() {
        let result = OutboundFrame::parse(b"[1,2]");
        assert!(matches!(result, Err(ProtocolError::NotAnObject("array"))));
    }
}
