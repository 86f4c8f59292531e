use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Address;

/// One UDP datagram on the wire, JSON-encoded. The `type` tag selects the
/// variant; addresses used as map keys serialize as JSON strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    Update {
        source: Address,
        destination: Address,
        distances: HashMap<Address, u32>,
    },
    Data {
        source: Address,
        destination: Address,
        payload: Value,
    },
    Trace {
        source: Address,
        destination: Address,
        routers: Vec<Address>,
    },
}

impl Message {
    pub fn serialize(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_wire_format_uses_lowercase_tag_and_string_keys() {
        let mut distances = HashMap::new();
        distances.insert("10.0.0.3".parse().unwrap(), 2u32);
        let message = Message::Update {
            source: "10.0.0.1".parse().unwrap(),
            destination: "10.0.0.2".parse().unwrap(),
            distances,
        };

        let value: Value = serde_json::from_slice(&message.serialize().unwrap()).unwrap();
        assert_eq!(value["type"], "update");
        assert_eq!(value["source"], "10.0.0.1");
        assert_eq!(value["destination"], "10.0.0.2");
        assert_eq!(value["distances"]["10.0.0.3"], 2);
    }

    #[test]
    fn trace_decodes_from_raw_json() {
        let raw = br#"{"type":"trace","source":"10.0.0.1","destination":"10.0.0.3","routers":["10.0.0.1"]}"#;
        match Message::deserialize(raw).unwrap() {
            Message::Trace {
                source, routers, ..
            } => {
                assert_eq!(source, "10.0.0.1".parse::<Address>().unwrap());
                assert_eq!(routers.len(), 1);
            }
            other => panic!("expected trace, got {other:?}"),
        }
    }

    #[test]
    fn missing_required_field_is_a_decode_error() {
        let raw = br#"{"type":"update","source":"10.0.0.1"}"#;
        assert!(Message::deserialize(raw).is_err());
    }
}
