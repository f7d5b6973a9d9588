//! Outbound payload construction.
//!
//! Building a payload is a pure mapping from a decoded [`Event`]; it has no
//! failure modes. The JSON shape is:
//!
//! ```json
//! {"node_id": 12, "seq": 30, "event_type": "rfid_scan", "rfid_uid": "ABCD1234"}
//! ```
//!
//! `rfid_uid` is left out entirely (not `null`) when the event carries none.

use loragate_core::DeviceKey;
use loragate_protocol::Event;
use serde::{Deserialize, Serialize};

/// JSON body posted to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundPayload {
    pub node_id: i64,
    pub seq: i64,
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rfid_uid: Option<String>,
}

impl From<&Event> for OutboundPayload {
    fn from(event: &Event) -> Self {
        Self {
            node_id: event.node_id(),
            seq: event.seq(),
            event_type: event.event_type().to_string(),
            rfid_uid: event.rfid_uid().map(str::to_string),
        }
    }
}

/// Build the payload for an event.
///
/// # Example
///
/// ```
/// use loragate_network::build_payload;
/// use loragate_protocol::Event;
///
/// let event = Event::new(12, 5, "occupied", None);
/// let json = serde_json::to_string(&build_payload(&event)).unwrap();
/// assert_eq!(json, r#"{"node_id":12,"seq":5,"event_type":"occupied"}"#);
/// ```
pub fn build_payload(event: &Event) -> OutboundPayload {
    OutboundPayload::from(event)
}

/// Payload plus the device key that authenticates it.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub payload: OutboundPayload,
    pub device_key: DeviceKey,
}

impl OutboundRequest {
    pub fn new(event: &Event, device_key: DeviceKey) -> Self {
        Self {
            payload: build_payload(event),
            device_key,
        }
    }
}
