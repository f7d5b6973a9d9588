use loragate_core::constants::EVENT_RFID_SCAN;
use std::fmt;

/// Decoded protocol event
///
/// An `Event` only exists once `node` and `seq` parsed as integers and `ev`
/// was present; there is no partially decoded form. The event type is always
/// lowercase and an RFID UID is only carried by `rfid_scan` events.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Event {
    node_id: i64,
    seq: i64,
    event_type: String,
    rfid_uid: Option<String>,
}

impl Event {
    /// Build an event, lowercasing the type and dropping a UID that does not
    /// belong to an `rfid_scan`.
    pub fn new(node_id: i64, seq: i64, event_type: &str, rfid_uid: Option<String>) -> Self {
        let event_type = event_type.trim().to_lowercase();
        let rfid_uid = if event_type == EVENT_RFID_SCAN {
            rfid_uid
        } else {
            None
        };

        Event {
            node_id,
            seq,
            event_type,
            rfid_uid,
        }
    }

    pub fn node_id(&self) -> i64 {
        self.node_id
    }

    pub fn seq(&self) -> i64 {
        self.seq
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn rfid_uid(&self) -> Option<&str> {
        self.rfid_uid.as_deref()
    }

    pub fn is_rfid_scan(&self) -> bool {
        self.event_type == EVENT_RFID_SCAN
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "node={} seq={} ev={}",
            self.node_id, self.seq, self.event_type
        )?;
        if let Some(uid) = &self.rfid_uid {
            write!(f, " uid={}", uid)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = Event::new(12, 30, "RFID_SCAN", Some("ABCD1234".to_string()));

        assert_eq!(event.node_id(), 12);
        assert_eq!(event.seq(), 30);
        assert_eq!(event.event_type(), "rfid_scan");
        assert_eq!(event.rfid_uid(), Some("ABCD1234"));
        assert!(event.is_rfid_scan());
    }

    #[test]
    fn test_uid_dropped_on_other_event_types() {
        let event = Event::new(12, 5, "occupied", Some("ZZZZ".to_string()));

        assert_eq!(event.event_type(), "occupied");
        assert_eq!(event.rfid_uid(), None);
        assert!(!event.is_rfid_scan());
    }

    #[test]
    fn test_uppercase_type_with_stray_uid() {
        let event = Event::new(1, 1, "OCCUPIED", Some("ZZ".to_string()));

        assert_eq!(event.event_type(), "occupied");
        assert_eq!(event.rfid_uid(), None);
        assert_eq!(event, Event::new(1, 1, "occupied", None));
    }

    #[test]
    fn test_uid_is_not_normalized() {
        let event = Event::new(1, 1, "rfid_scan", Some("abCD12".to_string()));
        assert_eq!(event.rfid_uid(), Some("abCD12"));
    }

    #[test]
    fn test_display() {
        let event = Event::new(12, 30, "rfid_scan", Some("ABCD1234".to_string()));
        assert_eq!(event.to_string(), "node=12 seq=30 ev=rfid_scan uid=ABCD1234");

        let event = Event::new(12, 25, "occupied", None);
        assert_eq!(event.to_string(), "node=12 seq=25 ev=occupied");
    }
}
