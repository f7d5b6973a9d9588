//! Line protocol decoder.
//!
//! This module turns one text line from the radio receiver into an
//! [`Event`], following the gateway line grammar.
//!
//! # Protocol Format
//!
//! ```text
//! node=<int>;seq=<int>;ev=<token>[;uid=<token>][;<key>=<value>...] [telemetry]
//! ```
//!
//! Where:
//! - `node`: Node identifier (signed integer, required)
//! - `seq`: Per-node sequence number (signed integer, required)
//! - `ev`: Event type, lowercased on decode (required)
//! - `uid`: RFID card UID, kept verbatim on `rfid_scan` events only
//! - Unknown keys are ignored
//! - Anything after the first space (RSSI, SNR, ...) is ignored
//!
//! # Outcomes
//!
//! Decoding has three outcomes:
//!
//! | Input | Result |
//! |-------|--------|
//! | Empty line, or first token not starting with `node=` | `Ok(None)` |
//! | Required field missing, `node`/`seq` not an integer | `Err(..)` (malformed) |
//! | Everything else | `Ok(Some(Event))` |
//!
//! Foreign lines share the serial link with protocol traffic (boot banners,
//! debug prints), so they are not an error.
//!
//! # Examples
//!
//! ```
//! use loragate_protocol::LineDecoder;
//!
//! let event = LineDecoder::decode("node=12;seq=30;ev=rfid_scan;uid=ABCD1234 RSSI=-80")
//!     .unwrap()
//!     .unwrap();
//!
//! assert_eq!(event.node_id(), 12);
//! assert_eq!(event.seq(), 30);
//! assert_eq!(event.event_type(), "rfid_scan");
//! assert_eq!(event.rfid_uid(), Some("ABCD1234"));
//!
//! // Foreign traffic
//! assert!(LineDecoder::decode("RSSI=-80").unwrap().is_none());
//!
//! // Malformed protocol line
//! assert!(LineDecoder::decode("node=12;ev=occupied").is_err());
//! ```

use crate::{event::Event, fields::ParsedFields};
use loragate_core::{Error, Result, constants::*};

/// Decoder for gateway protocol lines.
///
/// Decoding is a pure function of the input line; the same line always
/// decodes to the same result.
pub struct LineDecoder;

impl LineDecoder {
    /// Decode one line.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(event))` for a well-formed protocol line
    /// - `Ok(None)` for an empty or foreign line
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] when `node`, `seq` or `ev` is absent
    /// and [`Error::NonNumericField`] when `node` or `seq` is not a base-10
    /// integer. Both report [`Error::is_malformed`].
    pub fn decode(line: &str) -> Result<Option<Event>> {
        let Some(token) = Self::protocol_token(line) else {
            return Ok(None);
        };

        let fields = ParsedFields::parse(token);
        Self::event_from_fields(&fields).map(Some)
    }

    /// Extract the protocol token of a line, if the line is protocol traffic.
    ///
    /// Returns the substring before the first space when it starts with
    /// `node=`, `None` otherwise.
    ///
    /// ```
    /// use loragate_protocol::LineDecoder;
    ///
    /// assert_eq!(
    ///     LineDecoder::protocol_token("  node=1;seq=2;ev=x RSSI=-80\r\n"),
    ///     Some("node=1;seq=2;ev=x")
    /// );
    /// assert_eq!(LineDecoder::protocol_token("boot ok"), None);
    /// assert_eq!(LineDecoder::protocol_token("   "), None);
    /// ```
    pub fn protocol_token(line: &str) -> Option<&str> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let token = match line.split_once(TELEMETRY_SEPARATOR) {
            Some((token, _telemetry)) => token,
            None => line,
        };

        token.starts_with(PROTOCOL_PREFIX).then_some(token)
    }

    /// Build an event from already split fields.
    ///
    /// # Errors
    ///
    /// Same as [`LineDecoder::decode`].
    pub fn event_from_fields(fields: &ParsedFields) -> Result<Event> {
        let node = Self::required(fields, FIELD_NODE)?;
        let seq = Self::required(fields, FIELD_SEQ)?;
        let event_type = Self::required(fields, FIELD_EVENT)?;

        let node_id = Self::integer(FIELD_NODE, node)?;
        let seq = Self::integer(FIELD_SEQ, seq)?;
        let uid = fields.get(FIELD_UID).map(str::to_string);

        Ok(Event::new(node_id, seq, event_type, uid))
    }

    fn required<'a>(fields: &'a ParsedFields, name: &str) -> Result<&'a str> {
        fields.get(name).ok_or_else(|| Error::missing_field(name))
    }

    fn integer(name: &str, value: &str) -> Result<i64> {
        value
            .parse::<i64>()
            .map_err(|_| Error::non_numeric(name, value))
    }
}
